use roxmltree::{Document, Node, ParsingOptions};

/// Parses `text` with DTDs allowed (SVG exports routinely carry a DOCTYPE).
pub(crate) fn parse(text: &str) -> Result<Document<'_>, roxmltree::Error> {
    Document::parse_with_options(
        text,
        ParsingOptions {
            allow_dtd: true,
            ..ParsingOptions::default()
        },
    )
}

/// Reads an attribute by plain (`id`) or qualified (`inkscape:label`) name.
///
/// Qualified names are resolved through the element's namespace scope, so the prefix used in
/// the configuration must be the one declared by the document.
pub(crate) fn attribute<'a>(node: Node<'a, '_>, name: &str) -> Option<&'a str> {
    let Some((prefix, local)) = name.split_once(':') else {
        return node.attribute(name);
    };
    node.attributes()
        .find(|a| {
            a.name() == local
                && a.namespace()
                    .and_then(|uri| node.lookup_prefix(uri))
                    .is_some_and(|p| p == prefix)
        })
        .map(|a| a.value())
}

pub(crate) fn elements<'a, 'input>(
    root: Node<'a, 'input>,
) -> impl Iterator<Item = Node<'a, 'input>> {
    root.descendants().filter(|n| n.is_element())
}
