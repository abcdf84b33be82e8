use std::borrow::Cow;

/// Decodes HTML named and numeric entities (`&lt;`, `&quot;`, `&#10;`, `&#x3C;`, ...).
///
/// draw.io stores its native graph description entity-encoded inside an attribute of the
/// exported SVG root. Depending on the exporter the text may be encoded once (which the XML
/// parser already undid) or twice, so callers only run this when the text does not already look
/// like markup.
pub fn decode_entities(input: &str) -> Cow<'_, str> {
    // Fast path: nothing to decode.
    if !input.contains('&') {
        return Cow::Borrowed(input);
    }
    htmlize::unescape(input)
}

/// Decodes `%XX` escapes as produced by JavaScript's `encodeURIComponent`.
///
/// Invalid escapes are kept verbatim; invalid UTF-8 is replaced.
pub fn percent_decode(input: &str) -> Cow<'_, str> {
    percent_encoding::percent_decode_str(input).decode_utf8_lossy()
}
