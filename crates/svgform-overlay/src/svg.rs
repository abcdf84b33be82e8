//! Headless [`RenderedDocument`] over SVG text.
//!
//! Bounding boxes are computed the way a browser's `getBoundingClientRect()` would report them
//! for an untransformed host element: shape geometry, composed with every `transform` on the
//! element and its ancestors, then mapped through the root `viewBox` into viewport pixels.
//! Text has no font metrics here and therefore no geometry.

use crate::document::{AttributeQuery, ElementRef, RenderedDocument};
use crate::error::{DocumentError, MeasureError, SvgDocumentError};
use crate::geom::{Box2D, Rect, Size, Transform, point, union};
use rustc_hash::FxHashMap;
use std::str::FromStr;
use svgtypes::SimplePathSegment;

/// Subtrees that are never rendered directly.
const NON_RENDERED: &[&str] = &[
    "defs",
    "clipPath",
    "mask",
    "marker",
    "pattern",
    "symbol",
    "title",
    "desc",
    "metadata",
    "style",
    "script",
    "linearGradient",
    "radialGradient",
    "filter",
];

#[derive(Debug, Clone)]
struct SvgNode {
    tag: String,
    /// Attribute names are qualified (`inkscape:label`) when the attribute is namespaced.
    attrs: Vec<(String, String)>,
    parent: Option<usize>,
    children: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct SvgDocument {
    nodes: Vec<SvgNode>,
    ids: FxHashMap<String, usize>,
}

impl SvgDocument {
    pub fn parse(text: &str) -> Result<Self, SvgDocumentError> {
        let doc = roxmltree::Document::parse_with_options(
            text,
            roxmltree::ParsingOptions {
                allow_dtd: true,
                ..roxmltree::ParsingOptions::default()
            },
        )?;
        let mut out = Self {
            nodes: Vec::new(),
            ids: FxHashMap::default(),
        };
        out.push_node(doc.root_element(), None);
        Ok(out)
    }

    fn push_node(&mut self, node: roxmltree::Node<'_, '_>, parent: Option<usize>) -> usize {
        let idx = self.nodes.len();
        let attrs: Vec<(String, String)> = node
            .attributes()
            .map(|a| {
                let name = match a.namespace().and_then(|uri| node.lookup_prefix(uri)) {
                    Some(prefix) if !prefix.is_empty() => format!("{prefix}:{}", a.name()),
                    _ => a.name().to_string(),
                };
                (name, a.value().to_string())
            })
            .collect();
        if let Some((_, id)) = attrs.iter().find(|(k, _)| k == "id") {
            self.ids.entry(id.clone()).or_insert(idx);
        }
        self.nodes.push(SvgNode {
            tag: node.tag_name().name().to_string(),
            attrs,
            parent,
            children: Vec::new(),
        });
        for child in node.children().filter(|c| c.is_element()) {
            let c = self.push_node(child, Some(idx));
            self.nodes[idx].children.push(c);
        }
        idx
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn tag_name(&self, element: ElementRef) -> Option<&str> {
        self.nodes.get(element.0).map(|n| n.tag.as_str())
    }

    pub fn attribute(&self, element: ElementRef, name: &str) -> Option<&str> {
        self.attr(element.0, name)
    }

    fn attr(&self, idx: usize, name: &str) -> Option<&str> {
        self.nodes
            .get(idx)?
            .attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn number(&self, idx: usize, name: &str) -> Result<Option<f64>, MeasureError> {
        let Some(raw) = self.attr(idx, name) else {
            return Ok(None);
        };
        parse_length(raw).map(Some).ok_or_else(|| self.invalid(idx, name, raw))
    }

    fn number_or_zero(&self, idx: usize, name: &str) -> Result<f64, MeasureError> {
        Ok(self.number(idx, name)?.unwrap_or(0.0))
    }

    fn invalid(&self, idx: usize, attribute: &str, value: &str) -> MeasureError {
        MeasureError::InvalidAttribute {
            tag: self.nodes[idx].tag.clone(),
            attribute: attribute.to_string(),
            value: value.to_string(),
        }
    }

    fn is_hidden(&self, idx: usize) -> bool {
        let node = &self.nodes[idx];
        if NON_RENDERED.contains(&node.tag.as_str()) {
            return true;
        }
        if self.attr(idx, "display") == Some("none") {
            return true;
        }
        self.attr(idx, "style").is_some_and(|style| {
            style.split(';').any(|decl| {
                let compact: String = decl.chars().filter(|c| !c.is_whitespace()).collect();
                compact == "display:none"
            })
        })
    }

    /// The element's own `transform`, identity for the root element.
    fn own_transform(&self, idx: usize) -> Result<Transform, MeasureError> {
        if self.nodes[idx].parent.is_none() {
            return Ok(Transform::identity());
        }
        let t = match self.attr(idx, "transform").map(str::trim) {
            None | Some("") => Transform::identity(),
            Some(raw) => {
                let parsed = svgtypes::Transform::from_str(raw)
                    .map_err(|_| self.invalid(idx, "transform", raw))?;
                Transform::new(parsed.a, parsed.b, parsed.c, parsed.d, parsed.e, parsed.f)
            }
        };
        // Nested viewports are offset by their x/y.
        if self.nodes[idx].tag == "svg" {
            let x = self.number_or_zero(idx, "x")?;
            let y = self.number_or_zero(idx, "y")?;
            return Ok(Transform::translation(x, y).then(&t));
        }
        Ok(t)
    }

    /// Maps root user space (viewBox) into viewport pixels.
    fn viewport_transform(&self) -> Transform {
        let Some(vb) = self.view_box() else {
            return Transform::identity();
        };
        let width = self.attr(0, "width").and_then(parse_length);
        let height = self.attr(0, "height").and_then(parse_length);
        let (Some(width), Some(height)) = (width, height) else {
            return Transform::translation(-vb.x, -vb.y);
        };
        if vb.w <= 0.0 || vb.h <= 0.0 {
            return Transform::identity();
        }
        let sx = width / vb.w;
        let sy = height / vb.h;
        let aspect = self.attr(0, "preserveAspectRatio").unwrap_or_default();
        if aspect.trim() == "none" {
            return Transform::translation(-vb.x, -vb.y).then(&Transform::scale(sx, sy));
        }
        // Default `xMidYMid meet`.
        let s = sx.min(sy);
        let tx = (width - vb.w * s) / 2.0;
        let ty = (height - vb.h * s) / 2.0;
        Transform::translation(-vb.x, -vb.y)
            .then(&Transform::scale(s, s))
            .then(&Transform::translation(tx, ty))
    }

    fn view_box(&self) -> Option<svgtypes::ViewBox> {
        self.attr(0, "viewBox")
            .and_then(|raw| svgtypes::ViewBox::from_str(raw).ok())
    }

    /// Bounds of the element's own geometry in its own user space (before its transform).
    fn shape_bounds(&self, idx: usize) -> Result<Option<Box2D>, MeasureError> {
        let node = &self.nodes[idx];
        match node.tag.as_str() {
            "rect" | "image" | "foreignObject" | "use" => {
                let (Some(w), Some(h)) = (self.number(idx, "width")?, self.number(idx, "height")?)
                else {
                    return Ok(None);
                };
                let x = self.number_or_zero(idx, "x")?;
                let y = self.number_or_zero(idx, "y")?;
                Ok(Some(Box2D::new(point(x, y), point(x + w, y + h))))
            }
            "circle" => {
                let cx = self.number_or_zero(idx, "cx")?;
                let cy = self.number_or_zero(idx, "cy")?;
                let Some(r) = self.number(idx, "r")? else {
                    return Ok(None);
                };
                Ok(Some(Box2D::new(point(cx - r, cy - r), point(cx + r, cy + r))))
            }
            "ellipse" => {
                let cx = self.number_or_zero(idx, "cx")?;
                let cy = self.number_or_zero(idx, "cy")?;
                let (Some(rx), Some(ry)) = (self.number(idx, "rx")?, self.number(idx, "ry")?)
                else {
                    return Ok(None);
                };
                Ok(Some(Box2D::new(
                    point(cx - rx, cy - ry),
                    point(cx + rx, cy + ry),
                )))
            }
            "line" => {
                let p1 = point(
                    self.number_or_zero(idx, "x1")?,
                    self.number_or_zero(idx, "y1")?,
                );
                let p2 = point(
                    self.number_or_zero(idx, "x2")?,
                    self.number_or_zero(idx, "y2")?,
                );
                Ok(Some(Box2D::from_points([p1, p2])))
            }
            "polyline" | "polygon" => {
                let Some(raw) = self.attr(idx, "points") else {
                    return Ok(None);
                };
                let points: Vec<_> = svgtypes::PointsParser::from(raw)
                    .map(|(x, y)| point(x, y))
                    .collect();
                if points.is_empty() {
                    return Ok(None);
                }
                Ok(Some(Box2D::from_points(points)))
            }
            "path" => {
                let Some(raw) = self.attr(idx, "d") else {
                    return Ok(None);
                };
                path_bounds(raw).map_err(|_| self.invalid(idx, "d", raw))
            }
            _ => Ok(None),
        }
    }

    /// Bounds of the element and its rendered descendants, in its parent's user space.
    fn subtree_bounds(&self, idx: usize) -> Result<Option<Box2D>, MeasureError> {
        if self.is_hidden(idx) {
            return Ok(None);
        }
        let mut local = self.shape_bounds(idx)?;
        if matches!(
            self.nodes[idx].tag.as_str(),
            "svg" | "g" | "a" | "switch"
        ) {
            for &child in &self.nodes[idx].children {
                local = union(local, self.subtree_bounds(child)?);
            }
        }
        let Some(local) = local else {
            return Ok(None);
        };
        let t = self.own_transform(idx)?;
        Ok(Some(t.outer_transformed_box(&local)))
    }
}

impl RenderedDocument for SvgDocument {
    fn find(&self, query: &AttributeQuery<'_>) -> Result<Option<ElementRef>, DocumentError> {
        if query.name == "id" {
            return Ok(self.ids.get(query.value).copied().map(ElementRef));
        }
        Ok((0..self.nodes.len())
            .find(|&idx| self.attr(idx, query.name) == Some(query.value))
            .map(ElementRef))
    }

    fn bounding_rect(&self, element: ElementRef) -> Result<Option<Rect>, MeasureError> {
        let idx = element.0;
        if idx >= self.nodes.len() {
            return Err(MeasureError::UnknownElement(idx));
        }

        let mut ancestors = Vec::new();
        let mut cur = self.nodes[idx].parent;
        while let Some(p) = cur {
            if self.is_hidden(p) {
                return Ok(None);
            }
            ancestors.push(p);
            cur = self.nodes[p].parent;
        }

        let Some(mut b) = self.subtree_bounds(idx)? else {
            return Ok(None);
        };
        for &a in &ancestors {
            b = self.own_transform(a)?.outer_transformed_box(&b);
        }
        b = self.viewport_transform().outer_transformed_box(&b);
        let rect = Rect::from_box(b);
        Ok(rect.is_finite().then_some(rect))
    }

    fn dimensions(&self) -> Option<Size> {
        if self.nodes.is_empty() {
            return None;
        }
        let width = self.attr(0, "width").and_then(parse_length);
        let height = self.attr(0, "height").and_then(parse_length);
        match (width, height, self.view_box()) {
            (Some(width), Some(height), _) => Some(Size { width, height }),
            (_, _, Some(vb)) => Some(Size {
                width: vb.w,
                height: vb.h,
            }),
            _ => None,
        }
    }
}

/// Plain numbers and `px` lengths; anything else (percentages, font-relative units) is not
/// resolvable headlessly.
fn parse_length(raw: &str) -> Option<f64> {
    let s = raw.trim().trim_end_matches("px").trim();
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn path_bounds(d: &str) -> Result<Option<Box2D>, svgtypes::Error> {
    let mut b: Option<Box2D> = None;
    let mut include = |x: f64, y: f64| {
        let p = Box2D::new(point(x, y), point(x, y));
        b = union(b, Some(p));
    };
    let (mut cx, mut cy) = (0.0, 0.0);
    for seg in svgtypes::SimplifyingPathParser::from(d) {
        match seg? {
            SimplePathSegment::MoveTo { x, y } | SimplePathSegment::LineTo { x, y } => {
                include(x, y);
                (cx, cy) = (x, y);
            }
            SimplePathSegment::CurveTo {
                x1,
                y1,
                x2,
                y2,
                x,
                y,
            } => {
                include(cx, cy);
                include(x, y);
                for t in cubic_extrema(cx, x1, x2, x)
                    .into_iter()
                    .chain(cubic_extrema(cy, y1, y2, y))
                    .flatten()
                {
                    include(cubic_at(cx, x1, x2, x, t), cubic_at(cy, y1, y2, y, t));
                }
                (cx, cy) = (x, y);
            }
            SimplePathSegment::Quadratic { x1, y1, x, y } => {
                include(cx, cy);
                include(x, y);
                for t in [quad_extremum(cx, x1, x), quad_extremum(cy, y1, y)]
                    .into_iter()
                    .flatten()
                {
                    include(quad_at(cx, x1, x, t), quad_at(cy, y1, y, t));
                }
                (cx, cy) = (x, y);
            }
            SimplePathSegment::ClosePath => {}
        }
    }
    Ok(b)
}

fn cubic_at(p0: f64, p1: f64, p2: f64, p3: f64, t: f64) -> f64 {
    let mt = 1.0 - t;
    mt * mt * mt * p0 + 3.0 * mt * mt * t * p1 + 3.0 * mt * t * t * p2 + t * t * t * p3
}

/// Parameters in (0, 1) where the cubic's derivative vanishes.
fn cubic_extrema(p0: f64, p1: f64, p2: f64, p3: f64) -> [Option<f64>; 2] {
    const EPS: f64 = 1e-12;
    let a = -p0 + 3.0 * p1 - 3.0 * p2 + p3;
    let b = 2.0 * (p0 - 2.0 * p1 + p2);
    let c = p1 - p0;
    let inside = |t: f64| (t > 0.0 && t < 1.0).then_some(t);
    if a.abs() <= EPS {
        if b.abs() <= EPS {
            return [None, None];
        }
        return [inside(-c / b), None];
    }
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return [None, None];
    }
    let s = disc.sqrt();
    [inside((-b + s) / (2.0 * a)), inside((-b - s) / (2.0 * a))]
}

fn quad_at(p0: f64, p1: f64, p2: f64, t: f64) -> f64 {
    let mt = 1.0 - t;
    mt * mt * p0 + 2.0 * mt * t * p1 + t * t * p2
}

fn quad_extremum(p0: f64, p1: f64, p2: f64) -> Option<f64> {
    let denom = p0 - 2.0 * p1 + p2;
    if denom.abs() <= 1e-12 {
        return None;
    }
    let t = (p0 - p1) / denom;
    (t > 0.0 && t < 1.0).then_some(t)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect_of(doc: &SvgDocument, id: &str) -> Option<Rect> {
        let el = doc.find(&AttributeQuery::new("id", id)).unwrap()?;
        doc.bounding_rect(el).unwrap()
    }

    #[test]
    fn rect_with_group_translate() {
        let doc = SvgDocument::parse(
            r#"<svg xmlns="http://www.w3.org/2000/svg">
              <g transform="translate(10, 20)"><rect id="a" x="5" y="5" width="30" height="10"/></g>
            </svg>"#,
        )
        .unwrap();
        assert_eq!(rect_of(&doc, "a"), Some(Rect::new(15.0, 25.0, 30.0, 10.0)));
    }

    #[test]
    fn viewbox_scales_into_viewport() {
        let doc = SvgDocument::parse(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="200" height="100" viewBox="0 0 100 50">
              <rect id="a" x="10" y="10" width="20" height="10"/>
            </svg>"#,
        )
        .unwrap();
        assert_eq!(rect_of(&doc, "a"), Some(Rect::new(20.0, 20.0, 40.0, 20.0)));
        assert_eq!(
            doc.dimensions(),
            Some(Size {
                width: 200.0,
                height: 100.0
            })
        );
    }

    #[test]
    fn group_bounds_union_children_and_skip_hidden() {
        let doc = SvgDocument::parse(
            r#"<svg xmlns="http://www.w3.org/2000/svg">
              <g id="g">
                <circle cx="10" cy="10" r="5"/>
                <line x1="20" y1="0" x2="40" y2="30"/>
                <rect x="500" y="500" width="10" height="10" display="none"/>
                <defs><rect x="-100" y="-100" width="1" height="1"/></defs>
                <text x="0" y="0">label</text>
              </g>
              <g style="display: none"><rect id="hidden" width="10" height="10"/></g>
            </svg>"#,
        )
        .unwrap();
        assert_eq!(rect_of(&doc, "g"), Some(Rect::new(5.0, 0.0, 35.0, 30.0)));
        assert_eq!(rect_of(&doc, "hidden"), None);
    }

    #[test]
    fn path_bounds_include_curve_extrema() {
        let doc = SvgDocument::parse(
            r#"<svg xmlns="http://www.w3.org/2000/svg">
              <path id="p" d="M 0 0 C 0 100 100 100 100 0"/>
            </svg>"#,
        )
        .unwrap();
        let r = rect_of(&doc, "p").unwrap();
        assert_eq!(r.x, 0.0);
        assert_eq!(r.width, 100.0);
        assert!((r.height - 75.0).abs() < 1e-9);
    }

    #[test]
    fn elements_without_geometry_measure_as_none() {
        let doc = SvgDocument::parse(
            r#"<svg xmlns="http://www.w3.org/2000/svg"><text id="t" x="1" y="2">hi</text></svg>"#,
        )
        .unwrap();
        assert_eq!(rect_of(&doc, "t"), None);
    }

    #[test]
    fn invalid_geometry_attribute_is_a_measure_error() {
        let doc = SvgDocument::parse(
            r#"<svg xmlns="http://www.w3.org/2000/svg"><rect id="r" width="50%" height="10"/></svg>"#,
        )
        .unwrap();
        let el = doc.find(&AttributeQuery::new("id", "r")).unwrap().unwrap();
        assert!(matches!(
            doc.bounding_rect(el),
            Err(MeasureError::InvalidAttribute { .. })
        ));
        assert_eq!(
            doc.bounding_rect(ElementRef(99)),
            Err(MeasureError::UnknownElement(99))
        );
    }

    #[test]
    fn qualified_attributes_are_queryable() {
        let doc = SvgDocument::parse(
            r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:inkscape="http://www.inkscape.org/namespaces/inkscape">
              <rect inkscape:label="total" width="1" height="1"/>
            </svg>"#,
        )
        .unwrap();
        let el = doc
            .find(&AttributeQuery::new("inkscape:label", "total"))
            .unwrap()
            .unwrap();
        assert_eq!(doc.tag_name(el), Some("rect"));
    }

    #[test]
    fn out_of_range_element_has_no_attributes() {
        let doc = SvgDocument::parse(r#"<svg><rect id="a"/></svg>"#).unwrap();
        assert_eq!(doc.len(), 2);
        assert_eq!(doc.attribute(ElementRef(1), "id"), Some("a"));
        assert_eq!(doc.attribute(ElementRef(5), "id"), None);
        assert_eq!(doc.tag_name(ElementRef(5)), None);
    }
}
