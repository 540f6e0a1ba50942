//! Free helpers over the arena and layout rectangles

use crate::arena::DomArena;
use crate::error::Result;
use crate::types::{DomRect, Intersection, NodeType, Region};

/// Concatenated text of every text node in the subtree (`textContent`)
pub fn get_text_content(arena: &DomArena, node_id: u32) -> Result<String> {
    let mut out = String::new();
    arena.traverse_df(node_id, |node| {
        if node.node_type == NodeType::Text {
            out += &node.node_value;
        }
        Ok(())
    })?;
    Ok(out)
}

/// Intersection of two regions, with containment of `a` in `b`
pub fn intersect(a: &DomRect, b: &DomRect) -> Intersection {
    let overlap = a.intersection(b);
    Intersection {
        region: overlap.map(Region::from),
        area: overlap.map(|r| r.area()).unwrap_or(0.0),
        in_region: b.contains(a),
    }
}

/// Whether `a` lies in `b`: entirely when `all`, otherwise any overlap
pub fn in_region(a: &DomRect, b: &DomRect, all: bool) -> bool {
    if all {
        b.contains(a)
    } else {
        a.intersects(b)
    }
}

/// Parse a CSS pixel length (`"12px"`, `"12"`); other units are rejected
pub fn parse_px(value: &str) -> Option<f64> {
    let value = value.trim();
    value.strip_suffix("px").unwrap_or(value).trim().parse().ok()
}

/// Normalize a style property name to its CSS (hyphenated) form
pub fn css_name(property: &str) -> String {
    if property == "float" || property == "cssFloat" || property == "styleFloat" {
        return "float".to_string();
    }
    let mut out = String::with_capacity(property.len() + 2);
    for c in property.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersect() {
        let a = DomRect::new(10.0, 10.0, 20.0, 20.0);
        let b = DomRect::new(0.0, 0.0, 100.0, 100.0);
        let result = intersect(&a, &b);
        assert!(result.in_region);
        assert_eq!(result.area, 400.0);

        let far = DomRect::new(500.0, 500.0, 1.0, 1.0);
        let result = intersect(&far, &b);
        assert!(!result.in_region);
        assert!(result.region.is_none());
    }

    #[test]
    fn test_in_region() {
        let a = DomRect::new(90.0, 90.0, 20.0, 20.0);
        let b = DomRect::new(0.0, 0.0, 100.0, 100.0);
        assert!(in_region(&a, &b, false));
        assert!(!in_region(&a, &b, true));
    }

    #[test]
    fn test_css_helpers() {
        assert_eq!(css_name("backgroundColor"), "background-color");
        assert_eq!(css_name("cssFloat"), "float");
        assert_eq!(parse_px("12px"), Some(12.0));
        assert_eq!(parse_px("3em"), None);
    }
}
