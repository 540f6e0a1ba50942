//! Markup fragment parser
//!
//! Builds detached nodes from an HTML snippet. This is a forgiving tokenizer,
//! not a full HTML5 tree builder: it understands tags, quoted and bare
//! attributes, void elements, comments and the common character entities.
//! Unknown end tags are dropped; unclosed elements are closed at the end.

use crate::arena::DomArena;
use crate::error::Result;
use crate::types::{NodeId, NodeType, VOID_ELEMENTS};

/// Parse `html` into detached top-level nodes (in source order)
pub fn parse_fragment(arena: &mut DomArena, html: &str) -> Result<Vec<NodeId>> {
    let mut roots = Vec::new();
    let mut open: Vec<NodeId> = Vec::new();
    let mut rest = html;

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix("<!--") {
            let (body, tail) = after.split_once("-->").unwrap_or((after, ""));
            let id = arena.alloc(NodeType::Comment, "#comment");
            arena.get_mut(id)?.node_value = body.to_string();
            attach(arena, &mut roots, &open, id)?;
            rest = tail;
        } else if let Some(after) = rest.strip_prefix("</") {
            let end = after.find('>').unwrap_or(after.len());
            let name = after[..end].trim().to_ascii_uppercase();
            if let Some(pos) = open
                .iter()
                .rposition(|&id| arena.get(id).map(|n| n.node_name == name).unwrap_or(false))
            {
                open.truncate(pos);
            }
            rest = after.get(end + 1..).unwrap_or("");
        } else if rest.starts_with('<')
            && rest[1..].starts_with(|c: char| c.is_ascii_alphabetic())
        {
            let (tag, consumed) = parse_tag(&rest[1..]);
            let id = arena.alloc(NodeType::Element, &tag.name.to_ascii_uppercase());
            {
                let node = arena.get_mut(id)?;
                for (name, value) in tag.attributes {
                    if name == "style" {
                        node.set_style_text(&value);
                    } else {
                        node.attributes.insert(name, value);
                    }
                }
                node.checked = node.attributes.contains_key("checked");
            }
            attach(arena, &mut roots, &open, id)?;
            let void = VOID_ELEMENTS
                .iter()
                .any(|v| v.eq_ignore_ascii_case(&tag.name));
            if !void && !tag.self_closing {
                open.push(id);
            }
            rest = &rest[1 + consumed..];
        } else {
            let first = rest.chars().next().map(char::len_utf8).unwrap_or(1);
            let end = rest[first..]
                .find('<')
                .map(|i| i + first)
                .unwrap_or(rest.len());
            let text = decode_entities(&rest[..end]);
            let id = arena.alloc(NodeType::Text, "#text");
            arena.get_mut(id)?.node_value = text;
            attach(arena, &mut roots, &open, id)?;
            rest = &rest[end..];
        }
    }

    Ok(roots)
}

fn attach(arena: &mut DomArena, roots: &mut Vec<NodeId>, open: &[NodeId], id: NodeId) -> Result<()> {
    match open.last() {
        Some(&parent) => {
            arena.append_child(parent, id)?;
        }
        None => roots.push(id),
    }
    Ok(())
}

struct Tag {
    name: String,
    attributes: Vec<(String, String)>,
    self_closing: bool,
}

/// Parse `name attr=... >`; returns the tag and the bytes consumed
fn parse_tag(src: &str) -> (Tag, usize) {
    let bytes = src.as_bytes();
    let mut i = 0;
    let word = |i: &mut usize| {
        let start = *i;
        while *i < bytes.len()
            && !bytes[*i].is_ascii_whitespace()
            && !matches!(bytes[*i], b'>' | b'/' | b'=')
        {
            *i += 1;
        }
        src[start..*i].to_string()
    };

    let name = word(&mut i);
    let mut attributes = Vec::new();
    let mut self_closing = false;

    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() {
            break;
        }
        match bytes[i] {
            b'>' => {
                i += 1;
                break;
            }
            b'/' => {
                self_closing = true;
                i += 1;
            }
            _ => {
                let before = i;
                let attr = word(&mut i).to_ascii_lowercase();
                let mut value = String::new();
                if i < bytes.len() && bytes[i] == b'=' {
                    i += 1;
                    if i < bytes.len() && (bytes[i] == b'"' || bytes[i] == b'\'') {
                        let quote = bytes[i];
                        let start = i + 1;
                        let end = bytes[start..]
                            .iter()
                            .position(|&b| b == quote)
                            .map(|p| start + p)
                            .unwrap_or(bytes.len());
                        value = decode_entities(&src[start..end]);
                        i = (end + 1).min(bytes.len());
                    } else {
                        value = decode_entities(&word(&mut i));
                    }
                }
                if !attr.is_empty() {
                    attributes.push((attr, value));
                } else if i == before {
                    i += src[i..].chars().next().map_or(1, char::len_utf8);
                }
            }
        }
    }

    (
        Tag {
            name,
            attributes,
            self_closing,
        },
        i,
    )
}

/// Decode the handful of entities markup commonly carries
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        let decoded = tail.find(';').and_then(|end| {
            let entity = &tail[1..end];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" | "#39" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => entity
                    .strip_prefix('#')
                    .and_then(|n| match n.strip_prefix('x') {
                        Some(hex) => u32::from_str_radix(hex, 16).ok(),
                        None => n.parse().ok(),
                    })
                    .and_then(char::from_u32),
            };
            ch.map(|c| (c, end + 1))
        });
        match decoded {
            Some((c, len)) => {
                out.push(c);
                rest = &tail[len..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested() {
        let mut arena = DomArena::new();
        let roots = parse_fragment(
            &mut arena,
            r#"<div id="a" class='x y'><span>hi</span><br><input type=text disabled></div>tail"#,
        )
        .unwrap();
        assert_eq!(roots.len(), 2);

        let div = arena.get(roots[0]).unwrap();
        assert_eq!(div.node_name, "DIV");
        assert_eq!(div.attr("class"), Some("x y"));
        assert_eq!(div.children_ids.len(), 3);

        let input = arena.get(div.children_ids[2]).unwrap();
        assert_eq!(input.attr("type"), Some("text"));
        assert_eq!(input.attr("disabled"), Some(""));
        assert_eq!(arena.get(roots[1]).unwrap().node_value, "tail");
    }

    #[test]
    fn test_unclosed_and_stray_end_tags() {
        let mut arena = DomArena::new();
        let roots = parse_fragment(&mut arena, "<p>one</b><p>two").unwrap();
        // second <p> nests inside the first, as the tokenizer does not imply end tags
        assert_eq!(roots.len(), 1);
        assert_eq!(arena.descendants(roots[0]).unwrap().len(), 3);
    }

    #[test]
    fn test_nameless_attribute_before_multibyte_text() {
        let mut arena = DomArena::new();
        let roots = parse_fragment(&mut arena, "<a =\"x\"é>t</a><p title='ü'>ö</p>").unwrap();
        assert_eq!(roots.len(), 2);

        let a = arena.get(roots[0]).unwrap();
        assert_eq!(a.node_name, "A");
        assert_eq!(a.attr("é"), Some(""));
        assert_eq!(arena.get(a.children_ids[0]).unwrap().node_value, "t");

        let p = arena.get(roots[1]).unwrap();
        assert_eq!(p.attr("title"), Some("ü"));
    }

    #[test]
    fn test_entities() {
        assert_eq!(decode_entities("a &amp; b &lt;c&gt; &#65;&#x42;"), "a & b <c> AB");
        assert_eq!(decode_entities("AT&T"), "AT&T");
    }

    #[test]
    fn test_comment_and_style() {
        let mut arena = DomArena::new();
        let roots = parse_fragment(&mut arena, r#"<!-- x --><b style="display: none">"#).unwrap();
        assert_eq!(arena.get(roots[0]).unwrap().node_type, NodeType::Comment);
        let b = arena.get(roots[1]).unwrap();
        assert_eq!(b.styles.get("display").map(String::as_str), Some("none"));
    }
}
