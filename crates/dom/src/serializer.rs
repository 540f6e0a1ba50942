//! Markup output for `innerHTML` and `outerHTML` reads
//!
//! Attributes are emitted in sorted order so output is stable across runs.

use crate::arena::DomArena;
use crate::error::Result;
use crate::types::*;

/// Serializer configuration
#[derive(Debug, Clone)]
pub struct SerializerConfig {
    /// Emit tag names in lower case (DOM stores them upper case)
    pub lowercase_tags: bool,
    /// Emit comment nodes
    pub include_comments: bool,
}

impl Default for SerializerConfig {
    fn default() -> Self {
        Self {
            lowercase_tags: true,
            include_comments: true,
        }
    }
}

/// Markup serializer
pub struct DomSerializer {
    config: SerializerConfig,
}

impl DomSerializer {
    pub fn new() -> Self {
        Self::with_config(SerializerConfig::default())
    }

    pub fn with_config(config: SerializerConfig) -> Self {
        Self { config }
    }

    /// Markup of the node's children
    pub fn inner_html(&self, arena: &DomArena, node_id: NodeId) -> Result<String> {
        let mut output = String::new();
        for &child_id in &arena.get(node_id)?.children_ids {
            self.serialize_node(arena, child_id, &mut output)?;
        }
        Ok(output)
    }

    /// Markup of the node itself
    pub fn outer_html(&self, arena: &DomArena, node_id: NodeId) -> Result<String> {
        let mut output = String::new();
        self.serialize_node(arena, node_id, &mut output)?;
        Ok(output)
    }

    fn serialize_node(&self, arena: &DomArena, node_id: NodeId, output: &mut String) -> Result<()> {
        let node = arena.get(node_id)?;

        match node.node_type {
            NodeType::Element => {
                let tag = if self.config.lowercase_tags {
                    node.node_name.to_ascii_lowercase()
                } else {
                    node.node_name.clone()
                };
                output.push('<');
                output.push_str(&tag);

                let mut attrs: Vec<(&str, String)> = node
                    .attributes
                    .iter()
                    .map(|(k, v)| (k.as_str(), v.clone()))
                    .collect();
                if !node.styles.is_empty() {
                    attrs.push(("style", node.style_text()));
                }
                attrs.sort_by(|a, b| a.0.cmp(b.0));

                for (name, value) in attrs {
                    output.push(' ');
                    output.push_str(name);
                    output.push_str("=\"");
                    output.push_str(&escape(&value, true));
                    output.push('"');
                }
                output.push('>');

                if VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(&tag)) {
                    return Ok(());
                }

                for &child_id in &node.children_ids {
                    self.serialize_node(arena, child_id, output)?;
                }

                output.push_str("</");
                output.push_str(&tag);
                output.push('>');
            }
            NodeType::Text => output.push_str(&escape(&node.node_value, false)),
            NodeType::Comment if self.config.include_comments => {
                output.push_str("<!--");
                output.push_str(&node.node_value);
                output.push_str("-->");
            }
            NodeType::Document | NodeType::DocumentFragment => {
                for &child_id in &node.children_ids {
                    self.serialize_node(arena, child_id, output)?;
                }
            }
            _ => {}
        }

        Ok(())
    }
}

impl Default for DomSerializer {
    fn default() -> Self {
        Self::new()
    }
}

fn escape(text: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::parse_fragment;

    #[test]
    fn test_outer_html_roundtrip() {
        let mut arena = DomArena::new();
        let roots = parse_fragment(
            &mut arena,
            r#"<p title="a &quot;b&quot;" class="x">1 &lt; 2<br><!--c--></p>"#,
        )
        .unwrap();

        let html = DomSerializer::new().outer_html(&arena, roots[0]).unwrap();
        assert_eq!(
            html,
            r#"<p class="x" title="a &quot;b&quot;">1 &lt; 2<br><!--c--></p>"#
        );
    }

    #[test]
    fn test_inner_html_skips_comments_when_configured() {
        let mut arena = DomArena::new();
        let roots = parse_fragment(&mut arena, "<div>a<!--c--></div>").unwrap();
        let serializer = DomSerializer::with_config(SerializerConfig {
            include_comments: false,
            ..SerializerConfig::default()
        });
        assert_eq!(serializer.inner_html(&arena, roots[0]).unwrap(), "a");
    }
}
