//! CSS selector subset used by the query engine
//!
//! Supported:
//! - type (`div`), universal (`*`), id (`#main`), class (`.item`)
//! - attributes: `[a]`, `[a=v]`, `[a~=v]`, `[a|=v]`, `[a^=v]`, `[a$=v]`, `[a*=v]`
//! - pseudo-classes: `:first-child`, `:last-child`, `:only-child`, `:empty`,
//!   `:checked`, `:disabled`, `:enabled`
//! - combinators: descendant, `>`, `+`, `~`; groups with `,`
//!
//! Matching runs right-to-left against the arena, like browser engines do.

use crate::arena::DomArena;
use crate::error::{DomError, Result};
use crate::types::{DomNode, NodeId, NodeType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
    Adjacent,
    Sibling,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals(String),
    Includes(String),
    DashMatch(String),
    Prefix(String),
    Suffix(String),
    Substring(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pseudo {
    FirstChild,
    LastChild,
    OnlyChild,
    Empty,
    Checked,
    Disabled,
    Enabled,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<(String, AttrOp)>,
    pseudos: Vec<Pseudo>,
}

/// One selector of a group: compounds left-to-right, each with the
/// combinator that links it to the previous compound.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    parts: Vec<(Combinator, Compound)>,
}

/// A parsed, comma-separated selector group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList {
    selectors: Vec<Complex>,
}

impl SelectorList {
    /// Parse a selector group
    pub fn parse(input: &str) -> Result<Self> {
        let mut parser = Parser {
            src: input,
            chars: input.char_indices().peekable(),
        };
        let selectors = parser.parse_group()?;
        Ok(Self { selectors })
    }

    /// Test a single node
    pub fn matches(&self, arena: &DomArena, node_id: NodeId) -> bool {
        self.selectors
            .iter()
            .any(|complex| matches_complex(arena, node_id, &complex.parts))
    }
}

struct Parser<'a> {
    src: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
}

impl<'a> Parser<'a> {
    fn error(&self, reason: impl Into<String>) -> DomError {
        DomError::SelectorSyntax {
            selector: self.src.to_string(),
            reason: reason.into(),
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn skip_ws(&mut self) -> bool {
        let mut skipped = false;
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.chars.next();
            skipped = true;
        }
        skipped
    }

    fn ident(&mut self) -> Result<String> {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                out.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        if out.is_empty() {
            return Err(self.error("expected identifier"));
        }
        Ok(out)
    }

    fn parse_group(&mut self) -> Result<Vec<Complex>> {
        let mut selectors = Vec::new();
        loop {
            self.skip_ws();
            selectors.push(self.parse_complex()?);
            match self.peek() {
                Some(',') => {
                    self.chars.next();
                }
                None => break,
                Some(c) => return Err(self.error(format!("unexpected {:?}", c))),
            }
        }
        Ok(selectors)
    }

    fn parse_complex(&mut self) -> Result<Complex> {
        let mut parts = Vec::new();
        let mut combinator = Combinator::Descendant;
        loop {
            let compound = self.parse_compound()?;
            parts.push((combinator, compound));

            let had_ws = self.skip_ws();
            combinator = match self.peek() {
                Some(c @ ('>' | '+' | '~')) => {
                    self.chars.next();
                    match c {
                        '>' => Combinator::Child,
                        '+' => Combinator::Adjacent,
                        _ => Combinator::Sibling,
                    }
                }
                Some(',') | None => break,
                Some(_) if had_ws => Combinator::Descendant,
                Some(c) => return Err(self.error(format!("unexpected {:?}", c))),
            };
            self.skip_ws();
        }
        Ok(Complex { parts })
    }

    fn parse_compound(&mut self) -> Result<Compound> {
        let mut compound = Compound::default();
        let mut empty = true;

        match self.peek() {
            Some('*') => {
                self.chars.next();
                empty = false;
            }
            Some(c) if c.is_alphabetic() => {
                compound.tag = Some(self.ident()?.to_ascii_uppercase());
                empty = false;
            }
            _ => {}
        }

        loop {
            match self.peek() {
                Some('#') => {
                    self.chars.next();
                    compound.id = Some(self.ident()?);
                }
                Some('.') => {
                    self.chars.next();
                    compound.classes.push(self.ident()?);
                }
                Some('[') => {
                    self.chars.next();
                    compound.attrs.push(self.parse_attr()?);
                }
                Some(':') => {
                    self.chars.next();
                    compound.pseudos.push(self.parse_pseudo()?);
                }
                _ => break,
            }
            empty = false;
        }

        if empty {
            return Err(self.error("empty compound selector"));
        }
        Ok(compound)
    }

    fn parse_attr(&mut self) -> Result<(String, AttrOp)> {
        self.skip_ws();
        let name = self.ident()?;
        self.skip_ws();
        let op = match self.peek() {
            Some(']') => {
                self.chars.next();
                return Ok((name, AttrOp::Exists));
            }
            Some('=') => {
                self.chars.next();
                '='
            }
            Some(c @ ('~' | '|' | '^' | '$' | '*')) => {
                self.chars.next();
                if self.peek() != Some('=') {
                    return Err(self.error("expected '=' in attribute selector"));
                }
                self.chars.next();
                c
            }
            _ => return Err(self.error("malformed attribute selector")),
        };
        self.skip_ws();
        let value = self.attr_value()?;
        self.skip_ws();
        if self.peek() != Some(']') {
            return Err(self.error("expected ']'"));
        }
        self.chars.next();
        let op = match op {
            '=' => AttrOp::Equals(value),
            '~' => AttrOp::Includes(value),
            '|' => AttrOp::DashMatch(value),
            '^' => AttrOp::Prefix(value),
            '$' => AttrOp::Suffix(value),
            _ => AttrOp::Substring(value),
        };
        Ok((name, op))
    }

    fn attr_value(&mut self) -> Result<String> {
        match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.chars.next();
                let mut out = String::new();
                loop {
                    match self.chars.next() {
                        Some((_, c)) if c == quote => return Ok(out),
                        Some((_, c)) => out.push(c),
                        None => return Err(self.error("unterminated string")),
                    }
                }
            }
            _ => self.ident(),
        }
    }

    fn parse_pseudo(&mut self) -> Result<Pseudo> {
        let name = self.ident()?;
        match name.as_str() {
            "first-child" => Ok(Pseudo::FirstChild),
            "last-child" => Ok(Pseudo::LastChild),
            "only-child" => Ok(Pseudo::OnlyChild),
            "empty" => Ok(Pseudo::Empty),
            "checked" => Ok(Pseudo::Checked),
            "disabled" => Ok(Pseudo::Disabled),
            "enabled" => Ok(Pseudo::Enabled),
            other => Err(self.error(format!("unsupported pseudo-class :{}", other))),
        }
    }
}

fn matches_compound(arena: &DomArena, node: &DomNode, compound: &Compound) -> bool {
    if !node.is_element() {
        return false;
    }
    if let Some(tag) = &compound.tag {
        if !node.node_name.eq_ignore_ascii_case(tag) {
            return false;
        }
    }
    if let Some(id) = &compound.id {
        if node.attr("id") != Some(id.as_str()) {
            return false;
        }
    }
    if !compound.classes.iter().all(|c| node.has_class(c)) {
        return false;
    }
    let attrs_ok = compound.attrs.iter().all(|(name, op)| {
        let value = if name == "style" && !node.styles.is_empty() {
            Some(node.style_text())
        } else {
            node.attr(name).map(str::to_string)
        };
        let Some(value) = value else {
            return false;
        };
        match op {
            AttrOp::Exists => true,
            AttrOp::Equals(v) => &value == v,
            AttrOp::Includes(v) => value.split_whitespace().any(|t| t == v),
            AttrOp::DashMatch(v) => value == *v || value.starts_with(&format!("{}-", v)),
            AttrOp::Prefix(v) => !v.is_empty() && value.starts_with(v.as_str()),
            AttrOp::Suffix(v) => !v.is_empty() && value.ends_with(v.as_str()),
            AttrOp::Substring(v) => !v.is_empty() && value.contains(v.as_str()),
        }
    });
    if !attrs_ok {
        return false;
    }
    compound.pseudos.iter().all(|pseudo| match pseudo {
        Pseudo::FirstChild => element_sibling(arena, node.node_id, false).is_none(),
        Pseudo::LastChild => element_sibling(arena, node.node_id, true).is_none(),
        Pseudo::OnlyChild => {
            element_sibling(arena, node.node_id, false).is_none()
                && element_sibling(arena, node.node_id, true).is_none()
        }
        Pseudo::Empty => node.children_ids.iter().all(|&c| {
            arena
                .get(c)
                .map(|n| n.node_type == NodeType::Comment)
                .unwrap_or(true)
        }),
        Pseudo::Checked => node.checked,
        Pseudo::Disabled => node.is_form_control() && node.attr("disabled").is_some(),
        Pseudo::Enabled => node.is_form_control() && node.attr("disabled").is_none(),
    })
}

/// Nearest element sibling in either direction
pub(crate) fn element_sibling(arena: &DomArena, node_id: NodeId, forward: bool) -> Option<NodeId> {
    let parent = arena.get(node_id).ok()?.parent_id?;
    let siblings = &arena.get(parent).ok()?.children_ids;
    let pos = siblings.iter().position(|&c| c == node_id)?;
    let is_element = |id: &&NodeId| arena.get(**id).map(|n| n.is_element()).unwrap_or(false);
    if forward {
        siblings[pos + 1..].iter().find(is_element).copied()
    } else {
        siblings[..pos].iter().rev().find(is_element).copied()
    }
}

fn matches_complex(arena: &DomArena, node_id: NodeId, parts: &[(Combinator, Compound)]) -> bool {
    let Some(((combinator, compound), rest)) = parts.split_last() else {
        return true;
    };
    let Ok(node) = arena.get(node_id) else {
        return false;
    };
    if !matches_compound(arena, node, compound) {
        return false;
    }
    if rest.is_empty() {
        return true;
    }

    match combinator {
        Combinator::Child => node
            .parent_id
            .is_some_and(|p| matches_complex(arena, p, rest)),
        Combinator::Descendant => {
            let mut current = node.parent_id;
            while let Some(id) = current {
                if matches_complex(arena, id, rest) {
                    return true;
                }
                current = arena.get(id).ok().and_then(|n| n.parent_id);
            }
            false
        }
        Combinator::Adjacent => element_sibling(arena, node_id, false)
            .is_some_and(|s| matches_complex(arena, s, rest)),
        Combinator::Sibling => {
            let mut current = element_sibling(arena, node_id, false);
            while let Some(id) = current {
                if matches_complex(arena, id, rest) {
                    return true;
                }
                current = element_sibling(arena, id, false);
            }
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena() -> (DomArena, NodeId, Vec<NodeId>) {
        // <div id=root><ul class="list"><li class="a">…<li class="a b" data-x="1-2"></ul><p></div>
        let mut arena = DomArena::new();
        let root = arena.alloc(NodeType::Element, "DIV");
        arena.get_mut(root).unwrap().attributes.insert("id".into(), "root".into());
        let ul = arena.alloc(NodeType::Element, "UL");
        arena.get_mut(ul).unwrap().attributes.insert("class".into(), "list".into());
        let li1 = arena.alloc(NodeType::Element, "LI");
        arena.get_mut(li1).unwrap().attributes.insert("class".into(), "a".into());
        let li2 = arena.alloc(NodeType::Element, "LI");
        {
            let n = arena.get_mut(li2).unwrap();
            n.attributes.insert("class".into(), "a b".into());
            n.attributes.insert("data-x".into(), "1-2".into());
        }
        let p = arena.alloc(NodeType::Element, "P");
        arena.append_child(root, ul).unwrap();
        arena.append_child(ul, li1).unwrap();
        arena.append_child(ul, li2).unwrap();
        arena.append_child(root, p).unwrap();
        (arena, root, vec![ul, li1, li2, p])
    }

    fn select(arena: &DomArena, root: NodeId, sel: &str) -> Vec<NodeId> {
        let list = SelectorList::parse(sel).unwrap();
        arena
            .descendants(root)
            .unwrap()
            .into_iter()
            .filter(|&id| list.matches(arena, id))
            .collect()
    }

    #[test]
    fn test_simple_selectors() {
        let (arena, root, ids) = arena();
        assert_eq!(select(&arena, root, "li"), vec![ids[1], ids[2]]);
        assert_eq!(select(&arena, root, ".b"), vec![ids[2]]);
        assert_eq!(select(&arena, root, "li.a.b"), vec![ids[2]]);
        assert_eq!(select(&arena, root, "*").len(), 4);
    }

    #[test]
    fn test_combinators() {
        let (arena, root, ids) = arena();
        assert_eq!(select(&arena, root, "#root li"), vec![ids[1], ids[2]]);
        assert_eq!(select(&arena, root, "#root > li"), Vec::<NodeId>::new());
        assert_eq!(select(&arena, root, "ul > li + li"), vec![ids[2]]);
        assert_eq!(select(&arena, root, "ul ~ p"), vec![ids[3]]);
        assert_eq!(select(&arena, root, "p, ul"), vec![ids[0], ids[3]]);
    }

    #[test]
    fn test_attribute_and_pseudo() {
        let (arena, root, ids) = arena();
        assert_eq!(select(&arena, root, "[data-x]"), vec![ids[2]]);
        assert_eq!(select(&arena, root, "[data-x|='1']"), vec![ids[2]]);
        assert_eq!(select(&arena, root, "[class~=b]"), vec![ids[2]]);
        assert_eq!(select(&arena, root, "li:first-child"), vec![ids[1]]);
        assert_eq!(select(&arena, root, "li:last-child"), vec![ids[2]]);
        assert_eq!(select(&arena, root, "p:empty"), vec![ids[3]]);
    }

    #[test]
    fn test_syntax_errors() {
        assert!(SelectorList::parse("").is_err());
        assert!(SelectorList::parse("div[").is_err());
        assert!(SelectorList::parse("li:hover").is_err());
        assert!(SelectorList::parse("a >").is_err());
    }
}
