//! Page geometry for wrappers: positions, regions and intersections

use crate::error::Result;
use crate::host::RawNode;
use crate::method::{Arg, DomMethod};
use crate::node::Node;
use dom::{DomRect, Intersection};
use serde_json::{json, Value};

impl Node {
    /// Page region of the node; the window reports the viewport
    pub fn rect(&self) -> Result<Option<DomRect>> {
        match self.dom_node()? {
            RawNode::Window => Ok(Some(self.with_host(|h| h.viewport_region())?)),
            RawNode::Node(id) => Ok(self.with_host(|h| h.region(id))??),
        }
    }

    /// Page position, None when the node has no layout box
    pub fn get_xy(&self) -> Result<Option<(f64, f64)>> {
        let value = self.call(DomMethod::GetXY, &[])?;
        let xy = value.as_value().and_then(Value::as_array).and_then(|xy| {
            Some((xy.first()?.as_f64()?, xy.get(1)?.as_f64()?))
        });
        Ok(xy)
    }

    pub fn set_xy(&self, x: f64, y: f64) -> Result<&Self> {
        self.call(DomMethod::SetXY, &[Arg::Value(json!([x, y]))])?;
        Ok(self)
    }

    pub fn get_x(&self) -> Result<Option<f64>> {
        Ok(self.get_xy()?.map(|(x, _)| x))
    }

    /// Move horizontally, keeping the vertical position
    pub fn set_x(&self, x: f64) -> Result<&Self> {
        self.call(DomMethod::SetXY, &[Arg::Value(json!([x, null]))])?;
        Ok(self)
    }

    pub fn get_y(&self) -> Result<Option<f64>> {
        Ok(self.get_xy()?.map(|(_, y)| y))
    }

    /// Move vertically, keeping the horizontal position
    pub fn set_y(&self, y: f64) -> Result<&Self> {
        self.call(DomMethod::SetXY, &[Arg::Value(json!([null, y]))])?;
        Ok(self)
    }

    /// Exchange page positions with another node
    pub fn swap_xy(&self, other: &Node) -> Result<&Self> {
        self.call(DomMethod::SwapXY, &[other.into()])?;
        Ok(self)
    }

    /// Whether the node is in the viewport: entirely when `all`, otherwise
    /// any overlap counts
    pub fn in_viewport_region(&self, all: bool) -> Result<bool> {
        let inside = self.call(DomMethod::InViewportRegion, &[all.into()])?;
        Ok(inside.as_bool().unwrap_or(false))
    }

    /// Overlap with another node; `alt` replaces this node's own region
    pub fn intersect(&self, other: &Node, alt: Option<DomRect>) -> Result<Option<Intersection>> {
        let mine = match alt {
            Some(rect) => Some(rect),
            None => self.rect()?,
        };
        let (Some(mine), Some(theirs)) = (mine, other.rect()?) else {
            return Ok(None);
        };
        Ok(Some(dom::utils::intersect(&mine, &theirs)))
    }

    /// Whether this node lies in the other: entirely when `all`, otherwise
    /// any overlap counts. `alt` replaces this node's own region.
    pub fn in_region(&self, other: &Node, all: bool, alt: Option<DomRect>) -> Result<bool> {
        let mine = match alt {
            Some(rect) => Some(rect),
            None => self.rect()?,
        };
        let (Some(mine), Some(theirs)) = (mine, other.rect()?) else {
            return Ok(false);
        };
        Ok(dom::utils::in_region(&mine, &theirs, all))
    }

    /// Resize the layout box
    pub fn size_to(&self, width: f64, height: f64) -> Result<&Self> {
        self.set("offsetWidth", width)?;
        self.set("offsetHeight", height)
    }
}

#[cfg(test)]
mod tests {
    use crate::Context;
    use dom::{Document, DomRect};

    fn ctx() -> Context {
        let mut doc = Document::from_html(r#"<div id="a"></div><div id="b"></div>"#).unwrap();
        let a = doc.by_id("a").unwrap();
        let b = doc.by_id("b").unwrap();
        doc.set_layout(a, DomRect::new(10.0, 20.0, 100.0, 50.0)).unwrap();
        doc.set_layout(b, DomRect::new(50.0, 40.0, 100.0, 100.0)).unwrap();
        Context::new(doc)
    }

    #[test]
    fn test_xy_round_trip() {
        let ctx = ctx();
        let a = ctx.one("#a").unwrap();
        assert_eq!(a.get_xy().unwrap(), Some((10.0, 20.0)));

        a.set_xy(30.0, 5.0).unwrap();
        assert_eq!(a.get_xy().unwrap(), Some((30.0, 5.0)));

        a.set_x(12.0).unwrap();
        assert_eq!(a.get_x().unwrap(), Some(12.0));
        assert_eq!(a.get_y().unwrap(), Some(5.0));
    }

    #[test]
    fn test_intersect_and_in_region() {
        let ctx = ctx();
        let a = ctx.one("#a").unwrap();
        let b = ctx.one("#b").unwrap();

        let overlap = a.intersect(&b, None).unwrap().unwrap();
        assert_eq!(overlap.area, 60.0 * 30.0);
        assert!(!overlap.in_region);
        assert!(a.in_region(&b, false, None).unwrap());
        assert!(!a.in_region(&b, true, None).unwrap());
        assert!(a.in_region(&b, true, Some(DomRect::new(60.0, 50.0, 10.0, 10.0))).unwrap());
        assert!(a.in_viewport_region(true).unwrap());
    }

    #[test]
    fn test_swap_xy_and_size_to() {
        let ctx = ctx();
        let a = ctx.one("#a").unwrap();
        let b = ctx.one("#b").unwrap();
        a.swap_xy(&b).unwrap();
        assert_eq!(a.get_xy().unwrap(), Some((50.0, 40.0)));
        assert_eq!(b.get_xy().unwrap(), Some((10.0, 20.0)));

        a.size_to(10.0, 12.0).unwrap();
        let rect = a.rect().unwrap().unwrap();
        assert_eq!((rect.width, rect.height), (10.0, 12.0));
    }
}
