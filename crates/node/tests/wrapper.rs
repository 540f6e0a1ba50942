use dom::{Document, DocumentConfig};
use node::{
    Arg, AttrConfig, Batch, Context, DomMethod, HostValue, NodeConfig, NodeError, RawNode, Scrubbed,
};
use serde_json::{json, Value};

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

fn page(html: &str) -> Context {
    init_logging();
    Context::new(Document::from_html(html).unwrap())
}

#[test]
fn test_identity_is_stable() {
    let ctx = page(r#"<div id="a"></div>"#);
    let first = ctx.one("#a").unwrap();
    let second = ctx.one("#a").unwrap();
    assert_eq!(first, second);

    let raw = first.raw().unwrap();
    assert_eq!(ctx.one(raw).unwrap(), first);
    assert_eq!(ctx.lookup(first.uid()), Some(first.clone()));
}

#[test]
fn test_wrap_none_and_wrap_self() {
    let ctx = page(r#"<div id="a"></div>"#);
    assert!(ctx.one(None::<&str>).is_none());
    assert!(ctx.one("").is_none());
    assert!(ctx.one("#nope").is_none());

    let a = ctx.one("#a").unwrap();
    assert_eq!(ctx.one(&a).unwrap(), a);
}

#[test]
fn test_destroy_unregisters_and_rewrap_is_new() {
    let ctx = page(r#"<div id="a"></div>"#);
    let a = ctx.one("#a").unwrap();
    let uid = a.uid().to_string();

    a.destroy(false).unwrap();
    assert!(a.is_destroyed());
    assert!(ctx.lookup(&uid).is_none());

    let again = ctx.one("#a").unwrap();
    assert_ne!(again, a);
    assert!(!again.is_destroyed());
    assert!(matches!(a.get("id"), Err(NodeError::Destroyed(_))));
}

#[test]
fn test_destroy_recursive_releases_descendants() {
    let ctx = page(r#"<div id="a"><p id="p"><b id="b"></b></p></div>"#);
    let a = ctx.one("#a").unwrap();
    let p = ctx.one("#p").unwrap();
    let b = ctx.one("#b").unwrap();

    a.destroy(true).unwrap();
    assert!(a.is_destroyed());
    assert!(p.is_destroyed());
    assert!(b.is_destroyed());
}

#[test]
fn test_modulus_even_and_odd() {
    let ctx = page("<ul><li>0</li><li>1</li><li>2</li><li>3</li><li>4</li></ul>");
    let items = ctx.all("li");
    assert_eq!(items.size(), 5);

    let text = |list: &node::NodeList| -> Vec<String> {
        list.iter()
            .map(|n| n.get("text").unwrap().as_str().unwrap_or_default().to_string())
            .collect()
    };
    assert_eq!(text(&items.even()), vec!["0", "2", "4"]);
    assert_eq!(text(&items.odd()), vec!["1", "3"]);
    assert_eq!(items.modulus(2, 0), items.even());
}

#[test]
fn test_get_set_round_trip() {
    let ctx = page(r#"<p id="p">old</p>"#);
    let p = ctx.one("#p").unwrap();

    p.set("text", "new").unwrap().set("title", "tip").unwrap();
    assert_eq!(p.get("text").unwrap().as_str(), Some("new"));
    assert_eq!(p.get("title").unwrap().as_str(), Some("tip"));
    assert_eq!(p.get_attribute("title").unwrap(), "tip");
}

#[test]
fn test_default_setter_ignores_undefined_properties() {
    let ctx = page(r#"<p id="p"></p>"#);
    let p = ctx.one("#p").unwrap();
    p.set("madeUp", 1).unwrap();
    assert!(p.get("madeUp").unwrap().is_empty());
}

#[test]
fn test_dotted_paths() {
    let ctx = page(r#"<div id="outer"><p id="p" style="color: blue"></p></div>"#);
    let p = ctx.one("#p").unwrap();

    assert_eq!(p.get("style.color").unwrap().as_str(), Some("blue"));
    p.set("style.color", "red").unwrap();
    assert_eq!(p.get_style("color").unwrap(), "red");

    assert_eq!(p.get("parentNode.id").unwrap().as_str(), Some("outer"));
    assert!(p.get("parentNode.nothing.deeper").unwrap().is_empty());
}

#[test]
fn test_null_is_distinct_from_empty() {
    let ctx = page(r#"<p id="p" aria-hidden="true"></p>"#);
    let p = ctx.one("#p").unwrap();

    assert_eq!(p.get("aria-hidden").unwrap().as_str(), Some("true"));
    assert!(p.get("aria-label").unwrap().is_null());
    assert!(p.get("firstChild").unwrap().is_null());
    assert!(p.get("notAProperty").unwrap().is_empty());

    p.set("role", "button").unwrap();
    assert_eq!(p.get_attribute("role").unwrap(), "button");
}

#[test]
fn test_scrubbing_wraps_nodes_and_lists() {
    let ctx = page(r#"<ul id="l"><li>a</li><li>b</li></ul>"#);
    let list = ctx.one("#l").unwrap();

    let parent = list.get("parentNode").unwrap().into_node().unwrap();
    assert_eq!(parent, ctx.one("body").unwrap());

    let children = list.get("children").unwrap().into_list().unwrap();
    assert_eq!(children.size(), 2);

    assert!(ctx.document().get("defaultView").unwrap().into_node().unwrap().is_window());
}

#[test]
fn test_refresh_picks_up_new_matches() {
    let ctx = page(r#"<ul id="l"><li class="x"></li></ul>"#);
    let mut items = ctx.all(".x");
    assert_eq!(items.size(), 1);

    ctx.one("#l").unwrap().append(r#"<li class="x"></li>"#).unwrap();
    assert_eq!(items.size(), 1);

    items.refresh().unwrap();
    assert_eq!(items.size(), 2);
}

#[test]
fn test_scoped_refresh_uses_recorded_root() {
    let ctx = page(r#"<ul id="l"><li></li></ul><ul id="m"><li></li></ul>"#);
    let l = ctx.one("#l").unwrap();
    let mut items = l.all("li");

    ctx.one("#m").unwrap().append("<li></li>").unwrap();
    l.append("<li></li>").unwrap();
    items.refresh().unwrap();
    assert_eq!(items.size(), 2);
}

#[test]
fn test_batch_collects_only_real_values() {
    let ctx = page(r#"<p></p><p class="hit"></p><p></p>"#);
    ctx.register_attr(
        "marker",
        AttrConfig::new().getter(|node| {
            if node.has_class("hit")? {
                Ok(Value::from("found").into())
            } else {
                Ok(HostValue::Undefined)
            }
        }),
    );

    let paragraphs = ctx.all("p");
    let result = paragraphs.apply(|node| node.get("marker")).unwrap();
    assert_eq!(result, Batch::Values(vec![Scrubbed::Value(json!("found"))]));

    let chained = paragraphs.call(DomMethod::AddClass, &["seen".into()]).unwrap();
    assert_eq!(chained, Batch::List(paragraphs.clone()));
    assert_eq!(ctx.all(".seen").size(), 3);
}

#[test]
fn test_list_get_returns_list_for_nodes() {
    let ctx = page(r#"<div><p id="a"></p></div><div><p id="b"></p></div>"#);
    let paragraphs = ctx.all("p");

    match paragraphs.get("parentNode").unwrap() {
        Batch::List(parents) => assert_eq!(parents.size(), 2),
        other => panic!("expected a list, got {:?}", other),
    }
    assert_eq!(
        paragraphs.get("id").unwrap().into_json(),
        vec![json!("a"), json!("b")]
    );
}

#[test]
fn test_clone_gets_fresh_identifier() {
    let ctx = page(r#"<div id="a"><span></span></div>"#);
    let a = ctx.one("#a").unwrap();

    let copy = a.clone_node(true).unwrap().unwrap();
    assert_ne!(copy, a);
    assert_ne!(copy.uid(), a.uid());
    assert_eq!(ctx.one("#a").unwrap(), a);
    assert_eq!(ctx.lookup(copy.uid()), Some(copy.clone()));
    assert!(copy.one("span").is_some());
}

#[test]
fn test_platform_unique_id_is_used() {
    let doc = Document::from_html_with_config(
        r#"<div id="a"></div>"#,
        DocumentConfig {
            expose_unique_id: true,
            ..Default::default()
        },
    )
    .unwrap();
    let ctx = Context::with_config(
        doc,
        NodeConfig {
            uid_prefix: "w".to_string(),
            ..Default::default()
        },
    );

    let a = ctx.one("#a").unwrap();
    assert!(!a.uid().starts_with("w_"));
    assert_eq!(a.get("uniqueID").unwrap().as_str(), Some(a.uid()));
    assert!(ctx.document().uid().starts_with("w_"));
}

#[test]
fn test_hidden_type_fallback() {
    let doc = Document::from_html_with_config(
        r#"<input id="i" type="text">"#,
        DocumentConfig {
            restrict_type_change: true,
            ..Default::default()
        },
    )
    .unwrap();
    let ctx = Context::new(doc);
    let input = ctx.one("#i").unwrap();

    input.set("type", "password").unwrap();
    assert_eq!(input.get("type").unwrap().as_str(), Some("text"));

    input.set("type", "hidden").unwrap();
    assert_eq!(input.get("type").unwrap().as_str(), Some("hidden"));
    assert_eq!(input.get_style("display").unwrap(), "none");
}

#[test]
fn test_type_change_when_allowed() {
    let ctx = page(r#"<input id="i">"#);
    let input = ctx.one("#i").unwrap();
    input.set("type", "hidden").unwrap();
    assert_eq!(input.get_attribute("type").unwrap(), "hidden");
    assert_eq!(input.get_style("display").unwrap(), "");
}

#[test]
fn test_invoke_and_has_method() {
    let ctx = page(r#"<form id="f"><input id="i" value="abc"></form>"#);
    let form = ctx.one("#f").unwrap();
    let input = ctx.one("#i").unwrap();

    assert!(form.has_method("submit"));
    assert!(!input.has_method("submit"));
    assert!(input.has_method("select"));
    assert!(matches!(form.invoke("explode", &[]), Err(NodeError::UnknownMethod(_))));

    let found = form.invoke("getElementsByTagName", &["input".into()]).unwrap();
    assert_eq!(found.into_list().unwrap().item(0), Some(input.clone()));

    let chained = input.invoke("setAttribute", &["title".into(), "t".into()]).unwrap();
    assert_eq!(chained.into_node(), Some(input));
}

#[test]
fn test_wrapper_arguments_only_in_first_positions() {
    let ctx = page(r#"<div id="a"></div><div id="b"></div>"#);
    let a = ctx.one("#a").unwrap();
    let b = ctx.one("#b").unwrap();

    let err = a
        .call(DomMethod::SetAttribute, &["x".into(), "y".into(), Arg::from(&b)])
        .unwrap_err();
    assert!(matches!(err, NodeError::InvalidArgument { index: 2, .. }));

    assert_eq!(a.call(DomMethod::Contains, &[Arg::from(&b)]).unwrap().as_bool(), Some(false));
    let body = ctx.one("body").unwrap();
    assert!(body.contains(&a).unwrap());
}

#[test]
fn test_mutation() {
    let ctx = page(r#"<div id="box"><p id="old"></p></div>"#);
    let div = ctx.one("#box").unwrap();
    let old = ctx.one("#old").unwrap();

    old.replace(r#"<p id="new"></p>"#).unwrap();
    assert!(!old.in_doc(None).unwrap());
    let new = ctx.one("#new").unwrap();
    assert!(new.in_doc(None).unwrap());

    let span = ctx.create("<span>s</span>").unwrap();
    span.append_to(&div).unwrap();
    assert_eq!(div.get("lastChild").unwrap().into_node(), Some(span.clone()));

    let removed = div.remove_child(&span).unwrap().unwrap();
    assert_eq!(removed, span);
    assert!(!div.contains(&span).unwrap());

    div.wrap(r#"<section id="s"></section>"#).unwrap();
    assert_eq!(div.ancestor("section", false).unwrap(), ctx.one("#s"));
    div.unwrap().unwrap();
    assert!(ctx.one("#s").is_none());
}

#[test]
fn test_empty_destroys_child_wrappers() {
    let ctx = page(r#"<div id="box"><p id="p"><b id="b"></b></p>text</div>"#);
    let div = ctx.one("#box").unwrap();
    let p = ctx.one("#p").unwrap();
    let b = ctx.one("#b").unwrap();

    div.empty().unwrap();
    assert!(!div.has_child_nodes().unwrap());
    assert!(p.is_destroyed());
    assert!(b.is_destroyed());
    assert!(!div.is_destroyed());
}

#[test]
fn test_remove_with_destroy() {
    let ctx = page(r#"<div id="a"></div>"#);
    let a = ctx.one("#a").unwrap();
    a.remove(true).unwrap();
    assert!(a.is_destroyed());
    assert!(ctx.one("#a").is_none());
}

#[test]
fn test_get_by_id_is_scoped() {
    let ctx = page(r#"<div id="a"><p id="inner"></p></div><p id="outer"></p>"#);
    let a = ctx.one("#a").unwrap();
    assert!(a.get_by_id("inner").unwrap().is_some());
    assert!(a.get_by_id("outer").unwrap().is_none());
}

#[test]
fn test_visibility_and_classes() {
    let ctx = page(r#"<p id="p" class="a"></p>"#);
    let p = ctx.one("#p").unwrap();

    p.hide().unwrap();
    assert!(p.is_hidden().unwrap());
    p.toggle_view(None, None).unwrap();
    assert!(!p.is_hidden().unwrap());

    p.replace_class("a", "b").unwrap().toggle_class("c", None).unwrap();
    assert!(p.has_class("b").unwrap());
    assert!(p.has_class("c").unwrap());
    p.toggle_class("c", Some(true)).unwrap();
    assert!(p.has_class("c").unwrap());
    p.remove_class("c").unwrap();
    assert_eq!(p.get_attribute("class").unwrap(), "b");
}

#[test]
fn test_styles() {
    let ctx = page(r#"<div id="d"><p id="p"></p></div>"#);
    let d = ctx.one("#d").unwrap();
    let p = ctx.one("#p").unwrap();

    d.set_styles([("color", json!("red")), ("width", json!(10)), ("opacity", json!(0.5))])
        .unwrap();
    assert_eq!(d.get_style("width").unwrap(), "10px");
    assert_eq!(d.get_style("opacity").unwrap(), "0.5");
    assert_eq!(p.get_computed_style("color").unwrap(), "red");
}

#[test]
fn test_context_drop_is_reported() {
    let ctx = page(r#"<div id="a"></div>"#);
    let a = ctx.one("#a").unwrap();
    let list = ctx.all("div");
    drop(ctx);

    assert!(matches!(a.get("id"), Err(NodeError::ContextDropped)));
    assert!(list.item(0).is_none());
    assert!(a.to_string().ends_with(": not bound to a node"));
}

#[test]
fn test_window_and_document_aliases() {
    let ctx = page("<p></p>");
    assert_eq!(ctx.one("win").unwrap(), ctx.window());
    assert_eq!(ctx.one("doc").unwrap(), ctx.document());
    assert_eq!(ctx.window().raw(), Some(RawNode::Window));
    assert!(ctx.window().get("winWidth").unwrap().as_f64().unwrap() > 0.0);
}

#[test]
fn test_scroll_through_attributes() {
    let ctx = page("<p></p>");
    let doc = ctx.document();
    doc.set("scrollTop", 0).unwrap();
    assert_eq!(doc.get("docScrollY").unwrap().as_f64(), Some(0.0));
    assert!(doc.get("viewportRegion").unwrap().as_value().unwrap()["width"].as_f64().is_some());
}
