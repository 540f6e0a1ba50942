use dom::Document;
use node::Context;
use std::cell::RefCell;
use std::rc::Rc;

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

fn recorder() -> (Rc<RefCell<Vec<String>>>, impl Fn(&str) -> Box<dyn Fn(&node::EventFacade)>) {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = log.clone();
    let make = move |label: &str| -> Box<dyn Fn(&node::EventFacade)> {
        let sink = sink.clone();
        let label = label.to_string();
        Box::new(move |_e| sink.borrow_mut().push(label.clone()))
    };
    (log, make)
}

#[test]
fn test_simulate_bubbles_to_window() {
    let ctx = page(r#"<div id="outer"><button id="b"></button></div>"#);
    let (log, make) = recorder();

    let button = ctx.one("#b").unwrap();
    button.on("click", make("button")).unwrap();
    ctx.one("#outer").unwrap().on("click", make("outer")).unwrap();
    ctx.document().on("click", make("document")).unwrap();
    ctx.window().on("click", make("window")).unwrap();
    button.after("click", make("after")).unwrap();

    assert!(button.simulate("click").unwrap());
    assert_eq!(*log.borrow(), vec!["button", "outer", "document", "window", "after"]);
}

#[test]
fn test_stop_propagation_and_prevent_default() {
    let ctx = page(r#"<div id="outer"><a id="link"></a></div>"#);
    let (log, make) = recorder();
    let link = ctx.one("#link").unwrap();
    let outer = ctx.one("#outer").unwrap();

    outer.on("click", make("outer")).unwrap();
    link.after("click", make("after")).unwrap();
    let halt = link.on("click", |e| e.halt()).unwrap();

    assert!(!link.simulate("click").unwrap());
    assert!(log.borrow().is_empty());

    halt.detach();
    assert!(link.simulate("click").unwrap());
    assert_eq!(*log.borrow(), vec!["outer", "after"]);
}

#[test]
fn test_once_runs_a_single_time() {
    let ctx = page(r#"<p id="p"></p>"#);
    let (log, make) = recorder();
    let p = ctx.one("#p").unwrap();

    p.once("click", make("once")).unwrap();
    p.simulate("click").unwrap();
    p.simulate("click").unwrap();
    assert_eq!(log.borrow().len(), 1);
}

#[test]
fn test_delegate_matches_closest_inside_container() {
    let ctx = page(r#"<ul id="menu"><li class="item"><span id="label">x</span></li></ul><span id="out"></span>"#);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let menu = ctx.one("#menu").unwrap();

    let sink = seen.clone();
    menu.delegate(
        "click",
        move |e| {
            sink.borrow_mut().push((e.target().clone(), e.current_target()));
        },
        "li.item",
    )
    .unwrap();

    let label = ctx.one("#label").unwrap();
    label.simulate("click").unwrap();
    ctx.one("#out").unwrap().simulate("click").unwrap();

    let seen = seen.borrow();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, label);
    assert_eq!(seen[0].1, ctx.one("li").unwrap());
}

#[test]
fn test_custom_events_stay_on_the_wrapper() {
    let ctx = page(r#"<div id="a"></div>"#);
    let (log, make) = recorder();
    let a = ctx.one("#a").unwrap();

    a.on("panel:open", make("open")).unwrap();
    a.after("panel:open", make("opened")).unwrap();
    assert!(a.fire("panel:open").unwrap());
    assert!(a.simulate("panel:open").unwrap());
    assert_eq!(*log.borrow(), vec!["open", "opened"]);

    a.detach("panel:open").unwrap();
    a.fire("panel:open").unwrap();
    assert_eq!(log.borrow().len(), 2);
}

#[test]
fn test_purge_and_destroy_drop_listeners() {
    let ctx = page(r#"<div id="a"><p id="p"></p></div>"#);
    let (log, make) = recorder();
    let a = ctx.one("#a").unwrap();
    let p = ctx.one("#p").unwrap();

    a.on("click", make("a")).unwrap();
    p.on("click", make("p")).unwrap();
    a.purge(true, Some("click")).unwrap();
    p.simulate("click").unwrap();
    assert!(log.borrow().is_empty());

    p.on("click", make("p")).unwrap();
    p.destroy(false).unwrap();
    let again = ctx.one("#p").unwrap();
    again.simulate("click").unwrap();
    assert!(log.borrow().is_empty());
}

#[test]
fn test_list_subscription_detaches_everything() {
    let ctx = page("<p></p><p></p><p></p>");
    let (log, make) = recorder();
    let paragraphs = ctx.all("p");

    let sub = paragraphs.on("click", make("p")).unwrap();
    assert_eq!(sub.len(), 3);
    for p in paragraphs.iter() {
        p.simulate("click").unwrap();
    }
    assert_eq!(log.borrow().len(), 3);

    sub.detach();
    paragraphs.item(1).unwrap().simulate("click").unwrap();
    assert_eq!(log.borrow().len(), 3);
}

#[test]
fn test_default_action_runs_unless_prevented() {
    let ctx = page(r#"<input id="i" value="hello">"#);
    let input = ctx.one("#i").unwrap();

    let sub = input.on("select", |e| e.prevent_default()).unwrap();
    input.simulate("select").unwrap();
    assert!(input.get("selectionEnd").unwrap().is_empty());

    sub.detach();
    input.simulate("select").unwrap();
    assert_eq!(input.get("selectionEnd").unwrap().as_f64(), Some(5.0));
}
