//! Edge case tests for zjax
//!
//! Grammar corners of directives, triggers, swap specs and action
//! references, plus form payload rules.

use serde_json::{Value, json};
use zjax::actions::{HandlerRef, RESERVED_NAMESPACE, is_truthy};
use zjax::directive::{parse_statements, parse_triggers};
use zjax::form::{apply_payload, collect_payload};
use zjax::script::Script;
use zjax::swap::{SwapParts, parse_swap_list};
use zjax::{
    ActionRegistry, CompiledAction, EventTarget, Method, NodeId, ResponseMode, SwapMode, SwapOp, SwapRequest, Trigger,
    ZjaxError, action,
};

fn trigger(spec: &str) -> Result<Trigger, ZjaxError> {
    Trigger::parse(spec, NodeId::ROOT, "")
}

fn grammar_message(result: Result<impl std::fmt::Debug, ZjaxError>) -> String {
    match result {
        Err(ZjaxError::Grammar(message)) => message,
        other => panic!("expected a grammar error, got {:?}", other),
    }
}

// ============================================================================
// DIRECTIVE STATEMENTS
// ============================================================================

#[test]
fn test_commas_without_trigger_stay_in_handler() {
    let statements = parse_statements("$('#a').setAttribute('x', 'y')").unwrap();
    assert_eq!(statements.len(), 1);
    assert_eq!(statements[0].handler, "$('#a').setAttribute('x', 'y')");
}

#[test]
fn test_bracketed_list_with_spaces() {
    let triggers = parse_triggers("@[ click , keydown.enter ] GET /a #a", "div", NodeId::ROOT).unwrap();
    assert_eq!(triggers.len(), 2);
    assert_eq!(triggers[0].event, "click");
    assert_eq!(triggers[1].modifiers.key_name.as_deref(), Some("Enter"));
    assert!(triggers.iter().all(|t| t.handler_text == "GET /a #a"));
}

#[test]
fn test_statement_split_needs_at_sign() {
    let statements = parse_statements("@click GET /a #a,#b, @submit POST /c #c").unwrap();
    assert_eq!(statements.len(), 2);
    assert_eq!(statements[0].handler, "GET /a #a,#b");
    assert_eq!(statements[1].triggers, "submit");
}

#[test]
fn test_mixed_default_and_explicit_statements() {
    let triggers = parse_triggers("#a, @mouseover GET /tip #tip", "form", NodeId::ROOT).unwrap();
    assert_eq!(triggers[0].event, "submit");
    assert_eq!(triggers[0].handler_text, "#a");
    assert_eq!(triggers[1].event, "mouseover");
}

#[test]
fn test_malformed_statements() {
    assert!(grammar_message(parse_statements("@[click GET /a #a")).contains("Unterminated"));
    assert!(grammar_message(parse_statements("@ GET /a #a")).contains("Empty trigger"));
    assert!(grammar_message(parse_statements("@[] GET /a #a")).contains("Empty trigger"));
}

#[test]
fn test_empty_value_is_single_default_statement() {
    let triggers = parse_triggers("", "button", NodeId::ROOT).unwrap();
    assert_eq!(triggers.len(), 1);
    assert_eq!(triggers[0].handler_text, "");
}

// ============================================================================
// TRIGGERS AND MODIFIERS
// ============================================================================

#[test]
fn test_event_name_normalized() {
    let t = trigger("CLICK.once").unwrap();
    assert_eq!(t.event, "click");
    assert!(t.modifiers.once);
    assert!(trigger("cl!ck").is_err());
    assert!(trigger("").is_err());
    assert!(trigger(".once").is_err());
}

#[test]
fn test_targets() {
    assert_eq!(trigger("click").unwrap().target, EventTarget::Node(NodeId::ROOT));
    assert_eq!(trigger("click.window").unwrap().target, EventTarget::Window);
    assert_eq!(trigger("click.outside").unwrap().target, EventTarget::Window);
    assert_eq!(trigger("click.outside.document").unwrap().target, EventTarget::Document);
    assert_eq!(trigger("resize.window").unwrap().target, EventTarget::Window);
}

#[test]
fn test_modifiers_depend_on_category() {
    assert!(trigger("click.enter").is_err());
    assert!(trigger("mount.shift").is_err());
    assert!(trigger("zjax:swap.outside").is_err());
    assert!(trigger("keydown.outside").unwrap().modifiers.outside);
    assert!(trigger("mouseover.alt").unwrap().modifiers.alt);
    assert!(trigger("zjax:swap.document.once").unwrap().modifiers.once);
}

#[test]
fn test_key_slot_takes_one_token() {
    let t = trigger("keydown.ctrl.k").unwrap();
    assert!(t.modifiers.ctrl);
    assert_eq!(t.modifiers.key_name.as_deref(), Some("k"));

    let err = grammar_message(trigger("keydown.a.b"));
    assert_eq!(err, "Unknown trigger modifier in this context: b");

    // Timer before the key name
    let t = trigger("keyup.delay.1s.esc").unwrap();
    assert_eq!(t.modifiers.delay, Some(1000));
    assert_eq!(t.modifiers.key_name.as_deref(), Some("Escape"));

    assert_eq!(trigger("keydown.space").unwrap().modifiers.key_name.as_deref(), Some(" "));
    assert_eq!(trigger("keydown.cmd").unwrap().modifiers.key_name, None);
}

#[test]
fn test_modifier_order_is_irrelevant() {
    let pairs = [
        ("click.shift.ctrl", "click.ctrl.shift"),
        ("keydown.once.prevent.escape", "keydown.escape.prevent.once"),
        ("input.debounce.300ms.stop", "input.stop.debounce.300ms"),
    ];
    for (a, b) in pairs {
        let (a, b) = (trigger(a).unwrap(), trigger(b).unwrap());
        assert_eq!(a.modifiers, b.modifiers);
        assert_eq!(a.target, b.target);
    }
    let t = trigger("keydown.escape.prevent.once").unwrap();
    assert!(t.modifiers.once && t.modifiers.prevent);
    assert_eq!(t.modifiers.key_name.as_deref(), Some("Escape"));
}

#[test]
fn test_timer_values() {
    assert_eq!(trigger("click.delay.2s").unwrap().modifiers.delay, Some(2000));
    assert_eq!(trigger("input.debounce.0ms").unwrap().modifiers.debounce, Some(0));
    assert_eq!(
        grammar_message(trigger("click.delay")),
        "Missing value for timer modifier: delay"
    );
    for bad in ["click.delay.5", "click.delay.ms", "click.delay.-5ms", "click.debounce.1.5s", "click.delay.99999999999999999999ms"] {
        assert!(grammar_message(trigger(bad)).starts_with("Invalid timer value"), "{}", bad);
    }
}

#[test]
fn test_timer_keyword_as_value_slot() {
    // `delay` opens the slot, so `debounce` is read as its value
    assert!(trigger("click.delay.debounce.5ms").is_err());
}

// ============================================================================
// SWAP SPECS
// ============================================================================

#[test]
fn test_swap_op_shapes() {
    let op = SwapOp::parse(" #a | inner -> #b | prepend ").unwrap();
    assert_eq!(op.response, "#a");
    assert_eq!(op.response_mode, ResponseMode::Inner);
    assert_eq!(op.target, "#b");
    assert_eq!(op.swap_mode, SwapMode::Prepend);

    let op = SwapOp::parse("main > .card").unwrap();
    assert_eq!(op.response, "main > .card");
    assert_eq!(op.target, "main > .card");
    assert_eq!(op.to_string(), "main > .card|outer->main > .card|outer");
}

#[test]
fn test_swap_op_errors() {
    assert!(grammar_message(SwapOp::parse("#a->#b->#c")).starts_with("Too many"));
    assert!(grammar_message(SwapOp::parse("->#b")).starts_with("Missing selector"));
    assert!(grammar_message(SwapOp::parse("#a->")).starts_with("Missing selector"));
    assert_eq!(grammar_message(SwapOp::parse("#a|sideways")), "Invalid swap type: sideways");
    assert_eq!(grammar_message(SwapOp::parse("#a|upper->#b")), "Invalid response type: upper");
    assert!(grammar_message(SwapOp::parse("*|inner->#b")).contains("Response Type"));
    assert!(grammar_message(SwapOp::parse("#a->*|append")).contains("Swap Type"));
    assert!(SwapOp::parse("*").is_ok());
    assert!(SwapOp::parse("*->*").is_ok());
}

#[test]
fn test_swap_list() {
    assert_eq!(parse_swap_list("#a,#b|inner,#c->#d").unwrap().len(), 3);
    assert_eq!(grammar_message(parse_swap_list("  ")), "No swap specified");
    assert!(parse_swap_list("#a,,#b").is_err());
}

#[test]
fn test_swap_parts_any_order() {
    let parts = SwapParts::parse("/books post #list").unwrap();
    assert_eq!(parts.method, Some(Method::Post));
    assert_eq!(parts.endpoint.as_deref(), Some("/books"));

    let parts = SwapParts::parse("#a , #b ,#c").unwrap();
    assert_eq!(parts.method, None);
    assert_eq!(parts.endpoint, None);
    assert_eq!(parts.swaps.len(), 3);

    let parts = SwapParts::parse("DELETE https://api.example.com/items/1 #item|delete").unwrap();
    assert_eq!(parts.endpoint.as_deref(), Some("https://api.example.com/items/1"));
}

#[test]
fn test_swap_parts_errors() {
    assert!(grammar_message(SwapParts::parse("")).starts_with("Must have"));
    assert!(grammar_message(SwapParts::parse("GET /a #a #b #c")).starts_with("Must have"));
    assert_eq!(grammar_message(SwapParts::parse("GET PUT #a")), "Duplicate HTTP method: PUT");
    assert_eq!(grammar_message(SwapParts::parse("/a ./b #a")), "Duplicate endpoint: ./b");
    assert_eq!(grammar_message(SwapParts::parse("GET /a")), "No swap specified");
}

#[test]
fn test_swap_request_defaults() {
    let doc = zjax_html::parse(
        r#"<form id="get" method="get" action="/search"></form>
           <form id="bad" method="teapot"></form>
           <a id="bare">x</a>
           <button id="button">b</button>"#,
    );
    let tree = doc.tree();
    let node = |id: &str| doc.get_element_by_id(id).unwrap();

    let request = SwapRequest::parse("#results", tree, node("get")).unwrap();
    assert_eq!((request.method, request.endpoint.as_str()), (Method::Get, "/search"));

    let request = SwapRequest::parse("#results", tree, node("bad")).unwrap();
    assert_eq!((request.method, request.endpoint.as_str()), (Method::Post, "."));

    assert!(SwapRequest::parse("#x", tree, node("bare")).is_err());
    assert!(SwapRequest::parse("#x", tree, node("button")).is_err());

    let request = SwapRequest::parse("PUT . #x", tree, node("button")).unwrap();
    assert_eq!((request.method, request.endpoint.as_str()), (Method::Put, "."));
}

// ============================================================================
// FORM PAYLOADS
// ============================================================================

#[test]
fn test_payload_skips_unsuccessful_controls() {
    let doc = zjax_html::parse(
        r#"<form id="f">
             <input name="a" value="1">
             <input name="b" value="2" disabled>
             <input value="unnamed">
             <input type="submit" name="go" value="Go">
             <input type="checkbox" name="c">
             <input type="radio" name="r" value="x" checked>
             <select name="s"><option value="first">1</option><option selected>Second</option></select>
             <select name="m" multiple><option>x</option></select>
             <textarea name="t">hello
world</textarea>
             <button id="inside" name="btn" value="v">B</button>
           </form>"#,
    );
    let form = doc.get_element_by_id("f").unwrap();
    let pairs = collect_payload(doc.tree(), form);
    let pairs: Vec<(&str, &str)> = pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
    assert_eq!(
        pairs,
        vec![("a", "1"), ("r", "x"), ("s", "Second"), ("t", "hello\nworld")]
    );

    // A trigger inside the form submits the whole form
    let inside = doc.get_element_by_id("inside").unwrap();
    assert_eq!(collect_payload(doc.tree(), inside).len(), 4);
}

#[test]
fn test_payload_outside_form() {
    let doc = zjax_html::parse(r#"<input id="named" name="q" value="x y"><div id="plain">text</div><input id="anon" value="z">"#);
    let tree = doc.tree();
    assert_eq!(
        collect_payload(tree, doc.get_element_by_id("named").unwrap()),
        vec![("q".to_string(), "x y".to_string())]
    );
    assert!(collect_payload(tree, doc.get_element_by_id("plain").unwrap()).is_empty());
    assert!(collect_payload(tree, doc.get_element_by_id("anon").unwrap()).is_empty());
}

#[test]
fn test_apply_payload_placement() {
    let pairs = vec![("q".to_string(), "a&b".to_string())];

    let (url, body) = apply_payload(Method::Delete, "http://h/items?page=2", &pairs);
    assert_eq!(url, "http://h/items?page=2&q=a%26b");
    assert_eq!(body, None);

    let (url, body) = apply_payload(Method::Patch, "http://h/items", &pairs);
    assert_eq!(url, "http://h/items");
    assert_eq!(body.as_deref(), Some(&b"q=a%26b"[..]));

    let (url, body) = apply_payload(Method::Post, "http://h/items", &[]);
    assert_eq!((url.as_str(), body), ("http://h/items", None));
}

// ============================================================================
// ACTIONS
// ============================================================================

#[test]
fn test_handler_ref_classification() {
    assert_eq!(
        HandlerRef::parse("  books.open  "),
        HandlerRef::Named(vec!["books".into(), "open".into()])
    );
    assert_eq!(HandlerRef::parse("open_2"), HandlerRef::Named(vec!["open_2".into()]));
    for inline in ["books..open", "open()", ".open", "$.redirect('/')", "", "café", "books.ñame"] {
        assert!(matches!(HandlerRef::parse(inline), HandlerRef::Inline(_)), "{:?}", inline);
    }
}

#[test]
fn test_registry_rules() {
    let mut registry = ActionRegistry::new();
    let noop = || action(|_| Ok(Value::Null));

    assert!(matches!(
        registry.register(Some(RESERVED_NAMESPACE), [("x", noop())]),
        Err(ZjaxError::Config(_))
    ));
    assert!(registry.register(Some("bad-ns"), [("x", noop())]).is_err());
    assert!(registry.register(None, [("bad.name", noop())]).is_err());
    assert!(registry.is_empty());

    registry.register(Some("books"), [("open", noop()), ("close", noop())]).unwrap();
    registry.register(None, [("top", noop())]).unwrap();
    registry.register(Some("books"), [("list", noop())]).unwrap();
    assert_eq!(registry.paths().collect::<Vec<_>>(), ["books.list", "top"]);
    assert_eq!(registry.get("books.list").and_then(|a| a.namespace()), Some("books"));
}

#[test]
fn test_compile_failures_are_resolution_errors() {
    let registry = ActionRegistry::new();
    assert_eq!(
        CompiledAction::compile("books.open", &registry).unwrap_err(),
        ZjaxError::ActionResolution("Unknown action: books.open".into())
    );
    assert!(matches!(
        CompiledAction::compile("$('#a'", &registry),
        Err(ZjaxError::ActionResolution(message)) if message.starts_with("z-action value is invalid")
    ));
}

#[test]
fn test_truthiness() {
    for falsy in [json!(null), json!(false), json!(0), json!(0.0), json!("")] {
        assert!(!is_truthy(&falsy), "{}", falsy);
    }
    for truthy in [json!(true), json!(-1), json!("0"), json!([]), json!({})] {
        assert!(is_truthy(&truthy), "{}", truthy);
    }
}

#[test]
fn test_script_javascript_syntax() {
    let script = Script::compile("\n  $( '#a' ) .remove ( ) ;;\n  return   'done'  ").unwrap();
    assert!(script.source().contains("return"));
    assert!(Script::compile(";;;").is_ok());
    assert!(Script::compile("const n = 1; return n + 1").is_ok());

    let err = Script::compile("return $(").unwrap_err();
    assert!(!err.message.is_empty());
}
