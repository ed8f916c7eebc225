//! Edge case tests for zjax-html
//!
//! Malformed markup and the shapes swap responses usually take.

use zjax_html::{inner_html, outer_html, parse, HtmlParser};

// ============================================================================
// EMPTY AND MINIMAL INPUT
// ============================================================================

#[test]
fn test_parse_empty_string() {
    let doc = parse("");
    assert!(doc.document_element().is_some());
    assert!(doc.body().is_some());
}

#[test]
fn test_parse_only_whitespace() {
    let doc = parse("   \t\n\r\n   ");
    let body = doc.body().unwrap();
    assert_eq!(doc.tree().children(body).count(), 0);
}

#[test]
fn test_parse_only_doctype() {
    let doc = parse("<!DOCTYPE html>");
    assert!(doc.body().is_some());
}

// ============================================================================
// MALFORMED HTML
// ============================================================================

#[test]
fn test_parse_unclosed_tags() {
    let doc = parse("<div id=a><p><span>text");
    let div = doc.get_element_by_id("a").unwrap();
    assert_eq!(doc.tree().text_content(div), "text");
}

#[test]
fn test_parse_extra_closing_tags() {
    let doc = parse("<div id=a></div></div></div>");
    assert!(doc.get_element_by_id("a").is_some());
}

// ============================================================================
// RESPONSE FRAGMENTS
// ============================================================================

#[test]
fn test_multiple_top_level_nodes() {
    let doc = parse("<p>1</p><p>2</p><p>3</p>");
    let body = doc.body().unwrap();
    assert_eq!(doc.tree().children(body).count(), 3);
    assert_eq!(inner_html(doc.tree(), body), "<p>1</p><p>2</p><p>3</p>");
}

#[test]
fn test_directive_attributes_survive() {
    let doc = parse(r#"<button z-swap="@click GET /x #y|inner" z-action="@mount ready">go</button>"#);
    let button = doc.query("button").unwrap();
    assert_eq!(doc.tree().get_attribute(button, "z-swap"), Some("@click GET /x #y|inner"));
    assert_eq!(doc.tree().get_attribute(button, "z-action"), Some("@mount ready"));
}

#[test]
fn test_round_trip_outer_html() {
    let doc = HtmlParser::new().parse_with_url(r#"<section id="s"><a href="/x">x</a></section>"#, "http://localhost/");
    let section = doc.get_element_by_id("s").unwrap();
    assert_eq!(outer_html(doc.tree(), section), r#"<section id="s"><a href="/x">x</a></section>"#);
    assert_eq!(doc.url(), "http://localhost/");
}
