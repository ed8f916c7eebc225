//! Handler pipelines
//!
//! What a directive listener does once its gates have passed.
//!
//! `z-swap`: build request → `zjax:request` → fetch → `zjax:response` →
//! error chain or parse → patch each op → re-scan inserted nodes →
//! `zjax:swap` → (settle delay) → restore attributes → `zjax:settle`.
//!
//! `z-action`: invoke with a helper → `zjax:action` on a truthy result.

use std::rc::Rc;

use serde_json::{Value, json};
use smol::Timer;
use smol::future::FutureExt;
use url::Url;
use zjax_dom::NodeId;
use zjax_net::{Request, Response};

use crate::actions::{CompiledAction, is_truthy};
use crate::event::{Event, EventTarget};
use crate::form;
use crate::helper::Helper;
use crate::listeners::{self, Handler};
use crate::page::PageInner;
use crate::patch;
use crate::scan::{self, pretty_name};
use crate::swap::{SwapOp, SwapRequest};
use crate::{Result, ZjaxError};

/// Endpoint that means "the current page"
const CURRENT_PAGE: &str = ".";

/// Handler for one `z-swap` trigger
pub(crate) fn swap_handler(node: NodeId, request: Rc<SwapRequest>) -> Handler {
    Rc::new(move |page: Rc<PageInner>, event: Event| {
        let request = request.clone();
        async move {
            let outcome = run_swap(&page, node, &request, event).await;
            if let Err(e) = &outcome {
                tracing::error!("Unable to execute z-swap function: {} on {}", e, pretty_name(&page, node));
            }
            outcome
        }
        .boxed_local()
    })
}

/// Handler for one `z-action` trigger
pub(crate) fn action_handler(node: NodeId, action: Rc<CompiledAction>) -> Handler {
    Rc::new(move |page: Rc<PageInner>, event: Event| {
        let action = action.clone();
        async move {
            let helper = Helper::new(page.clone(), node).with_event(event);
            let outcome = action.invoke(&helper);
            listeners::sweep(&page);

            match &outcome {
                Ok(value) if is_truthy(value) => {
                    let done = Event::custom("zjax:action", EventTarget::Node(node), value.clone()).with_bubbles(true);
                    listeners::dispatch(&page, done);
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!("Unable to execute z-action function: {} on {}", e, pretty_name(&page, node));
                }
            }
            outcome
        }
        .boxed_local()
    })
}

async fn run_swap(page: &Rc<PageInner>, node: NodeId, request: &SwapRequest, event: Event) -> Result<Value> {
    let http = build_request(page, node, request)?;
    let endpoint = http.url.clone();
    zdebug!(page, "z-swap triggered: {} {}", http.method, endpoint);

    emit(
        page,
        "zjax:request",
        node,
        json!({ "method": request.method, "endpoint": endpoint, "swaps": request.swaps }),
    );

    let response = page.transport.send(http).await.map_err(|e| ZjaxError::Fetch {
        endpoint: endpoint.clone(),
        message: e.to_string(),
    })?;
    emit(
        page,
        "zjax:response",
        node,
        json!({ "status": response.status, "endpoint": endpoint }),
    );

    if !response.is_success() {
        return handle_error(page, node, event, response, &endpoint);
    }

    let mut response_doc = zjax_html::parse_with_url(&response.text(), &endpoint);
    zdebug!(page, "z-swap response from {} received and parsed", endpoint);

    let mut swapped = 0;
    let mut failed = 0;
    for op in &request.swaps {
        match apply_op(page, node, &mut response_doc, op) {
            Ok(()) => swapped += 1,
            Err(e) => {
                failed += 1;
                tracing::error!("Unable to swap '{}': {} on {}", op, e, pretty_name(page, node));
            }
        }
    }

    Ok(json!({
        "status": response.status,
        "endpoint": endpoint,
        "swapped": swapped,
        "failed": failed,
    }))
}

/// Resolve the endpoint and attach the form payload
fn build_request(page: &PageInner, node: NodeId, request: &SwapRequest) -> Result<Request> {
    let doc = page.document.borrow();
    let endpoint = resolve_endpoint(doc.url(), &request.endpoint)?;
    let payload = form::collect_payload(doc.tree(), node);
    let (url, body) = form::apply_payload(request.method, &endpoint, &payload);

    let mut http = Request::new(request.method, &url).with_header("Accept", "text/html");
    if let Some(body) = body {
        http = http
            .with_header("Content-Type", "application/x-www-form-urlencoded")
            .with_body(body);
    }
    Ok(http)
}

fn resolve_endpoint(location: &str, endpoint: &str) -> Result<String> {
    if endpoint == CURRENT_PAGE {
        return Ok(location.to_string());
    }
    Url::parse(location)
        .and_then(|base| base.join(endpoint))
        .map(String::from)
        .map_err(|e| ZjaxError::Fetch {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })
}

/// Status handler → catch-all → `ZjaxError::Network`
fn handle_error(page: &Rc<PageInner>, node: NodeId, event: Event, response: Response, endpoint: &str) -> Result<Value> {
    match page.config.error_handler(response.status) {
        Some(handler) => {
            zdebug!(page, "Handling {} from {} with an error handler", response.status, endpoint);
            let helper = Helper::new(page.clone(), node)
                .with_event(event)
                .with_response(response);
            handler(&helper)
        }
        None => Err(ZjaxError::Network {
            status: response.status,
            reason: response.reason,
            endpoint: endpoint.to_string(),
        }),
    }
}

/// Patch one op, re-scan what it inserted and schedule its settle
fn apply_op(page: &Rc<PageInner>, node: NodeId, response_doc: &mut zjax_dom::Document, op: &SwapOp) -> Result<()> {
    let transitions = if page.config.transitions() {
        page.transitions.borrow().clone()
    } else {
        None
    };
    let result = patch::patch(&mut page.document.borrow_mut(), response_doc, op, transitions.as_deref())?;

    listeners::sweep(page);
    for &inserted in &result.inserted {
        scan::scan(page, inserted);
    }
    emit(
        page,
        "zjax:swap",
        node,
        json!({ "swap": op, "inserted": result.inserted.len() }),
    );

    let settle_page = page.clone();
    let delay = page.config.settle_delay();
    let swap = op.to_string();
    page.spawn(async move {
        Timer::after(delay).await;
        let settled = patch::settle(&mut settle_page.document.borrow_mut(), &result);
        if let Err(e) = settled {
            tracing::error!("Unable to settle '{}': {} on {}", swap, e, pretty_name(&settle_page, node));
        }
        emit(&settle_page, "zjax:settle", node, json!({ "swap": swap }));
    });
    Ok(())
}

/// Dispatch a lifecycle event to the document
fn emit(page: &Rc<PageInner>, kind: &str, node: NodeId, detail: Value) {
    let event = Event::custom(kind, EventTarget::Document, detail).with_related_node(node);
    listeners::dispatch(page, event);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_endpoint() {
        let location = "http://localhost:8080/books/index.html?page=2";
        assert_eq!(resolve_endpoint(location, ".").unwrap(), location);
        assert_eq!(resolve_endpoint(location, "/api").unwrap(), "http://localhost:8080/api");
        assert_eq!(resolve_endpoint(location, "./list").unwrap(), "http://localhost:8080/books/list");
        assert_eq!(
            resolve_endpoint(location, "https://example.com/x").unwrap(),
            "https://example.com/x"
        );
        assert!(matches!(
            resolve_endpoint("not a url", "/api"),
            Err(ZjaxError::Fetch { .. })
        ));
    }
}
