//! In-process transport
//!
//! Serves canned responses from a route table and records every request it
//! sees. Clones share the same table, so a test can keep one handle while
//! the page owns another.

use std::cell::RefCell;
use std::rc::Rc;

use smol::future::BoxedLocal;
use url::Url;

use crate::{Method, NetError, Request, Response, Transport};

#[derive(Debug, Clone)]
struct Route {
    method: Method,
    path: String,
    outcome: Result<Response, String>,
}

#[derive(Debug, Default)]
struct Routes {
    routes: Vec<Route>,
    requests: Vec<Request>,
}

/// Route-table transport
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    inner: Rc<RefCell<Routes>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `method path` with `response`; later routes win
    ///
    /// A `path` containing `?` must match the query string exactly,
    /// otherwise the query is ignored.
    pub fn route(&self, method: Method, path: &str, response: Response) -> &Self {
        self.inner.borrow_mut().routes.push(Route {
            method,
            path: path.to_string(),
            outcome: Ok(response),
        });
        self
    }

    /// Shorthand for a `200` HTML route
    pub fn html(&self, method: Method, path: &str, body: &str) -> &Self {
        self.route(method, path, Response::html(body))
    }

    /// Fail `method path` at the transport level
    pub fn fail(&self, method: Method, path: &str, message: &str) -> &Self {
        self.inner.borrow_mut().routes.push(Route {
            method,
            path: path.to_string(),
            outcome: Err(message.to_string()),
        });
        self
    }

    /// Requests seen so far, oldest first
    pub fn requests(&self) -> Vec<Request> {
        self.inner.borrow().requests.clone()
    }

    fn lookup(&self, request: &Request) -> Result<Response, NetError> {
        let url = Url::parse(&request.url).map_err(|_| NetError::InvalidUrl(request.url.clone()))?;
        let path_and_query = match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        };

        let inner = self.inner.borrow();
        let route = inner.routes.iter().rev().find(|route| {
            route.method == request.method
                && if route.path.contains('?') {
                    route.path == path_and_query
                } else {
                    route.path == url.path()
                }
        });

        match route {
            Some(Route { outcome: Ok(response), .. }) => Ok(response.clone()),
            Some(Route { outcome: Err(message), .. }) => Err(NetError::Network(message.clone())),
            None => Ok(Response::new(404, format!("No route for {} {}", request.method, url.path()))),
        }
    }
}

impl Transport for MemoryTransport {
    fn send(&self, request: Request) -> BoxedLocal<Result<Response, NetError>> {
        tracing::debug!("memory {} {}", request.method, request.url);
        let result = self.lookup(&request);
        self.inner.borrow_mut().requests.push(request);
        Box::pin(async move { result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_match() {
        let transport = MemoryTransport::new();
        transport.html(Method::Get, "/items", "<ul></ul>");

        let resp = smol::block_on(transport.send(Request::get("http://localhost/items?page=2"))).unwrap();
        assert_eq!(resp.text(), "<ul></ul>");
        assert_eq!(transport.requests().len(), 1);
    }

    #[test]
    fn test_query_route() {
        let transport = MemoryTransport::new();
        transport
            .html(Method::Get, "/search", "all")
            .html(Method::Get, "/search?q=rust", "rust");

        let resp = smol::block_on(transport.send(Request::get("http://localhost/search?q=rust"))).unwrap();
        assert_eq!(resp.text(), "rust");
        let resp = smol::block_on(transport.send(Request::get("http://localhost/search?q=go"))).unwrap();
        assert_eq!(resp.text(), "all");
    }

    #[test]
    fn test_unrouted_is_404() {
        let transport = MemoryTransport::new();
        let resp = smol::block_on(transport.send(Request::post("http://localhost/nope"))).unwrap();
        assert_eq!(resp.status, 404);
    }

    #[test]
    fn test_failure_route() {
        let transport = MemoryTransport::new();
        transport.fail(Method::Get, "/down", "connection refused");
        let result = smol::block_on(transport.send(Request::get("http://localhost/down")));
        assert!(matches!(result, Err(NetError::Network(m)) if m == "connection refused"));
    }
}
