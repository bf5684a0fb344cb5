//! Ordered, regex based request routing.
//!
//! Routes are tried in the order they were registered and the first one
//! whose method and path pattern both match handles the request. Patterns
//! may overlap; an earlier route shadows any later one it overlaps with.

use crate::http::request::{Method, Request};
use crate::http::response::Response;
use regex::Regex;
use tracing::debug;

/// Signature shared by all route handlers.
pub type Handler = Box<dyn Fn(&Request, &PathParams) -> Response + Send + Sync>;

/// Capture groups of a matched path pattern, in group order.
///
/// Groups that did not participate in the match are empty strings so the
/// positions stay stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(Vec<String>);

impl PathParams {
    pub fn new(params: Vec<String>) -> Self {
        Self(params)
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

pub struct Route {
    method: Method,
    pattern: Regex,
    handler: Handler,
}

impl Route {
    /// Returns the captures if this route accepts the request.
    fn matches(&self, request: &Request) -> Option<PathParams> {
        if request.method != self.method {
            return None;
        }

        let captures = self.pattern.captures(request.path())?;
        let params = captures
            .iter()
            .skip(1)
            .map(|group| group.map_or_else(String::new, |m| m.as_str().to_string()))
            .collect();

        Some(PathParams(params))
    }
}

/// Immutable once the server starts; shared read-only by every connection.
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Appends a route. `pattern` is matched against the request path.
    pub fn register<H>(
        &mut self,
        method: &str,
        pattern: &str,
        handler: H,
    ) -> Result<&mut Self, regex::Error>
    where
        H: Fn(&Request, &PathParams) -> Response + Send + Sync + 'static,
    {
        let pattern = Regex::new(pattern)?;
        self.routes.push(Route {
            method: Method::from_token(method),
            pattern,
            handler: Box::new(handler),
        });
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Hands the request to the first matching route, or answers 404.
    pub fn dispatch(&self, request: &Request) -> Response {
        for (index, route) in self.routes.iter().enumerate() {
            if let Some(params) = route.matches(request) {
                debug!(
                    method = %request.method,
                    path = %request.url,
                    route = index,
                    pattern = route.pattern.as_str(),
                    "Matched route"
                );
                return (route.handler)(request, &params);
            }
        }

        debug!(method = %request.method, path = %request.url, "No route matched");
        Response::not_found()
    }
}
