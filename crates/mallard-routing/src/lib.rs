//! Declarative route tables for axum routers.
//!
//! Routes are described by a spelled-out method name and folded into an
//! `axum::Router`. Unknown method names are skipped rather than rejected,
//! so tables can be built from loosely validated sources.
//!
//! # Example
//!
//! ```rust,ignore
//! use axum::Router;
//! use mallard_routing::{Route, register};
//!
//! let router = register(Router::new(), [
//!     Route::new("GET", "/health", health),
//!     Route::new("Any", "/echo", echo),
//! ]);
//! ```

use axum::Router;
use axum::handler::Handler;
use axum::routing::{self, MethodFilter, MethodRouter};
use tracing::debug;

/// A single route described by a spelled-out method name.
///
/// Recognized names are `GET`, `POST`, `PATCH`, `DELETE`, `PUT`, `HEAD`,
/// `OPTIONS`, and `Any`. Any other name produces an inert route that
/// [`register`] skips.
pub struct Route<S = ()> {
    method: String,
    path: String,
    action: Option<MethodRouter<S>>,
}

impl<S> Route<S>
where
    S: Clone + Send + Sync + 'static,
{
    /// Describe a route for the given method name, path, and handler.
    pub fn new<H, T>(method: impl Into<String>, path: impl Into<String>, handler: H) -> Self
    where
        H: Handler<T, S>,
        T: 'static,
    {
        let method = method.into();
        let action = match method.as_str() {
            "Any" => Some(routing::any(handler)),
            name => method_filter(name).map(|filter| routing::on(filter, handler)),
        };
        Self {
            method,
            path: path.into(),
            action,
        }
    }
}

/// Fold a route table into `router`, skipping unrecognized method names.
pub fn register<S>(mut router: Router<S>, routes: impl IntoIterator<Item = Route<S>>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    for route in routes {
        match route.action {
            Some(action) => {
                router = router.route(&route.path, action);
            }
            None => {
                debug!(
                    method = %route.method,
                    path = %route.path,
                    "Skipping route with unrecognized method"
                );
            }
        }
    }
    router
}

fn method_filter(name: &str) -> Option<MethodFilter> {
    match name {
        "GET" => Some(MethodFilter::GET),
        "POST" => Some(MethodFilter::POST),
        "PATCH" => Some(MethodFilter::PATCH),
        "DELETE" => Some(MethodFilter::DELETE),
        "PUT" => Some(MethodFilter::PUT),
        "HEAD" => Some(MethodFilter::HEAD),
        "OPTIONS" => Some(MethodFilter::OPTIONS),
        _ => None,
    }
}
