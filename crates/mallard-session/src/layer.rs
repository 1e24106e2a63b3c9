//! Tower middleware that attaches lazy session handles to requests.

use std::collections::HashMap;
use std::sync::Arc;
use std::task::{Context, Poll};

use http::{HeaderName, Request};
use tower::{Layer, Service};
use tracing::trace;
use uuid::Uuid;

use crate::session::{Session, Sessions};
use crate::store::SessionStore;

/// Tower layer that equips each request with lazy session handles.
///
/// The identifier is read from the request header named after the session;
/// when the header is absent or unreadable a fresh UUID is generated.
/// Handle construction performs no cache I/O, and the layer never touches
/// the response.
#[derive(Clone)]
pub struct SessionLayer {
    store: Arc<dyn SessionStore>,
    names: Names,
}

/// Handle arrangement, fixed by the constructor. A one-element
/// `with_names` list is still the map form.
#[derive(Clone)]
enum Names {
    Single(String),
    Many(Vec<String>),
}

impl SessionLayer {
    /// Expose a single session as the [`Session`] request extension.
    pub fn new(store: Arc<dyn SessionStore>, name: impl Into<String>) -> Self {
        Self {
            store,
            names: Names::Single(name.into()),
        }
    }

    /// Expose the named sessions as the [`Sessions`] request extension,
    /// one handle per name, regardless of how many names are given.
    pub fn with_names(
        store: Arc<dyn SessionStore>,
        names: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            store,
            names: Names::Many(names.into_iter().map(Into::into).collect()),
        }
    }
}

impl<S> Layer<S> for SessionLayer {
    type Service = SessionService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SessionService {
            inner,
            store: Arc::clone(&self.store),
            names: self.names.clone(),
        }
    }
}

/// Service produced by [`SessionLayer`].
#[derive(Clone)]
pub struct SessionService<S> {
    inner: S,
    store: Arc<dyn SessionStore>,
    names: Names,
}

impl<S> SessionService<S> {
    fn session_for<B>(&self, req: &Request<B>, name: &str) -> Session {
        let id = header_id(req, name).unwrap_or_else(|| Uuid::new_v4().to_string());
        trace!(name = %name, session_id = %id, "Attaching session handle");
        Session::new(Arc::clone(&self.store), name, id)
    }
}

/// Session id carried by the request header named after the session.
fn header_id<B>(req: &Request<B>, name: &str) -> Option<String> {
    let header = HeaderName::try_from(name).ok()?;
    let value = req.headers().get(&header)?;
    value
        .to_str()
        .ok()
        .filter(|id| !id.is_empty())
        .map(str::to_owned)
}

impl<S, B> Service<Request<B>> for SessionService<S>
where
    S: Service<Request<B>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        match &self.names {
            Names::Single(name) => {
                let session = self.session_for(&req, name);
                req.extensions_mut().insert(session);
            }
            Names::Many(names) => {
                let handles: HashMap<String, Session> = names
                    .iter()
                    .map(|name| (name.clone(), self.session_for(&req, name)))
                    .collect();
                req.extensions_mut().insert(Sessions::new(handles));
            }
        }
        self.inner.call(req)
    }
}
