//! Per-request session facade.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};
use crate::options::SessionOptions;
use crate::record::SessionRecord;
use crate::store::SessionStore;
use crate::value::{Entry, effective_expiry};

/// Lazily loaded per-request state.
#[derive(Default)]
struct State {
    record: Option<SessionRecord>,
    written: bool,
}

struct SessionInner {
    store: Arc<dyn SessionStore>,
    name: String,
    id: String,
    state: Mutex<State>,
}

/// A cheap, clonable handle over one named session.
///
/// Construction performs no I/O; the backing record is fetched from the
/// store on first access and memoized for the life of the handle. Values
/// carry their own expiry inside the whole-session TTL: an expired value
/// reads as absent but is only removed by an explicit delete, clear, or
/// overwrite.
///
/// A handle serves a single request. Clones share the same state, which
/// is what the tower layer and the axum extractors rely on.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    /// Create a handle for the given identifier without touching the store.
    pub fn new(
        store: Arc<dyn SessionStore>,
        name: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                store,
                name: name.into(),
                id: id.into(),
                state: Mutex::new(State::default()),
            }),
        }
    }

    /// The session identifier.
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// The session name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Whether the backing record was absent from the store.
    ///
    /// Forces the lazy load.
    pub fn is_new(&self) -> Result<bool> {
        self.with_record(|record, _| record.is_new)
    }

    /// Read a value, decoding it into `T`.
    ///
    /// Returns `Ok(None)` when the key is absent or its entry has expired.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let now = Utc::now().timestamp();
        let value = self.with_record(|record, _| {
            record
                .values
                .get(key)
                .and_then(|entry| entry.live(now))
                .cloned()
        })?;
        match value {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| Error::Decode(e.to_string())),
            None => Ok(None),
        }
    }

    /// Store a value under `key`.
    ///
    /// `expire_secs` bounds how long the value stays readable; requests
    /// outside `1..=max_age` fall back to the session's max-age.
    pub fn set<T: Serialize>(
        &self,
        key: impl Into<String>,
        value: T,
        expire_secs: i64,
    ) -> Result<()> {
        let value = serde_json::to_value(value).map_err(|e| Error::Encode(e.to_string()))?;
        let now = Utc::now().timestamp();
        self.with_record(|record, written| {
            let expires_at = now + effective_expiry(expire_secs, record.options.max_age);
            record.values.insert(key.into(), Entry::new(value, expires_at));
            *written = true;
        })
    }

    /// Remove a single value.
    pub fn delete(&self, key: &str) -> Result<()> {
        self.with_record(|record, written| {
            record.values.remove(key);
            *written = true;
        })
    }

    /// Remove every value.
    pub fn clear(&self) -> Result<()> {
        self.with_record(|record, written| {
            if !record.values.is_empty() {
                record.values.clear();
                *written = true;
            }
        })
    }

    /// Replace the session's options wholesale.
    pub fn set_options(&self, options: SessionOptions) -> Result<()> {
        self.with_record(|record, written| {
            record.options = options;
            *written = true;
        })
    }

    /// Persist the session when it has unsaved writes.
    ///
    /// A successful save clears the written flag; a failed one leaves it
    /// set so a later save retries.
    pub fn save(&self) -> Result<()> {
        let mut state = self.inner.state.lock();
        if !state.written {
            return Ok(());
        }
        let State { record, written } = &mut *state;
        match record {
            Some(record) => {
                self.inner.store.save(record)?;
                *written = false;
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Run a closure over the loaded record, fetching it on first use.
    ///
    /// A failed load leaves the record unset so a later access retries.
    fn with_record<R>(&self, f: impl FnOnce(&mut SessionRecord, &mut bool) -> R) -> Result<R> {
        let mut state = self.inner.state.lock();
        let State { record, written } = &mut *state;
        match record {
            Some(rec) => Ok(f(rec, written)),
            None => {
                let mut rec = self
                    .inner
                    .store
                    .new_session(&self.inner.id, &self.inner.name)?;
                let out = f(&mut rec, written);
                *record = Some(rec);
                Ok(out)
            }
        }
    }
}

/// Named session handles for the many-sessions layer.
#[derive(Clone)]
pub struct Sessions {
    handles: HashMap<String, Session>,
}

impl Sessions {
    pub(crate) fn new(handles: HashMap<String, Session>) -> Self {
        Self { handles }
    }

    /// The handle for `name`, if the layer was configured with it.
    pub fn get(&self, name: &str) -> Option<&Session> {
        self.handles.get(name)
    }

    /// Save every named session.
    pub fn save_all(&self) -> Result<()> {
        for session in self.handles.values() {
            session.save()?;
        }
        Ok(())
    }
}
