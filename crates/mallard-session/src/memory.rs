//! In-memory session storage.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::error::Result;
use crate::options::SessionOptions;
use crate::record::SessionRecord;
use crate::store::SessionStore;
use crate::value::SessionValues;

/// A process-local [`SessionStore`].
///
/// Records live in a mutex-guarded map and never expire on their own;
/// per-value expiry still applies when values are read back through the
/// facade. Intended for tests and single-node development.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, SessionValues>>,
    options: SessionOptions,
}

impl MemoryStore {
    /// Create an empty store with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store whose sessions start from the given options.
    pub fn with_options(options: SessionOptions) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            options,
        }
    }
}

impl SessionStore for MemoryStore {
    fn new_session(&self, id: &str, name: &str) -> Result<SessionRecord> {
        let mut record = SessionRecord::new(id, name, self.options.clone());
        if let Some(values) = self.records.lock().get(id) {
            record.values = values.clone();
            record.is_new = false;
        }
        Ok(record)
    }

    fn save(&self, record: &SessionRecord) -> Result<()> {
        let mut records = self.records.lock();
        if record.options.max_age < 0 {
            records.remove(&record.id);
        } else {
            records.insert(record.id.clone(), record.values.clone());
        }
        Ok(())
    }

    fn delete(&self, record: &mut SessionRecord) -> Result<()> {
        self.records.lock().remove(&record.id);
        record.values.clear();
        Ok(())
    }
}
