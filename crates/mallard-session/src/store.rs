//! Storage backend trait for sessions.

use crate::error::Result;
use crate::record::SessionRecord;

/// Trait for session storage backends.
///
/// Implementations own the mapping between a session identifier and its
/// persisted record. The per-request `Session` facade drives these methods
/// and memoizes the record it gets back, so a backend sees at most one
/// `new_session` per request.
pub trait SessionStore: Send + Sync {
    /// Build the record for the given identifier.
    ///
    /// Copies the store's default options into a fresh record, then
    /// attempts to load existing state. `is_new` is true unless the load
    /// found data. A missing record is not an error.
    fn new_session(&self, id: &str, name: &str) -> Result<SessionRecord>;

    /// Persist the record.
    ///
    /// A record whose max-age is negative is deleted from the backend
    /// instead of being written.
    fn save(&self, record: &SessionRecord) -> Result<()>;

    /// Remove the record from the backend and clear its values in place.
    fn delete(&self, record: &mut SessionRecord) -> Result<()>;
}
