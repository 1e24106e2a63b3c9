//! The per-session state handed between facade and store.

use crate::options::SessionOptions;
use crate::value::SessionValues;

/// The state of one named session as a store sees it.
///
/// Records are produced by a store's `new_session` and routed back through
/// its `save` and `delete`. Between those calls the per-request `Session`
/// facade owns the record.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    /// Externally supplied session identifier.
    pub id: String,

    /// Session name. Adapters use it as the request header carrying the
    /// identifier; the store keys the cache record by id alone.
    pub name: String,

    /// Stored values.
    pub values: SessionValues,

    /// Whether the record was absent from the backend when constructed.
    pub is_new: bool,

    /// Options applied to this session.
    pub options: SessionOptions,
}

impl SessionRecord {
    /// Create an empty record for the given identifier.
    pub fn new(id: impl Into<String>, name: impl Into<String>, options: SessionOptions) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            values: SessionValues::new(),
            is_new: true,
            options,
        }
    }
}
