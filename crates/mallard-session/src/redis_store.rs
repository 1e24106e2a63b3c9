//! Redis-backed session storage over a blocking connection pool.

use std::sync::Arc;
use std::time::Duration;

use r2d2::Pool;
use redis::{Client, Commands, ConnectionLike};
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::options::SessionOptions;
use crate::record::SessionRecord;
use crate::serializer::{MessagePackSerializer, SessionSerializer};
use crate::store::SessionStore;

/// Default cache TTL in seconds applied when a session's max-age is zero.
pub const DEFAULT_MAX_AGE: i64 = 60 * 20;

/// Default cap on the serialized payload size in bytes.
pub const DEFAULT_MAX_LENGTH: usize = 4096;

/// Default cache key prefix.
pub const DEFAULT_KEY_PREFIX: &str = "session_";

/// How long an idle pooled connection may linger before it is recycled.
const IDLE_TIMEOUT: Duration = Duration::from_secs(240);

/// Configuration for [`RedisStore`].
///
/// Fixed at construction; the store never mutates it afterwards.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Options copied into every new session.
    pub options: SessionOptions,

    /// Cache TTL in seconds used when a session's own max-age is zero.
    pub default_max_age: i64,

    /// Maximum serialized payload size in bytes. Zero disables the check.
    pub max_length: usize,

    /// Prefix applied to every cache key.
    pub key_prefix: String,

    /// Serialization strategy for stored values.
    pub serializer: Arc<dyn SessionSerializer>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            options: SessionOptions::default(),
            default_max_age: DEFAULT_MAX_AGE,
            max_length: DEFAULT_MAX_LENGTH,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            serializer: Arc::new(MessagePackSerializer),
        }
    }
}

impl StoreConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the options copied into new sessions.
    pub fn with_options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the TTL fallback for sessions whose max-age is zero.
    ///
    /// Negative values are rejected when the store is built.
    pub fn with_default_max_age(mut self, secs: i64) -> Self {
        self.default_max_age = secs;
        self
    }

    /// Set the maximum serialized payload size. Zero disables the check.
    pub fn with_max_length(mut self, bytes: usize) -> Self {
        self.max_length = bytes;
        self
    }

    /// Set the cache key prefix.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Set the serialization strategy.
    pub fn with_serializer(mut self, serializer: impl SessionSerializer + 'static) -> Self {
        self.serializer = Arc::new(serializer);
        self
    }
}

/// Borrow-a-connection seam between the store and its pool.
///
/// The production source is an r2d2 pool managed by `redis::Client`;
/// tests substitute a mock connection.
pub trait ConnectionSource: Send + Sync {
    /// The connection type handed out.
    type Connection: ConnectionLike;

    /// Borrow a connection.
    fn connection(&self) -> Result<Self::Connection>;
}

/// A connection checked out from an r2d2 pool.
pub struct PooledConn(r2d2::PooledConnection<Client>);

impl ConnectionLike for PooledConn {
    fn req_packed_command(&mut self, cmd: &[u8]) -> redis::RedisResult<redis::Value> {
        self.0.req_packed_command(cmd)
    }

    fn req_packed_commands(
        &mut self,
        cmd: &[u8],
        offset: usize,
        count: usize,
    ) -> redis::RedisResult<Vec<redis::Value>> {
        self.0.req_packed_commands(cmd, offset, count)
    }

    fn get_db(&self) -> i64 {
        self.0.get_db()
    }

    fn check_connection(&mut self) -> bool {
        self.0.check_connection()
    }

    fn is_open(&self) -> bool {
        self.0.is_open()
    }
}

impl ConnectionSource for Pool<Client> {
    type Connection = PooledConn;

    fn connection(&self) -> Result<PooledConn> {
        Ok(PooledConn(self.get()?))
    }
}

/// Session storage backed by a Redis-compatible cache.
///
/// Cache records live under `key_prefix + id` with a TTL enforced by the
/// backend. Reads and writes are blocking round trips on a borrowed
/// connection; there is no retry and no async path. Authentication and
/// database selection come from the connection URL.
pub struct RedisStore<S: ConnectionSource = Pool<Client>> {
    source: S,
    config: StoreConfig,
}

impl<S: ConnectionSource> std::fmt::Debug for RedisStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RedisStore {
    /// Connect to `url` with a bounded connection pool and default
    /// configuration.
    ///
    /// The URL carries address, credentials, and database index. The pool
    /// holds at most `pool_size` connections, validates each one on
    /// checkout, and recycles connections idle for longer than four
    /// minutes.
    pub fn new(url: &str, pool_size: u32) -> Result<Self> {
        let client = Client::open(url)?;
        let pool = Pool::builder()
            .max_size(pool_size)
            .min_idle(Some(0))
            .idle_timeout(Some(IDLE_TIMEOUT))
            .test_on_check_out(true)
            .build(client)?;
        Self::with_pool(pool)
    }

    /// Wrap an existing pool with the default configuration.
    pub fn with_pool(pool: Pool<Client>) -> Result<Self> {
        Self::with_config(pool, StoreConfig::default())
    }
}

impl<S: ConnectionSource> RedisStore<S> {
    /// Build a store over any connection source.
    ///
    /// Construction rejects a negative default max-age, then pings the
    /// backend and fails if it is unreachable or answers with anything
    /// but `PONG`.
    pub fn with_config(source: S, config: StoreConfig) -> Result<Self> {
        if config.default_max_age < 0 {
            return Err(Error::Config(format!(
                "default max-age must be non-negative, got {}",
                config.default_max_age
            )));
        }
        let store = Self { source, config };
        store.ping()?;
        Ok(store)
    }

    /// The store configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn cache_key(&self, id: &str) -> String {
        format!("{}{}", self.config.key_prefix, id)
    }

    fn ping(&self) -> Result<()> {
        let mut conn = self.source.connection()?;
        let reply: String = redis::cmd("PING").query(&mut conn)?;
        if reply != "PONG" {
            return Err(Error::Ping(reply));
        }
        Ok(())
    }

    /// Fetch and decode the cache record into `record`.
    ///
    /// Returns `Ok(false)` when the cache has no record for this id.
    fn load(&self, record: &mut SessionRecord) -> Result<bool> {
        let key = self.cache_key(&record.id);
        let mut conn = self.source.connection()?;
        let payload: Option<Vec<u8>> = conn.get(&key)?;
        match payload {
            Some(bytes) => {
                record.values = self.config.serializer.deserialize(&bytes)?;
                trace!(session_id = %record.id, bytes = bytes.len(), "Loaded session from cache");
                Ok(true)
            }
            None => {
                trace!(session_id = %record.id, "No cache record for session");
                Ok(false)
            }
        }
    }

    fn write(&self, record: &SessionRecord) -> Result<()> {
        let payload = self.config.serializer.serialize(&record.values)?;
        if self.config.max_length != 0 && payload.len() > self.config.max_length {
            return Err(Error::PayloadTooLarge {
                size: payload.len(),
                limit: self.config.max_length,
            });
        }

        let ttl = if record.options.max_age == 0 {
            self.config.default_max_age
        } else {
            record.options.max_age
        };

        let key = self.cache_key(&record.id);
        let mut conn = self.source.connection()?;
        // ttl is non-negative here: construction rejects a negative default
        // and a negative session max-age deletes instead of saving.
        let _: () = conn.set_ex(&key, &payload, ttl as u64)?;
        debug!(session_id = %record.id, bytes = payload.len(), ttl, "Saved session");
        Ok(())
    }

    fn remove(&self, id: &str) -> Result<()> {
        let key = self.cache_key(id);
        let mut conn = self.source.connection()?;
        let _: () = conn.del(&key)?;
        debug!(session_id = %id, "Deleted session");
        Ok(())
    }
}

impl<S: ConnectionSource> SessionStore for RedisStore<S> {
    fn new_session(&self, id: &str, name: &str) -> Result<SessionRecord> {
        let mut record = SessionRecord::new(id, name, self.config.options.clone());
        let found = self.load(&mut record)?;
        record.is_new = !found;
        debug!(session_id = %id, is_new = record.is_new, "Opened session");
        Ok(record)
    }

    fn save(&self, record: &SessionRecord) -> Result<()> {
        if record.options.max_age < 0 {
            return self.remove(&record.id);
        }
        self.write(record)
    }

    fn delete(&self, record: &mut SessionRecord) -> Result<()> {
        self.remove(&record.id)?;
        record.values.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serializer::JsonSerializer;
    use crate::value::{Entry, SessionValues};
    use redis::Value;
    use redis_test::{MockCmd, MockRedisConnection};
    use serde_json::json;

    /// Hands out clones of one mock connection. Clones share the command
    /// queue, so a sequence spanning several borrows is checked in order.
    #[derive(Clone)]
    struct MockSource(MockRedisConnection);

    impl ConnectionSource for MockSource {
        type Connection = MockRedisConnection;

        fn connection(&self) -> Result<MockRedisConnection> {
            Ok(self.0.clone())
        }
    }

    fn ping_cmd() -> MockCmd {
        MockCmd::new(redis::cmd("PING"), Ok("PONG"))
    }

    /// Build a store over a queue of `PING`, the given commands, and a
    /// trailing sentinel. `assert_consumed` succeeds only if everything
    /// before the sentinel was consumed in order.
    fn mock_store(
        commands: Vec<MockCmd>,
        config: StoreConfig,
    ) -> (RedisStore<MockSource>, MockSource) {
        let mut all = vec![ping_cmd()];
        all.extend(commands);
        all.push(MockCmd::new(redis::cmd("ECHO").arg("done"), Ok("done")));
        let source = MockSource(MockRedisConnection::new(all));
        let store = RedisStore::with_config(source.clone(), config).unwrap();
        (store, source)
    }

    fn assert_consumed(source: &MockSource) {
        let mut conn = source.connection().unwrap();
        let reply: String = redis::cmd("ECHO").arg("done").query(&mut conn).unwrap();
        assert_eq!(reply, "done");
    }

    #[test]
    fn test_construction_pings_backend() {
        let source = MockSource(MockRedisConnection::new(vec![ping_cmd()]));
        assert!(RedisStore::with_config(source, StoreConfig::default()).is_ok());
    }

    #[test]
    fn test_unreachable_backend_fails_construction() {
        // An empty queue turns any command into a client error.
        let source = MockSource(MockRedisConnection::new(vec![]));
        let err = RedisStore::with_config(source, StoreConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Redis(_)));
    }

    #[test]
    fn test_unexpected_ping_reply_fails_construction() {
        let source = MockSource(MockRedisConnection::new(vec![MockCmd::new(
            redis::cmd("PING"),
            Ok("NOPE"),
        )]));
        let err = RedisStore::with_config(source, StoreConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Ping(_)));
    }

    #[test]
    fn test_negative_default_max_age_fails_construction() {
        // The empty queue shows the rejection happens before any command.
        let source = MockSource(MockRedisConnection::new(vec![]));
        let config = StoreConfig::default().with_default_max_age(-5);
        let err = RedisStore::with_config(source, config).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_new_session_miss() {
        let (store, source) = mock_store(
            vec![MockCmd::new(
                redis::cmd("GET").arg("session_abc"),
                Ok(Value::Nil),
            )],
            StoreConfig::default(),
        );

        let record = store.new_session("abc", "app").unwrap();
        assert!(record.is_new);
        assert!(record.values.is_empty());
        assert_eq!(record.options, SessionOptions::default());
        assert_consumed(&source);
    }

    #[test]
    fn test_new_session_hit_decodes_values() {
        let mut values = SessionValues::new();
        values.insert("k".to_string(), Entry::new(json!("v"), 4_000_000_000));
        let payload = MessagePackSerializer.serialize(&values).unwrap();

        let (store, source) = mock_store(
            vec![MockCmd::new(
                redis::cmd("GET").arg("session_abc"),
                Ok(payload),
            )],
            StoreConfig::default(),
        );

        let record = store.new_session("abc", "app").unwrap();
        assert!(!record.is_new);
        assert_eq!(record.values, values);
        assert_consumed(&source);
    }

    #[test]
    fn test_save_issues_setex_with_session_ttl() {
        let options = SessionOptions::default().with_max_age(300);
        let mut record = SessionRecord::new("abc", "app", options);
        record
            .values
            .insert("k".to_string(), Entry::new(json!(1), 4_000_000_000));
        let payload = MessagePackSerializer.serialize(&record.values).unwrap();

        let (store, source) = mock_store(
            vec![
                MockCmd::new(
                    redis::cmd("SETEX")
                        .arg("session_abc")
                        .arg(300u64)
                        .arg(&payload),
                    Ok("OK"),
                ),
                MockCmd::new(redis::cmd("GET").arg("session_abc"), Ok(payload.clone())),
            ],
            StoreConfig::default(),
        );

        store.save(&record).unwrap();

        // Reloading consumes the trailing GET, proving SETEX ran first.
        let reloaded = store.new_session("abc", "app").unwrap();
        assert_eq!(reloaded.values, record.values);
        assert_consumed(&source);
    }

    #[test]
    fn test_save_zero_max_age_uses_default_ttl() {
        let record = SessionRecord::new("abc", "app", SessionOptions::default().with_max_age(0));
        let payload = MessagePackSerializer.serialize(&record.values).unwrap();

        let (store, source) = mock_store(
            vec![MockCmd::new(
                redis::cmd("SETEX")
                    .arg("session_abc")
                    .arg(60u64)
                    .arg(&payload),
                Ok("OK"),
            )],
            StoreConfig::default().with_default_max_age(60),
        );

        store.save(&record).unwrap();
        assert_consumed(&source);
    }

    #[test]
    fn test_oversized_save_is_rejected_before_io() {
        let (store, source) = mock_store(vec![], StoreConfig::default().with_max_length(10));

        let mut record = SessionRecord::new("abc", "app", SessionOptions::default());
        record.values.insert(
            "a".to_string(),
            Entry::new(json!("hello world!!!"), 4_000_000_000),
        );

        let err = store.save(&record).unwrap_err();
        assert!(matches!(err, Error::PayloadTooLarge { limit: 10, .. }));
        // The sentinel is next in the queue, so no command was issued.
        assert_consumed(&source);
    }

    #[test]
    fn test_zero_max_length_disables_size_check() {
        let options = SessionOptions::default().with_max_age(300);
        let mut record = SessionRecord::new("abc", "app", options);
        record.values.insert(
            "a".to_string(),
            Entry::new(json!("x".repeat(8192)), 4_000_000_000),
        );
        let payload = MessagePackSerializer.serialize(&record.values).unwrap();

        let (store, source) = mock_store(
            vec![MockCmd::new(
                redis::cmd("SETEX")
                    .arg("session_abc")
                    .arg(300u64)
                    .arg(&payload),
                Ok("OK"),
            )],
            StoreConfig::default().with_max_length(0),
        );

        store.save(&record).unwrap();
        assert_consumed(&source);
    }

    #[test]
    fn test_delete_clears_values() {
        let (store, source) = mock_store(
            vec![MockCmd::new(redis::cmd("DEL").arg("session_abc"), Ok(1))],
            StoreConfig::default(),
        );

        let mut record = SessionRecord::new("abc", "app", SessionOptions::default());
        record
            .values
            .insert("k".to_string(), Entry::new(json!(1), 4_000_000_000));

        store.delete(&mut record).unwrap();
        assert!(record.values.is_empty());
        assert_consumed(&source);
    }

    #[test]
    fn test_negative_max_age_save_deletes() {
        let (store, source) = mock_store(
            vec![MockCmd::new(redis::cmd("DEL").arg("session_abc"), Ok(1))],
            StoreConfig::default(),
        );

        let record = SessionRecord::new("abc", "app", SessionOptions::default().with_max_age(-1));
        store.save(&record).unwrap();
        assert_consumed(&source);
    }

    #[test]
    fn test_custom_key_prefix() {
        let (store, source) = mock_store(
            vec![MockCmd::new(redis::cmd("GET").arg("app:abc"), Ok(Value::Nil))],
            StoreConfig::default().with_key_prefix("app:"),
        );

        assert!(store.new_session("abc", "app").unwrap().is_new);
        assert_consumed(&source);
    }

    #[test]
    fn test_decode_error_propagates() {
        let (store, _source) = mock_store(
            vec![MockCmd::new(
                redis::cmd("GET").arg("session_abc"),
                Ok(vec![0xc1u8]),
            )],
            StoreConfig::default(),
        );

        let err = store.new_session("abc", "app").unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn test_json_strategy_round_trip() {
        let options = SessionOptions::default().with_max_age(120);
        let mut record = SessionRecord::new("abc", "app", options);
        record
            .values
            .insert("k".to_string(), Entry::new(json!({"n": 7}), 4_000_000_000));
        let payload = JsonSerializer.serialize(&record.values).unwrap();

        let (store, source) = mock_store(
            vec![
                MockCmd::new(
                    redis::cmd("SETEX")
                        .arg("session_abc")
                        .arg(120u64)
                        .arg(&payload),
                    Ok("OK"),
                ),
                MockCmd::new(redis::cmd("GET").arg("session_abc"), Ok(payload.clone())),
            ],
            StoreConfig::default().with_serializer(JsonSerializer),
        );

        store.save(&record).unwrap();
        let reloaded = store.new_session("abc", "app").unwrap();
        assert_eq!(reloaded.values, record.values);
        assert_consumed(&source);
    }
}
