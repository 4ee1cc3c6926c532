/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Free-form attribute bag as delivered by dataset readers and stored in
/// JSONB `data` columns.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;
