/// All database primary keys are 64-bit integers (SQLite rowids).
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
