/// Machine identifiers are opaque UUIDs assigned at creation.
pub type MachineId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
