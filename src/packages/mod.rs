// Serializable views handed out to callers.
pub mod schedule;
