/// Free-form keyed configuration (desired state, process and task contexts).
///
/// Handler-specific schemas are unknown to the core, so these stay dynamic.
pub type Context = serde_json::Map<String, serde_json::Value>;

/// Epoch milliseconds, the unit the orchestrator uses for every timestamp.
pub type EpochMillis = i64;

/// Current time in epoch milliseconds.
pub fn now_millis() -> EpochMillis {
    chrono::Utc::now().timestamp_millis()
}
