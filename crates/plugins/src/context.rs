//! Typed reads out of a free-form task context.

use serde_json::Value;

use satellite_core::error::ValidationError;
use satellite_core::types::Context;

/// The value at `key`, or a [`ValidationError`] naming it.
pub fn require<'a>(ctx: Option<&'a Context>, key: &str) -> Result<&'a Value, ValidationError> {
    ctx.and_then(|c| c.get(key))
        .filter(|v| !v.is_null())
        .ok_or_else(|| ValidationError::new(format!("Missing {key}")))
}

pub fn require_str<'a>(ctx: Option<&'a Context>, key: &str) -> Result<&'a str, ValidationError> {
    require(ctx, key)?
        .as_str()
        .ok_or_else(|| ValidationError::new(format!("{key} must be a string")))
}

pub fn optional_str<'a>(ctx: Option<&'a Context>, key: &str) -> Option<&'a str> {
    ctx.and_then(|c| c.get(key)).and_then(Value::as_str)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn ctx(value: Value) -> Context {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn require_str_reports_missing_and_mistyped_keys() {
        let c = ctx(json!({ "group": "infra", "count": 3, "gone": null }));
        assert_eq!(require_str(Some(&c), "group").unwrap(), "infra");
        assert_eq!(require_str(Some(&c), "nope").unwrap_err().0, "Missing nope");
        assert_eq!(require_str(Some(&c), "gone").unwrap_err().0, "Missing gone");
        assert_eq!(
            require_str(Some(&c), "count").unwrap_err().0,
            "count must be a string"
        );
        assert!(require_str(None, "group").is_err());
        assert_eq!(optional_str(Some(&c), "count"), None);
    }
}
