//! The "no value supplied" marker
//!
//! A call-time slot is an `Option<Value>`: `Some(Value::Null)` is an explicit
//! null from the caller, `None` is void (the caller said nothing). Keeping the
//! two apart is what lets a declared default kick in only when nothing was
//! passed.

use serde_json::Value;

/// Void: nothing was supplied for this slot.
pub const VOID: Option<Value> = None;

pub fn is_void(slot: &Option<Value>) -> bool {
    slot.is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn void_is_distinct_from_null() {
        assert!(is_void(&VOID));
        assert!(!is_void(&Some(Value::Null)));
        assert!(!is_void(&Some(json!(0))));
        assert_ne!(VOID, Some(Value::Null));
    }
}
