//! Frozen records
//!
//! Every record in this crate is fixed at construction: fields are private,
//! there are no setters, and derived instances come from `replace`-style
//! constructors. [`Immutable`] adds the dynamic face of that contract for
//! hosts that expose records to a scripting layer: field iteration by name,
//! and an `assign` entry point that always refuses.

use serde_json::Value;

use crate::error::{ForgeError, Result};

pub trait Immutable {
    /// Field names in declaration order.
    const FIELDS: &'static [&'static str];

    /// Render a single field, `None` if the record has no such field.
    fn field(&self, name: &str) -> Option<String>;

    fn fields(&self) -> Vec<(&'static str, String)> {
        Self::FIELDS
            .iter()
            .filter_map(|&name| self.field(name).map(|rendered| (name, rendered)))
            .collect()
    }

    /// Attribute assignment from a dynamic host. Always fails.
    fn assign(&self, field: &str, _value: Value) -> Result<()> {
        Err(ForgeError::ImmutableInstance {
            field: field.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Debug, Clone, PartialEq)]
    struct Point {
        x: i64,
        y: i64,
    }

    impl Immutable for Point {
        const FIELDS: &'static [&'static str] = &["x", "y"];

        fn field(&self, name: &str) -> Option<String> {
            match name {
                "x" => Some(self.x.to_string()),
                "y" => Some(self.y.to_string()),
                _ => None,
            }
        }
    }

    #[test]
    fn fields_iterate_in_declaration_order() {
        let p = Point { x: 1, y: 2 };
        assert_eq!(
            p.fields(),
            vec![("x", "1".to_string()), ("y", "2".to_string())]
        );
        assert_eq!(p.field("z"), None);
    }

    #[test]
    fn assign_always_fails() {
        let p = Point { x: 1, y: 2 };
        let err = p.assign("x", Value::from(3)).unwrap_err();
        assert_eq!(err.to_string(), "cannot assign to field 'x'");
        assert!(matches!(err, ForgeError::ImmutableInstance { .. }));
        assert_eq!(p, Point { x: 1, y: 2 });
    }

    #[test]
    fn equality_is_structural() {
        assert_eq!(Point { x: 1, y: 2 }, Point { x: 1, y: 2 });
        assert_ne!(Point { x: 1, y: 2 }, Point { x: 2, y: 1 });
    }
}
