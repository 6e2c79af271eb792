//! Recursive walks over JSON values.

use serde_json::{Map, Value};

/// Callbacks for [`walk`]. Each returns whether it changed anything.
pub trait Visitor {
    fn visit_string(&mut self, _s: &mut String) -> bool {
        false
    }

    /// Called for every object before its children are walked.
    fn visit_object(&mut self, _obj: &mut Map<String, Value>) -> bool {
        false
    }
}

/// Walk `value` depth-first, returning whether any callback changed it.
pub fn walk<V: Visitor + ?Sized>(value: &mut Value, visitor: &mut V) -> bool {
    match value {
        Value::Null | Value::Bool(_) | Value::Number(_) => false,
        Value::String(s) => visitor.visit_string(s),
        Value::Array(items) => items
            .iter_mut()
            .fold(false, |changed, item| walk(item, visitor) | changed),
        Value::Object(obj) => {
            let mut changed = visitor.visit_object(obj);
            for child in obj.values_mut() {
                changed |= walk(child, visitor);
            }
            changed
        }
    }
}

/// Read-only depth-first walk calling `f` on every object.
pub fn walk_objects<'a, F>(value: &'a Value, f: &mut F)
where
    F: FnMut(&'a Map<String, Value>),
{
    match value {
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {}
        Value::Array(items) => items.iter().for_each(|item| walk_objects(item, f)),
        Value::Object(obj) => {
            f(obj);
            obj.values().for_each(|child| walk_objects(child, f));
        }
    }
}
