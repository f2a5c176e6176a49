//! Behavior attributes - event hooks, text templates and feature flags.
//!
//! Handlers are first-class function values stored in the behavior map next
//! to plain data. Equality between two behavior maps compares handlers by
//! pointer identity, never by what they do: two closures with identical
//! bodies are different behaviors, and a cloned `Rc` is the same behavior.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::context::Engine;
use crate::types::NodeId;

// =============================================================================
// Events & Handlers
// =============================================================================

/// An event delivered to a behavior handler.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Node the event was dispatched on.
    pub target: NodeId,
    /// Behavior key that was invoked (`click`, `choose`, `reload`, ...).
    pub name: String,
    /// Position of the duplicate row, for events raised by template rows.
    pub index: Option<usize>,
    /// Payload. The data row for template rows.
    pub value: Value,
}

impl Event {
    /// Create an event without a row index.
    pub fn new(target: impl Into<NodeId>, name: impl Into<String>, value: Value) -> Self {
        Self {
            target: target.into(),
            name: name.into(),
            index: None,
            value,
        }
    }
}

/// Behavior handler. Receives the engine so it can mutate the tree.
pub type Handler = Rc<dyn Fn(&mut Engine, &Event)>;

/// Wrap a closure as a [`Behavior::Handler`].
pub fn handler(f: impl Fn(&mut Engine, &Event) + 'static) -> Behavior {
    Behavior::Handler(Rc::new(f))
}

// =============================================================================
// Behavior
// =============================================================================

/// One entry of a node's behavior map.
#[derive(Clone)]
pub enum Behavior {
    /// Text template. `{{field}}` placeholders render from structural data.
    Text(String),
    /// Feature flag (`animate_enter`, ...).
    Flag(bool),
    /// Any other data-only behavior.
    Value(Value),
    /// Event hook.
    Handler(Handler),
}

/// Ordered behavior map.
pub type BehaviorMap = BTreeMap<String, Behavior>;

impl Behavior {
    pub fn as_handler(&self) -> Option<&Handler> {
        match self {
            Behavior::Handler(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Behavior::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Behavior::Flag(b) => Some(*b),
            _ => None,
        }
    }
}

impl PartialEq for Behavior {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Behavior::Text(a), Behavior::Text(b)) => a == b,
            (Behavior::Flag(a), Behavior::Flag(b)) => a == b,
            (Behavior::Value(a), Behavior::Value(b)) => a == b,
            (Behavior::Handler(a), Behavior::Handler(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Behavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Behavior::Text(t) => f.debug_tuple("Text").field(t).finish(),
            Behavior::Flag(b) => f.debug_tuple("Flag").field(b).finish(),
            Behavior::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Behavior::Handler(h) => write!(f, "Handler({:p})", Rc::as_ptr(h)),
        }
    }
}

impl From<Value> for Behavior {
    fn from(value: Value) -> Self {
        match value {
            Value::Bool(b) => Behavior::Flag(b),
            Value::String(s) => Behavior::Text(s),
            other => Behavior::Value(other),
        }
    }
}

impl From<&str> for Behavior {
    fn from(text: &str) -> Self {
        Behavior::Text(text.to_string())
    }
}

impl From<bool> for Behavior {
    fn from(flag: bool) -> Self {
        Behavior::Flag(flag)
    }
}

/// Convert a descriptor's data-only behavior section into a behavior map.
pub fn behaviors_from_attrs(attrs: &crate::types::Attrs) -> BehaviorMap {
    attrs
        .iter()
        .map(|(k, v)| (k.clone(), Behavior::from(v.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_handlers_compare_by_reference() {
        let a = handler(|_, _| {});
        let b = handler(|_, _| {});
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn test_from_json_value() {
        assert_eq!(Behavior::from(json!(true)), Behavior::Flag(true));
        assert_eq!(Behavior::from(json!("Hi {{name}}")), Behavior::Text("Hi {{name}}".into()));
        assert_eq!(Behavior::from(json!(3)), Behavior::Value(json!(3)));
    }

    #[test]
    fn test_map_equality_sees_handler_swap() {
        let h = handler(|_, _| {});
        let mut first = BehaviorMap::new();
        first.insert("click".into(), h.clone());
        let mut second = first.clone();
        assert_eq!(first, second);

        second.insert("click".into(), handler(|_, _| {}));
        assert_ne!(first, second);
    }
}
