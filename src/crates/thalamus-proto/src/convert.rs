//! Conversions between wire types and the observable state tree.

use crate::{observable_change, ObservableChange};
use thalamus_state::{Action, Value};

impl From<Action> for observable_change::Action {
    fn from(action: Action) -> Self {
        match action {
            Action::Set => observable_change::Action::Set,
            Action::Delete => observable_change::Action::Delete,
        }
    }
}

impl From<observable_change::Action> for Action {
    fn from(action: observable_change::Action) -> Self {
        match action {
            observable_change::Action::Set => Action::Set,
            observable_change::Action::Delete => Action::Delete,
        }
    }
}

/// Builds a wire change from a tree mutation. Values travel as JSON text.
pub fn change_to_wire(action: Action, address: &str, value: &Value) -> ObservableChange {
    ObservableChange {
        address: address.to_string(),
        value: value.to_json().to_string(),
        action: observable_change::Action::from(action) as i32,
    }
}

/// Decodes a wire change into `(action, address, value)`. Unparseable JSON
/// decodes as [`Value::None`] rather than failing the stream.
pub fn change_from_wire(change: &ObservableChange) -> (Action, &str, Value) {
    let action = observable_change::Action::try_from(change.action)
        .unwrap_or(observable_change::Action::Set)
        .into();
    let value = serde_json::from_str::<serde_json::Value>(&change.value)
        .map(|json| Value::from_json(&json))
        .unwrap_or(Value::None);
    (action, change.address.as_str(), value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_round_trip() {
        let value = Value::from_json(&serde_json::json!({"Running": true, "Rate": 1000.5}));
        let wire = change_to_wire(Action::Set, "$['nodes'][0]", &value);
        assert_eq!(wire.address, "$['nodes'][0]");

        let (action, address, decoded) = change_from_wire(&wire);
        assert_eq!(action, Action::Set);
        assert_eq!(address, "$['nodes'][0]");
        assert_eq!(decoded, value);
    }

    #[test]
    fn test_bad_json_decodes_as_none() {
        let wire = ObservableChange {
            address: "$['x']".to_string(),
            value: "{not json".to_string(),
            action: observable_change::Action::Delete as i32,
        };
        let (action, _, value) = change_from_wire(&wire);
        assert_eq!(action, Action::Delete);
        assert!(value.is_none());
    }
}
