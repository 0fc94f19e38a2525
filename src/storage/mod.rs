//! Storage module for saving and loading story state
//!
//! A save is the state store's combined view serialized as JSON.

use crate::state::StateStore;

/// Save state to bytes using JSON serialization
pub fn save(state: &StateStore) -> anyhow::Result<Vec<u8>> {
    let json = serde_json::to_string_pretty(&state.combined_view())?;
    Ok(json.into_bytes())
}

/// Load a fresh state store from bytes
pub fn load(bytes: &[u8]) -> anyhow::Result<StateStore> {
    let view = serde_json::from_slice(bytes)?;
    Ok(StateStore::from_combined_view(view)?)
}

/// Replace the contents of an existing store, keeping its listeners
pub fn load_into(state: &mut StateStore, bytes: &[u8]) -> anyhow::Result<()> {
    let view = serde_json::from_slice(bytes)?;
    state.restore(view)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Scope;
    use serde_json::json;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn save_then_load_restores_state() {
        let mut original = StateStore::new();
        original.set("score", json!(100), Scope::Global).unwrap();
        original.set("name", json!("Alice"), Scope::Global).unwrap();
        original.set("hint", json!("left"), Scope::Temp).unwrap();

        let bytes = save(&original).unwrap();
        let restored = load(&bytes).unwrap();

        assert_eq!(restored.global(), original.global());
        assert_eq!(restored.temp(), original.temp());
        assert_eq!(restored.get("score", None).unwrap(), json!(100));
    }

    #[test]
    fn load_into_notifies_existing_listeners() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let mut target = StateStore::new();
        target.add_listener(move |_, _| counter.set(counter.get() + 1));

        load_into(&mut target, br#"{"gold": 3, "temp": {}, "t": {}}"#).unwrap();

        assert_eq!(calls.get(), 1);
        assert_eq!(target.get("gold", None).unwrap(), json!(3));
    }

    #[test]
    fn load_invalid_data_returns_error() {
        assert!(load(b"invalid json data").is_err());
        assert!(load(b"[1, 2, 3]").is_err());
    }
}
