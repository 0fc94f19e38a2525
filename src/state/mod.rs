//! Story state store
//!
//! Two scopes of JSON values: global state that persists across
//! navigations, and temporary state that callers reset when they choose.
//! Every mutation synchronously notifies the registered listeners.

use crate::error::StoryError;
use serde_json::{Map, Value};
use std::fmt;

/// A scope's key/value mapping
pub type StateMap = Map<String, Value>;

/// Called after every mutation with `(global, temp)`
pub type StateListener = Box<dyn FnMut(&StateMap, &StateMap)>;

/// Key holding the pid of the passage being displayed
pub const CURRENT_PASSAGE_KEY: &str = "currentPassagePid";
/// Key holding the pid of the passage displayed before it
pub const LAST_PASSAGE_KEY: &str = "lastPassagePid";
/// Key set by the map directive during a render
pub const MAP_DISPLAYED_KEY: &str = "mapDisplayed";

/// Keys the combined view uses for the temporary scope; never valid global keys
pub const RESERVED_KEYS: [&str; 2] = ["temp", "t"];

/// Which mapping an operation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Global,
    Temp,
}

impl Scope {
    /// Parse `"global"` or `"temp"` (also `"t"`)
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "global" => Some(Scope::Global),
            "temp" | "t" => Some(Scope::Temp),
            _ => None,
        }
    }
}

#[derive(Default)]
pub struct StateStore {
    global: StateMap,
    temp: StateMap,
    listeners: Vec<StateListener>,
}

impl fmt::Debug for StateStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateStore")
            .field("global", &self.global)
            .field("temp", &self.temp)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with global values
    pub fn with_global(initial: StateMap) -> Result<Self, StoryError> {
        if let Some(key) = RESERVED_KEYS.iter().find(|key| initial.contains_key(**key)) {
            return Err(reserved_key_error(key));
        }
        Ok(Self {
            global: initial,
            ..Self::default()
        })
    }

    /// Rebuild a store from a combined view, splitting `temp`/`t` back out
    pub fn from_combined_view(view: Value) -> Result<Self, StoryError> {
        let (global, temp) = split_combined_view(view)?;
        Ok(Self {
            global,
            temp,
            listeners: Vec::new(),
        })
    }

    pub fn add_listener(&mut self, listener: impl FnMut(&StateMap, &StateMap) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn global(&self) -> &StateMap {
        &self.global
    }

    pub fn temp(&self) -> &StateMap {
        &self.temp
    }

    /// Resolve a dot-delimited path.
    ///
    /// With no explicit scope, a `temp.` or `t.` prefix selects the
    /// temporary scope. Any missing segment is an error.
    pub fn get(&self, path: &str, scope: Option<Scope>) -> Result<Value, StoryError> {
        let (map, path) = match scope {
            Some(Scope::Global) => (&self.global, path),
            Some(Scope::Temp) => (&self.temp, strip_temp_prefix(path).unwrap_or(path)),
            None => match path {
                "temp" | "t" => return Ok(Value::Object(self.temp.clone())),
                _ => match strip_temp_prefix(path) {
                    Some(rest) => (&self.temp, rest),
                    None => (&self.global, path),
                },
            },
        };

        resolve_path(map, path)
            .cloned()
            .ok_or_else(|| StoryError::not_found("state key", path_label(scope, path)))
    }

    /// Non-failing lookup against the combined view
    pub fn lookup(&self, path: &str) -> Option<Value> {
        self.get(path, None).ok()
    }

    /// Write a top-level key, then notify listeners
    pub fn set(&mut self, key: &str, value: Value, scope: Scope) -> Result<(), StoryError> {
        if scope == Scope::Global && RESERVED_KEYS.contains(&key) {
            return Err(reserved_key_error(key));
        }
        log::trace!("set {key} = {value} ({scope:?})");
        self.scope_mut(scope).insert(key.to_string(), value);
        self.notify();
        Ok(())
    }

    /// Remove one key, or the whole scope when `key` is `None`, then notify listeners
    pub fn clear(&mut self, key: Option<&str>, scope: Scope) {
        match key {
            Some(key) => {
                self.scope_mut(scope).remove(key);
            }
            None => self.scope_mut(scope).clear(),
        }
        log::trace!("cleared {} ({scope:?})", key.unwrap_or("<all>"));
        self.notify();
    }

    /// Merged read-only projection: global keys plus `temp` and its alias `t`
    pub fn combined_view(&self) -> Value {
        let mut view = self.global.clone();
        let temp = Value::Object(self.temp.clone());
        view.insert("temp".to_string(), temp.clone());
        view.insert("t".to_string(), temp);
        Value::Object(view)
    }

    /// Replace both scopes from a combined view, keeping listeners
    pub fn restore(&mut self, view: Value) -> Result<(), StoryError> {
        let (global, temp) = split_combined_view(view)?;
        self.global = global;
        self.temp = temp;
        self.notify();
        Ok(())
    }

    fn scope_mut(&mut self, scope: Scope) -> &mut StateMap {
        match scope {
            Scope::Global => &mut self.global,
            Scope::Temp => &mut self.temp,
        }
    }

    // Listener panics are not caught here; they unwind into the caller.
    fn notify(&mut self) {
        for listener in &mut self.listeners {
            listener(&self.global, &self.temp);
        }
    }
}

fn split_combined_view(view: Value) -> Result<(StateMap, StateMap), StoryError> {
    let Value::Object(mut global) = view else {
        return Err(StoryError::configuration(
            "state snapshot must be a JSON object",
        ));
    };
    let temp = global.remove("temp");
    let alias = global.remove("t");
    let temp = match temp.or(alias) {
        Some(Value::Object(temp)) => temp,
        Some(Value::Null) | None => StateMap::new(),
        Some(other) => {
            return Err(StoryError::configuration(format!(
                "temporary state must be an object, found {other}"
            )));
        }
    };
    Ok((global, temp))
}

fn strip_temp_prefix(path: &str) -> Option<&str> {
    path.strip_prefix("temp.").or_else(|| path.strip_prefix("t."))
}

fn resolve_path<'a>(map: &'a StateMap, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    segments.try_fold(map.get(first)?, |value, segment| match value {
        Value::Object(object) => object.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn path_label(scope: Option<Scope>, path: &str) -> String {
    match scope {
        Some(Scope::Temp) => format!("temp.{path}"),
        _ => path.to_string(),
    }
}

fn reserved_key_error(key: &str) -> StoryError {
    StoryError::validation(format!(
        "`{key}` is reserved for temporary state and cannot be a global key"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn set_then_get_returns_value() {
        let mut store = StateStore::new();
        store.set("x", json!(1), Scope::Global).unwrap();
        assert_eq!(store.get("x", None).unwrap(), json!(1));
    }

    #[test]
    fn missing_paths_are_not_found() {
        let store = StateStore::new();
        assert!(matches!(
            store.get("temp.y", None),
            Err(StoryError::NotFound { .. })
        ));
        assert!(matches!(
            store.get("unknown.path", None),
            Err(StoryError::NotFound { .. })
        ));
    }

    #[test]
    fn nested_paths_walk_objects_and_arrays() {
        let mut store = StateStore::new();
        store
            .set("hero", json!({"bag": ["rope", "lamp"], "hp": 3}), Scope::Global)
            .unwrap();
        assert_eq!(store.get("hero.hp", None).unwrap(), json!(3));
        assert_eq!(store.get("hero.bag.1", None).unwrap(), json!("lamp"));
        assert!(store.get("hero.hp.max", None).is_err());
        assert!(store.get("hero.bag.9", None).is_err());
    }

    #[test]
    fn temp_prefix_selects_temp_scope() {
        let mut store = StateStore::new();
        store.set("y", json!("t-val"), Scope::Temp).unwrap();
        store.set("y", json!("g-val"), Scope::Global).unwrap();
        assert_eq!(store.get("temp.y", None).unwrap(), json!("t-val"));
        assert_eq!(store.get("t.y", None).unwrap(), json!("t-val"));
        assert_eq!(store.get("y", None).unwrap(), json!("g-val"));
        assert_eq!(store.get("y", Some(Scope::Temp)).unwrap(), json!("t-val"));
    }

    #[test]
    fn set_is_top_level_only() {
        let mut store = StateStore::new();
        store.set("a.b", json!(1), Scope::Global).unwrap();
        assert!(store.global().contains_key("a.b"));
        assert!(store.get("a.b", None).is_err());
    }

    #[test]
    fn reserved_keys_are_rejected_in_global_scope() {
        let mut store = StateStore::new();
        assert!(matches!(
            store.set("temp", json!(1), Scope::Global),
            Err(StoryError::Validation { .. })
        ));
        assert!(store.set("t", json!(1), Scope::Global).is_err());
        assert!(store.set("t", json!(1), Scope::Temp).is_ok());
    }

    #[test]
    fn clear_removes_one_key_or_everything() {
        let mut store = StateStore::new();
        store.set("a", json!(1), Scope::Global).unwrap();
        store.set("b", json!(2), Scope::Global).unwrap();
        store.clear(Some("a"), Scope::Global);
        assert!(store.get("a", None).is_err());
        assert!(store.get("b", None).is_ok());
        store.clear(None, Scope::Global);
        assert!(store.global().is_empty());
    }

    #[test]
    fn listeners_see_both_scopes_after_each_mutation() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let mut store = StateStore::new();
        store.add_listener(move |global, temp| {
            sink.borrow_mut().push((global.len(), temp.len()));
        });

        store.set("a", json!(1), Scope::Global).unwrap();
        store.set("b", json!(2), Scope::Temp).unwrap();
        store.clear(None, Scope::Temp);

        assert_eq!(*seen.borrow(), vec![(1, 0), (1, 1), (1, 0)]);
    }

    #[test]
    fn combined_view_always_has_temp_and_alias() {
        let mut store = StateStore::new();
        let view = store.combined_view();
        assert_eq!(view["temp"], json!({}));
        assert_eq!(view["t"], json!({}));

        store.set("seen", json!(true), Scope::Temp).unwrap();
        store.set("gold", json!(5), Scope::Global).unwrap();
        let view = store.combined_view();
        assert_eq!(view["temp"], view["t"]);
        assert_eq!(view["t"]["seen"], json!(true));
        assert_eq!(view["gold"], json!(5));
    }

    #[test]
    fn combined_view_round_trips() {
        let mut store = StateStore::new();
        store.set("gold", json!(5), Scope::Global).unwrap();
        store.set("hint", json!("left"), Scope::Temp).unwrap();

        let rebuilt = StateStore::from_combined_view(store.combined_view()).unwrap();
        assert_eq!(rebuilt.global(), store.global());
        assert_eq!(rebuilt.temp(), store.temp());
        assert!(!rebuilt.global().contains_key("temp"));
        assert!(!rebuilt.global().contains_key("t"));
        assert_eq!(rebuilt.combined_view(), store.combined_view());
    }

    #[test]
    fn from_combined_view_rejects_non_objects() {
        assert!(StateStore::from_combined_view(json!([1, 2])).is_err());
        assert!(StateStore::from_combined_view(json!({"temp": 3})).is_err());
    }

    #[test]
    fn with_global_rejects_reserved_seed_keys() {
        let mut seed = StateMap::new();
        seed.insert("t".to_string(), json!(1));
        assert!(StateStore::with_global(seed).is_err());
    }
}
