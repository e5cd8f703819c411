use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::value::Value;

/// A lexical scope: a name → value map plus an optional link to the
/// enclosing scope. Resolution walks outward. Held behind `Rc<RefCell<_>>`
/// so a captured closure keeps seeing later writes to the defining scope.
#[derive(Debug, Default)]
pub struct Environment {
    store: FxHashMap<String, Value>,
    outer: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    pub fn new() -> Rc<RefCell<Environment>> {
        Rc::new(RefCell::new(Environment { store: FxHashMap::default(), outer: None }))
    }

    pub fn enclosed(outer: Rc<RefCell<Environment>>) -> Rc<RefCell<Environment>> {
        Rc::new(RefCell::new(Environment { store: FxHashMap::default(), outer: Some(outer) }))
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.store.get(name) {
            return Some(value.clone());
        }
        self.outer.as_ref().and_then(|outer| outer.borrow().get(name))
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.store.insert(name.into(), value);
    }
}
