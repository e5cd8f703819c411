use std::rc::Rc;

use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolScope {
    Global,
    Local,
    Builtin,
    Free,
    Function,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub scope: SymbolScope,
    pub index: usize,
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    pub outer: Option<Rc<std::cell::RefCell<SymbolTable>>>,
    store: FxHashMap<String, Symbol>,
    pub num_definitions: usize,
    pub free_symbols: Vec<Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable::default()
    }

    pub fn with_outer(outer: Rc<std::cell::RefCell<SymbolTable>>) -> Self {
        SymbolTable { outer: Some(outer), ..Default::default() }
    }

    pub fn define(&mut self, name: &str) -> Symbol {
        let scope = if self.outer.is_none() { SymbolScope::Global } else { SymbolScope::Local };
        let symbol = Symbol { name: name.to_string(), scope, index: self.num_definitions };
        self.num_definitions += 1;
        self.store.insert(name.to_string(), symbol.clone());
        symbol
    }

    pub fn define_builtin(&mut self, index: usize, name: &str) -> Symbol {
        let symbol = Symbol { name: name.to_string(), scope: SymbolScope::Builtin, index };
        self.store.insert(name.to_string(), symbol.clone());
        symbol
    }

    pub fn define_function_name(&mut self, name: &str) -> Symbol {
        let symbol = Symbol { name: name.to_string(), scope: SymbolScope::Function, index: 0 };
        self.store.insert(name.to_string(), symbol.clone());
        symbol
    }

    fn define_free(&mut self, original: Symbol) -> Symbol {
        self.free_symbols.push(original.clone());
        let symbol = Symbol {
            name: original.name.clone(),
            scope: SymbolScope::Free,
            index: self.free_symbols.len() - 1,
        };
        self.store.insert(original.name, symbol.clone());
        symbol
    }

    pub fn resolve(&mut self, name: &str) -> Option<Symbol> {
        if let Some(symbol) = self.store.get(name) {
            return Some(symbol.clone());
        }

        let outer = self.outer.clone()?;
        let resolved = outer.borrow_mut().resolve(name)?;

        match resolved.scope {
            SymbolScope::Global | SymbolScope::Builtin => Some(resolved),
            _ => Some(self.define_free(resolved)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_define_resolves_global_in_root_table() {
        let mut table = SymbolTable::new();
        let a = table.define("a");
        assert_eq!(a.scope, SymbolScope::Global);
        assert_eq!(a.index, 0);
        assert_eq!(table.resolve("a"), Some(a));
    }

    #[test]
    fn test_define_resolves_local_in_nested_table() {
        let global = Rc::new(RefCell::new(SymbolTable::new()));
        global.borrow_mut().define("a");
        let mut local = SymbolTable::with_outer(global.clone());
        let b = local.define("b");
        assert_eq!(b.scope, SymbolScope::Local);
        assert_eq!(local.resolve("a").unwrap().scope, SymbolScope::Global);
        assert_eq!(local.resolve("b"), Some(b));
    }

    #[test]
    fn test_resolve_free() {
        let global = Rc::new(RefCell::new(SymbolTable::new()));
        global.borrow_mut().define("a");

        let first_local = Rc::new(RefCell::new(SymbolTable::with_outer(global.clone())));
        first_local.borrow_mut().define("b");

        let mut second_local = SymbolTable::with_outer(first_local.clone());
        second_local.define("c");
        second_local.define("d");

        let resolved_b = second_local.resolve("b").unwrap();
        assert_eq!(resolved_b.scope, SymbolScope::Free);
        assert_eq!(resolved_b.index, 0);
        assert_eq!(second_local.free_symbols[0].name, "b");
        assert_eq!(second_local.free_symbols[0].scope, SymbolScope::Local);
    }

    #[test]
    fn test_resolve_unresolveable_free() {
        let global = Rc::new(RefCell::new(SymbolTable::new()));
        global.borrow_mut().define("a");
        let first_local = Rc::new(RefCell::new(SymbolTable::with_outer(global)));
        first_local.borrow_mut().define("b");
        let mut second_local = SymbolTable::with_outer(first_local);
        second_local.define("c");
        assert_eq!(second_local.resolve("nonexistent"), None);
    }

    #[test]
    fn test_define_and_resolve_function_name() {
        let mut table = SymbolTable::new();
        table.define_function_name("a");
        let resolved = table.resolve("a").unwrap();
        assert_eq!(resolved.scope, SymbolScope::Function);
        assert_eq!(resolved.index, 0);
    }

    #[test]
    fn test_shadowing_function_name() {
        let mut table = SymbolTable::new();
        table.define_function_name("a");
        table.define("a");
        let resolved = table.resolve("a").unwrap();
        assert_eq!(resolved.scope, SymbolScope::Global);
    }

    #[test]
    fn test_define_builtin_does_not_bump_num_definitions() {
        let mut table = SymbolTable::new();
        table.define_builtin(0, "len");
        table.define_builtin(5, "push");
        assert_eq!(table.num_definitions, 0);
        assert_eq!(table.resolve("len").unwrap().scope, SymbolScope::Builtin);
        assert_eq!(table.resolve("push").unwrap().index, 5);
    }
}
