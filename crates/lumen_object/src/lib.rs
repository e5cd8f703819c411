pub mod builtins;
pub mod environment;
pub mod value;

pub use environment::Environment;
pub use value::{native_bool, BuiltinFn, Closure, CompiledFunction, Function, HashKey, Value, FALSE, NULL, TRUE};

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn test_integer_inspect() {
        assert_eq!(Value::Integer(5).inspect(), "5");
    }

    #[test]
    fn test_boolean_inspect() {
        assert_eq!(Value::Boolean(true).inspect(), "true");
        assert_eq!(Value::Boolean(false).inspect(), "false");
    }

    #[test]
    fn test_null_inspect() {
        assert_eq!(Value::Null.inspect(), "null");
    }

    #[test]
    fn test_string_equality_by_value_not_identity() {
        let a = Value::String(Rc::from("hello"));
        let b = Value::String(Rc::from("hello"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_array_inspect() {
        let arr = Value::Array(Rc::new(vec![Value::Integer(1), Value::Integer(2)]));
        assert_eq!(arr.inspect(), "[1, 2]");
    }

    #[test]
    fn test_truthiness_law() {
        assert!(Value::Integer(0).is_truthy());
        assert!(Value::String(Rc::from("")).is_truthy());
        assert!(Value::Boolean(true).is_truthy());
        assert!(!Value::Boolean(false).is_truthy());
        assert!(!Value::Null.is_truthy());
    }

    #[test]
    fn test_hash_key_restricted_to_hashable_types() {
        assert_eq!(Value::Integer(5).hash_key(), Some(HashKey::Integer(5)));
        assert_eq!(Value::Boolean(true).hash_key(), Some(HashKey::Boolean(true)));
        assert_eq!(
            Value::String(Rc::from("x")).hash_key(),
            Some(HashKey::String("x".to_string()))
        );
        assert_eq!(Value::Null.hash_key(), None);
        assert_eq!(Value::Array(Rc::new(vec![])).hash_key(), None);
    }

    #[test]
    fn test_type_names() {
        assert_eq!(Value::Integer(1).type_name(), "INTEGER");
        assert_eq!(Value::String(Rc::from("x")).type_name(), "STRING");
        assert_eq!(Value::Null.type_name(), "NULL");
    }

    #[test]
    fn test_environment_resolves_through_outer_scope() {
        let outer = Environment::new();
        outer.borrow_mut().set("x", Value::Integer(10));
        let inner = Environment::enclosed(outer.clone());
        assert_eq!(inner.borrow().get("x"), Some(Value::Integer(10)));
    }

    #[test]
    fn test_environment_shadows_outer_binding() {
        let outer = Environment::new();
        outer.borrow_mut().set("x", Value::Integer(1));
        let inner = Environment::enclosed(outer.clone());
        inner.borrow_mut().set("x", Value::Integer(2));
        assert_eq!(inner.borrow().get("x"), Some(Value::Integer(2)));
        assert_eq!(outer.borrow().get("x"), Some(Value::Integer(1)));
    }

    #[test]
    fn test_environment_sees_later_writes_to_captured_scope() {
        // Closures hold the Rc<RefCell<Environment>> by reference, so a write
        // after capture is still visible.
        let env = Environment::new();
        let captured = env.clone();
        env.borrow_mut().set("y", Value::Integer(1));
        assert_eq!(captured.borrow().get("y"), Some(Value::Integer(1)));
        env.borrow_mut().set("y", Value::Integer(2));
        assert_eq!(captured.borrow().get("y"), Some(Value::Integer(2)));
    }
}
