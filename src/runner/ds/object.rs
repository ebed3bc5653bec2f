use std::cell::RefCell;
use std::fmt;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

use crate::runner::ds::class::ClassRef;
use crate::runner::ds::value::Value;

pub type ObjectRef = Rc<RefCell<Instance>>;

/// An instance of a host class. Fields are what attribute access reads
/// and writes directly; property access goes through getters and setters first.
pub struct Instance {
    pub class: ClassRef,
    fields: Vec<(String, Value)>,
}
impl Instance {
    /// Allocate an instance with every declared field at its initial value.
    /// No constructor runs here.
    pub fn allocate(class: &ClassRef) -> ObjectRef {
        Rc::new(RefCell::new(Instance {
            class: class.clone(),
            fields: class.initial_fields(),
        }))
    }

    pub fn get_field(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.get_field(name).is_some()
    }

    /// Overwrite a field. Returns `false` if the instance has no such field.
    pub fn set_field(&mut self, name: &str, value: Value) -> bool {
        match self.fields.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => {
                slot.1 = value;
                true
            }
            None => false,
        }
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|(n, _)| n.clone()).collect()
    }
}
impl Display for Instance {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let fields: Vec<String> = self
            .fields
            .iter()
            .map(|(n, v)| match v {
                // Nested instances by class name only; fields may form cycles.
                Value::Object(o) => format!("{}:<{}>", n, o.borrow().class.name),
                _ => format!("{}:{}", n, v),
            })
            .collect();
        write!(f, "{}({})", self.class.name, fields.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ds::class::ClassBuilder;

    #[test]
    fn test_allocate_initializes_declared_fields() {
        let c = ClassBuilder::new("Point")
            .field("x", Value::from(0))
            .field("y", Value::from(0))
            .build();
        let p = Instance::allocate(&c);
        assert_eq!(p.borrow().field_names(), vec!["x".to_string(), "y".to_string()]);
        assert!(p.borrow_mut().set_field("x", Value::from(5)));
        assert!(!p.borrow_mut().set_field("z", Value::from(5)));
        assert_eq!(p.borrow().get_field("x"), Some(&Value::from(5)));
        assert_eq!(p.borrow().to_string(), "Point(x:5, y:0)");
    }
}
