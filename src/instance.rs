use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::class::Class;
use crate::error::LarkError;
use crate::token::Token;
use crate::value::Value;

/// A runtime object produced by `new ClassName(...)`: a per-value field map
/// and a reference to its class.  Handles share one allocation and compare by
/// pointer identity.
#[derive(Clone)]
pub struct Instance {
    data: Rc<RefCell<InstanceData>>,
}

#[derive(Debug)]
struct InstanceData {
    class: Class,
    fields: HashMap<String, Value>,
}

impl Instance {
    pub fn new(class: Class) -> Self {
        Instance {
            data: Rc::new(RefCell::new(InstanceData {
                class,
                fields: HashMap::new(),
            })),
        }
    }

    pub fn class(&self) -> Class {
        self.data.borrow().class.clone()
    }

    /// Property access: own fields shadow methods; a found method is bound
    /// to this instance.
    pub fn get(&self, property: &Token) -> Result<Value, LarkError> {
        let field: Option<Value> = self.data.borrow().fields.get(&property.lexeme).cloned();

        if let Some(value) = field {
            return Ok(value);
        }

        if let Some(method) = self.class().find_method(&property.lexeme) {
            return Ok(Value::Function(method.bind(self.clone())));
        }

        Err(LarkError::runtime(
            property.row,
            property.col,
            format!("undefined property '{}'", property.lexeme),
        ))
    }

    /// Set a field, creating or overwriting it.
    pub fn set(&self, name: &str, value: Value) {
        self.data
            .borrow_mut()
            .fields
            .insert(name.to_string(), value);
    }

    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} instance>", self.class().name())
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} instance", self.class().name())
    }
}
