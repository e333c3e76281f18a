use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::environment::Environment;
use crate::error::LarkError;
use crate::instance::Instance;
use crate::interpreter::{Interpreter, Unwind};
use crate::stmt::FunctionDecl;
use crate::value::Value;

/// A user function value: a declaration plus the environment captured at its
/// creation site.
///
/// Cloning is cheap; every clone shares the declaration and the closure, so
/// mutations through the closure are visible to all holders.
#[derive(Clone)]
pub struct Function {
    declaration: Rc<FunctionDecl>,
    closure: Rc<RefCell<Environment>>,
}

impl Function {
    pub fn new(declaration: Rc<FunctionDecl>, closure: Rc<RefCell<Environment>>) -> Self {
        Function {
            declaration,
            closure,
        }
    }

    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    /// Produce a copy of this function bound to `instance`.
    ///
    /// The binding interposes one environment holding `this` between the
    /// function's closure and its future call frames, so `this` resolves at
    /// one hop above the frame exactly as the resolver laid it out.
    pub fn bind(&self, instance: Instance) -> Function {
        debug!("Binding method '{}' to an instance", self.name());

        let mut bound: Environment = Environment::with_enclosing(self.closure.clone());

        let fresh = bound.define("this", Value::Instance(instance));
        debug_assert!(fresh, "fresh binding environment cannot hold 'this'");

        Function {
            declaration: self.declaration.clone(),
            closure: Rc::new(RefCell::new(bound)),
        }
    }

    /// Invoke the function.  The caller has already checked arity.
    ///
    /// A `Return` unwind from the body is absorbed here; a body that runs off
    /// the end yields `none`.
    pub fn call(&self, interpreter: &mut Interpreter, args: Vec<Value>) -> Result<Value, Unwind> {
        debug!("Calling function '{}' with {} arg(s)", self.name(), args.len());

        let frame = Rc::new(RefCell::new(Environment::with_enclosing(
            self.closure.clone(),
        )));

        for (param, value) in self.declaration.params.iter().zip(args) {
            if !frame.borrow_mut().define(&param.lexeme, value) {
                return Err(Unwind::Error(LarkError::runtime(
                    param.row,
                    param.col,
                    format!("duplicate parameter '{}'", param.lexeme),
                )));
            }
        }

        match interpreter.execute_in(&self.declaration.body, frame) {
            Ok(()) => Ok(Value::None),

            Err(Unwind::Return { value, .. }) => Ok(value),

            Err(unwind) => Err(unwind),
        }
    }

    pub fn ptr_eq(&self, other: &Function) -> bool {
        Rc::ptr_eq(&self.declaration, &other.declaration)
            && Rc::ptr_eq(&self.closure, &other.closure)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {}>", self.name())
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {}>", self.name())
    }
}
