use std::fmt;
use std::rc::Rc;

use crate::callable::Function;

/// A class value: an ordered method list plus an optional superclass.
///
/// Immutable after construction; handles share one allocation and compare by
/// pointer identity.
#[derive(Clone)]
pub struct Class {
    data: Rc<ClassData>,
}

#[derive(Debug)]
struct ClassData {
    name: String,
    methods: Vec<Function>,
    superclass: Option<Class>,
}

impl Class {
    pub fn new(name: String, methods: Vec<Function>, superclass: Option<Class>) -> Self {
        Class {
            data: Rc::new(ClassData {
                name,
                methods,
                superclass,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.data.name
    }

    pub fn superclass(&self) -> Option<Class> {
        self.data.superclass.clone()
    }

    /// Search the method list in declaration order, then the superclass
    /// chain.
    pub fn find_method(&self, name: &str) -> Option<Function> {
        for method in &self.data.methods {
            if method.name() == name {
                return Some(method.clone());
            }
        }

        self.data
            .superclass
            .as_ref()
            .and_then(|superclass| superclass.find_method(name))
    }

    pub fn constructor(&self) -> Option<Function> {
        self.find_method("constructor")
    }

    /// Arity of instantiation: the constructor's, or 0 when there is none.
    pub fn arity(&self) -> usize {
        self.constructor().map_or(0, |ctor| ctor.arity())
    }

    pub fn ptr_eq(&self, other: &Class) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<class {}>", self.name())
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
