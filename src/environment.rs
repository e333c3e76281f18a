use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::debug;

use crate::value::Value;

/// One node of the lexical environment chain.
///
/// A node is created for each block, call frame, method binding, and once for
/// the global scope.  Closures keep their creation-site node alive through
/// the shared `Rc`, so mutations flow between every holder of the chain.
#[derive(Debug, Clone)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: Rc<RefCell<Environment>>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Bind `name` in this node.
    ///
    /// Returns `false` when the name is already bound in a non-global node;
    /// the caller reports that as the duplicate-declaration runtime error.
    /// The global node permits redefinition.
    #[must_use]
    pub fn define(&mut self, name: &str, value: Value) -> bool {
        if self.enclosing.is_some() && self.values.contains_key(name) {
            debug!("Rejecting duplicate declaration of '{}'", name);

            return false;
        }

        self.values.insert(name.to_string(), value);

        true
    }

    /// Read a binding from this node only; no chain walk.
    pub fn get_local(&self, name: &str) -> Option<Value> {
        self.values.get(name).cloned()
    }

    /// Overwrite a binding in this node only.  Returns `false` when the name
    /// is not bound here.
    #[must_use]
    pub fn set_local(&mut self, name: &str, value: Value) -> bool {
        if let Some(slot) = self.values.get_mut(name) {
            *slot = value;

            true
        } else {
            false
        }
    }

    /// Walk exactly `hops` parents from `env`.
    ///
    /// The resolver guarantees the distance, so running past the chain root
    /// would be an internal invariant violation.
    pub fn ancestor(env: Rc<RefCell<Environment>>, hops: usize) -> Rc<RefCell<Environment>> {
        let mut node: Rc<RefCell<Environment>> = env;

        for _ in 0..hops {
            let parent = node
                .borrow()
                .enclosing
                .clone()
                .expect("binding distance exceeds environment chain");

            node = parent;
        }

        node
    }

    /// Walk to the root (global) node of the chain containing `env`.
    pub fn global_of(env: Rc<RefCell<Environment>>) -> Rc<RefCell<Environment>> {
        let mut node: Rc<RefCell<Environment>> = env;

        loop {
            let parent = node.borrow().enclosing.clone();

            match parent {
                Some(p) => node = p,

                None => return node,
            }
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
