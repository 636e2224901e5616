use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::debug;

use crate::error::{LoxError, Result};
use crate::token::Token;
use crate::value::Value;

#[derive(Debug, Default)]
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

    /// Install a binding in this scope, shadowing any previous one here.
    pub fn define(&mut self, name: &str, value: Value) {
        debug!("Defining '{}'", name);

        self.values.insert(name.to_string(), value);
    }

    /// Walk outward from this scope until the name is found.
    pub fn get(&self, name: &Token) -> Result<Value> {
        if let Some(value) = self.values.get(&name.lexeme) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            Err(LoxError::runtime(
                name.line,
                format!("Undefined variable '{}'.", name.lexeme),
            ))
        }
    }

    /// Like `get`, but overwrites the binding where it lives.
    pub fn assign(&mut self, name: &Token, value: Value) -> Result<()> {
        if self.values.contains_key(&name.lexeme) {
            self.values.insert(name.lexeme.clone(), value);

            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            Err(LoxError::runtime(
                name.line,
                format!("Undefined variable '{}'.", name.lexeme),
            ))
        }
    }

    /// Walk `enclosing` exactly `distance` times.
    ///
    /// The resolver promises the chain is deep enough; running out of scopes
    /// is a resolver bug, not a user error, and panics.
    pub fn ancestor(env: &Rc<RefCell<Environment>>, distance: usize) -> Rc<RefCell<Environment>> {
        let mut current: Rc<RefCell<Environment>> = Rc::clone(env);

        for _ in 0..distance {
            let next: Rc<RefCell<Environment>> = current
                .borrow()
                .enclosing
                .clone()
                .expect("scope chain shorter than resolved distance");

            current = next;
        }

        current
    }

    /// Read a binding exactly `distance` scopes outward. Never walks further.
    pub fn get_at(env: &Rc<RefCell<Environment>>, distance: usize, name: &str) -> Value {
        debug!("get_at depth={} name={}", distance, name);

        Environment::ancestor(env, distance)
            .borrow()
            .values
            .get(name)
            .cloned()
            .expect("binding resolved to a scope that does not contain it")
    }

    /// Overwrite a binding exactly `distance` scopes outward.
    pub fn assign_at(env: &Rc<RefCell<Environment>>, distance: usize, name: &Token, value: Value) {
        debug!("assign_at depth={} name={}", distance, name.lexeme);

        let target: Rc<RefCell<Environment>> = Environment::ancestor(env, distance);
        let mut target = target.borrow_mut();

        debug_assert!(target.values.contains_key(&name.lexeme));

        target.values.insert(name.lexeme.clone(), value);
    }
}
