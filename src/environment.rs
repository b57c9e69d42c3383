use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use thiserror::Error;

/// Shared handle to a frame.  Closures and bound methods hold these, so a
/// frame lives as long as its longest holder.
pub type EnvRef = Rc<RefCell<Environment>>;

/// Failed variable lookup, before the interpreter attaches a source index.
#[derive(Debug, Error, PartialEq)]
pub enum LookupError {
    #[error("Undefined variable '{0}'")]
    Undefined(String),

    /// Assignment never creates a variable implicitly.
    #[error("Assigning to variable '{0}' before declaration")]
    AssignBeforeDeclaration(String),
}

/// One runtime scope: a flat name → value map plus an optional link to the
/// enclosing frame.
#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<EnvRef>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: EnvRef) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Wrap into a shared handle.
    pub fn into_ref(self) -> EnvRef {
        Rc::new(RefCell::new(self))
    }

    /// Insert or overwrite `name` in this frame.  Redeclaration is allowed
    /// here; the resolver is the only place that rejects it.
    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    /// Direct lookup in this frame only.
    pub fn get(&self, name: &str) -> Result<Value, LookupError> {
        self.values
            .get(name)
            .cloned()
            .ok_or_else(|| LookupError::Undefined(name.to_string()))
    }

    /// Direct assignment in this frame only.
    pub fn assign(&mut self, name: &str, value: Value) -> Result<(), LookupError> {
        match self.values.get_mut(name) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(LookupError::AssignBeforeDeclaration(name.to_string())),
        }
    }

    /// Read `name` from the frame exactly `depth` links up from `env`.
    pub fn get_at(env: &EnvRef, depth: usize, name: &str) -> Result<Value, LookupError> {
        Self::ancestor(env, depth)
            .ok_or_else(|| LookupError::Undefined(name.to_string()))?
            .borrow()
            .get(name)
    }

    /// Assign `name` in the frame exactly `depth` links up from `env`.
    pub fn assign_at(
        env: &EnvRef,
        depth: usize,
        name: &str,
        value: Value,
    ) -> Result<(), LookupError> {
        Self::ancestor(env, depth)
            .ok_or_else(|| LookupError::AssignBeforeDeclaration(name.to_string()))?
            .borrow_mut()
            .assign(name, value)
    }

    /// Walk `depth` enclosing links.  `None` if the chain is shorter.
    fn ancestor(env: &EnvRef, depth: usize) -> Option<EnvRef> {
        let mut frame: EnvRef = Rc::clone(env);

        for _ in 0..depth {
            let parent: EnvRef = frame.borrow().enclosing.clone()?;
            frame = parent;
        }

        Some(frame)
    }
}
