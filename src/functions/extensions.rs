//! External (extension) function registration.
//!
//! Extension bundles are handed to the parser at construction time and
//! validated there, before any token is consumed. Implementations
//! exchange atomic values: the engine atomizes arguments on the way in
//! and wraps results on the way out, which keeps extension callables
//! independent of the caller's node type.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::Error;
use crate::types::AtomicValue;

pub type ExtensionImpl =
    Arc<dyn Fn(&[Vec<AtomicValue>]) -> Result<Vec<AtomicValue>, Error> + Send + Sync>;

#[derive(Clone)]
pub struct ExtensionFunction {
    pub name: String,
    pub min_args: usize,
    pub max_args: usize,
    pub implementation: ExtensionImpl,
    pub description: String,
}

impl ExtensionFunction {
    pub fn new(
        name: impl Into<String>,
        min_args: usize,
        max_args: usize,
        implementation: ExtensionImpl,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            min_args,
            max_args,
            implementation,
            description: description.into(),
        }
    }
}

impl fmt::Debug for ExtensionFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionFunction")
            .field("name", &self.name)
            .field("min_args", &self.min_args)
            .field("max_args", &self.max_args)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Validated collection of extension functions, looked up by name during
/// evaluation.
#[derive(Debug, Default)]
pub struct ExtensionRegistry {
    by_name: HashMap<String, ExtensionFunction>,
}

impl ExtensionRegistry {
    /// Validates a bundle: empty names, inverted arity ranges and
    /// duplicate names all fail with a configuration error naming the
    /// offending entry.
    pub fn from_functions(functions: &[ExtensionFunction]) -> Result<Self, Error> {
        let mut by_name = HashMap::with_capacity(functions.len());
        for func in functions {
            if func.name.is_empty() {
                return Err(Error::config("extension function with an empty name"));
            }
            if func.max_args < func.min_args {
                return Err(Error::config(format!(
                    "extension function '{}' has max_args {} below min_args {}",
                    func.name, func.max_args, func.min_args
                )));
            }
            if by_name.insert(func.name.clone(), func.clone()).is_some() {
                return Err(Error::config(format!(
                    "duplicate extension function '{}'",
                    func.name
                )));
            }
        }
        Ok(Self { by_name })
    }

    pub fn get(&self, name: &str) -> Option<&ExtensionFunction> {
        self.by_name.get(name)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ext(name: &str, min: usize, max: usize) -> ExtensionFunction {
        ExtensionFunction::new(name, min, max, Arc::new(|_| Ok(vec![])), "test")
    }

    #[test]
    fn test_valid_bundle() {
        let registry = ExtensionRegistry::from_functions(&[ext("a", 0, 2), ext("b", 1, 1)]).unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.get("a").is_some());
        assert!(registry.get("c").is_none());
    }

    #[test]
    fn test_invalid_bundles() {
        assert!(ExtensionRegistry::from_functions(&[ext("", 0, 0)]).is_err());
        assert!(ExtensionRegistry::from_functions(&[ext("f", 2, 1)]).is_err());
        assert!(ExtensionRegistry::from_functions(&[ext("f", 0, 1), ext("f", 0, 1)]).is_err());
    }
}
