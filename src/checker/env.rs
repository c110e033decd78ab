use crate::common::types::Type;
use im::{HashMap, Vector};

/// Variable environment and entity context stack for a checking pass.
///
/// Persistent maps keep scope extension cheap: a quantifier body is checked
/// under `with_var` without touching the enclosing environment.
#[derive(Clone, Debug)]
pub struct Environment {
    /// Free variable names in scope: parameters, quantifier-bound variables
    /// and locals, mapped to their declared types.
    vars: HashMap<String, Type>,

    /// Enclosing entity scopes, innermost last. A bare name may resolve to a
    /// feature of any entity on this stack (or its ancestors).
    contexts: Vector<String>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            vars: HashMap::new(),
            contexts: Vector::new(),
        }
    }

    pub fn with_var(&self, name: impl Into<String>, ty: Type) -> Self {
        let mut next = self.clone();
        next.vars.insert(name.into(), ty);
        next
    }

    pub fn with_context(&self, entity: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.contexts.push_back(entity.into());
        next
    }

    pub fn lookup(&self, name: &str) -> Option<&Type> {
        self.vars.get(name)
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// Entity contexts, innermost first.
    pub fn contexts(&self) -> impl Iterator<Item = &str> {
        self.contexts.iter().rev().map(String::as_str)
    }

    pub fn innermost_context(&self) -> Option<&str> {
        self.contexts.last().map(String::as_str)
    }

    pub fn bound_names(&self) -> impl Iterator<Item = &str> {
        self.vars.keys().map(String::as_str)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_does_not_leak() {
        let env = Environment::new().with_var("x", Type::integer());
        let inner = env.with_var("y", Type::boolean());
        assert!(inner.is_bound("y"));
        assert!(!env.is_bound("y"));
        assert!(env.is_bound("x"));
    }

    #[test]
    fn contexts_iterate_innermost_first() {
        let env = Environment::new()
            .with_context("Person")
            .with_context("Employee");
        let stack: Vec<&str> = env.contexts().collect();
        assert_eq!(stack, vec!["Employee", "Person"]);
        assert_eq!(env.innermost_context(), Some("Employee"));
    }
}
