//! Lookup of execution contexts (qubes) named by entries.

use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;

/// Snapshot of a resolved context.
///
/// Records keep this value, not the context itself; it is looked up again
/// on every reload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextHandle {
    /// Context name, also its string form in commands.
    pub name: String,
    /// Icon identifier for the context, if it has one.
    pub icon: Option<String>,
}

impl ContextHandle {
    /// Create a handle with an optional icon.
    pub fn new(name: impl Into<String>, icon: Option<String>) -> Self {
        Self {
            name: name.into(),
            icon,
        }
    }
}

impl fmt::Display for ContextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Capability resolving a context name to a live context.
pub trait ContextRegistry {
    /// Resolve `name`, or `None` if no such context exists right now.
    fn resolve(&self, name: &str) -> Option<ContextHandle>;
}

/// In-memory registry, editable through a shared reference.
#[derive(Debug, Default)]
pub struct StaticContextRegistry {
    contexts: RefCell<IndexMap<String, ContextHandle>>,
}

impl StaticContextRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a context.
    pub fn insert(&self, context: ContextHandle) {
        self.contexts
            .borrow_mut()
            .insert(context.name.clone(), context);
    }

    /// Remove a context, returning it if it was present.
    pub fn remove(&self, name: &str) -> Option<ContextHandle> {
        self.contexts.borrow_mut().shift_remove(name)
    }

    /// Number of known contexts.
    pub fn len(&self) -> usize {
        self.contexts.borrow().len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.contexts.borrow().is_empty()
    }
}

impl FromIterator<ContextHandle> for StaticContextRegistry {
    fn from_iter<I: IntoIterator<Item = ContextHandle>>(iter: I) -> Self {
        let registry = Self::new();
        for context in iter {
            registry.insert(context);
        }
        registry
    }
}

impl ContextRegistry for StaticContextRegistry {
    fn resolve(&self, name: &str) -> Option<ContextHandle> {
        self.contexts.borrow().get(name).cloned()
    }
}
