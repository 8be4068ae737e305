//! Explicit plug-in registration.
//!
//! Rust has no reflective class loading, so a discovered [`ClassSet`] is
//! turned into live values through a [`Registry`]: each plug-in registers a
//! factory under its canonical class name, and the registry doubles as the
//! [`ClassLoader`] the finder resolves against. A class that was discovered
//! but never registered fails resolution.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::error::ResolveError;
use crate::finder::ClassSet;
use crate::loader::{ClassHandle, ClassLoader};

type Factory<T> = Box<dyn Fn() -> T + Send + Sync>;
type Initializer = Box<dyn Fn() -> Result<(), String> + Send + Sync>;

struct Entry<T> {
    factory: Factory<T>,
    initializer: Option<Initializer>,
    initialized: OnceLock<Result<(), String>>,
}

pub struct Registry<T> {
    entries: HashMap<String, Entry<T>>,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<T> Registry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `factory` under `class_name`, replacing any earlier entry.
    pub fn register<F>(&mut self, class_name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.insert(class_name.into(), Box::new(factory), None)
    }

    /// Like [`Registry::register`], with a one-time initializer that runs
    /// on the first successful lookup. Its outcome is remembered: a failed
    /// initializer makes every later lookup fail the same way.
    pub fn register_with_initializer<I, F>(
        &mut self,
        class_name: impl Into<String>,
        initializer: I,
        factory: F,
    ) -> &mut Self
    where
        I: Fn() -> Result<(), String> + Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.insert(class_name.into(), Box::new(factory), Some(Box::new(initializer)))
    }

    fn insert(
        &mut self,
        class_name: String,
        factory: Factory<T>,
        initializer: Option<Initializer>,
    ) -> &mut Self {
        self.entries.insert(
            class_name,
            Entry {
                factory,
                initializer,
                initialized: OnceLock::new(),
            },
        );
        self
    }

    pub fn contains(&self, class_name: &str) -> bool {
        self.entries.contains_key(class_name)
    }

    /// Builds a new value for `handle`, or `None` if nothing is registered
    /// under its name.
    pub fn instantiate(&self, handle: &ClassHandle) -> Option<T> {
        self.entries.get(handle.name()).map(|e| (e.factory)())
    }

    /// Instantiates every handle in `classes`, sorted by class name. Fails
    /// on the first handle without a registration.
    pub fn instantiate_all(&self, classes: &ClassSet) -> Result<Vec<T>, ResolveError> {
        let mut handles: Vec<&ClassHandle> = classes.iter().collect();
        handles.sort_by(|a, b| a.name().cmp(b.name()));
        handles
            .into_iter()
            .map(|h| {
                self.instantiate(h)
                    .ok_or_else(|| ResolveError::NotFound(h.name().to_string()))
            })
            .collect()
    }
}

impl<T> ClassLoader for Registry<T> {
    fn load_class(&self, name: &str) -> Result<ClassHandle, ResolveError> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| ResolveError::NotFound(name.to_string()))?;

        if let Some(init) = entry.initializer.as_ref() {
            entry
                .initialized
                .get_or_init(|| {
                    tracing::debug!(class = name, "running plug-in initializer");
                    init()
                })
                .clone()
                .map_err(|message| ResolveError::Initialization {
                    name: name.to_string(),
                    message,
                })?;
        }

        Ok(ClassHandle::new(name))
    }
}
