//! Mapping from OS error numbers to `Errno::*` exception classes.
//!
//! Every entry is a leaf under `SystemCallError` carrying its number as the
//! `Errno` class constant. Entries are only ever added. A lookup for a number
//! nobody has seen before synthesizes a class named `E` followed by the number
//! padded to three digits, and that class is then the permanent answer for it.

use std::sync::Arc;

use ahash::RandomState;
use hashbrown::HashMap;
use indexmap::IndexMap;
use parking_lot::{RwLock, RwLockUpgradableReadGuard};

use crate::{
    known_errors::known_errors,
    taxonomy::{BuiltinClass, ExceptionClass, Taxonomy, TaxonomyError},
};

/// Name registered for error number 0.
pub const NOERROR: &str = "NOERROR";

#[derive(Default)]
struct ErrnoTable {
    by_errno: HashMap<i32, Arc<ExceptionClass>>,
    /// Every `Errno::<NAME>` constant, including aliases.
    constants: IndexMap<String, Arc<ExceptionClass>, RandomState>,
}

/// Process-wide errno to class cache.
pub struct SystemErrorRegistry {
    base: Arc<ExceptionClass>,
    inner: RwLock<ErrnoTable>,
}

impl SystemErrorRegistry {
    /// Creates the registry and seeds it with `NOERROR` and every known name.
    pub fn new(taxonomy: &Taxonomy) -> Result<Self, TaxonomyError> {
        let base = taxonomy
            .builtin(BuiltinClass::SystemCallError)
            .ok_or_else(|| TaxonomyError::MissingParent {
                name: "Errno".to_owned(),
                parent: BuiltinClass::SystemCallError.to_string(),
            })?;
        let registry = Self {
            base,
            inner: RwLock::default(),
        };

        let noerror = registry.register_known(taxonomy, 0, NOERROR)?;
        for (name, errno) in known_errors() {
            match errno {
                Some(errno) => {
                    registry.register_known(taxonomy, errno, name)?;
                }
                None => registry.alias(name, &noerror),
            }
        }
        tracing::trace!(entries = registry.len(), "seeded errno registry");
        Ok(registry)
    }

    /// The `SystemCallError` class all entries descend from.
    #[must_use]
    pub fn base(&self) -> &Arc<ExceptionClass> {
        &self.base
    }

    /// Returns the cached class for `errno` without synthesizing one.
    #[must_use]
    pub fn get(&self, errno: i32) -> Option<Arc<ExceptionClass>> {
        self.inner.read().by_errno.get(&errno).cloned()
    }

    /// Returns the class for `errno`, synthesizing and caching one on a miss.
    ///
    /// Concurrent misses for the same number converge on a single class.
    pub fn lookup(&self, taxonomy: &Taxonomy, errno: i32) -> Result<Arc<ExceptionClass>, TaxonomyError> {
        if let Some(class) = self.get(errno) {
            return Ok(class);
        }
        self.insert(taxonomy, errno, &format!("E{errno:03}"), false)
    }

    /// Exposes `errno` under `name`.
    ///
    /// When the number already has a class, that class is made reachable under
    /// the additional name instead of defining a second one.
    pub fn register_known(
        &self,
        taxonomy: &Taxonomy,
        errno: i32,
        name: &str,
    ) -> Result<Arc<ExceptionClass>, TaxonomyError> {
        self.insert(taxonomy, errno, name, true)
    }

    fn insert(
        &self,
        taxonomy: &Taxonomy,
        errno: i32,
        name: &str,
        alias_existing: bool,
    ) -> Result<Arc<ExceptionClass>, TaxonomyError> {
        let guard = self.inner.upgradable_read();

        if let Some(existing) = guard.by_errno.get(&errno) {
            let existing = Arc::clone(existing);
            if alias_existing && !guard.constants.contains_key(name) {
                let mut guard = RwLockUpgradableReadGuard::upgrade(guard);
                guard.constants.insert(name.to_owned(), Arc::clone(&existing));
            }
            return Ok(existing);
        }

        let mut guard = RwLockUpgradableReadGuard::upgrade(guard);
        let class = taxonomy.define_errno(&format!("Errno::{name}"), &self.base, errno)?;
        guard.by_errno.insert(errno, Arc::clone(&class));
        guard.constants.insert(name.to_owned(), Arc::clone(&class));
        drop(guard);

        if !alias_existing {
            tracing::debug!(errno, class = %class, "synthesized errno class");
        }
        Ok(class)
    }

    fn alias(&self, name: &str, class: &Arc<ExceptionClass>) {
        self.inner
            .write()
            .constants
            .entry(name.to_owned())
            .or_insert_with(|| Arc::clone(class));
    }

    /// Resolves an `Errno::<name>` constant.
    #[must_use]
    pub fn const_get(&self, name: &str) -> Option<Arc<ExceptionClass>> {
        self.inner.read().constants.get(name).cloned()
    }

    /// All `Errno` constants in registration order.
    #[must_use]
    pub fn constants(&self) -> Vec<(String, Arc<ExceptionClass>)> {
        self.inner
            .read()
            .constants
            .iter()
            .map(|(name, class)| (name.clone(), Arc::clone(class)))
            .collect()
    }

    /// Number of distinct error numbers with a class.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().by_errno.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for SystemErrorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemErrorRegistry")
            .field("entries", &self.len())
            .finish_non_exhaustive()
    }
}
