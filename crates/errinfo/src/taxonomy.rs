//! The exception class tree.
//!
//! A fixed set of builtin classes is registered once at startup, in dependency
//! order, into a [`Taxonomy`] arena. After that the tree only grows: user code may
//! define further subclasses and the errno registry adds one `Errno::*` leaf per
//! error number it encounters. Nodes are never removed or mutated.

use std::{
    fmt,
    sync::{Arc, OnceLock},
};

use ahash::RandomState;
use indexmap::IndexMap;
use parking_lot::{RwLock, RwLockUpgradableReadGuard};
use strum::{Display, EnumString, IntoStaticStr};

/// Builtin exception classes.
///
/// Uses strum derives for `Display`, `FromStr` and `Into<&'static str>`. The string
/// form is the class's full display name (e.g. `fatal`, `Encoding::CompatibilityError`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
pub enum BuiltinClass {
    /// Root of the tree.
    Exception,
    SystemExit,
    /// Uncatchable, reportable failure.
    #[strum(serialize = "fatal")]
    Fatal,
    SignalException,
    Interrupt,

    // --- StandardError hierarchy ---
    StandardError,
    TypeError,
    ArgumentError,
    IndexError,
    /// Subclass of IndexError.
    KeyError,
    RangeError,

    // --- ScriptError hierarchy ---
    ScriptError,
    SyntaxError,
    LoadError,
    NotImplementedError,

    // --- NameError hierarchy ---
    NameError,
    /// Subclass of NameError carrying the failed call's arguments.
    NoMethodError,

    RuntimeError,
    SecurityError,
    NoMemoryError,
    EncodingError,
    #[strum(serialize = "Encoding::CompatibilityError")]
    EncodingCompatibilityError,

    /// Parent of every `Errno::*` class.
    SystemCallError,
}

impl BuiltinClass {
    /// All builtin classes in registration order. A class always follows its parent.
    pub const ALL: [Self; 23] = [
        Self::Exception,
        Self::SystemExit,
        Self::Fatal,
        Self::SignalException,
        Self::Interrupt,
        Self::StandardError,
        Self::TypeError,
        Self::ArgumentError,
        Self::IndexError,
        Self::KeyError,
        Self::RangeError,
        Self::ScriptError,
        Self::SyntaxError,
        Self::LoadError,
        Self::NotImplementedError,
        Self::NameError,
        Self::NoMethodError,
        Self::RuntimeError,
        Self::SecurityError,
        Self::NoMemoryError,
        Self::EncodingError,
        Self::EncodingCompatibilityError,
        Self::SystemCallError,
    ];

    /// Returns the declared parent, `None` only for the root.
    #[must_use]
    pub fn parent(self) -> Option<Self> {
        let parent = match self {
            Self::Exception => return None,
            Self::SystemExit
            | Self::Fatal
            | Self::SignalException
            | Self::StandardError
            | Self::ScriptError
            | Self::SecurityError
            | Self::NoMemoryError => Self::Exception,
            Self::Interrupt => Self::SignalException,
            Self::TypeError
            | Self::ArgumentError
            | Self::IndexError
            | Self::RangeError
            | Self::NameError
            | Self::RuntimeError
            | Self::EncodingError
            | Self::SystemCallError => Self::StandardError,
            Self::KeyError => Self::IndexError,
            Self::SyntaxError | Self::LoadError | Self::NotImplementedError => Self::ScriptError,
            Self::NoMethodError => Self::NameError,
            Self::EncodingCompatibilityError => Self::EncodingError,
        };
        Some(parent)
    }

    /// Attributes this class adds on top of those it inherits.
    #[must_use]
    pub fn extra_fields(self) -> &'static [&'static str] {
        match self {
            Self::SystemExit => &["status"],
            Self::NameError => &["name"],
            Self::NoMethodError => &["args"],
            Self::SystemCallError => &["errno"],
            _ => &[],
        }
    }

    /// The specialized constructor this class installs, if any.
    fn own_initializer(self) -> Option<Initializer> {
        match self {
            Self::Exception => Some(Initializer::Generic),
            Self::SystemExit => Some(Initializer::SystemExit),
            Self::NameError => Some(Initializer::NameError),
            Self::NoMethodError => Some(Initializer::NoMethodError),
            Self::SystemCallError => Some(Initializer::SystemCallError),
            _ => None,
        }
    }

    /// Index of this class in [`Self::ALL`].
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Which constructor builds instances of a class. Inherited by subclasses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Initializer {
    /// Optional message.
    Generic,
    /// Optional leading integer status, then the generic arguments.
    SystemExit,
    /// Trailing member name, then the generic arguments.
    NameError,
    /// Trailing call arguments, then the name error arguments.
    NoMethodError,
    /// Message and errno, resolved through the errno registry.
    SystemCallError,
}

/// Index of a class in its [`Taxonomy`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(u32);

impl ClassId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A node of the exception tree.
///
/// Classes compare by identity: two handles are equal only if they refer to the
/// same registered node.
#[derive(Debug)]
pub struct ExceptionClass {
    id: ClassId,
    name: String,
    parent: Option<Arc<Self>>,
    builtin: Option<BuiltinClass>,
    fields: &'static [&'static str],
    initializer: Initializer,
    /// The `Errno` class constant, set at most once.
    errno: OnceLock<i32>,
}

impl ExceptionClass {
    #[must_use]
    pub fn id(&self) -> ClassId {
        self.id
    }

    /// Full display name, including any namespace (`Errno::ENOENT`).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn parent(&self) -> Option<&Arc<Self>> {
        self.parent.as_ref()
    }

    /// The builtin this node was registered for, if any.
    #[must_use]
    pub fn builtin(&self) -> Option<BuiltinClass> {
        self.builtin
    }

    #[must_use]
    pub fn initializer(&self) -> Initializer {
        self.initializer
    }

    /// Iterates over this class and its ancestors, nearest first.
    pub fn ancestors(&self) -> impl Iterator<Item = &Self> {
        std::iter::successors(Some(self), |class| class.parent.as_deref())
    }

    /// Returns true if `self` is `other` or one of its descendants.
    #[must_use]
    pub fn is_kind_of(&self, other: &Self) -> bool {
        self.ancestors().any(|class| class == other)
    }

    /// Returns true if `self` is the given builtin or one of its descendants.
    #[must_use]
    pub fn is_kind_of_builtin(&self, builtin: BuiltinClass) -> bool {
        self.ancestors().any(|class| class.builtin == Some(builtin))
    }

    /// All extra attribute names, inherited ones first.
    #[must_use]
    pub fn field_names(&self) -> Vec<&'static str> {
        let mut chain: Vec<&Self> = self.ancestors().collect();
        chain.reverse();
        chain.into_iter().flat_map(|class| class.fields.iter().copied()).collect()
    }

    /// The nearest `Errno` constant along the ancestor chain.
    #[must_use]
    pub fn errno_constant(&self) -> Option<i32> {
        self.ancestors().find_map(|class| class.errno.get().copied())
    }
}

impl PartialEq for ExceptionClass {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}

impl Eq for ExceptionClass {}

impl fmt::Display for ExceptionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Structural failure while registering a class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaxonomyError {
    /// The declared parent has not been registered yet.
    MissingParent { name: String, parent: String },
    /// A class of this name exists with a different parent.
    SuperclassMismatch { name: String },
    /// The class already carries a different `Errno` constant.
    ErrnoMismatch { name: String, existing: i32 },
    /// The arena cannot index any more classes.
    TooManyClasses,
}

impl fmt::Display for TaxonomyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingParent { name, parent } => {
                write!(f, "cannot define {name}: parent class {parent} is not defined")
            }
            Self::SuperclassMismatch { name } => write!(f, "superclass mismatch for class {name}"),
            Self::ErrnoMismatch { name, existing } => {
                write!(f, "{name} already has Errno constant {existing}")
            }
            Self::TooManyClasses => f.write_str("exception class table is full"),
        }
    }
}

impl std::error::Error for TaxonomyError {}

/// Description of a class about to be inserted.
struct ClassSpec<'a> {
    name: &'a str,
    parent: Option<Arc<ExceptionClass>>,
    builtin: Option<BuiltinClass>,
    fields: &'static [&'static str],
    initializer: Option<Initializer>,
    errno: Option<i32>,
}

#[derive(Default)]
struct ClassTable {
    classes: Vec<Arc<ExceptionClass>>,
    by_name: IndexMap<String, ClassId, RandomState>,
}

/// Append-only arena of exception classes, indexed by id and by full name.
#[derive(Default)]
pub struct Taxonomy {
    inner: RwLock<ClassTable>,
}

impl Taxonomy {
    /// Creates an empty taxonomy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a taxonomy holding every [`BuiltinClass`], registered in order.
    ///
    /// Builtin `i` gets `ClassId(i)`, so [`Self::builtin`] is an index lookup.
    pub fn with_builtins() -> Result<Self, TaxonomyError> {
        let taxonomy = Self::new();
        for builtin in BuiltinClass::ALL {
            taxonomy.define_builtin(builtin)?;
        }
        Ok(taxonomy)
    }

    fn define_builtin(&self, builtin: BuiltinClass) -> Result<Arc<ExceptionClass>, TaxonomyError> {
        let name: &'static str = builtin.into();
        let parent = match builtin.parent() {
            Some(parent) => Some(self.require(name, parent.into())?),
            None => None,
        };
        self.insert(ClassSpec {
            name,
            parent,
            builtin: Some(builtin),
            fields: builtin.extra_fields(),
            initializer: builtin.own_initializer(),
            errno: None,
        })
    }

    fn require(&self, name: &str, parent: &str) -> Result<Arc<ExceptionClass>, TaxonomyError> {
        self.get(parent).ok_or_else(|| TaxonomyError::MissingParent {
            name: name.to_owned(),
            parent: parent.to_owned(),
        })
    }

    /// Registers `name` under `parent`, or returns the existing class of that name.
    pub fn define(&self, name: &str, parent: &Arc<ExceptionClass>) -> Result<Arc<ExceptionClass>, TaxonomyError> {
        self.insert(ClassSpec {
            name,
            parent: Some(Arc::clone(parent)),
            builtin: None,
            fields: &[],
            initializer: None,
            errno: None,
        })
    }

    /// Like [`Self::define`], naming the parent instead of passing it.
    pub fn define_by_name(&self, name: &str, parent: &str) -> Result<Arc<ExceptionClass>, TaxonomyError> {
        let parent = self.require(name, parent)?;
        self.define(name, &parent)
    }

    /// Registers an errno leaf carrying `errno` as its class constant.
    ///
    /// A class already defined under `name` with the same parent gets the
    /// constant attached if it has none yet.
    pub(crate) fn define_errno(
        &self,
        name: &str,
        parent: &Arc<ExceptionClass>,
        errno: i32,
    ) -> Result<Arc<ExceptionClass>, TaxonomyError> {
        self.insert(ClassSpec {
            name,
            parent: Some(Arc::clone(parent)),
            builtin: None,
            fields: &[],
            initializer: None,
            errno: Some(errno),
        })
    }

    fn insert(&self, spec: ClassSpec<'_>) -> Result<Arc<ExceptionClass>, TaxonomyError> {
        let guard = self.inner.upgradable_read();

        if let Some(id) = guard.by_name.get(spec.name) {
            let existing = &guard.classes[id.index()];
            let same_parent = match (existing.parent(), spec.parent.as_ref()) {
                (Some(a), Some(b)) => a == b,
                (None, None) => true,
                _ => false,
            };
            if !same_parent {
                return Err(TaxonomyError::SuperclassMismatch {
                    name: spec.name.to_owned(),
                });
            }
            if let Some(errno) = spec.errno {
                let existing_errno = *existing.errno.get_or_init(|| errno);
                if existing_errno != errno {
                    return Err(TaxonomyError::ErrnoMismatch {
                        name: spec.name.to_owned(),
                        existing: existing_errno,
                    });
                }
            }
            return Ok(Arc::clone(existing));
        }

        let mut guard = RwLockUpgradableReadGuard::upgrade(guard);
        let id = ClassId(u32::try_from(guard.classes.len()).map_err(|_| TaxonomyError::TooManyClasses)?);
        let initializer = spec
            .initializer
            .or_else(|| spec.parent.as_ref().map(|parent| parent.initializer))
            .unwrap_or(Initializer::Generic);
        let class = Arc::new(ExceptionClass {
            id,
            name: spec.name.to_owned(),
            parent: spec.parent,
            builtin: spec.builtin,
            fields: spec.fields,
            initializer,
            errno: spec.errno.map(OnceLock::from).unwrap_or_default(),
        });
        guard.classes.push(Arc::clone(&class));
        guard.by_name.insert(spec.name.to_owned(), id);
        drop(guard);

        tracing::trace!(class = %class.name, id = id.0, "registered exception class");
        Ok(class)
    }

    /// Looks up a class by its full name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<ExceptionClass>> {
        let guard = self.inner.read();
        guard.by_name.get(name).map(|id| Arc::clone(&guard.classes[id.index()]))
    }

    /// Looks up a class by id.
    #[must_use]
    pub fn by_id(&self, id: ClassId) -> Option<Arc<ExceptionClass>> {
        self.inner.read().classes.get(id.index()).cloned()
    }

    /// Returns the node of a builtin class, if this taxonomy was built with them.
    #[must_use]
    #[expect(clippy::cast_possible_truncation, reason = "there are fewer than u32::MAX builtins")]
    pub fn builtin(&self, builtin: BuiltinClass) -> Option<Arc<ExceptionClass>> {
        self.by_id(ClassId(builtin.index() as u32))
            .filter(|class| class.builtin == Some(builtin))
    }

    /// Number of registered classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().classes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Names of all registered classes in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.inner.read().by_name.keys().cloned().collect()
    }
}

impl fmt::Debug for Taxonomy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Taxonomy").field("classes", &self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_register_in_dependency_order() {
        let taxonomy = Taxonomy::with_builtins().unwrap();
        assert_eq!(taxonomy.len(), BuiltinClass::ALL.len());
        for builtin in BuiltinClass::ALL {
            let class = taxonomy.builtin(builtin).unwrap();
            assert_eq!(class.name(), builtin.to_string());
            assert_eq!(class.builtin(), Some(builtin));
            match builtin.parent() {
                Some(parent) => assert_eq!(class.parent().unwrap().builtin(), Some(parent)),
                None => assert!(class.parent().is_none()),
            }
        }
    }

    #[test]
    fn every_chain_ends_at_the_root() {
        let taxonomy = Taxonomy::with_builtins().unwrap();
        let root = taxonomy.builtin(BuiltinClass::Exception).unwrap();
        for builtin in BuiltinClass::ALL {
            let class = taxonomy.builtin(builtin).unwrap();
            assert_eq!(class.ancestors().last().unwrap(), &*root);
        }
    }

    #[test]
    fn child_before_parent_is_rejected() {
        let taxonomy = Taxonomy::new();
        let err = taxonomy.define_builtin(BuiltinClass::TypeError).unwrap_err();
        assert_eq!(
            err,
            TaxonomyError::MissingParent {
                name: "TypeError".to_owned(),
                parent: "StandardError".to_owned(),
            }
        );
        assert!(taxonomy.is_empty());
    }

    #[test]
    fn redefinition_is_idempotent() {
        let taxonomy = Taxonomy::with_builtins().unwrap();
        let first = taxonomy.define_by_name("MyError", "StandardError").unwrap();
        let second = taxonomy.define_by_name("MyError", "StandardError").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(taxonomy.len(), BuiltinClass::ALL.len() + 1);
    }

    #[test]
    fn redefinition_with_other_parent_fails() {
        let taxonomy = Taxonomy::with_builtins().unwrap();
        taxonomy.define_by_name("MyError", "StandardError").unwrap();
        let err = taxonomy.define_by_name("MyError", "ScriptError").unwrap_err();
        assert_eq!(err.to_string(), "superclass mismatch for class MyError");
    }

    #[test]
    fn errno_constant_attaches_to_a_predefined_class() {
        let taxonomy = Taxonomy::with_builtins().unwrap();
        let base = taxonomy.builtin(BuiltinClass::SystemCallError).unwrap();
        let custom = taxonomy.define("Errno::E4321", &base).unwrap();
        assert_eq!(custom.errno_constant(), None);

        let leaf = taxonomy.define_errno("Errno::E4321", &base, 4321).unwrap();
        assert!(Arc::ptr_eq(&custom, &leaf));
        assert_eq!(custom.errno_constant(), Some(4321));
        assert!(taxonomy.define_errno("Errno::E4321", &base, 4321).is_ok());

        let err = taxonomy.define_errno("Errno::E4321", &base, 4322).unwrap_err();
        assert_eq!(
            err,
            TaxonomyError::ErrnoMismatch {
                name: "Errno::E4321".to_owned(),
                existing: 4321,
            }
        );
        assert_eq!(custom.errno_constant(), Some(4321));
    }

    #[test]
    fn initializers_and_fields_are_inherited() {
        let taxonomy = Taxonomy::with_builtins().unwrap();
        let custom = taxonomy.define_by_name("MissingThing", "NoMethodError").unwrap();
        assert_eq!(custom.initializer(), Initializer::NoMethodError);
        assert_eq!(custom.field_names(), vec!["name", "args"]);
        let key_error = taxonomy.builtin(BuiltinClass::KeyError).unwrap();
        assert_eq!(key_error.initializer(), Initializer::Generic);
        assert!(key_error.is_kind_of_builtin(BuiltinClass::IndexError));
        assert!(!key_error.is_kind_of_builtin(BuiltinClass::ScriptError));
    }

    #[test]
    fn builtin_names_round_trip_through_strum() {
        assert_eq!("fatal".parse::<BuiltinClass>().unwrap(), BuiltinClass::Fatal);
        let name: &'static str = BuiltinClass::EncodingCompatibilityError.into();
        assert_eq!(name, "Encoding::CompatibilityError");
    }
}
