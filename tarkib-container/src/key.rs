//! Service type identification keys.
//!
//! [`DependencyKey`] identifies a service type or an implementation type.
//! It pairs the [`TypeId`] with the compiler-provided type name so that
//! registrations can be reported, indexed by name and resolved from text.

use std::any::{TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};

use tarkib_support::rendering::{qualified_type_name, simple_type_name};

/// Uniquely identifies a type known to the container.
///
/// Service contracts are usually trait objects (`dyn Printer`), while
/// implementations are concrete types. Both are keyed the same way.
///
/// # Examples
/// ```
/// use tarkib_container::key::DependencyKey;
///
/// trait Printer {}
///
/// let key = DependencyKey::of::<dyn Printer>();
/// assert_eq!(key.simple_name(), "Printer");
/// assert!(!key.qualified_name().starts_with("dyn "));
/// ```
#[derive(Clone, Copy)]
pub struct DependencyKey {
    type_id: TypeId,
    type_name: &'static str,
}

impl DependencyKey {
    /// Creates a key for type `T`.
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
        }
    }

    /// Creates a key from a raw [`TypeId`] and type name.
    ///
    /// Prefer [`DependencyKey::of`] when possible.
    #[inline]
    pub fn from_raw(type_id: TypeId, type_name: &'static str) -> Self {
        Self { type_id, type_name }
    }

    /// Returns the [`TypeId`] of this type.
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the type name exactly as reported by the compiler.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns the path-qualified name without the `dyn ` marker,
    /// e.g. `app::services::Printer`.
    #[inline]
    pub fn qualified_name(&self) -> &'static str {
        qualified_type_name(self.type_name)
    }

    /// Returns the last path segment, e.g. `Printer`.
    pub fn simple_name(&self) -> String {
        simple_type_name(self.type_name)
    }
}

impl PartialEq for DependencyKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for DependencyKey {}

impl Hash for DependencyKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for DependencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DependencyKey({})", self.type_name)
    }
}

impl fmt::Display for DependencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.qualified_name())
    }
}
