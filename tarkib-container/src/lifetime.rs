//! Service lifetimes.
//!
//! A lifetime determines how long a resolved instance lives:
//! - [`Lifetime::Singleton`]: one instance for the whole container
//! - [`Lifetime::Scoped`]: one instance per scope
//! - [`Lifetime::Transient`]: a new instance on every resolution
//!
//! # Ordering
//! Lifetimes are ordered by how long an instance lives:
//! `Singleton > Scoped > Transient`.

use std::fmt;
use std::str::FromStr;

/// Defines the lifetime of a service within the container.
///
/// # Examples
/// ```
/// use tarkib_container::lifetime::Lifetime;
///
/// assert!(Lifetime::Singleton > Lifetime::Scoped);
/// assert_eq!("scoped".parse::<Lifetime>().unwrap(), Lifetime::Scoped);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Lifetime {
    /// One instance shared across the entire container.
    ///
    /// Created on first resolve, lives until the container is dropped.
    Singleton,

    /// One instance per scope.
    ///
    /// Resolving from the root container uses the root scope.
    Scoped,

    /// New instance created on every resolve call. Never cached.
    #[default]
    Transient,
}

impl Lifetime {
    /// All lifetimes, longest-lived first.
    pub const ALL: [Lifetime; 3] = [Lifetime::Singleton, Lifetime::Scoped, Lifetime::Transient];

    /// Returns `true` if this lifetime caches instances.
    #[inline]
    pub fn is_cached(&self) -> bool {
        matches!(self, Lifetime::Singleton | Lifetime::Scoped)
    }

    /// Returns the canonical name of the lifetime.
    pub fn as_str(&self) -> &'static str {
        match self {
            Lifetime::Singleton => "Singleton",
            Lifetime::Scoped => "Scoped",
            Lifetime::Transient => "Transient",
        }
    }

    #[inline]
    fn ordering(&self) -> u8 {
        match self {
            Lifetime::Singleton => 2,
            Lifetime::Scoped => 1,
            Lifetime::Transient => 0,
        }
    }
}

impl PartialOrd for Lifetime {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Lifetime {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.ordering().cmp(&other.ordering())
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a token is not a lifetime name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown lifetime {token:?}, expected one of Singleton, Scoped, Transient")]
pub struct ParseLifetimeError {
    pub token: String,
}

impl FromStr for Lifetime {
    type Err = ParseLifetimeError;

    /// Case-insensitive match against the lifetime names; surrounding
    /// whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        Lifetime::ALL
            .into_iter()
            .find(|lifetime| lifetime.as_str().eq_ignore_ascii_case(token))
            .ok_or_else(|| ParseLifetimeError { token: s.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifetime_ordering() {
        assert!(Lifetime::Singleton > Lifetime::Scoped);
        assert!(Lifetime::Scoped > Lifetime::Transient);
        assert!(Lifetime::Singleton > Lifetime::Transient);
    }

    #[test]
    fn lifetime_is_cached() {
        assert!(Lifetime::Singleton.is_cached());
        assert!(Lifetime::Scoped.is_cached());
        assert!(!Lifetime::Transient.is_cached());
    }

    #[test]
    fn lifetime_display() {
        assert_eq!(format!("{}", Lifetime::Singleton), "Singleton");
        assert_eq!(format!("{}", Lifetime::Scoped), "Scoped");
        assert_eq!(format!("{}", Lifetime::Transient), "Transient");
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("SINGLETON".parse::<Lifetime>(), Ok(Lifetime::Singleton));
        assert_eq!(" scoped ".parse::<Lifetime>(), Ok(Lifetime::Scoped));
        assert_eq!("Transient".parse::<Lifetime>(), Ok(Lifetime::Transient));
    }

    #[test]
    fn parse_rejects_unknown() {
        let err = "forever".parse::<Lifetime>().unwrap_err();
        assert_eq!(err.token, "forever");
        assert!("".parse::<Lifetime>().is_err());
    }
}
