//! Error types for container operations.
//!
//! Resolution failures carry the full resolution path and
//! "did you mean?" suggestions, not just the missing type.

use std::fmt;

use tarkib_support::rendering::render_chain;

use crate::key::DependencyKey;

/// Main error type for container operations.
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    /// A required service has no registration.
    #[error("{}", .0)]
    Unsatisfiable(UnsatisfiableDependencyError),

    /// Default activation found no public constructor whose
    /// parameters the container can satisfy.
    #[error(
        "No suitable constructor found for {implementation}\n  Hint: Declare a public constructor, or register the type through the composer so it is compiled"
    )]
    NoSuitableConstructor { implementation: DependencyKey },

    /// A factory failed, or produced a value of the wrong type.
    #[error("Failed to construct {key}: {source}")]
    ConstructionFailed {
        key: DependencyKey,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ContainerError {
    /// Records that this failure happened while building `consumer`.
    ///
    /// Only resolution failures carry a path; other errors pass through.
    pub fn within(self, consumer: DependencyKey) -> Self {
        match self {
            ContainerError::Unsatisfiable(mut err) => {
                err.chain.insert(0, consumer);
                ContainerError::Unsatisfiable(err)
            }
            other => other,
        }
    }

    /// Shorthand for a type mismatch between a stored instance and the
    /// requested type.
    pub fn type_mismatch(key: DependencyKey, expected: &str) -> Self {
        ContainerError::ConstructionFailed {
            key,
            source: format!("Type mismatch: expected {expected}").into(),
        }
    }
}

/// Error when a required service cannot be resolved.
#[derive(Debug)]
pub struct UnsatisfiableDependencyError {
    /// The service that was requested
    pub requested: DependencyKey,
    /// Services being built when the lookup failed, outermost first
    pub chain: Vec<DependencyKey>,
    /// Registered services with similar names
    pub suggestions: Vec<String>,
}

impl UnsatisfiableDependencyError {
    /// The service that needed `requested`, if known.
    pub fn required_by(&self) -> Option<&DependencyKey> {
        self.chain.last()
    }
}

impl fmt::Display for UnsatisfiableDependencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unable to resolve service: {}", self.requested)?;

        if !self.chain.is_empty() {
            let path: Vec<String> = self
                .chain
                .iter()
                .chain(std::iter::once(&self.requested))
                .map(DependencyKey::simple_name)
                .collect();
            write!(f, "\n  Resolution path: {}", render_chain(&path))?;
        }

        if !self.suggestions.is_empty() {
            write!(f, "\n  Did you mean one of:")?;
            for suggestion in &self.suggestions {
                write!(f, "\n    - {suggestion}")?;
            }
        }

        write!(
            f,
            "\n  Hint: Did you forget to register {}?",
            self.requested.simple_name()
        )
    }
}

/// Convenient Result type for container operations.
pub type Result<T> = std::result::Result<T, ContainerError>;
