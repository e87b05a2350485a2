//! Error types for service composition.
//!
//! Everything except [`CompositionError::Container`] is raised while
//! composing and aborts the declaration source being processed.

use tarkib_container::{ContainerError, DependencyKey};

/// Main error type for composition operations.
#[derive(Debug, thiserror::Error)]
pub enum CompositionError {
    /// A declaration names a service type that is not defined in the catalog.
    #[error(
        "Service type {name:?} not found in catalog {catalog:?}{}",
        render_suggestions(.suggestions)
    )]
    UnresolvedServiceType {
        name: String,
        catalog: String,
        suggestions: Vec<String>,
    },

    /// A declaration names an implementation type that is not defined in the catalog.
    #[error(
        "Implementation type {name:?} not found in catalog {catalog:?}{}",
        render_suggestions(.suggestions)
    )]
    UnresolvedImplementationType {
        name: String,
        catalog: String,
        suggestions: Vec<String>,
    },

    /// The implementation cannot be exposed as the service.
    #[error(
        "{implementation} does not implement service {service}\n  Hint: Declare the contract with .implements::<dyn {}>(|this| this)",
        .service.simple_name()
    )]
    IncompatibleImplementation {
        service: DependencyKey,
        implementation: DependencyKey,
    },

    /// The type to build declares no constructor at all.
    #[error("{implementation} declares no constructor\n  Hint: Add one with .constructor(..)")]
    NoAccessibleConstructor { implementation: DependencyKey },

    /// The locator was used before composition configured it.
    #[error("Service locator is not configured\n  Hint: Call .add_service_locator() before building the composition")]
    LocatorUnconfigured,

    /// The locator can only be configured once.
    #[error("Service locator is already configured")]
    LocatorAlreadyConfigured,

    /// The configuration source could not be read.
    #[error("Failed to load service configuration: {0}")]
    Configuration(#[from] figment::Error),

    /// Resolution through the container failed.
    #[error(transparent)]
    Container(#[from] ContainerError),
}

fn render_suggestions(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        return String::new();
    }

    let mut rendered = String::from("\n  Did you mean one of:");
    for suggestion in suggestions {
        rendered.push_str("\n    - ");
        rendered.push_str(suggestion);
    }
    rendered
}

/// Convenient Result type for composition operations.
pub type Result<T> = std::result::Result<T, CompositionError>;
