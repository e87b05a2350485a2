//! Textual tokens to types and lifetimes.

use std::sync::Arc;

use tracing::warn;

use tarkib_container::Lifetime;
use tarkib_support::rendering::{qualified_type_name, suggest_similar};

use crate::catalog::TypeCatalog;
use crate::descriptor::TypeDescriptor;

/// Finds a type by name.
///
/// Tries an exact path-qualified match first, then the first type in
/// catalog order whose simple name equals `name` (case-sensitive).
pub fn resolve_type(name: &str, catalog: &TypeCatalog) -> Option<Arc<TypeDescriptor>> {
    resolve_qualified(name, catalog).or_else(|| {
        catalog
            .defined_types()
            .iter()
            .find(|descriptor| descriptor.simple_name() == name)
            .cloned()
    })
}

/// Finds a type by its path-qualified name only.
///
/// A leading `dyn ` is ignored, so `std::any::type_name` output works.
pub fn resolve_qualified(name: &str, catalog: &TypeCatalog) -> Option<Arc<TypeDescriptor>> {
    catalog.find_qualified(qualified_type_name(name.trim())).cloned()
}

/// Up to three names in `catalog` that look like `name`.
pub(crate) fn type_suggestions(name: &str, catalog: &TypeCatalog) -> Vec<String> {
    let simple: Vec<&str> = catalog.defined_types().iter().map(|t| t.simple_name()).collect();
    let mut suggestions = suggest_similar(name, &simple, 3);
    if suggestions.is_empty() {
        suggestions = suggest_similar(name, &catalog.qualified_names(), 3);
    }
    suggestions
}

/// Parses a lifetime token; anything missing or unknown is transient.
pub fn parse_lifetime(token: Option<&str>) -> Lifetime {
    let Some(token) = token else {
        return Lifetime::Transient;
    };

    token.parse().unwrap_or_else(|err| {
        warn!(error = %err, "Unknown lifetime, defaulting to transient");
        Lifetime::Transient
    })
}
