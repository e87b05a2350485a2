//! Text rendering utilities for human-friendly diagnostics.
//!
//! Provides helpers to format resolution paths, type names,
//! and suggestions in error output.

/// Renders a resolution path as a readable string.
///
/// # Examples
/// ```
/// use tarkib_support::rendering::render_chain;
///
/// let chain = vec!["UserService", "UserRepo", "Database"];
/// assert_eq!(render_chain(&chain), "UserService → UserRepo → Database");
/// ```
pub fn render_chain(chain: &[impl AsRef<str>]) -> String {
    chain
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join(" → ")
}

/// Shortens a fully qualified type name for display.
///
/// ```
/// use tarkib_support::rendering::shorten_type_name;
///
/// let short = shorten_type_name("my_app::services::user::UserService");
/// assert_eq!(short, "UserService");
///
/// let short = shorten_type_name("alloc::sync::Arc<dyn my_app::traits::Logger>");
/// assert_eq!(short, "Arc<dyn Logger>");
/// ```
pub fn shorten_type_name(full_name: &str) -> String {
    // "my_app::services::UserService" → "UserService"
    // "Arc<dyn my_app::Logger>" → "Arc<dyn Logger>"
    let mut result = String::with_capacity(full_name.len());
    let mut chars = full_name.chars().peekable();
    let mut current_segment = String::new();

    while let Some(ch) = chars.next() {
        match ch {
            ':' if chars.peek() == Some(&':') => {
                chars.next();
                current_segment.clear();
            }
            '<' | '>' | ',' | ' ' => {
                result.push_str(&current_segment);
                result.push(ch);
                current_segment.clear();
            }
            _ => {
                current_segment.push(ch);
            }
        }
    }

    result.push_str(&current_segment);
    result
}

/// Strips the `dyn ` marker from a trait object type name.
///
/// Service contracts are trait objects, but configuration and the locator
/// refer to them by the trait's own path.
///
/// ```
/// use tarkib_support::rendering::qualified_type_name;
///
/// assert_eq!(qualified_type_name("dyn app::IPrinter"), "app::IPrinter");
/// assert_eq!(qualified_type_name("app::ConsolePrinter"), "app::ConsolePrinter");
/// ```
pub fn qualified_type_name(type_name: &str) -> &str {
    type_name.strip_prefix("dyn ").unwrap_or(type_name)
}

/// Returns the simple name of a type: its last path segment, without
/// the `dyn ` marker.
///
/// ```
/// use tarkib_support::rendering::simple_type_name;
///
/// assert_eq!(simple_type_name("dyn app::services::IPrinter"), "IPrinter");
/// assert_eq!(simple_type_name("app::Repo<app::User>"), "Repo<User>");
/// ```
pub fn simple_type_name(type_name: &str) -> String {
    shorten_type_name(qualified_type_name(type_name))
}

/// Generates "did you mean?" suggestions for a type name that could
/// not be resolved.
///
/// Compares the requested name against the available names and
/// returns at most `max_suggestions` close matches, best first.
pub fn suggest_similar(
    requested: &str,
    available: &[&str],
    max_suggestions: usize,
) -> Vec<String> {
    let requested_lower = requested.to_lowercase();
    let requested_short = simple_type_name(requested).to_lowercase();

    let mut scored: Vec<(&str, usize)> = available
        .iter()
        .filter_map(|&name| {
            let name_lower = name.to_lowercase();
            let name_short = simple_type_name(name).to_lowercase();

            if name_lower.contains(&requested_lower)
                || requested_lower.contains(&name_lower)
            {
                return Some((name, 100));
            }

            if name_short.contains(&requested_short)
                || requested_short.contains(&name_short)
            {
                return Some((name, 80));
            }

            let common = name_short
                .chars()
                .zip(requested_short.chars())
                .take_while(|(a, b)| a == b)
                .count();

            if common >= 3 {
                return Some((name, common * 10));
            }

            None
        })
        .collect();

    // stable: equal scores keep catalog order
    scored.sort_by(|a, b| b.1.cmp(&a.1));
    scored
        .into_iter()
        .take(max_suggestions)
        .map(|(name, _)| name.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_simple_chain() {
        let chain = vec!["A", "B", "C"];
        assert_eq!(render_chain(&chain), "A → B → C");
    }

    #[test]
    fn render_empty_chain() {
        let chain: Vec<&str> = vec![];
        assert_eq!(render_chain(&chain), "");
    }

    #[test]
    fn shorten_simple_path() {
        assert_eq!(
            shorten_type_name("my_app::services::UserService"),
            "UserService"
        );
    }

    #[test]
    fn shorten_with_generics() {
        assert_eq!(
            shorten_type_name("alloc::sync::Arc<dyn my_app::traits::Logger>"),
            "Arc<dyn Logger>"
        );
    }

    #[test]
    fn simple_name_of_trait_object() {
        assert_eq!(simple_type_name("dyn test_wpf::ICalculator"), "ICalculator");
        assert_eq!(simple_type_name("ICalculator"), "ICalculator");
    }

    #[test]
    fn qualified_name_keeps_path() {
        assert_eq!(qualified_type_name("dyn a::b::IPrinter"), "a::b::IPrinter");
    }

    #[test]
    fn suggest_similar_types() {
        let available = vec![
            "my_app::UserService",
            "my_app::UserRepository",
            "my_app::Logger",
            "my_app::Database",
        ];

        let suggestions = suggest_similar("UserServise", &available, 3);
        assert!(!suggestions.is_empty());
        assert!(suggestions[0].contains("UserService"));
    }

    #[test]
    fn suggest_no_match() {
        let available = vec!["my_app::Database"];
        let suggestions = suggest_similar("XyzAbcDef", &available, 3);
        assert!(suggestions.is_empty());
    }
}
