//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Formats a count with a pluralized noun.
///
/// Usage in templates: `{{ cart.item_count|count_label("item") }}` renders
/// "1 item" or "3 items".
#[askama::filter_fn]
pub fn count_label(
    count: impl Display,
    _env: &dyn askama::Values,
    noun: &str,
) -> askama::Result<String> {
    Ok(pluralize(&count.to_string(), noun))
}

fn pluralize(count: &str, noun: &str) -> String {
    let suffix = if count == "1" { "" } else { "s" };
    format!("{count} {noun}{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pluralize_item_counts() {
        assert_eq!(pluralize("0", "item"), "0 items");
        assert_eq!(pluralize("1", "item"), "1 item");
        assert_eq!(pluralize("7", "item"), "7 items");
    }
}
