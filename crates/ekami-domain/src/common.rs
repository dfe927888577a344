//! Shared traits and helpers for domain records.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Exposes a stable identifier for records kept in a collection.
pub trait Identifiable {
    fn id(&self) -> Uuid;
}

/// Converts an entity into a user-facing display label.
pub trait Displayable {
    fn display_label(&self) -> String;
}

/// Records that carry caller-maintained creation and update timestamps.
pub trait Timestamped {
    fn created_at(&self) -> DateTime<Utc>;
    fn updated_at(&self) -> DateTime<Utc>;

    /// Stamps the record as modified at `now`.
    fn touch(&mut self, now: DateTime<Utc>);
}

/// Returns the first eight hex characters of an identifier for compact listings.
pub fn short_id(id: Uuid) -> String {
    let mut short = id.simple().to_string();
    short.truncate(8);
    short
}

/// Trims the value and maps blank strings to `None`.
pub fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_id_keeps_eight_characters() {
        let id = Uuid::parse_str("0f1e2d3c-4b5a-6978-8796-a5b4c3d2e1f0").unwrap();
        assert_eq!(short_id(id), "0f1e2d3c");
    }

    #[test]
    fn non_blank_discards_whitespace() {
        assert_eq!(non_blank("   "), None);
        assert_eq!(non_blank("  Civic "), Some("Civic".to_string()));
    }
}
