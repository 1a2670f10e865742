//! String formatting utilities.
//!
//! Provides functions for shortening identifiers in log lines and for
//! turning raw status values into display labels.

/// Truncates an identifier for display purposes.
///
/// Shows only the first 8 characters followed by ".." for longer strings.
pub fn truncate_id(id: &str) -> String {
	match id.char_indices().nth(8) {
		Some((cut, _)) => format!("{}..", &id[..cut]),
		None => id.to_string(),
	}
}

/// Converts a raw status value into its display label.
///
/// Underscores become spaces and the result is uppercased, so
/// `picked_up` is shown as `PICKED UP`.
pub fn status_label(status: &str) -> String {
	status.replace('_', " ").to_uppercase()
}
