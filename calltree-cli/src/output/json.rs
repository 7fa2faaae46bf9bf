//! JSON formatting for reports and example streams.

use serde::Serialize;

/// JSON output formatter
pub struct JsonOutput;

impl JsonOutput {
    /// Pretty-printed report.
    pub fn format<T: Serialize + ?Sized>(data: &T) -> String {
        serde_json::to_string_pretty(data)
            .unwrap_or_else(|e| format!("{{\n  \"error\": \"{}\"\n}}", e))
    }

    /// One JSON object per line, items that fail to serialize are skipped.
    pub fn format_line<T: Serialize>(item: &T) -> Option<String> {
        serde_json::to_string(item).ok()
    }
}
