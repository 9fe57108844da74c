//! Output formatting for CLI results

use chrono::Utc;
use serde::Serialize;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Rows},
};

/// Format rows as a rounded table
pub fn format_table<T: Tabled>(data: &[T]) -> String {
    if data.is_empty() {
        return "No results found.".to_string();
    }

    let mut table = Table::new(data);
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()));

    table.to_string()
}

/// Envelope for JSON output with response metadata
#[derive(Debug, Serialize)]
struct JsonEnvelope<'a, T: Serialize> {
    data: &'a T,
    meta: Metadata,
}

#[derive(Debug, Serialize)]
struct Metadata {
    timestamp: String,
    version: String,
}

/// Format data as pretty-printed JSON wrapped in the standard envelope
pub fn format_json<T: Serialize + ?Sized>(data: &T) -> Result<String, serde_json::Error> {
    let envelope = JsonEnvelope {
        data: &data,
        meta: Metadata {
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
    };
    serde_json::to_string_pretty(&envelope)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Tabled, Serialize)]
    struct TestRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "NAME")]
        name: String,
    }

    fn row(id: &str, name: &str) -> TestRow {
        TestRow {
            id: id.to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn test_format_table_empty() {
        let items: Vec<TestRow> = vec![];
        assert_eq!(format_table(&items), "No results found.");
    }

    #[test]
    fn test_format_table_rows_and_style() {
        let items = vec![row("c1", "root"), row("c2", "dev")];
        let result = format_table(&items);

        assert!(result.contains("ID"));
        assert!(result.contains("root"));
        assert!(result.contains("dev"));
        // Rounded style corners
        assert!(result.contains("╭"));
        assert!(result.contains("╰"));
    }

    #[test]
    fn test_format_json_envelope() {
        let items = vec![row("c1", "root")];
        let result = format_json(&items).unwrap();

        assert!(result.contains("\"data\""));
        assert!(result.contains("\"meta\""));
        assert!(result.contains("\"id\": \"c1\""));
        assert!(result.contains("\"timestamp\""));
        assert!(result.contains("\"version\""));
    }
}
