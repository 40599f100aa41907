//! Output formatting for command results
//!
//! Supports JSON (default), compact JSON, table and CSV output modes. Results
//! are converted to JSON values first, so any serializable model can be shown.

use std::collections::BTreeSet;
use std::io::Write;

use anyhow::Result;
use comfy_table::Table;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use serde::Serialize;
use serde_json::Value;

/// Output format for command results
#[derive(Debug, Clone, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON (default)
    #[default]
    Json,
    /// Compact JSON (one line per item)
    JsonCompact,
    /// Columnar table
    Table,
    /// Comma-separated values
    Csv,
}

/// Serialize `items` and write them in the given format.
pub fn write_items<T: Serialize>(
    writer: &mut dyn Write,
    items: &[T],
    format: &OutputFormat,
) -> Result<()> {
    let values = items
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()?;
    write_results(writer, &values, format)
}

/// Write a single item. JSON formats print the object itself, not a one-element array.
pub fn write_item<T: Serialize>(writer: &mut dyn Write, item: &T, format: &OutputFormat) -> Result<()> {
    let value = serde_json::to_value(item)?;
    match format {
        OutputFormat::Json => {
            writeln!(writer, "{}", serde_json::to_string_pretty(&value)?)?;
            Ok(())
        }
        _ => write_results(writer, std::slice::from_ref(&value), format),
    }
}

/// Format and write results to the given writer.
pub fn write_results(writer: &mut dyn Write, documents: &[Value], format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => write_json(writer, documents),
        OutputFormat::JsonCompact => write_json_compact(writer, documents),
        OutputFormat::Table => write_table(writer, documents),
        OutputFormat::Csv => write_csv(writer, documents),
    }
}

fn write_json(writer: &mut dyn Write, documents: &[Value]) -> Result<()> {
    let json = serde_json::to_string_pretty(documents)?;
    writeln!(writer, "{json}")?;
    Ok(())
}

fn write_json_compact(writer: &mut dyn Write, documents: &[Value]) -> Result<()> {
    for doc in documents {
        let json = serde_json::to_string(doc)?;
        writeln!(writer, "{json}")?;
    }
    Ok(())
}

fn write_table(writer: &mut dyn Write, documents: &[Value]) -> Result<()> {
    if documents.is_empty() {
        writeln!(writer, "(no results)")?;
        return Ok(());
    }

    let columns = collect_columns(documents);

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(columns.iter().collect::<Vec<_>>());

    for doc in documents {
        let row: Vec<String> = columns
            .iter()
            .map(|col| format_cell(doc.get(col.as_str())))
            .collect();
        table.add_row(row);
    }

    writeln!(writer, "{table}")?;
    Ok(())
}

fn write_csv(writer: &mut dyn Write, documents: &[Value]) -> Result<()> {
    if documents.is_empty() {
        return Ok(());
    }

    let columns = collect_columns(documents);

    writeln!(
        writer,
        "{}",
        columns
            .iter()
            .map(|c| csv_escape(c))
            .collect::<Vec<_>>()
            .join(",")
    )?;

    for doc in documents {
        let row: Vec<String> = columns
            .iter()
            .map(|col| csv_escape(&format_cell(doc.get(col.as_str()))))
            .collect();
        writeln!(writer, "{}", row.join(","))?;
    }

    Ok(())
}

/// Collect column names from all documents, preserving order from the first document.
fn collect_columns(documents: &[Value]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut columns = Vec::new();

    for doc in documents {
        if let Value::Object(map) = doc {
            for key in map.keys() {
                if seen.insert(key.clone()) {
                    columns.push(key.clone());
                }
            }
        }
    }

    columns
}

/// Format a JSON value for display in a table cell or CSV.
fn format_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(v @ Value::Array(arr)) => {
            if arr.len() <= 3 {
                serde_json::to_string(v).unwrap_or_default()
            } else {
                format!("[{} items]", arr.len())
            }
        }
        Some(v @ Value::Object(obj)) => {
            if obj.len() <= 3 {
                serde_json::to_string(v).unwrap_or_default()
            } else {
                format!("{{{} fields}}", obj.len())
            }
        }
    }
}

/// Escape a value for CSV output.
fn csv_escape(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct Row {
        name: &'static str,
        location: &'static str,
        #[serde(skip_serializing_if = "Option::is_none")]
        state: Option<&'static str>,
    }

    fn render(items: &[Row], format: OutputFormat) -> String {
        let mut buf = Vec::new();
        write_items(&mut buf, items, &format).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_format_cell_types() {
        assert_eq!(format_cell(Some(&json!("hello"))), "hello");
        assert_eq!(format_cell(Some(&json!(42))), "42");
        assert_eq!(format_cell(Some(&json!(true))), "true");
        assert_eq!(format_cell(Some(&Value::Null)), "");
        assert_eq!(format_cell(None), "");
    }

    #[test]
    fn test_format_cell_complex() {
        assert!(format_cell(Some(&json!(["10.0.0.0/16"]))).starts_with('['));
        assert_eq!(format_cell(Some(&json!([1, 2, 3, 4, 5]))), "[5 items]");
        assert!(format_cell(Some(&json!({"env": "prod"}))).starts_with('{'));
        assert_eq!(
            format_cell(Some(&json!({"a": 1, "b": 2, "c": 3, "d": 4}))),
            "{4 fields}"
        );
    }

    #[test]
    fn test_csv_escape() {
        assert_eq!(csv_escape("rg1"), "rg1");
        assert_eq!(csv_escape("a,b"), "\"a,b\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_columns_merge_across_items() {
        let rows = [
            Row { name: "rg1", location: "eastus", state: None },
            Row { name: "rg2", location: "westus", state: Some("Succeeded") },
        ];
        let csv = render(&rows, OutputFormat::Csv);
        let lines: Vec<&str> = csv.trim().lines().collect();
        assert_eq!(lines[0], "name,location,state");
        assert_eq!(lines[1], "rg1,eastus,");
        assert_eq!(lines[2], "rg2,westus,Succeeded");
    }

    #[test]
    fn test_json_compact_is_one_line_per_item() {
        let rows = [
            Row { name: "a", location: "x", state: None },
            Row { name: "b", location: "y", state: None },
        ];
        let out = render(&rows, OutputFormat::JsonCompact);
        assert_eq!(out.trim().lines().count(), 2);
        assert!(out.starts_with("{\"name\":\"a\""));
    }

    #[test]
    fn test_table() {
        let out = render(&[Row { name: "rg1", location: "eastus", state: None }], OutputFormat::Table);
        assert!(out.contains("location"));
        assert!(out.contains("eastus"));

        let empty: [Row; 0] = [];
        assert!(render(&empty, OutputFormat::Table).contains("no results"));
    }

    #[test]
    fn test_single_item_json_is_an_object() {
        let mut buf = Vec::new();
        write_item(&mut buf, &json!({"name": "vm1"}), &OutputFormat::Json).unwrap();
        let out = String::from_utf8(buf).unwrap();
        assert!(out.trim_start().starts_with('{'));
    }
}
