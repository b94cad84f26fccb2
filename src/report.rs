use std::fmt::Write;

use log::warn;
use serde_json::Value;

use crate::schema::ID_FIELD;
use crate::service::Document;
use crate::skills::SkillTestDescriptor;

const MAX_LIST_ITEMS: usize = 5;
const MAX_SCALAR_CHARS: usize = 100;

/// Renders fetched documents for a terminal or log pane. `id` and null values are skipped,
/// lists show their first five items, long scalars are cut at 100 characters.
pub fn format_results(skill_name: &str, documents: &[Document]) -> String {
    let mut out = format!("\n=== Results for {} ===\n", skill_name);
    for (index, document) in documents.iter().enumerate() {
        let _ = writeln!(out, "\nDocument {}:", index + 1);
        for (key, value) in document {
            if key == ID_FIELD || value.is_null() {
                continue;
            }
            match value {
                Value::Array(items) => {
                    let shown: Vec<String> = items.iter().take(MAX_LIST_ITEMS).map(display).collect();
                    let _ = write!(out, "  {}: {}", key, shown.join(", "));
                    if items.len() > MAX_LIST_ITEMS {
                        let _ = write!(out, "... ({} total)", items.len());
                    }
                }
                other => {
                    let text = display(other);
                    let _ = write!(out, "  {}: {}", key, text.chars().take(MAX_SCALAR_CHARS).collect::<String>());
                    if text.chars().count() > MAX_SCALAR_CHARS {
                        out.push_str("...");
                    }
                }
            }
            out.push('\n');
        }
    }
    out
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// True when there is at least one document and every generic field the skill maps into
/// is present in each of them.
pub fn validate_results(descriptor: &SkillTestDescriptor, documents: &[Document]) -> bool {
    if documents.is_empty() {
        warn!("{} returned no documents", descriptor.name());
        return false;
    }
    let targets = descriptor.targets();
    for document in documents {
        for field in &targets {
            if !document.contains_key(*field) {
                warn!("Expected output field '{}' not found in results", field);
                return false;
            }
        }
    }
    true
}
