//! Rendering of matched items and of the field catalog.

use crate::fields::{FieldError, Registry};
use crate::item::ItemAccessor;
use comfy_table::{Cell, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use serde_json::{Map, Value};
use std::borrow::Cow;

const MAX_COLUMN_WIDTH: usize = 60;

fn truncate_value(s: &str, max_len: usize) -> Cow<'_, str> {
    if s.chars().count() <= max_len {
        Cow::Borrowed(s)
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        Cow::Owned(format!("{truncated}..."))
    }
}

fn styled_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header.iter().map(Cell::new));
    table
}

/// Display values of `fields` for one item, unknown fields being an error.
fn display_row(
    registry: &Registry,
    item: &dyn ItemAccessor,
    fields: &[String],
) -> Result<Vec<String>, FieldError> {
    fields
        .iter()
        .map(|name| {
            let field = registry
                .lookup(name)?
                .ok_or_else(|| FieldError::Unknown(name.clone()))?;
            let value = field.value(item)?;
            Ok(field.format_value(&value))
        })
        .collect()
}

/// A table of the selected items, one column per field.
pub fn format_items_text<I: ItemAccessor>(
    registry: &Registry,
    items: &[I],
    matched: &[usize],
    fields: &[String],
) -> Result<String, FieldError> {
    if matched.is_empty() {
        return Ok("(0 items)".to_string());
    }

    let header: Vec<&str> = fields.iter().map(String::as_str).collect();
    let mut table = styled_table(&header);
    for &idx in matched {
        let row = display_row(registry, &items[idx], fields)?;
        table.add_row(row.iter().map(|value| truncate_value(value, MAX_COLUMN_WIDTH)));
    }

    let count = matched.len();
    Ok(format!(
        "{table}\n({count} item{})",
        if count == 1 { "" } else { "s" }
    ))
}

/// The selected items as a JSON array of objects holding the raw field values.
pub fn format_items_json<I: ItemAccessor>(
    registry: &Registry,
    items: &[I],
    matched: &[usize],
    fields: &[String],
) -> Result<String, FieldError> {
    let mut rows = Vec::with_capacity(matched.len());
    for &idx in matched {
        let mut row = Map::new();
        for name in fields {
            let field = registry
                .lookup(name)?
                .ok_or_else(|| FieldError::Unknown(name.clone()))?;
            row.insert(name.clone(), field.value(&items[idx])?.to_json());
        }
        rows.push(Value::Object(row));
    }

    Ok(serde_json::to_string_pretty(&Value::Array(rows))
        .unwrap_or_else(|_| "Error formatting JSON".to_string()))
}

/// The field catalog: name, value type, cache policy, matcher and description.
pub fn format_field_list(registry: &Registry) -> String {
    let mut table = styled_table(&["Field", "Type", "Cache", "Matcher", "Description"]);
    for field in registry.descriptors() {
        table.add_row(vec![
            Cell::new(&field.name),
            Cell::new(field.value_type.label()),
            Cell::new(field.cache_policy.label()),
            Cell::new(field.matcher.map_or("-", |m| m.label())),
            Cell::new(&field.doc),
        ]);
    }
    table.to_string()
}
