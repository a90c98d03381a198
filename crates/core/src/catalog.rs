//! Catalog parsing
//!
//! The item catalog is a JSON array of `{"name": ..., "source": ...}`
//! objects, loaded once before scheduling begins. Entries that are
//! malformed — missing fields, non-string fields, an empty source
//! locator — are skipped with a warning rather than failing the whole
//! load; a sparse list beats no list.

use crate::error::CatalogError;
use serde::{Deserialize, Serialize};

/// One well-formed catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Display label for the row
    pub name: String,

    /// Address stage 1 fetches raw content from
    pub source: String,
}

/// Parse a catalog document into its well-formed entries
///
/// Returns an error only when the document as a whole is unusable
/// (not JSON, or not an array). Malformed individual entries are
/// dropped silently, preserving the order of the rest.
///
/// # Example
///
/// ```
/// use filmstrip_core::parse_catalog;
///
/// let entries = parse_catalog(
///     r#"[
///         {"name": "Sunset", "source": "photos/sunset.png"},
///         {"name": "Broken"},
///         {"name": "Harbor", "source": "photos/harbor.png"}
///     ]"#,
/// )
/// .unwrap();
///
/// assert_eq!(entries.len(), 2);
/// assert_eq!(entries[0].name, "Sunset");
/// assert_eq!(entries[1].name, "Harbor");
/// ```
pub fn parse_catalog(json: &str) -> Result<Vec<CatalogEntry>, CatalogError> {
    let document: serde_json::Value = serde_json::from_str(json)?;
    let raw_entries = document.as_array().ok_or(CatalogError::NotAnArray)?;

    let mut entries = Vec::with_capacity(raw_entries.len());
    for (index, raw) in raw_entries.iter().enumerate() {
        match entry_from_value(raw) {
            Some(entry) => entries.push(entry),
            None => {
                log::warn!("skipping malformed catalog entry at index {}", index);
            }
        }
    }

    log::info!(
        "catalog loaded: {} of {} entries usable",
        entries.len(),
        raw_entries.len()
    );
    Ok(entries)
}

fn entry_from_value(value: &serde_json::Value) -> Option<CatalogEntry> {
    let name = value.get("name")?.as_str()?;
    let source = value.get("source")?.as_str()?;
    if name.is_empty() || source.is_empty() {
        return None;
    }
    Some(CatalogEntry {
        name: name.to_string(),
        source: source.to_string(),
    })
}
