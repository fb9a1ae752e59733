//! Read-only inspection and JSON export of the local store, plus the
//! matching import.

use crate::resolve::decode_payload;
use crate::store::LocalStore;
use crate::Result;
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Value};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Every local entry, with values parsed as JSON where possible.
pub fn export_all(store: &LocalStore) -> Result<Map<String, Value>> {
    let mut document = Map::new();
    for entry in store.entries()? {
        document.insert(entry.key, decode_payload(&entry.value));
    }
    Ok(document)
}

/// `localstorage_<YYYY-MM-DD>.json`
pub fn export_file_name(date: NaiveDate) -> String {
    format!("localstorage_{}.json", date.format("%Y-%m-%d"))
}

/// Write the export document into `dir` and return its path.
pub fn write_export(store: &LocalStore, dir: &Path, date: NaiveDate) -> Result<PathBuf> {
    let document = export_all(store)?;
    let json = serde_json::to_string_pretty(&Value::Object(document))?;

    std::fs::create_dir_all(dir)?;
    let path = dir.join(export_file_name(date));
    let mut file = std::fs::File::create(&path)?;
    file.write_all(json.as_bytes())?;

    info!("Exported local store to {}", path.display());
    Ok(path)
}

/// Load an export document back into the store.
///
/// String values are stored as-is (raw), everything else is re-serialized,
/// so `import_document(export_all(store))` reproduces the store when every raw
/// value was itself either JSON or a non-JSON string.
pub fn import_document(store: &LocalStore, document: &Map<String, Value>) -> Result<usize> {
    let mut imported = 0;
    for (key, value) in document {
        let payload = match value {
            Value::String(raw) => raw.clone(),
            other => serde_json::to_string(other)?,
        };
        store.set(key, &payload)?;
        imported += 1;
    }
    Ok(imported)
}

/// Shape of a stored value, as shown by [`inspect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Object,
    Array,
    String,
    Number,
    Bool,
    Null,
    /// Not valid JSON.
    Raw,
}

/// Diagnostic summary of one entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntrySummary {
    pub key: String,
    pub kind: ValueKind,
    pub bytes: usize,
    /// Element count for arrays, field count for objects.
    pub len: Option<usize>,
    /// Requested fields present in the value (or in an array's first element).
    pub fields: Map<String, Value>,
}

/// Summarize entries whose key starts with `prefix`.
pub fn inspect(store: &LocalStore, prefix: &str, fields: &[String]) -> Result<Vec<EntrySummary>> {
    let mut summaries = Vec::new();
    for entry in store.entries()? {
        if !entry.key.starts_with(prefix) {
            continue;
        }
        summaries.push(summarize(&entry.key, &entry.value, fields));
    }
    Ok(summaries)
}

fn summarize(key: &str, raw: &str, fields: &[String]) -> EntrySummary {
    let parsed: Option<Value> = serde_json::from_str(raw).ok();
    let (kind, len, selected) = match &parsed {
        None => (ValueKind::Raw, None, Map::new()),
        Some(Value::Object(map)) => (ValueKind::Object, Some(map.len()), select(map, fields)),
        Some(Value::Array(items)) => {
            let selected = match items.first() {
                Some(Value::Object(first)) => select(first, fields),
                _ => Map::new(),
            };
            (ValueKind::Array, Some(items.len()), selected)
        }
        Some(Value::String(_)) => (ValueKind::String, None, Map::new()),
        Some(Value::Number(_)) => (ValueKind::Number, None, Map::new()),
        Some(Value::Bool(_)) => (ValueKind::Bool, None, Map::new()),
        Some(Value::Null) => (ValueKind::Null, None, Map::new()),
    };

    EntrySummary {
        key: key.to_string(),
        kind,
        bytes: raw.len(),
        len,
        fields: selected,
    }
}

fn select(map: &Map<String, Value>, fields: &[String]) -> Map<String, Value> {
    fields
        .iter()
        .filter_map(|f| map.get(f).map(|v| (f.clone(), v.clone())))
        .collect()
}

/// One line per summary, for the console.
pub fn render_summary(summary: &EntrySummary) -> String {
    let mut line = format!("{} [{:?}, {} bytes", summary.key, summary.kind, summary.bytes);
    if let Some(len) = summary.len {
        line.push_str(&format!(", {} items", len));
    }
    line.push(']');
    for (field, value) in &summary.fields {
        line.push_str(&format!(" {}={}", field, value));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn export_parses_json_and_keeps_raw_strings() {
        let store = LocalStore::in_memory();
        store.set("a", r#"{"x":1}"#).unwrap();
        store.set("b", "raw").unwrap();

        let document = export_all(&store).unwrap();
        assert_eq!(Value::Object(document), json!({"a": {"x": 1}, "b": "raw"}));
    }

    #[test]
    fn export_does_not_mutate_store() {
        let store = LocalStore::in_memory();
        store.set("a", "{bad json").unwrap();
        export_all(&store).unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("{bad json"));
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn file_name_is_date_stamped() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(export_file_name(date), "localstorage_2024-03-07.json");
    }

    #[test]
    fn write_export_creates_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::in_memory();
        store.set("essais", r#"[{"id":1}]"#).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 11, 2).unwrap();

        let path = write_export(&store, &dir.path().join("exports"), date).unwrap();
        assert!(path.ends_with("localstorage_2024-11-02.json"));

        let written: Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, json!({"essais": [{"id": 1}]}));
    }

    #[test]
    fn import_restores_exported_values() {
        let source = LocalStore::in_memory();
        source.set("a", r#"{"x":1}"#).unwrap();
        source.set("b", "raw").unwrap();
        source.set("c", "[1,2]").unwrap();
        let document = export_all(&source).unwrap();

        let target = LocalStore::in_memory();
        assert_eq!(import_document(&target, &document).unwrap(), 3);
        assert_eq!(target.entries().unwrap(), source.entries().unwrap());
    }

    #[test]
    fn inspect_filters_by_prefix_and_selects_fields() {
        let store = LocalStore::in_memory();
        store
            .set(
                "essais:liste",
                r#"[{"id":12,"statut":"valide","labo":"B"},{"id":13}]"#,
            )
            .unwrap();
        store
            .set("essais:courant", r#"{"id":12,"statut":"valide","notes":"x"}"#)
            .unwrap();
        store.set("menu:ouvert", "true").unwrap();

        let fields = vec!["id".to_string(), "statut".to_string()];
        let summaries = inspect(&store, "essais:", &fields).unwrap();
        assert_eq!(summaries.len(), 2);

        let courant = &summaries[0];
        assert_eq!(courant.key, "essais:courant");
        assert_eq!(courant.kind, ValueKind::Object);
        assert_eq!(courant.len, Some(3));
        assert_eq!(Value::Object(courant.fields.clone()), json!({"id": 12, "statut": "valide"}));

        let liste = &summaries[1];
        assert_eq!(liste.kind, ValueKind::Array);
        assert_eq!(liste.len, Some(2));
        assert_eq!(liste.fields.get("statut"), Some(&json!("valide")));
    }

    #[test]
    fn inspect_marks_non_json_values_raw() {
        let store = LocalStore::in_memory();
        store.set("note", "pas du json").unwrap();
        let summaries = inspect(&store, "", &[]).unwrap();
        assert_eq!(summaries[0].kind, ValueKind::Raw);
        assert_eq!(summaries[0].bytes, "pas du json".len());
    }

    #[test]
    fn rendered_summary_lists_selected_fields() {
        let summary = summarize("k", r#"{"id":3,"x":true}"#, &["id".to_string()]);
        assert_eq!(render_summary(&summary), "k [Object, 17 bytes, 2 items] id=3");
    }
}
