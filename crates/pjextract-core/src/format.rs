//! Tabular shaping of collected records.
//!
//! Turns loosely-typed [`ProcessRecord`]s into an Arrow [`RecordBatch`] with
//! human-readable column names, Brazilian date formats and the tribunal code
//! as the first column.

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::error::FormatError;
use crate::model::{Category, INSTANCE_TAG, ProcessRecord};

/// Remote field name → column label.
pub const COLUMN_LABELS: &[(&str, &str)] = &[
    (INSTANCE_TAG, "Código Tribunal"),
    ("id", "ID do Processo"),
    ("descricaoOrgaoJulgador", "Órgão Julgador"),
    ("classeJudicial", "Classe Processual"),
    ("numero", "Número"),
    ("numeroProcesso", "Número Completo do Processo"),
    ("segredoDeJustica", "Segredo de Justiça"),
    ("codigoStatusProcesso", "Status"),
    ("prioridadeProcessual", "Prioridade"),
    ("nomeParteAutora", "Parte Autora"),
    ("qtdeParteAutora", "Qtd. Autores"),
    ("nomeParteRe", "Parte Ré"),
    ("registroComplementarParteRe", "Registro Comp. Ré"),
    ("qtdeParteRe", "Qtd. Rés"),
    ("dataAutuacao", "Data de Autuação"),
    ("juizoDigital", "Juízo 100% Digital"),
    ("dataArquivamento", "Data de Arquivamento"),
    ("temAssociacao", "Possui Associação"),
    ("registroComplementarParteAutora", "Registro Comp. Autora"),
    ("dataProximaAudiencia", "Próxima Audiência"),
];

/// Column moved to the front of every table.
pub const TRIBUNAL_COLUMN: &str = "Código Tribunal";

const ARCHIVAL_DATE: &str = "dataArquivamento";
const DATE_ONLY_FIELDS: &[&str] = &["dataAutuacao", ARCHIVAL_DATE];
const DATE_TIME_FIELDS: &[&str] = &["dataProximaAudiencia"];

const DATE_FORMAT: &str = "%d/%m/%Y";
const DATE_TIME_FORMAT: &str = "%d/%m/%Y %H:%M";

pub fn label_for(key: &str) -> Option<&'static str> {
    COLUMN_LABELS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, label)| *label)
}

/// Shape records of one category into a table.
///
/// - the archival date is dropped for [`Category::General`];
/// - date fields become `DD/MM/YYYY` (`DD/MM/YYYY HH:MM` for the next
///   hearing); unparseable values become null;
/// - known fields are renamed and come first, unknown fields follow under
///   their own name, each group in first-seen order;
/// - the tribunal code column, when present, is first.
pub fn format_records(records: &[ProcessRecord], category: Category) -> Result<RecordBatch, FormatError> {
    let keys = column_order(records, category);

    let mut fields = Vec::with_capacity(keys.len());
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(keys.len());
    for (key, label) in &keys {
        let values: Vec<Option<&Value>> = records.iter().map(|r| r.get(key)).collect();
        let column = if DATE_ONLY_FIELDS.contains(&key.as_str()) {
            date_column(&values, DATE_FORMAT)
        } else if DATE_TIME_FIELDS.contains(&key.as_str()) {
            date_column(&values, DATE_TIME_FORMAT)
        } else {
            infer_column(&values)
        };
        fields.push(Field::new(label.as_str(), column.data_type().clone(), true));
        columns.push(column);
    }

    let options = RecordBatchOptions::new().with_row_count(Some(records.len()));
    let batch = RecordBatch::try_new_with_options(Arc::new(Schema::new(fields)), columns, &options)?;
    Ok(batch)
}

/// `(remote key, column label)` pairs in output order.
fn column_order(records: &[ProcessRecord], category: Category) -> Vec<(String, String)> {
    let mut seen: Vec<&str> = Vec::new();
    for record in records {
        for key in record.fields().keys() {
            if !seen.contains(&key.as_str()) {
                seen.push(key.as_str());
            }
        }
    }
    if category == Category::General {
        seen.retain(|k| *k != ARCHIVAL_DATE);
    }

    let (known, unknown): (Vec<&str>, Vec<&str>) = seen.into_iter().partition(|k| label_for(k).is_some());
    let mut out: Vec<(String, String)> = known
        .into_iter()
        .map(|k| (k.to_string(), label_for(k).unwrap_or(k).to_string()))
        .chain(unknown.into_iter().map(|k| (k.to_string(), k.to_string())))
        .collect();

    if let Some(pos) = out.iter().position(|(_, label)| label == TRIBUNAL_COLUMN) {
        let tribunal = out.remove(pos);
        out.insert(0, tribunal);
    }
    out
}

fn date_column(values: &[Option<&Value>], format: &str) -> ArrayRef {
    let formatted: Vec<Option<String>> = values
        .iter()
        .map(|v| {
            v.and_then(Value::as_str)
                .and_then(parse_timestamp)
                .map(|dt| dt.format(format).to_string())
        })
        .collect();
    Arc::new(StringArray::from(formatted))
}

/// Parse the timestamp shapes the portal emits. Offsets are dropped: the
/// wall-clock time as sent is what gets displayed.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    // Offsets without a colon, e.g. `-0300`.
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.naive_local());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Pick the narrowest Arrow type that holds every non-null value.
fn infer_column(values: &[Option<&Value>]) -> ArrayRef {
    let present = || values.iter().flatten().filter(|v| !v.is_null());

    if present().next().is_some() {
        if present().all(|v| v.is_boolean()) {
            return Arc::new(BooleanArray::from(
                values.iter().map(|v| v.and_then(Value::as_bool)).collect::<Vec<_>>(),
            ));
        }
        if present().all(|v| v.is_i64()) {
            return Arc::new(Int64Array::from(
                values.iter().map(|v| v.and_then(Value::as_i64)).collect::<Vec<_>>(),
            ));
        }
        if present().all(|v| v.is_number()) {
            return Arc::new(Float64Array::from(
                values.iter().map(|v| v.and_then(Value::as_f64)).collect::<Vec<_>>(),
            ));
        }
    }

    Arc::new(StringArray::from(
        values.iter().map(|v| v.and_then(render_text)).collect::<Vec<_>>(),
    ))
}

fn render_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Cell text at (`row`, column `label`), for assertions and previews.
pub fn cell_text(batch: &RecordBatch, label: &str, row: usize) -> Option<String> {
    let col = batch.column(batch.schema().index_of(label).ok()?).clone();
    if col.is_null(row) {
        return None;
    }
    match col.data_type() {
        DataType::Utf8 => Some(col.as_any().downcast_ref::<StringArray>()?.value(row).to_string()),
        DataType::Boolean => Some(col.as_any().downcast_ref::<BooleanArray>()?.value(row).to_string()),
        DataType::Int64 => Some(col.as_any().downcast_ref::<Int64Array>()?.value(row).to_string()),
        DataType::Float64 => Some(col.as_any().downcast_ref::<Float64Array>()?.value(row).to_string()),
        _ => None,
    }
}
