//! Spreadsheet export: one sheet per non-empty category.

use arrow::array::{Array, AsArray};
use arrow::datatypes::{DataType, Float64Type, Int64Type};
use arrow::record_batch::RecordBatch;
use pjextract_core::{Category, ExtractionMode, Progress, ResultSet, format_records};
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use tracing::{info, warn};

use crate::StoreError;

pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Warning emitted when a run produced no records at all.
pub const NOTHING_COLLECTED: &str = "Nenhum processo foi coletado no total.";

/// Downloadable workbook.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl Artifact {
    pub fn mime(&self) -> &'static str {
        XLSX_MIME
    }
}

/// Categories that get a sheet, in sheet order.
pub fn sheet_plan(results: &ResultSet) -> Vec<Category> {
    [Category::General, Category::Archived]
        .into_iter()
        .filter(|&c| !results.records(c).is_empty())
        .collect()
}

/// Format every non-empty category and serialize them into one workbook.
///
/// Returns `None`, after a single warning, when nothing was collected.
pub fn export_workbook(
    results: &ResultSet,
    mode: ExtractionMode,
    progress: &mut dyn Progress,
) -> Result<Option<Artifact>, StoreError> {
    let plan = sheet_plan(results);
    if plan.is_empty() {
        warn!("nothing collected, no workbook produced");
        progress.warning(NOTHING_COLLECTED);
        return Ok(None);
    }

    progress.message(&format!("Gerando planilha consolidada '{}'...", mode.filename()));

    let mut tables = Vec::with_capacity(plan.len());
    for category in plan {
        let records = results.records(category);
        progress.message(&format!(
            "-> Processando {} registros de '{category}'...",
            records.len()
        ));
        let batch = format_records(records, category)?;
        tables.push((category.display_name(), batch));
    }

    let sheets: Vec<(&str, &RecordBatch)> = tables.iter().map(|(name, batch)| (*name, batch)).collect();
    let bytes = write_sheets(&sheets)?;
    for (name, _) in &sheets {
        progress.message(&format!("-> Aba '{name}' adicionada."));
    }

    info!(filename = mode.filename(), size = bytes.len(), sheets = sheets.len(), "workbook ready");
    Ok(Some(Artifact {
        filename: mode.filename().to_string(),
        bytes,
    }))
}

/// Serialize named tables into an `.xlsx` workbook held in memory.
pub fn write_sheets(sheets: &[(&str, &RecordBatch)]) -> Result<Vec<u8>, StoreError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();

    for (name, batch) in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(*name)?;
        write_table(worksheet, batch, &header)?;
    }

    Ok(workbook.save_to_buffer()?)
}

fn write_table(worksheet: &mut Worksheet, batch: &RecordBatch, header: &Format) -> Result<(), StoreError> {
    let schema = batch.schema();
    for (col_idx, field) in schema.fields().iter().enumerate() {
        let col = col_idx as u16;
        worksheet.write_string_with_format(0, col, field.name(), header)?;

        let array = batch.column(col_idx);
        for row_idx in 0..batch.num_rows() {
            if array.is_null(row_idx) {
                continue;
            }
            let row = row_idx as u32 + 1;
            match array.data_type() {
                DataType::Utf8 => {
                    worksheet.write_string(row, col, array.as_string::<i32>().value(row_idx))?;
                }
                DataType::Boolean => {
                    worksheet.write_boolean(row, col, array.as_boolean().value(row_idx))?;
                }
                DataType::Int64 => {
                    worksheet.write_number(row, col, array.as_primitive::<Int64Type>().value(row_idx) as f64)?;
                }
                DataType::Float64 => {
                    worksheet.write_number(row, col, array.as_primitive::<Float64Type>().value(row_idx))?;
                }
                other => {
                    return Err(StoreError::UnsupportedColumn {
                        column: field.name().clone(),
                        data_type: other.to_string(),
                    });
                }
            }
        }
    }

    worksheet.set_freeze_panes(1, 0)?;
    worksheet.autofit();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use arrow::array::{Date32Array, StringArray};
    use arrow::datatypes::{Field, Schema};
    use async_trait::async_trait;
    use pjextract_core::{
        AuthError, AuthSession, Authenticator, Credentials, InstanceId, InstanceSelection,
        Orchestrator, PageFetchError, PageSource, ProcessRecord, RunRequest, Settings,
    };
    use serde_json::json;

    fn record(value: serde_json::Value) -> ProcessRecord {
        serde_json::from_value(value).unwrap()
    }

    /// Counts warnings and keeps messages.
    #[derive(Default)]
    struct Recorder {
        warnings: Vec<String>,
        messages: Vec<String>,
    }

    impl Progress for Recorder {
        fn message(&mut self, msg: &str) {
            self.messages.push(msg.to_string());
        }
        fn warning(&mut self, msg: &str) {
            self.warnings.push(msg.to_string());
        }
    }

    struct RejectAll;

    #[async_trait]
    impl Authenticator for RejectAll {
        async fn authenticate(
            &self,
            _instance: InstanceId,
            _credentials: &Credentials,
            _progress: &mut dyn Progress,
        ) -> Result<AuthSession, AuthError> {
            Err(AuthError::Timeout {
                step: "waiting for the lawyer panel",
                secs: 30,
            })
        }
    }

    struct NeverCalled;

    #[async_trait]
    impl PageSource for NeverCalled {
        async fn fetch_page(
            &self,
            _session: &AuthSession,
            _instance: InstanceId,
            _category: Category,
            _page: u32,
        ) -> Result<Vec<ProcessRecord>, PageFetchError> {
            panic!("no session, no page requests");
        }
    }

    #[test]
    fn empty_results_give_no_artifact_and_one_warning() {
        let mut progress = Recorder::default();
        let artifact = export_workbook(&ResultSet::default(), ExtractionMode::Both, &mut progress).unwrap();
        assert!(artifact.is_none());
        assert_eq!(progress.warnings, [NOTHING_COLLECTED]);
    }

    #[tokio::test]
    async fn run_without_any_login_produces_nothing() {
        let settings = Settings {
            instance_delay: std::time::Duration::ZERO,
            page_delay: std::time::Duration::ZERO,
            ..Settings::default()
        };
        let orchestrator = Orchestrator::new(RejectAll, NeverCalled, settings);

        for mode in [ExtractionMode::GeneralOnly, ExtractionMode::ArchivedOnly, ExtractionMode::Both] {
            let request = RunRequest {
                credentials: Credentials::new("user", "pass").unwrap(),
                instances: InstanceSelection::from_ids([1, 2, 3].map(|n| InstanceId::new(n).unwrap())),
                mode,
            };
            let mut progress = Recorder::default();
            let report = orchestrator.run(&request, &mut progress).await;
            assert_eq!(report.failed_instances().count(), 3);

            let artifact = export_workbook(&report.results, mode, &mut progress).unwrap();
            assert!(artifact.is_none());
            assert_eq!(
                progress.warnings.iter().filter(|w| *w == NOTHING_COLLECTED).count(),
                1
            );
        }
    }

    #[test]
    fn only_non_empty_categories_get_sheets() {
        let mut results = ResultSet::default();
        results.archived.push(record(json!({"numero": "1", "TRT": 2})));
        assert_eq!(sheet_plan(&results), [Category::Archived]);

        results.general.push(record(json!({"numero": "2", "TRT": 3})));
        assert_eq!(sheet_plan(&results), [Category::General, Category::Archived]);
    }

    #[test]
    fn exports_workbook_named_after_mode() {
        let mut results = ResultSet::default();
        results.general.push(record(json!({
            "numeroProcesso": "0000001-23.2024.5.02.0001",
            "dataAutuacao": "2024-03-15T00:00:00",
            "segredoDeJustica": false,
            "qtdeParteRe": 2,
            "TRT": 2,
        })));
        results.archived.push(record(json!({
            "numeroProcesso": "0000002-23.2020.5.02.0001",
            "dataArquivamento": "2022-08-01T00:00:00",
            "TRT": 2,
        })));

        let mut progress = Recorder::default();
        let artifact = export_workbook(&results, ExtractionMode::Both, &mut progress)
            .unwrap()
            .unwrap();

        assert_eq!(artifact.filename, "processos_geral_e_arquivados.xlsx");
        assert_eq!(artifact.mime(), XLSX_MIME);
        // xlsx is a zip container.
        assert_eq!(&artifact.bytes[..2], b"PK");
        assert!(progress.warnings.is_empty());
        assert!(progress.messages.iter().any(|m| m.contains("Acervo Geral")));
        assert!(progress.messages.iter().any(|m| m.contains("Processos Arquivados")));
    }

    #[test]
    fn unsupported_column_type_is_reported() {
        let schema = Schema::new(vec![
            Field::new("Número", arrow::datatypes::DataType::Utf8, true),
            Field::new("Quando", arrow::datatypes::DataType::Date32, true),
        ]);
        let batch = RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(StringArray::from(vec![Some("1")])),
                Arc::new(Date32Array::from(vec![Some(19_000)])),
            ],
        )
        .unwrap();

        let err = write_sheets(&[("Acervo Geral", &batch)]).unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedColumn { ref column, .. } if column == "Quando"));
    }
}
