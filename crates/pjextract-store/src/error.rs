use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("format error: {0}")]
    Format(#[from] pjextract_core::FormatError),

    #[error("xlsx error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("unsupported column type {data_type} in `{column}`")]
    UnsupportedColumn { column: String, data_type: String },
}
