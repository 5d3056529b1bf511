use std::path::PathBuf;

use thiserror::Error;

use crate::data::tag::DatasetTag;

/// Failures the estimator reports by kind. Plumbing code wraps these in
/// `anyhow::Error`, so callers that care can `downcast_ref::<DatasetError>()`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DatasetError {
    #[error("unsupported file format '.{extension}' for {}", path.display())]
    UnknownFormat { path: PathBuf, extension: String },

    #[error("dataset '{tag}' has neither a file override nor a backing-store table")]
    MissingDataset { tag: DatasetTag },

    #[error("dataset '{tag}' must be read from the backing store, but no store is configured (set DB_PATH or --db)")]
    StoreNotConfigured { tag: DatasetTag },

    #[error("dataset '{dataset}' is missing required column '{column}'")]
    MissingColumn { dataset: DatasetTag, column: String },

    #[error("dataset '{dataset}' row {row}: column '{column}' holds non-numeric value '{value}'")]
    InvalidCell {
        dataset: DatasetTag,
        row: usize,
        column: String,
        value: String,
    },

    #[error("unknown dataset tag '{0}'")]
    UnknownTag(String),
}
