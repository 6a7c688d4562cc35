//! Error types for the report store.

use thiserror::Error;

use crate::types::ReportId;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("invalid `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("encrypted payload too large: {size} bytes (limit {limit})")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("report already exists: {0}")]
    DuplicateReport(ReportId),

    #[error("report not found: {0}")]
    NotFound(ReportId),

    #[error("no updates provided")]
    EmptyUpdate,

    #[error("storage error: {0}")]
    Storage(String),
}

impl StoreError {
    pub(crate) fn storage(context: &str, err: impl std::fmt::Display) -> Self {
        Self::Storage(format!("{}: {}", context, err))
    }

    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}
