//! # siiec-store
//!
//! Persistence for anonymous incident reports.
//!
//! Envelopes are stored exactly as the client produced them. When a private
//! key is configured the store opens each envelope on arrival and again on
//! every single-report read, so the decrypted narrative never touches disk.
//! Only address details may be copied out of the plaintext into the stored
//! record. Without a key, reports are still accepted and kept encrypted.
//!
//! ## Quick Start
//!
//! ```ignore
//! use siiec_store::*;
//! use siiec_envelope::KeyProvider;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let store = ReportStore::new(Arc::new(InMemoryBackend::new()), KeyProvider::from_env());
//!
//! let receipt = store.submit(submission).await.unwrap();
//! let view = store.get(&receipt.id).await.unwrap();
//! println!("{:?}", view.decrypted_narrative);
//! # });
//! ```

pub mod error;
pub mod storage;
pub mod store;
pub mod types;

// Re-export main types for convenience
pub use error::StoreError;
pub use storage::{FileBackend, InMemoryBackend, StorageBackend};
pub use store::{ReportStore, DEFAULT_MAP_INTENSITY};
pub use types::{
    DecryptionStatus, DetailedAddress, GeoLocation, MapPoint, ReportFilter, ReportId, ReportStats,
    ReportStatus, ReportSubmission, ReportSummary, ReportUpdate, ReportView, StoredReport,
    SubmissionReceipt, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT,
};

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
