//! Report store: persists envelopes unchanged and decrypts when it can.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::Mutex;

use siiec_envelope::asynchronous;
use siiec_envelope::{
    DecryptError, Envelope, KeyProvider, PlaintextObject, DEFAULT_MAX_ENVELOPE_BYTES,
};

use crate::error::StoreError;
use crate::storage::StorageBackend;
use crate::types::*;

/// Intensity given to published reports that were never scored.
pub const DEFAULT_MAP_INTENSITY: f64 = 0.5;

fn log_decrypt_failure(id: &ReportId, err: &DecryptError) {
    match err {
        DecryptError::MalformedEnvelope(defect) => {
            tracing::warn!(report = %id, kind = err.kind(), %defect, "malformed envelope; stored encrypted")
        }
        DecryptError::DecryptionFailed => {
            tracing::warn!(report = %id, kind = err.kind(), "could not decrypt; stored encrypted")
        }
        DecryptError::MalformedPlaintext => {
            tracing::error!(report = %id, kind = err.kind(), "tag verified but plaintext is not a JSON object; investigate")
        }
    }
}

fn string_field(body: &PlaintextObject, key: &str) -> Option<String> {
    match body.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn decrypted_address(body: &PlaintextObject) -> DetailedAddress {
    body.get("addressDetails")
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default()
}

fn check_trust_score(score: Option<f64>) -> Result<(), StoreError> {
    match score {
        Some(s) if !(0.0..=1.0).contains(&s) => Err(StoreError::invalid("trustScore", "must be within [0, 1]")),
        _ => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// ReportStore
// ---------------------------------------------------------------------------

pub struct ReportStore {
    storage: Arc<dyn StorageBackend>,
    keys: KeyProvider,
    max_envelope_bytes: usize,
    // Serializes read-modify-write sequences against the backend.
    writes: Mutex<()>,
}

impl ReportStore {
    pub fn new(storage: Arc<dyn StorageBackend>, keys: KeyProvider) -> Self {
        Self {
            storage,
            keys,
            max_envelope_bytes: DEFAULT_MAX_ENVELOPE_BYTES,
            writes: Mutex::new(()),
        }
    }

    pub fn with_max_envelope_bytes(mut self, limit: usize) -> Self {
        self.max_envelope_bytes = limit;
        self
    }

    pub fn keys(&self) -> &KeyProvider {
        &self.keys
    }

    pub fn is_decryption_available(&self) -> bool {
        self.keys.is_decryption_available()
    }

    pub fn max_envelope_bytes(&self) -> usize {
        self.max_envelope_bytes
    }

    /// Decrypt on the blocking pool. Never fails: the outcome is a status.
    async fn try_decrypt(&self, id: &ReportId, envelope: &Envelope) -> (DecryptionStatus, Option<PlaintextObject>) {
        let Some(decryptor) = self.keys.decryptor() else {
            return (DecryptionStatus::Unavailable, None);
        };
        match asynchronous::decrypt(decryptor.clone(), envelope.clone()).await {
            Ok(body) => (DecryptionStatus::Decrypted, Some(body)),
            Err(err) => {
                log_decrypt_failure(id, &err);
                (DecryptionStatus::Failed, None)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Submission
    // -----------------------------------------------------------------------

    /// Validate and persist a submission.
    ///
    /// Decryption problems never reject the report: the envelope is stored
    /// as received and the outcome is reported in the receipt.
    pub async fn submit(&self, sub: ReportSubmission) -> Result<SubmissionReceipt, StoreError> {
        let missing = sub.missing_fields();
        if !missing.is_empty() {
            return Err(StoreError::MissingFields(missing));
        }
        let id = ReportId::parse(sub.id.trim())?;
        check_trust_score(sub.trust_score)?;

        let envelope = sub.envelope();
        let size = envelope.serialized_len();
        if size > self.max_envelope_bytes {
            return Err(StoreError::PayloadTooLarge {
                size,
                limit: self.max_envelope_bytes,
            });
        }
        if self.storage.get(&id)?.is_some() {
            return Err(StoreError::DuplicateReport(id));
        }

        let (decryption, body) = self.try_decrypt(&id, &envelope).await;

        let now = Utc::now();
        let timestamp = sub
            .timestamp
            .as_deref()
            .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
            .map_or(now, |t| t.with_timezone(&Utc));

        let (latitude, longitude, given_address) = match sub.location {
            Some(loc) => (Some(loc.lat), Some(loc.lng), loc.details.unwrap_or_default()),
            None => (None, None, DetailedAddress::default()),
        };
        let address = match &body {
            Some(body) => given_address.or(decrypted_address(body)),
            None => given_address,
        };

        let report = StoredReport {
            id: id.clone(),
            is_anonymous: sub.is_anonymous.unwrap_or(true),
            role: sub.role,
            category: sub.category,
            report_type: sub.report_type,
            custom_crime_type: sub.custom_crime_type,
            envelope,
            latitude,
            longitude,
            address,
            timestamp,
            trust_score: sub.trust_score,
            ai_analysis: sub.ai_analysis,
            status: ReportStatus::Pending,
            assigned_to: None,
            decryption,
            created_at: now,
            updated_at: now,
        };

        {
            let _guard = self.writes.lock().await;
            if !self.storage.insert(&report)? {
                return Err(StoreError::DuplicateReport(id));
            }
        }

        tracing::info!(report = %id, decryption = decryption.as_str(), "report stored");
        Ok(SubmissionReceipt {
            id,
            created_at: now,
            decryption,
        })
    }

    // -----------------------------------------------------------------------
    // Retrieval
    // -----------------------------------------------------------------------

    fn load(&self, id: &ReportId) -> Result<StoredReport, StoreError> {
        self.storage
            .get(id)?
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    /// Stored report plus the decrypted narrative and entities when possible.
    pub async fn get(&self, id: &ReportId) -> Result<ReportView, StoreError> {
        let report = self.load(id)?;
        let (read_decryption, body) = self.try_decrypt(id, &report.envelope).await;

        Ok(ReportView {
            decrypted_narrative: body.as_ref().and_then(|b| string_field(b, "narrative")),
            decrypted_entities: body.as_ref().and_then(|b| string_field(b, "entities")),
            read_decryption,
            report,
        })
    }

    /// Newest first, filtered and paginated.
    pub async fn list(&self, filter: &ReportFilter) -> Result<Vec<ReportSummary>, StoreError> {
        let mut reports: Vec<StoredReport> = self
            .storage
            .list()?
            .into_iter()
            .filter(|r| filter.matches(r))
            .collect();
        reports.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.created_at.cmp(&a.created_at)));

        Ok(reports
            .iter()
            .skip(filter.offset.unwrap_or(0))
            .take(filter.limit())
            .map(ReportSummary::from)
            .collect())
    }

    // -----------------------------------------------------------------------
    // Moderation
    // -----------------------------------------------------------------------

    pub async fn update(&self, id: &ReportId, update: ReportUpdate) -> Result<StoredReport, StoreError> {
        if update.is_empty() {
            return Err(StoreError::EmptyUpdate);
        }
        check_trust_score(update.trust_score)?;

        let _guard = self.writes.lock().await;
        let mut report = self.load(id)?;

        if let Some(status) = update.status {
            report.status = status;
        }
        if let Some(assignee) = update.assigned_to.filter(|a| !a.trim().is_empty()) {
            report.assigned_to = Some(assignee);
        }
        if let Some(score) = update.trust_score {
            report.trust_score = Some(score);
        }
        report.updated_at = Utc::now();

        self.storage.put(&report)?;
        tracing::info!(report = %id, status = %report.status, "report updated");
        Ok(report)
    }

    /// Delete every report. Returns how many were removed.
    pub async fn purge(&self) -> Result<usize, StoreError> {
        let _guard = self.writes.lock().await;
        let mut deleted = 0;
        for report in self.storage.list()? {
            if self.storage.delete(&report.id)? {
                deleted += 1;
            }
        }
        tracing::warn!(deleted, "all reports purged");
        Ok(deleted)
    }

    // -----------------------------------------------------------------------
    // Aggregates
    // -----------------------------------------------------------------------

    pub async fn stats(&self) -> Result<ReportStats, StoreError> {
        let reports = self.storage.list()?;
        let mut by_status = BTreeMap::new();
        let mut by_category = BTreeMap::new();
        let mut by_decryption = BTreeMap::new();

        for r in &reports {
            *by_status.entry(r.status.as_str().to_owned()).or_insert(0) += 1;
            *by_category.entry(r.category.clone()).or_insert(0) += 1;
            *by_decryption.entry(r.decryption.as_str().to_owned()).or_insert(0) += 1;
        }

        Ok(ReportStats {
            total: reports.len(),
            by_status,
            by_category,
            by_decryption,
        })
    }

    /// Published reports with coordinates. Intensity is the trust score.
    pub async fn map_points(&self) -> Result<Vec<MapPoint>, StoreError> {
        let mut points: Vec<MapPoint> = self
            .storage
            .list()?
            .into_iter()
            .filter(|r| r.status == ReportStatus::Published)
            .filter_map(|r| {
                Some(MapPoint {
                    lat: r.latitude?,
                    lng: r.longitude?,
                    intensity: r.trust_score.unwrap_or(DEFAULT_MAP_INTENSITY),
                    trust_score: r.trust_score,
                    category: r.category,
                    id: r.id,
                })
            })
            .collect();
        points.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(points)
    }
}
