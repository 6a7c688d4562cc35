//! Core types: ReportId, ReportStatus, ReportSubmission, StoredReport and views.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use siiec_envelope::Envelope;

use crate::error::StoreError;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

const MAX_ID_LEN: usize = 128;

/// Client-chosen report identifier.
///
/// Restricted to `[A-Za-z0-9_.-]`, at most 128 characters and not starting
/// with a dot, so it can double as a file name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReportId(String);

impl ReportId {
    pub fn parse(id: impl Into<String>) -> Result<Self, StoreError> {
        let id = id.into();
        if id.is_empty() || id.len() > MAX_ID_LEN {
            return Err(StoreError::invalid("id", format!("length must be 1..={}", MAX_ID_LEN)));
        }
        if id.starts_with('.') {
            return Err(StoreError::invalid("id", "must not start with '.'"));
        }
        if !id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.'))
        {
            return Err(StoreError::invalid("id", "allowed characters are A-Z a-z 0-9 _ - ."));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ReportId {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<ReportId> for String {
    fn from(id: ReportId) -> Self {
        id.0
    }
}

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Moderation state
// ---------------------------------------------------------------------------

/// Moderation status. Every report starts as `Pending`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    #[default]
    Pending,
    Published,
    Rejected,
}

impl ReportStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Published => "published",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "published" => Ok(Self::Published),
            "rejected" => Ok(Self::Rejected),
            other => Err(StoreError::invalid("status", format!("unknown status `{}`", other))),
        }
    }
}

/// Outcome of the decryption attempt for a report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecryptionStatus {
    Decrypted,
    /// No private key configured; the envelope was stored unread.
    Unavailable,
    /// A key is configured but this envelope could not be opened.
    Failed,
}

impl DecryptionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Decrypted => "decrypted",
            Self::Unavailable => "unavailable",
            Self::Failed => "failed",
        }
    }
}

// ---------------------------------------------------------------------------
// Submission (wire JSON from the reporting client)
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedAddress {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colony: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<String>,
}

impl DetailedAddress {
    /// Fill blank fields from `other`.
    pub fn or(self, other: DetailedAddress) -> DetailedAddress {
        fn pick(a: Option<String>, b: Option<String>) -> Option<String> {
            a.filter(|s| !s.trim().is_empty()).or(b.filter(|s| !s.trim().is_empty()))
        }
        DetailedAddress {
            street: pick(self.street, other.street),
            colony: pick(self.colony, other.colony),
            zip_code: pick(self.zip_code, other.zip_code),
            references: pick(self.references, other.references),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub lat: f64,
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<DetailedAddress>,
}

/// `null` reads as an empty string so it is reported as a missing field.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Report as posted by the client: plaintext metadata plus the envelope
/// fields inlined at the top level.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportSubmission {
    #[serde(deserialize_with = "null_as_empty")]
    pub id: String,
    pub is_anonymous: Option<bool>,
    pub role: Option<String>,
    #[serde(deserialize_with = "null_as_empty")]
    pub category: String,
    #[serde(rename = "type", deserialize_with = "null_as_empty")]
    pub report_type: String,
    pub custom_crime_type: Option<String>,
    #[serde(deserialize_with = "null_as_empty")]
    pub encrypted_data: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub encrypted_key: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub iv: String,
    pub algorithm: Option<String>,
    pub location: Option<GeoLocation>,
    pub timestamp: Option<String>,
    pub trust_score: Option<f64>,
    pub ai_analysis: Option<Value>,
}

impl ReportSubmission {
    /// Required fields that are absent or blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("id", &self.id),
            ("category", &self.category),
            ("type", &self.report_type),
            ("encryptedData", &self.encrypted_data),
            ("encryptedKey", &self.encrypted_key),
            ("iv", &self.iv),
        ]
        .into_iter()
        .filter(|(_, v)| v.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }

    /// The envelope exactly as the client sent it.
    pub fn envelope(&self) -> Envelope {
        Envelope::from_parts(
            self.encrypted_data.clone(),
            self.encrypted_key.clone(),
            self.iv.clone(),
            self.algorithm.clone(),
            self.timestamp.clone(),
        )
    }
}

// ---------------------------------------------------------------------------
// Persisted record
// ---------------------------------------------------------------------------

/// Stored report. The envelope is kept byte-for-byte; decrypted text is not
/// persisted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredReport {
    pub id: ReportId,
    pub is_anonymous: bool,
    pub role: Option<String>,
    pub category: String,
    #[serde(rename = "type")]
    pub report_type: String,
    pub custom_crime_type: Option<String>,
    pub envelope: Envelope,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub address: DetailedAddress,
    pub timestamp: DateTime<Utc>,
    pub trust_score: Option<f64>,
    pub ai_analysis: Option<Value>,
    pub status: ReportStatus,
    pub assigned_to: Option<String>,
    /// Outcome of the attempt made at submission time.
    pub decryption: DecryptionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Single-report view for the back office.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportView {
    #[serde(flatten)]
    pub report: StoredReport,
    /// Outcome of the attempt made for this read.
    pub read_decryption: DecryptionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decrypted_narrative: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decrypted_entities: Option<String>,
}

/// List entry. Carries no ciphertext.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub id: ReportId,
    pub is_anonymous: bool,
    pub role: Option<String>,
    pub category: String,
    #[serde(rename = "type")]
    pub report_type: String,
    pub custom_crime_type: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub address_street: Option<String>,
    pub address_colony: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub trust_score: Option<f64>,
    pub ai_analysis: Option<Value>,
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
}

impl From<&StoredReport> for ReportSummary {
    fn from(r: &StoredReport) -> Self {
        Self {
            id: r.id.clone(),
            is_anonymous: r.is_anonymous,
            role: r.role.clone(),
            category: r.category.clone(),
            report_type: r.report_type.clone(),
            custom_crime_type: r.custom_crime_type.clone(),
            latitude: r.latitude,
            longitude: r.longitude,
            address_street: r.address.street.clone(),
            address_colony: r.address.colony.clone(),
            timestamp: r.timestamp,
            trust_score: r.trust_score,
            ai_analysis: r.ai_analysis.clone(),
            status: r.status,
            created_at: r.created_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Queries and updates
// ---------------------------------------------------------------------------

pub const DEFAULT_LIST_LIMIT: usize = 100;
pub const MAX_LIST_LIMIT: usize = 1_000;

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ReportFilter {
    pub status: Option<ReportStatus>,
    pub category: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl ReportFilter {
    pub fn matches(&self, report: &StoredReport) -> bool {
        self.status.map_or(true, |s| s == report.status)
            && self.category.as_deref().map_or(true, |c| c == report.category)
    }

    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIST_LIMIT).min(MAX_LIST_LIMIT)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportUpdate {
    pub status: Option<ReportStatus>,
    pub assigned_to: Option<String>,
    pub trust_score: Option<f64>,
}

impl ReportUpdate {
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.assigned_to.as_deref().map_or(true, |a| a.trim().is_empty())
            && self.trust_score.is_none()
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    pub id: ReportId,
    pub created_at: DateTime<Utc>,
    pub decryption: DecryptionStatus,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportStats {
    pub total: usize,
    pub by_status: BTreeMap<String, usize>,
    pub by_category: BTreeMap<String, usize>,
    pub by_decryption: BTreeMap<String, usize>,
}

/// Heat-map point for a published report.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapPoint {
    pub id: ReportId,
    pub lat: f64,
    pub lng: f64,
    pub intensity: f64,
    pub category: String,
    pub trust_score: Option<f64>,
}
