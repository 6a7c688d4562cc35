//! Typed view of the plaintext report body.
//!
//! The cipher treats the body as an opaque JSON object. These helpers give
//! clients the pre-submission checks and give the back office named fields.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::decryptor::PlaintextObject;
use crate::error::FormError;

/// Minimum narrative length, in characters after trimming.
pub const MIN_NARRATIVE_CHARS: usize = 20;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AddressDetails {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub street: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub colony: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub zip_code: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub references: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub municipality: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub state: String,
}

impl AddressDetails {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Report body: narrative, accused entities and a structured address.
/// Unknown fields are kept in `extra` and survive a round-trip.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportBody {
    #[serde(default)]
    pub narrative: String,
    #[serde(default)]
    pub entities: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_details: Option<AddressDetails>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ReportBody {
    pub fn new(narrative: impl Into<String>, entities: impl Into<String>) -> Self {
        Self {
            narrative: narrative.into(),
            entities: entities.into(),
            ..Self::default()
        }
    }

    pub fn with_address(mut self, address: AddressDetails) -> Self {
        self.address_details = Some(address);
        self
    }

    /// Read a decrypted object. Fields of the wrong JSON type are an error.
    pub fn from_plaintext(object: PlaintextObject) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(object))
    }

    /// Narrative must carry at least [`MIN_NARRATIVE_CHARS`] characters.
    pub fn validate(&self) -> Result<(), FormError> {
        let chars = self.narrative.trim().chars().count();
        if chars < MIN_NARRATIVE_CHARS {
            return Err(FormError::NarrativeTooShort {
                chars,
                min: MIN_NARRATIVE_CHARS,
            });
        }
        Ok(())
    }
}

/// Top-level string fields that are blank after trimming.
pub fn validate_form_fields(fields: &Map<String, Value>) -> Result<(), FormError> {
    let empty: Vec<String> = fields
        .iter()
        .filter(|(_, v)| matches!(v, Value::String(s) if s.trim().is_empty()))
        .map(|(k, _)| k.clone())
        .collect();
    if empty.is_empty() {
        Ok(())
    } else {
        Err(FormError::EmptyFields(empty))
    }
}
