//! Status document model
//!
//! The durable record of per-artifact-type generation progress for one
//! (artifact set, version) pair. Stateless job invocations coordinate
//! exclusively through this document, so its shape is kept strictly
//! canonical: `files` always holds exactly one entry per artifact type,
//! in a fixed order, with the canonical file name. Anything read from
//! storage is forced back into that shape by [`StatusDocument::normalize`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::BomxError;

/// The closed set of derived datasets the explosion job can produce.
///
/// Defined at deploy time; each type maps 1:1 to a canonical output
/// file name in the artifact set's storage prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactType {
    SupplyRules,
    ProductionModelSemiFinished,
    RawMaterialSemiFinished,
    SalesPlan,
    ProductionPlan,
}

impl ArtifactType {
    /// All artifact types, in canonical document order.
    pub const ALL: [ArtifactType; 5] = [
        ArtifactType::SupplyRules,
        ArtifactType::ProductionModelSemiFinished,
        ArtifactType::RawMaterialSemiFinished,
        ArtifactType::SalesPlan,
        ArtifactType::ProductionPlan,
    ];

    /// Canonical output file name for this artifact type.
    pub fn file_name(&self) -> &'static str {
        match self {
            ArtifactType::SupplyRules => "ReglasAbastecimiento.csv",
            ArtifactType::ProductionModelSemiFinished => "ModeloProduccionSemielaborados.csv",
            ArtifactType::RawMaterialSemiFinished => "MateriaPrimaSemielaborados.csv",
            ArtifactType::SalesPlan => "PlanVentas.csv",
            ArtifactType::ProductionPlan => "PlanProduccion.csv",
        }
    }

    /// Wire identifier used in requests and in the persisted document.
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactType::SupplyRules => "supply-rules",
            ArtifactType::ProductionModelSemiFinished => "production-model-semi-finished",
            ArtifactType::RawMaterialSemiFinished => "raw-material-semi-finished",
            ArtifactType::SalesPlan => "sales-plan",
            ArtifactType::ProductionPlan => "production-plan",
        }
    }

    /// Comma-separated list of all valid wire identifiers, for error messages.
    pub fn valid_ids() -> String {
        Self::ALL
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl std::fmt::Display for ArtifactType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ArtifactType {
    type Err = BomxError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| BomxError::UnknownArtifactType(s.to_string()))
    }
}

/// Generation state of one artifact type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactState {
    #[default]
    Pending,
    Processing,
    Success,
    Error,
}

impl ArtifactState {
    pub fn is_pending(&self) -> bool {
        matches!(self, ArtifactState::Pending)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ArtifactState::Success)
    }
}

impl std::fmt::Display for ArtifactState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtifactState::Pending => write!(f, "pending"),
            ArtifactState::Processing => write!(f, "processing"),
            ArtifactState::Success => write!(f, "success"),
            ArtifactState::Error => write!(f, "error"),
        }
    }
}

/// One row of the status document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactStatusEntry {
    pub artifact_type: ArtifactType,
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub status: ArtifactState,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub record_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub artifact_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ArtifactStatusEntry {
    /// A fresh pending entry for the given artifact type.
    pub fn pending(artifact_type: ArtifactType) -> Self {
        Self {
            artifact_type,
            file_name: artifact_type.file_name().to_string(),
            status: ArtifactState::Pending,
            record_count: None,
            artifact_key: None,
            error: None,
            updated_at: None,
        }
    }
}

/// The durable status document for one (artifact set, version) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusDocument {
    pub artifact_set_id: String,
    pub version: String,
    pub files: Vec<ArtifactStatusEntry>,
    pub last_updated_at: DateTime<Utc>,
}

impl StatusDocument {
    /// A fresh document with every artifact type pending.
    pub fn fresh(artifact_set_id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            artifact_set_id: artifact_set_id.into(),
            version: version.into(),
            files: ArtifactType::ALL
                .iter()
                .map(|t| ArtifactStatusEntry::pending(*t))
                .collect(),
            last_updated_at: Utc::now(),
        }
    }

    /// Rebuild a canonical document from whatever was read out of storage.
    ///
    /// Total over arbitrary JSON: a missing or malformed `files` field is
    /// treated as empty, entries for unknown artifact types are dropped,
    /// missing entries are synthesized as pending, and file names are
    /// forced back to their canonical values (stale names from earlier
    /// schema versions have been observed in the wild). Output order is
    /// always canonical order.
    pub fn normalize(
        raw: &serde_json::Value,
        artifact_set_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        let stored: Vec<ArtifactStatusEntry> = raw
            .get("files")
            .and_then(|v| v.as_array())
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|e| serde_json::from_value(e.clone()).ok())
                    .collect()
            })
            .unwrap_or_default();

        let files = ArtifactType::ALL
            .iter()
            .map(|t| {
                match stored.iter().find(|e| e.artifact_type == *t) {
                    Some(found) => {
                        let mut entry = found.clone();
                        entry.file_name = t.file_name().to_string();
                        entry
                    }
                    None => ArtifactStatusEntry::pending(*t),
                }
            })
            .collect();

        Self {
            artifact_set_id: artifact_set_id.into(),
            version: version.into(),
            files,
            last_updated_at: raw
                .get("lastUpdatedAt")
                .and_then(|v| serde_json::from_value(v.clone()).ok())
                .unwrap_or_else(Utc::now),
        }
    }

    /// The entry for the given artifact type.
    ///
    /// Always present on a normalized document.
    pub fn entry(&self, artifact_type: ArtifactType) -> Option<&ArtifactStatusEntry> {
        self.files.iter().find(|e| e.artifact_type == artifact_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_artifact_type_roundtrip() {
        for t in ArtifactType::ALL {
            let parsed: ArtifactType = t.as_str().parse().unwrap();
            assert_eq!(parsed, t);
        }
        assert!("bogus".parse::<ArtifactType>().is_err());
    }

    #[test]
    fn test_artifact_type_serde_uses_wire_ids() {
        let json = serde_json::to_value(ArtifactType::SalesPlan).unwrap();
        assert_eq!(json, json!("sales-plan"));
    }

    #[test]
    fn test_fresh_document_is_all_pending_in_canonical_order() {
        let doc = StatusDocument::fresh("B1", "v3");
        assert_eq!(doc.files.len(), ArtifactType::ALL.len());
        for (entry, t) in doc.files.iter().zip(ArtifactType::ALL) {
            assert_eq!(entry.artifact_type, t);
            assert_eq!(entry.file_name, t.file_name());
            assert_eq!(entry.status, ArtifactState::Pending);
            assert!(entry.record_count.is_none());
        }
    }

    #[test]
    fn test_normalize_is_total_over_garbage() {
        for raw in [
            json!(null),
            json!(42),
            json!("not a document"),
            json!({}),
            json!({ "files": "wrong shape" }),
            json!({ "files": [null, 1, "x", {}] }),
        ] {
            let doc = StatusDocument::normalize(&raw, "B1", "v3");
            assert_eq!(doc.files.len(), ArtifactType::ALL.len());
            for (entry, t) in doc.files.iter().zip(ArtifactType::ALL) {
                assert_eq!(entry.artifact_type, t);
                assert_eq!(entry.status, ArtifactState::Pending);
            }
        }
    }

    #[test]
    fn test_normalize_keeps_mutable_fields_and_forces_file_name() {
        let raw = json!({
            "artifactSetId": "B1",
            "version": "v3",
            "files": [
                {
                    "artifactType": "sales-plan",
                    "fileName": "old_name_from_v1_schema.csv",
                    "status": "success",
                    "recordCount": 10,
                    "artifactKey": "B1/PlanVentas.csv"
                }
            ]
        });

        let doc = StatusDocument::normalize(&raw, "B1", "v3");
        let entry = doc.entry(ArtifactType::SalesPlan).unwrap();
        assert_eq!(entry.status, ArtifactState::Success);
        assert_eq!(entry.record_count, Some(10));
        assert_eq!(entry.artifact_key.as_deref(), Some("B1/PlanVentas.csv"));
        assert_eq!(entry.file_name, "PlanVentas.csv");

        // everything the stored document did not mention is pending
        let other = doc.entry(ArtifactType::ProductionPlan).unwrap();
        assert_eq!(other.status, ArtifactState::Pending);
    }

    #[test]
    fn test_normalize_drops_unknown_types_and_restores_order() {
        let raw = json!({
            "files": [
                { "artifactType": "production-plan", "status": "error", "error": "boom" },
                { "artifactType": "not-a-real-type", "status": "success" },
                { "artifactType": "supply-rules", "status": "processing" }
            ]
        });

        let doc = StatusDocument::normalize(&raw, "B1", "v3");
        assert_eq!(doc.files.len(), ArtifactType::ALL.len());
        assert_eq!(doc.files[0].artifact_type, ArtifactType::SupplyRules);
        assert_eq!(doc.files[0].status, ArtifactState::Processing);
        assert_eq!(
            doc.entry(ArtifactType::ProductionPlan).unwrap().error.as_deref(),
            Some("boom")
        );
    }

    #[test]
    fn test_persisted_field_names_are_camel_case() {
        let doc = StatusDocument::fresh("B1", "v3");
        let value = serde_json::to_value(&doc).unwrap();
        assert!(value.get("artifactSetId").is_some());
        assert!(value.get("lastUpdatedAt").is_some());
        let entry = &value["files"][0];
        assert!(entry.get("artifactType").is_some());
        assert!(entry.get("fileName").is_some());
        assert_eq!(entry["status"], json!("pending"));
        // optional fields are omitted, not serialized as null
        assert!(entry.get("recordCount").is_none());
        assert!(entry.get("error").is_none());
    }
}
