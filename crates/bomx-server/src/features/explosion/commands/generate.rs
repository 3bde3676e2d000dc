//! Generate-artifact command
//!
//! One invocation produces exactly one artifact type for one
//! (artifact set, version) pair: validate, mark the entry processing,
//! connect to the relational source, build and upload the CSV, then mark
//! the entry success or error. The caller that wants all five artifact
//! types issues one invocation per type.
//!
//! Nothing propagates out of `handle` as an error: every outcome becomes a
//! structured response carrying the best-known status document.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use bomx_common::status::{ArtifactStatusEntry, ArtifactState, ArtifactType, StatusDocument};

use crate::db::{SourceConnection, SourceConnector};
use crate::features::explosion::builder;
use crate::features::explosion::store::{artifact_key, StatusStore};
use crate::storage::ObjectStore;

/// Content type of every generated artifact.
pub const ARTIFACT_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

/// Job input contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateArtifactCommand {
    #[serde(default)]
    pub artifact_set_id: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub artifact_type: String,
}

/// Details of a successfully generated artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedFile {
    pub artifact_type: ArtifactType,
    pub file_name: String,
    pub record_count: u64,
    pub artifact_key: String,
}

/// Job output contract. Always well-formed; `status` carries the best
/// current knowledge whenever a document was read or written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateArtifactResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_file: Option<GeneratedFile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusDocument>,
}

impl GenerateArtifactResponse {
    fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            generated_file: None,
            error: None,
            status: None,
        }
    }

    fn failed(error: impl Into<String>, status: Option<StatusDocument>) -> Self {
        Self {
            success: false,
            message: "artifact generation failed".to_string(),
            generated_file: None,
            error: Some(error.into()),
            status,
        }
    }
}

/// Run one generation invocation end to end.
#[instrument(skip(store, connector, cmd), fields(
    artifact_set = %cmd.artifact_set_id,
    version = %cmd.version,
    artifact_type = %cmd.artifact_type,
))]
pub async fn handle(
    store: Arc<dyn ObjectStore>,
    connector: Arc<dyn SourceConnector>,
    cmd: GenerateArtifactCommand,
) -> GenerateArtifactResponse {
    let invocation_id = Uuid::new_v4();

    // Received -> Validated: reject before any side effect.
    if cmd.artifact_set_id.trim().is_empty()
        || cmd.version.trim().is_empty()
        || cmd.artifact_type.trim().is_empty()
    {
        return GenerateArtifactResponse::rejected(
            "artifactSetId, version and artifactType are required",
        );
    }
    let artifact_type: ArtifactType = match cmd.artifact_type.parse() {
        Ok(t) => t,
        Err(_) => {
            return GenerateArtifactResponse::rejected(format!(
                "unknown artifact type '{}'; valid types: {}",
                cmd.artifact_type,
                ArtifactType::valid_ids()
            ));
        }
    };

    let set = cmd.artifact_set_id.as_str();
    let version = cmd.version.as_str();
    let status_store = StatusStore::new(store.clone());

    info!(%invocation_id, "starting artifact generation");

    // Validated -> Processing: the processing write must land before the
    // relational query begins, so concurrent readers see the transition.
    let doc = match status_store
        .update(set, version, artifact_type, set_processing)
        .await
    {
        Ok(doc) => doc,
        Err(e) => {
            error!(%invocation_id, error = %e, "cannot establish prior status state");
            return GenerateArtifactResponse::failed(e.to_string(), None);
        }
    };

    // Open the source connection; exhausting the retry budget is terminal.
    let mut conn = match connector.connect().await {
        Ok(conn) => conn,
        Err(e) => {
            let message = e.to_string();
            error!(%invocation_id, error = %message, "source connection failed");
            let status = record_error(&status_store, set, version, artifact_type, &message)
                .await
                .or(Some(doc));
            return GenerateArtifactResponse::failed(message, status);
        }
    };

    // Build, upload, and write the terminal status. The connection is
    // closed on every exit path once it has been opened.
    let outcome = run_pipeline(
        &status_store,
        store.as_ref(),
        conn.as_mut(),
        set,
        version,
        artifact_type,
    )
    .await;
    conn.close().await;

    match outcome {
        Ok((generated, status)) => {
            info!(
                %invocation_id,
                record_count = generated.record_count,
                artifact_key = %generated.artifact_key,
                "artifact generated"
            );
            GenerateArtifactResponse {
                success: true,
                message: format!(
                    "generated {} with {} records",
                    generated.file_name, generated.record_count
                ),
                generated_file: Some(generated),
                error: None,
                status: Some(status),
            }
        }
        Err(message) => {
            error!(%invocation_id, error = %message, "artifact generation failed");
            let status = record_error(&status_store, set, version, artifact_type, &message)
                .await
                .or(Some(doc));
            GenerateArtifactResponse::failed(message, status)
        }
    }
}

/// Processing -> Succeeded happy path; any failure is returned as the
/// message that ends up in the error status entry.
async fn run_pipeline(
    status_store: &StatusStore,
    store: &dyn ObjectStore,
    conn: &mut dyn SourceConnection,
    set: &str,
    version: &str,
    artifact_type: ArtifactType,
) -> Result<(GeneratedFile, StatusDocument), String> {
    let built = builder::build(conn, artifact_type, version)
        .await
        .map_err(|e| e.to_string())?;

    let key = artifact_key(set, built.file_name);
    let upload = store
        .put(&key, built.csv, ARTIFACT_CONTENT_TYPE)
        .await
        .map_err(|e| e.to_string())?;
    info!(key = %upload.key, size = upload.size, checksum = %upload.checksum, "artifact uploaded");

    let record_count = built.record_count;
    let entry_key = key.clone();
    let status = status_store
        .update(set, version, artifact_type, move |e| {
            set_success(e, record_count, entry_key)
        })
        .await
        .map_err(|e| e.to_string())?;

    Ok((
        GeneratedFile {
            artifact_type,
            file_name: built.file_name.to_string(),
            record_count,
            artifact_key: key,
        },
        status,
    ))
}

/// Best-effort terminal error write; a failure here is logged and the
/// already-decided failure result stands.
async fn record_error(
    status_store: &StatusStore,
    set: &str,
    version: &str,
    artifact_type: ArtifactType,
    message: &str,
) -> Option<StatusDocument> {
    let message = message.to_string();
    match status_store
        .update(set, version, artifact_type, move |e| set_error(e, message))
        .await
    {
        Ok(doc) => Some(doc),
        Err(e) => {
            warn!(error = %e, "failed to record error status");
            None
        }
    }
}

fn set_processing(mut entry: ArtifactStatusEntry) -> ArtifactStatusEntry {
    entry.status = ArtifactState::Processing;
    entry.record_count = None;
    entry.artifact_key = None;
    entry.error = None;
    entry.updated_at = Some(Utc::now());
    entry
}

fn set_success(
    mut entry: ArtifactStatusEntry,
    record_count: u64,
    artifact_key: String,
) -> ArtifactStatusEntry {
    entry.status = ArtifactState::Success;
    entry.record_count = Some(record_count);
    entry.artifact_key = Some(artifact_key);
    entry.error = None;
    entry.updated_at = Some(Utc::now());
    entry
}

fn set_error(mut entry: ArtifactStatusEntry, message: String) -> ArtifactStatusEntry {
    entry.status = ArtifactState::Error;
    entry.error = Some(message);
    entry.updated_at = Some(Utc::now());
    entry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_processing_clears_prior_outcome() {
        let mut entry = ArtifactStatusEntry::pending(ArtifactType::SalesPlan);
        entry.record_count = Some(10);
        entry.artifact_key = Some("B1/PlanVentas.csv".to_string());
        entry.error = Some("old failure".to_string());

        let entry = set_processing(entry);
        assert_eq!(entry.status, ArtifactState::Processing);
        assert!(entry.record_count.is_none());
        assert!(entry.artifact_key.is_none());
        assert!(entry.error.is_none());
        assert!(entry.updated_at.is_some());
    }

    #[test]
    fn test_set_success_records_outcome() {
        let entry = set_success(
            ArtifactStatusEntry::pending(ArtifactType::SalesPlan),
            10,
            "B1/PlanVentas.csv".to_string(),
        );
        assert_eq!(entry.status, ArtifactState::Success);
        assert_eq!(entry.record_count, Some(10));
        assert_eq!(entry.artifact_key.as_deref(), Some("B1/PlanVentas.csv"));
    }

    #[test]
    fn test_response_serialization_skips_empty_fields() {
        let response = GenerateArtifactResponse::rejected("bad input");
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["success"], serde_json::json!(false));
        assert!(value.get("generatedFile").is_none());
        assert!(value.get("status").is_none());
    }
}
