//! Status query with reconciliation
//!
//! Read path for callers that cannot observe the generation process. The
//! recorded status document can drift from reality (an invocation died
//! between upload and status write, or an artifact was deleted), so the
//! query lists the artifact set's storage prefix and corrects entries that
//! disagree with the observed objects. The corrected document is returned
//! without being written back; the next status write re-normalizes anyway.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use bomx_common::status::StatusDocument;

use crate::features::explosion::store::{artifact_key, set_prefix, StatusStore, StoreError};
use crate::storage::ObjectStore;

/// Query input contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusQuery {
    pub artifact_set_id: String,
    pub version: String,
}

#[derive(Debug, thiserror::Error)]
pub enum StatusQueryError {
    #[error("artifactSetId and version are required")]
    MissingInput,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Load the status document and reconcile it against stored artifacts.
#[instrument(skip(store))]
pub async fn handle(
    store: Arc<dyn ObjectStore>,
    query: StatusQuery,
) -> Result<StatusDocument, StatusQueryError> {
    if query.artifact_set_id.trim().is_empty() || query.version.trim().is_empty() {
        return Err(StatusQueryError::MissingInput);
    }

    let status_store = StatusStore::new(store.clone());
    let doc = status_store
        .load(&query.artifact_set_id, &query.version)
        .await?;

    // Best effort: a listing failure must not turn a status read into an
    // error, so the document is returned as recorded.
    let existing_keys = match store.list(&set_prefix(&query.artifact_set_id)).await {
        Ok(keys) => keys,
        Err(e) => {
            warn!(error = %e, "storage listing failed, returning status as recorded");
            return Ok(doc);
        }
    };

    Ok(reconcile(doc, &existing_keys))
}

/// Correct entries whose recorded state disagrees with the observed keys.
fn reconcile(mut doc: StatusDocument, existing_keys: &[String]) -> StatusDocument {
    for entry in doc.files.iter_mut() {
        let expected_key = artifact_key(&doc.artifact_set_id, &entry.file_name);
        let exists = existing_keys.iter().any(|k| *k == expected_key);

        if exists && !entry.status.is_success() {
            debug!(key = %expected_key, "artifact present, correcting status to success");
            entry.status = bomx_common::status::ArtifactState::Success;
            entry.artifact_key = Some(expected_key);
            entry.updated_at = Some(Utc::now());
            doc.last_updated_at = Utc::now();
        } else if !exists && entry.status.is_success() {
            debug!(key = %expected_key, "artifact missing, correcting status to pending");
            entry.status = bomx_common::status::ArtifactState::Pending;
            entry.artifact_key = None;
            entry.updated_at = Some(Utc::now());
            doc.last_updated_at = Utc::now();
        }
    }
    doc
}
