//! Manifest discovery and claim.

use std::collections::HashMap;

use tracing::{debug, error, info, warn};

use crate::manifest::{is_manifest_name, remote_id_from_name, RemoteManifestEntry};
use crate::metadata::MetadataRecord;
use crate::metrics;
use crate::storage::StorageError;

use super::context::CycleContext;
use super::types::OrchestratorError;

/// List the outbox and claim every manifest not seen before.
///
/// A claim is the creation of the manifest's metadata record; only entries
/// this call created a record for are returned. A listing failure aborts
/// before anything is claimed.
pub async fn discover(ctx: &CycleContext) -> Result<Vec<RemoteManifestEntry>, OrchestratorError> {
    let outbox = &ctx.identity.outbox;
    let entries = ctx
        .bounded(
            ctx.storage.list(outbox.storage_id(), outbox.path()),
            || StorageError::Timeout,
        )
        .await
        .map_err(OrchestratorError::Discovery)?;

    debug!(
        storage_id = outbox.storage_id(),
        path = outbox.path(),
        entries = entries.len(),
        "Listed outbox"
    );

    let mut claimed = Vec::new();
    let mut seen: HashMap<String, String> = HashMap::new();
    for entry in entries {
        if !is_manifest_name(&entry.name) {
            continue;
        }

        let Some(remote_id) = remote_id_from_name(&entry.name) else {
            warn!(name = %entry.name, "Manifest name has no remote id, skipping");
            continue;
        };

        // `{prefix}x` and `{prefix}_x` both map to `x`; only one can be claimed.
        if let Some(first) = seen.get(&remote_id) {
            warn!(
                remote_id = %remote_id,
                name = %entry.name,
                claimed_by = %first,
                "Manifest names collide on remote id, skipping"
            );
            continue;
        }
        seen.insert(remote_id.clone(), entry.name.clone());

        match ctx.store.create_if_absent(&MetadataRecord::new_init(&remote_id)) {
            Ok(true) => {
                info!(remote_id = %remote_id, path = %entry.path, "Claimed manifest");
                metrics::MANIFESTS_CLAIMED.inc();
                claimed.push(RemoteManifestEntry {
                    remote_id,
                    name: entry.name,
                    path: entry.path,
                    uri: entry.uri,
                });
            }
            Ok(false) => {
                debug!(remote_id = %remote_id, "Manifest already claimed");
            }
            Err(e) => {
                error!(remote_id = %remote_id, error = %e, "Failed to claim manifest");
            }
        }
    }

    Ok(claimed)
}
