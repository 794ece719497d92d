//! Alias publishing and garbage collection of physical indices.

use std::sync::Arc;

use tracing::{debug, info};

use crsearch_client::{BackendError, SearchBackend};
use crsearch_types::{AliasAction, IndexHandle};

use crate::error::IndexingError;

/// Moves the stable alias between physical indices.
pub struct IndexLifecycleManager {
    backend: Arc<dyn SearchBackend>,
}

impl IndexLifecycleManager {
    pub fn new(backend: Arc<dyn SearchBackend>) -> Self {
        Self { backend }
    }

    /// Physical indices currently behind `alias`; a missing alias is empty.
    pub async fn live_indices(&self, alias: &str) -> Result<Vec<String>, IndexingError> {
        match self.backend.aliased_indices(alias).await {
            Ok(indices) => Ok(indices),
            Err(e) if e.is_not_found() => {
                debug!(alias = %alias, "Alias does not exist yet");
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Point the alias at `handle.name` in one atomic alias request.
    pub async fn update_index_alias(&self, handle: &IndexHandle) -> Result<(), IndexingError> {
        if !handle.is_namespaced() {
            return Err(IndexingError::MissingIndexPostfix {
                index: handle.name.clone(),
                alias: handle.alias.clone(),
            });
        }
        if !self.backend.index_exists(&handle.name).await? {
            return Err(IndexingError::TargetIndexMissing {
                index: handle.name.clone(),
            });
        }

        let current = self.live_indices(&handle.alias).await?;
        let mut actions = Vec::with_capacity(current.len() + 1);
        if current.is_empty() {
            // A bare index squatting on the alias name must go first.
            if self.backend.index_exists(&handle.alias).await? {
                self.backend
                    .delete_indices(std::slice::from_ref(&handle.alias))
                    .await
                    .map_err(|e| match e {
                        BackendError::UnexpectedStatus { status, body } => {
                            BackendError::UnexpectedStatus {
                                status,
                                body: format!(
                                    "index {} could not be removed to be replaced by an alias: {}",
                                    handle.alias, body
                                ),
                            }
                        }
                        other => other,
                    })?;
                info!(index = %handle.alias, "Removed bare index in place of the alias");
            }
        } else {
            for index in &current {
                actions.push(AliasAction::remove(index.clone(), handle.alias.clone()));
            }
        }
        actions.push(AliasAction::add(handle.name.clone(), handle.alias.clone()));

        self.backend.update_aliases(&actions).await?;
        info!(
            alias = %handle.alias,
            index = %handle.name,
            previous = ?current,
            "Switched alias"
        );
        Ok(())
    }

    /// Delete every `alias-` prefixed index that is not live; returns the names.
    ///
    /// Fails with `NotFound` while the alias does not exist, so nothing is
    /// deleted before a first publish.
    pub async fn remove_old_indices(&self, handle: &IndexHandle) -> Result<Vec<String>, IndexingError> {
        let live = self.backend.aliased_indices(&handle.alias).await?;
        let removable: Vec<String> = self
            .backend
            .list_indices()
            .await?
            .into_iter()
            .filter(|name| handle.owns(name) && !live.contains(name))
            .collect();

        if !removable.is_empty() {
            self.backend.delete_indices(&removable).await?;
            info!(alias = %handle.alias, removed = ?removable, "Removed old indices");
        }
        Ok(removable)
    }
}
