//! Resource provisioning for the object-storage tree
//!
//! Resolves the shared submissions root and the per-reference subfolder,
//! creating them when absent. Lookup-then-create is not atomic on the
//! backend, so both steps run under a lock keyed by the folder path; two
//! finalizes for the same reference never create twin folders.

use crate::locks::KeyedLocks;
use crate::retry::RetryPolicy;
use crate::sinks::ObjectStore;
use crate::{IntakeError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Where the submissions root comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RootFolder {
    /// Existing folder id supplied by configuration
    Fixed(String),
    /// Top-level folder resolved (or created) by name
    Named(String),
}

/// Folder ids for one finalize; re-derived every time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedFolder {
    pub root_id: String,
    pub reference_folder_id: String,
}

pub struct Provisioner {
    store: Arc<dyn ObjectStore>,
    locks: KeyedLocks,
    retry: RetryPolicy,
}

impl Provisioner {
    pub fn new(store: Arc<dyn ObjectStore>, locks: KeyedLocks, retry: RetryPolicy) -> Self {
        Self {
            store,
            locks,
            retry,
        }
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Return the id of the live folder `name` under `parent`, creating it
    /// when there is none.
    ///
    /// More than one live match is reported as
    /// [`IntakeError::AmbiguousFolder`] instead of picking one.
    pub async fn resolve_or_create_folder(&self, name: &str, parent: Option<&str>) -> Result<String> {
        let key = format!("folder:{}/{}", parent.unwrap_or(""), name);
        let _guard = self.locks.lock(&key).await;

        self.retry
            .run(&format!("resolve folder '{name}'"), || {
                self.lookup_or_create(name, parent)
            })
            .await
    }

    async fn lookup_or_create(&self, name: &str, parent: Option<&str>) -> Result<String> {
        let mut matches = self.store.find_folders(name, parent).await?;
        match matches.len() {
            0 => {
                let id = self.store.create_folder(name, parent).await?;
                info!("Created folder '{}' ({})", name, id);
                Ok(id)
            }
            1 => {
                let found = matches.remove(0);
                debug!("Found folder '{}' ({})", name, found.id);
                Ok(found.id)
            }
            _ => Err(IntakeError::AmbiguousFolder {
                name: name.to_string(),
                parent: parent.unwrap_or("top level").to_string(),
                ids: matches.into_iter().map(|f| f.id).collect(),
            }),
        }
    }

    /// Resolve root and reference folders, in that order
    pub async fn provision(&self, root: &RootFolder, reference: &str) -> Result<ProvisionedFolder> {
        let root_id = match root {
            RootFolder::Fixed(id) if id.trim().is_empty() => {
                return Err(IntakeError::configuration("storage root folder id is empty"));
            }
            RootFolder::Fixed(id) => id.clone(),
            RootFolder::Named(name) if name.trim().is_empty() => {
                return Err(IntakeError::configuration(
                    "storage root folder name is empty",
                ));
            }
            RootFolder::Named(name) => self.resolve_or_create_folder(name, None).await?,
        };
        let reference_folder_id = self
            .resolve_or_create_folder(reference, Some(&root_id))
            .await?;

        Ok(ProvisionedFolder {
            root_id,
            reference_folder_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::MemoryObjectStore;

    fn provisioner(store: &MemoryObjectStore) -> Provisioner {
        Provisioner::new(
            Arc::new(store.clone()),
            KeyedLocks::new(),
            RetryPolicy::immediate(),
        )
    }

    #[tokio::test]
    async fn test_existing_folder_is_reused_without_create() {
        let store = MemoryObjectStore::new();
        let existing = store.insert_folder("CNT123", Some("root"), false).await;
        let p = provisioner(&store);

        let first = p.resolve_or_create_folder("CNT123", Some("root")).await.unwrap();
        let second = p.resolve_or_create_folder("CNT123", Some("root")).await.unwrap();
        assert_eq!(first, existing);
        assert_eq!(second, existing);
        assert_eq!(store.create_calls().await, 0);
    }

    #[tokio::test]
    async fn test_missing_folder_created_once() {
        let store = MemoryObjectStore::new();
        let p = provisioner(&store);
        let first = p.resolve_or_create_folder("CNT9", None).await.unwrap();
        let second = p.resolve_or_create_folder("CNT9", None).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(store.create_calls().await, 1);
    }

    #[tokio::test]
    async fn test_trashed_folder_is_not_matched() {
        let store = MemoryObjectStore::new();
        let trashed = store.insert_folder("CNT1", None, true).await;
        let p = provisioner(&store);
        let id = p.resolve_or_create_folder("CNT1", None).await.unwrap();
        assert_ne!(id, trashed);
        assert_eq!(store.create_calls().await, 1);
    }

    #[tokio::test]
    async fn test_duplicate_folders_are_reported() {
        let store = MemoryObjectStore::new();
        store.insert_folder("CNT1", None, false).await;
        store.insert_folder("CNT1", None, false).await;
        let p = provisioner(&store);
        let err = p.resolve_or_create_folder("CNT1", None).await.unwrap_err();
        match err {
            IntakeError::AmbiguousFolder { ids, .. } => assert_eq!(ids.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(store.create_calls().await, 0);
    }

    #[tokio::test]
    async fn test_provision_nests_reference_under_root() {
        let store = MemoryObjectStore::new();
        let p = provisioner(&store);
        let folder = p
            .provision(&RootFolder::Named("Submissions".to_string()), "CNT123")
            .await
            .unwrap();

        let folders = store.folders().await;
        let child = folders
            .iter()
            .find(|f| f.id == folder.reference_folder_id)
            .unwrap();
        assert_eq!(child.name, "CNT123");
        assert_eq!(child.parent.as_deref(), Some(folder.root_id.as_str()));
    }

    #[tokio::test]
    async fn test_fixed_root_skips_root_lookup() {
        let store = MemoryObjectStore::new();
        let root = store.insert_folder("Configured", None, false).await;
        let p = provisioner(&store);
        let folder = p
            .provision(&RootFolder::Fixed(root.clone()), "CNT1")
            .await
            .unwrap();
        assert_eq!(folder.root_id, root);
        assert_eq!(store.create_calls().await, 1);
    }

    #[tokio::test]
    async fn test_blank_root_is_configuration_error() {
        let store = MemoryObjectStore::new();
        let p = provisioner(&store);
        let result = p.provision(&RootFolder::Named(" ".to_string()), "CNT1").await;
        assert!(matches!(result, Err(IntakeError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_concurrent_provisioning_creates_one_folder() {
        let store = MemoryObjectStore::new();
        let p = Arc::new(provisioner(&store));
        let root = RootFolder::Named("Submissions".to_string());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let p = p.clone();
                let root = root.clone();
                tokio::spawn(async move { p.provision(&root, "CNT777").await })
            })
            .collect();

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().unwrap().reference_folder_id);
        }
        ids.dedup();
        assert_eq!(ids.len(), 1);
        assert_eq!(store.folders_named("CNT777").await.len(), 1);
        assert_eq!(store.folders_named("Submissions").await.len(), 1);
    }
}
