//! Versioned-index management behind a stable alias.

use serde_json::json;
use tracing::{info, warn};

use crate::client::EsClient;
use crate::error::{Result, SearchError};
use crate::mapping::index_mapping;

/// Owns the alias and drives the versioned-index protocol. The alias
/// resolves to exactly one physical index at every point during a
/// migrate or rollback; both swaps are single `_aliases` calls.
pub struct IndexManager {
    client: EsClient,
    alias: String,
}

/// Snapshot of the alias and its physical indices.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexStatus {
    pub alias: String,
    pub exists: bool,
    pub current_index: Option<String>,
    pub version: Option<u32>,
    pub document_count: Option<u64>,
    pub all_versions: Vec<String>,
}

impl IndexManager {
    pub fn new(client: EsClient, alias: impl Into<String>) -> Self {
        Self {
            client,
            alias: alias.into(),
        }
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn client(&self) -> &EsClient {
        &self.client
    }

    /// `<alias>_v<N>`
    pub fn index_name(&self, version: u32) -> String {
        format!("{}_v{}", self.alias, version)
    }

    /// Parse `<alias>_v<N>` back to `N`.
    pub fn parse_version(&self, index: &str) -> Result<u32> {
        let invalid = || SearchError::InvalidIndexName {
            alias: self.alias.clone(),
            name: index.to_string(),
        };
        let suffix = index
            .strip_prefix(self.alias.as_str())
            .and_then(|rest| rest.strip_prefix("_v"))
            .ok_or_else(invalid)?;
        let version: u32 = suffix.parse().map_err(|_| invalid())?;
        if version == 0 {
            return Err(invalid());
        }
        Ok(version)
    }

    /// The physical index the alias currently points at, if the alias
    /// exists.
    pub async fn current_index(&self) -> Result<Option<String>> {
        let response = self.client.get(&format!("/_alias/{}", self.alias)).await?;
        if response.is_not_found() {
            return Ok(None);
        }
        let body = response.into_body()?;
        Ok(body
            .as_object()
            .and_then(|map| map.keys().next())
            .map(|name| name.to_string()))
    }

    async fn index_exists(&self, index: &str) -> Result<bool> {
        let response = self.client.head(&format!("/{index}")).await?;
        Ok(response.is_success())
    }

    async fn create_index(&self, index: &str) -> Result<()> {
        let mapping = index_mapping();
        self.client
            .put(&format!("/{index}"), Some(&mapping))
            .await?
            .into_body()?;
        Ok(())
    }

    /// Create `<alias>_v1` and the alias if the alias does not exist;
    /// returns the current physical index either way.
    pub async fn initialize(&self) -> Result<String> {
        if let Some(current) = self.current_index().await? {
            return Ok(current);
        }
        let index = self.index_name(1);
        info!(index = %index, alias = %self.alias, "creating initial index");
        self.create_index(&index).await?;
        self.client
            .put(&format!("/{index}/_alias/{}", self.alias), None)
            .await?
            .into_body()?;
        Ok(index)
    }

    /// Create the next version with the current mapping, copy-index
    /// server-side, and swing the alias in one atomic call. The old
    /// index is write-blocked but kept for rollback.
    pub async fn migrate(&self) -> Result<String> {
        let Some(current) = self.current_index().await? else {
            return self.initialize().await;
        };
        let version = self.parse_version(&current)?;
        let next = self.index_name(version + 1);

        info!(from = %current, to = %next, "migrating index");
        self.create_index(&next).await?;

        let reindex = self
            .client
            .post(
                "/_reindex?wait_for_completion=true",
                Some(&json!({
                    "source": {"index": current},
                    "dest": {"index": next},
                })),
            )
            .await?
            .into_body()?;
        info!(
            total = reindex.get("total").and_then(|t| t.as_u64()).unwrap_or(0),
            "reindex complete"
        );

        self.swap_alias(&current, &next).await?;

        self.client
            .put(&format!("/{current}/_block/write"), None)
            .await?
            .into_body()?;

        Ok(next)
    }

    /// Swing the alias back to the previous version. Requires the
    /// current version to be above 1 and the previous physical index
    /// to still exist.
    pub async fn rollback(&self) -> Result<String> {
        let Some(current) = self.current_index().await? else {
            return Err(SearchError::NoIndex {
                alias: self.alias.clone(),
            });
        };
        let version = self.parse_version(&current)?;
        if version <= 1 {
            return Err(SearchError::CannotRollbackPastV1 { current });
        }
        let previous = self.index_name(version - 1);
        if !self.index_exists(&previous).await? {
            return Err(SearchError::PreviousIndexMissing { index: previous });
        }

        info!(from = %current, to = %previous, "rolling back index");
        self.client
            .put(
                &format!("/{previous}/_settings"),
                Some(&json!({"index.blocks.write": false})),
            )
            .await?
            .into_body()?;

        self.swap_alias(&current, &previous).await?;
        Ok(previous)
    }

    async fn swap_alias(&self, from: &str, to: &str) -> Result<()> {
        self.client
            .post(
                "/_aliases",
                Some(&json!({
                    "actions": [
                        {"remove": {"index": from, "alias": self.alias}},
                        {"add": {"index": to, "alias": self.alias}},
                    ]
                })),
            )
            .await?
            .into_body()?;
        Ok(())
    }

    /// Delete physical indices older than the newest `keep_latest`
    /// versions. Already-deleted indices are tolerated. Returns the
    /// indices actually deleted.
    pub async fn delete_old_versions(&self, keep_latest: u32) -> Result<Vec<String>> {
        let Some(current) = self.current_index().await? else {
            return Ok(Vec::new());
        };
        let version = self.parse_version(&current)?;
        if version <= keep_latest {
            return Ok(Vec::new());
        }

        let mut deleted = Vec::new();
        for v in 1..=version - keep_latest {
            let index = self.index_name(v);
            let response = self.client.delete(&format!("/{index}")).await?;
            if response.is_not_found() {
                continue;
            }
            response.into_body()?;
            info!(index = %index, "deleted old index version");
            deleted.push(index);
        }
        Ok(deleted)
    }

    /// Delete every versioned physical index (and with them the
    /// alias). Used by full rebuilds.
    pub async fn delete_all_versions(&self) -> Result<Vec<String>> {
        let Some(current) = self.current_index().await? else {
            return Ok(Vec::new());
        };
        let version = self.parse_version(&current)?;
        let mut deleted = Vec::new();
        for v in 1..=version + 1 {
            let index = self.index_name(v);
            let response = self.client.delete(&format!("/{index}")).await?;
            if response.is_not_found() {
                continue;
            }
            response.into_body()?;
            deleted.push(index);
        }
        warn!(alias = %self.alias, count = deleted.len(), "deleted all index versions");
        Ok(deleted)
    }

    /// Report the alias, current physical index, version, document
    /// count, and every versioned index still on disk.
    pub async fn status(&self) -> Result<IndexStatus> {
        let Some(current) = self.current_index().await? else {
            return Ok(IndexStatus {
                alias: self.alias.clone(),
                exists: false,
                current_index: None,
                version: None,
                document_count: None,
                all_versions: Vec::new(),
            });
        };
        let version = self.parse_version(&current)?;

        let count_body = self
            .client
            .get(&format!("/{}/_count", self.alias))
            .await?
            .into_body()?;
        let document_count = count_body.get("count").and_then(|c| c.as_u64());

        // Look one version past the current to surface orphans left by
        // an interrupted migrate.
        let mut all_versions = Vec::new();
        for v in 1..=version + 1 {
            let index = self.index_name(v);
            if self.index_exists(&index).await? {
                all_versions.push(index);
            }
        }

        Ok(IndexStatus {
            alias: self.alias.clone(),
            exists: true,
            current_index: Some(current),
            version: Some(version),
            document_count,
            all_versions,
        })
    }

    /// Refresh the alias so writes are immediately searchable.
    pub async fn refresh(&self) -> Result<()> {
        self.client
            .post(&format!("/{}/_refresh", self.alias), None)
            .await?
            .into_body()?;
        Ok(())
    }
}
