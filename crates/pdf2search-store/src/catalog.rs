//! Document catalog operations.

use std::path::{Path, PathBuf};

use pdf2search_core::Document;
use tokio_postgres::Row;

use crate::error::Result;
use crate::store::Store;

pub(crate) fn document_from_row(row: &Row) -> Document {
    Document {
        id: row.get("id"),
        file_path: PathBuf::from(row.get::<_, String>("file_path")),
        created_at: row.get("created_at"),
    }
}

impl Store {
    /// Register a document by path. Returns the new id, or `None` if
    /// the path is already registered. Idempotent; conflicts are not
    /// errors.
    pub async fn register_document(&self, file_path: &Path) -> Result<Option<i32>> {
        let row = self
            .client
            .query_opt(
                "INSERT INTO documents (file_path)
                 VALUES ($1)
                 ON CONFLICT (file_path) DO NOTHING
                 RETURNING id",
                &[&path_str(file_path)],
            )
            .await?;
        Ok(row.map(|r| r.get(0)))
    }

    /// Register many documents; returns how many rows were new.
    pub async fn register_documents(&self, paths: &[PathBuf]) -> Result<u64> {
        let stmt = self
            .client
            .prepare(
                "INSERT INTO documents (file_path)
                 VALUES ($1)
                 ON CONFLICT (file_path) DO NOTHING",
            )
            .await?;
        let mut inserted = 0;
        for path in paths {
            inserted += self.client.execute(&stmt, &[&path_str(path)]).await?;
        }
        Ok(inserted)
    }

    pub async fn document_by_id(&self, id: i32) -> Result<Option<Document>> {
        let row = self
            .client
            .query_opt(
                "SELECT id, file_path, created_at FROM documents WHERE id = $1",
                &[&id],
            )
            .await?;
        Ok(row.as_ref().map(document_from_row))
    }

    pub async fn document_by_path(&self, file_path: &Path) -> Result<Option<Document>> {
        let row = self
            .client
            .query_opt(
                "SELECT id, file_path, created_at FROM documents WHERE file_path = $1",
                &[&path_str(file_path)],
            )
            .await?;
        Ok(row.as_ref().map(document_from_row))
    }

    /// All documents ordered by id.
    pub async fn all_documents(&self, limit: Option<i64>) -> Result<Vec<Document>> {
        let rows = match limit {
            Some(limit) => {
                self.client
                    .query(
                        "SELECT id, file_path, created_at FROM documents ORDER BY id LIMIT $1",
                        &[&limit],
                    )
                    .await?
            }
            None => {
                self.client
                    .query(
                        "SELECT id, file_path, created_at FROM documents ORDER BY id",
                        &[],
                    )
                    .await?
            }
        };
        Ok(rows.iter().map(document_from_row).collect())
    }
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
