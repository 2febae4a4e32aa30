//! Artifact (enhancement) store operations.

use pdf2search_core::{sanitize_content, Document, Enhancement, EnhancementType};
use serde_json::Value;
use tokio_postgres::Row;

use crate::catalog::document_from_row;
use crate::error::Result;
use crate::store::Store;

fn enhancement_from_row(row: &Row) -> Result<Enhancement> {
    Ok(Enhancement {
        id: row.get("id"),
        document_id: row.get("document_id"),
        enhancement_type: row.get::<_, String>("enhancement_type").parse()?,
        content: row.get("content"),
        robot_id: row.get("robot_id"),
        created_at: row.get("created_at"),
    })
}

impl Store {
    /// Upsert an artifact on `(document_id, enhancement_type,
    /// robot_id)`, overwriting content and refreshing the timestamp on
    /// conflict. Content is sanitized for JSONB before serialization.
    pub async fn put_enhancement(
        &self,
        document_id: i32,
        enhancement_type: EnhancementType,
        content: Value,
        robot_id: &str,
    ) -> Result<i32> {
        let content = sanitize_content(content);
        let row = self
            .client
            .query_one(
                "INSERT INTO enhancements (document_id, enhancement_type, content, robot_id)
                 VALUES ($1, $2, $3, $4)
                 ON CONFLICT (document_id, enhancement_type, robot_id)
                 DO UPDATE SET content = EXCLUDED.content, created_at = NOW()
                 RETURNING id",
                &[
                    &document_id,
                    &enhancement_type.as_str(),
                    &content,
                    &robot_id,
                ],
            )
            .await?;
        Ok(row.get(0))
    }

    /// All artifacts for a document, ordered by creation time.
    pub async fn enhancements_for_document(&self, document_id: i32) -> Result<Vec<Enhancement>> {
        let rows = self
            .client
            .query(
                "SELECT id, document_id, enhancement_type, content, robot_id, created_at
                 FROM enhancements
                 WHERE document_id = $1
                 ORDER BY created_at",
                &[&document_id],
            )
            .await?;
        rows.iter().map(enhancement_from_row).collect()
    }

    /// Most recently created artifact of a type for a document.
    pub async fn enhancement(
        &self,
        document_id: i32,
        enhancement_type: EnhancementType,
    ) -> Result<Option<Enhancement>> {
        let row = self
            .client
            .query_opt(
                "SELECT id, document_id, enhancement_type, content, robot_id, created_at
                 FROM enhancements
                 WHERE document_id = $1 AND enhancement_type = $2
                 ORDER BY created_at DESC, id DESC
                 LIMIT 1",
                &[&document_id, &enhancement_type.as_str()],
            )
            .await?;
        row.as_ref().map(enhancement_from_row).transpose()
    }

    /// Documents joined with their artifacts, for the search
    /// projection. Both queries run in one transaction so each
    /// document sees a self-consistent artifact set.
    pub async fn documents_with_enhancements(
        &mut self,
        document_ids: Option<&[i32]>,
        limit: Option<i64>,
    ) -> Result<Vec<(Document, Vec<Enhancement>)>> {
        let tx = self.client.transaction().await?;

        let doc_rows = match (document_ids, limit) {
            (Some(ids), _) => {
                tx.query(
                    "SELECT id, file_path, created_at FROM documents
                     WHERE id = ANY($1) ORDER BY id",
                    &[&ids],
                )
                .await?
            }
            (None, Some(limit)) => {
                tx.query(
                    "SELECT id, file_path, created_at FROM documents ORDER BY id LIMIT $1",
                    &[&limit],
                )
                .await?
            }
            (None, None) => {
                tx.query(
                    "SELECT id, file_path, created_at FROM documents ORDER BY id",
                    &[],
                )
                .await?
            }
        };

        if doc_rows.is_empty() {
            tx.commit().await?;
            return Ok(Vec::new());
        }

        let ids: Vec<i32> = doc_rows.iter().map(|r| r.get("id")).collect();
        let enh_rows = tx
            .query(
                "SELECT id, document_id, enhancement_type, content, robot_id, created_at
                 FROM enhancements
                 WHERE document_id = ANY($1)
                 ORDER BY document_id, created_at",
                &[&ids],
            )
            .await?;
        tx.commit().await?;

        let mut grouped: std::collections::HashMap<i32, Vec<Enhancement>> =
            std::collections::HashMap::new();
        for row in &enh_rows {
            let enh = enhancement_from_row(row)?;
            grouped.entry(enh.document_id).or_default().push(enh);
        }

        Ok(doc_rows
            .iter()
            .map(|row| {
                let doc = document_from_row(row);
                let enhancements = grouped.remove(&doc.id).unwrap_or_default();
                (doc, enhancements)
            })
            .collect())
    }
}
