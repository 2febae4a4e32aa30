//! Work-queue operations over `pending_enhancements`.

use pdf2search_core::{EnhancementType, PendingEnhancement, PendingStatus};
use tokio_postgres::Row;
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::store::Store;

fn pending_from_row(row: &Row) -> Result<PendingEnhancement> {
    Ok(PendingEnhancement {
        id: row.get("id"),
        document_id: row.get("document_id"),
        enhancement_type: row.get::<_, String>("enhancement_type").parse()?,
        status: row.get::<_, String>("status").parse()?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        attempts: row.get("attempts"),
        last_error: row.get("last_error"),
    })
}

const PENDING_COLUMNS: &str =
    "id, document_id, enhancement_type, status, created_at, updated_at, attempts, last_error";

impl Store {
    /// Enqueue one unit of work for `(document_id, enhancement_type)`.
    ///
    /// Upsert semantics: a row resting in `COMPLETED`, `FAILED`,
    /// `EXPIRED`, `DISCARDED`, or `INDEXING_FAILED` is revived to
    /// `PENDING`; an in-flight row is left untouched. Existing
    /// artifacts survive a revival, so a re-run overwrites them via
    /// the artifact upsert. `attempts` is never reset.
    pub async fn enqueue(
        &self,
        document_id: i32,
        enhancement_type: EnhancementType,
    ) -> Result<i32> {
        let row = self
            .client
            .query_one(
                "INSERT INTO pending_enhancements (document_id, enhancement_type, status)
                 VALUES ($1, $2, 'PENDING')
                 ON CONFLICT (document_id, enhancement_type) DO UPDATE
                 SET status = CASE
                     WHEN pending_enhancements.status IN
                         ('COMPLETED', 'FAILED', 'EXPIRED', 'DISCARDED', 'INDEXING_FAILED')
                     THEN 'PENDING'
                     ELSE pending_enhancements.status
                 END,
                 updated_at = NOW()
                 RETURNING id",
                &[&document_id, &enhancement_type.as_str()],
            )
            .await?;
        Ok(row.get(0))
    }

    /// Atomically claim the oldest `PENDING` unit of the given type,
    /// moving it to `PROCESSING` and incrementing `attempts`.
    ///
    /// The inner select locks the row with `FOR UPDATE SKIP LOCKED`,
    /// so concurrent claimers never observe the same row and never
    /// block on each other. Returns `None` when the queue is empty.
    pub async fn claim_next(
        &self,
        enhancement_type: EnhancementType,
    ) -> Result<Option<PendingEnhancement>> {
        let sql = format!(
            "UPDATE pending_enhancements
             SET status = 'PROCESSING',
                 attempts = attempts + 1,
                 updated_at = NOW()
             WHERE id = (
                 SELECT id FROM pending_enhancements
                 WHERE status = 'PENDING' AND enhancement_type = $1
                 ORDER BY created_at, id
                 FOR UPDATE SKIP LOCKED
                 LIMIT 1
             )
             RETURNING {PENDING_COLUMNS}"
        );
        let row = self
            .client
            .query_opt(sql.as_str(), &[&enhancement_type.as_str()])
            .await?;
        row.as_ref().map(pending_from_row).transpose()
    }

    /// Transition a unit to `status`, verifying the edge against the
    /// state machine. The current status is read under `FOR UPDATE` in
    /// the same transaction as the write, so the guard cannot race
    /// with another writer.
    pub async fn set_status(
        &mut self,
        id: i32,
        status: PendingStatus,
        last_error: Option<&str>,
    ) -> Result<()> {
        let tx = self.client.transaction().await?;
        let row = tx
            .query_opt(
                "SELECT status FROM pending_enhancements WHERE id = $1 FOR UPDATE",
                &[&id],
            )
            .await?
            .ok_or(StoreError::PendingNotFound(id))?;
        let current: PendingStatus = row.get::<_, String>(0).parse()?;
        current.guard_transition(status)?;

        tx.execute(
            "UPDATE pending_enhancements
             SET status = $1, last_error = $2, updated_at = NOW()
             WHERE id = $3",
            &[&status.as_str(), &last_error, &id],
        )
        .await?;
        tx.commit().await?;
        debug!(id, from = %current, to = %status, "pending status updated");
        Ok(())
    }

    /// Inspection query for operators and tests, ordered by creation
    /// time.
    pub async fn pending_by_status(
        &self,
        statuses: &[PendingStatus],
        enhancement_type: Option<EnhancementType>,
        limit: Option<i64>,
    ) -> Result<Vec<PendingEnhancement>> {
        let status_strs: Vec<&str> = statuses.iter().map(|s| s.as_str()).collect();
        let mut sql = format!(
            "SELECT {PENDING_COLUMNS} FROM pending_enhancements WHERE status = ANY($1)"
        );
        let ty_str = enhancement_type.map(|t| t.as_str());
        if ty_str.is_some() {
            sql.push_str(" AND enhancement_type = $2");
        }
        sql.push_str(" ORDER BY created_at");
        if limit.is_some() {
            sql.push_str(if ty_str.is_some() {
                " LIMIT $3"
            } else {
                " LIMIT $2"
            });
        }

        let rows = match (ty_str, limit) {
            (Some(ty), Some(limit)) => {
                self.client
                    .query(sql.as_str(), &[&status_strs, &ty, &limit])
                    .await?
            }
            (Some(ty), None) => self.client.query(sql.as_str(), &[&status_strs, &ty]).await?,
            (None, Some(limit)) => {
                self.client.query(sql.as_str(), &[&status_strs, &limit]).await?
            }
            (None, None) => self.client.query(sql.as_str(), &[&status_strs]).await?,
        };
        rows.iter().map(pending_from_row).collect()
    }
}
