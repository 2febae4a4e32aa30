//! Connection handling and schema bootstrap.

use tokio_postgres::{Client, NoTls};
use tracing::{debug, error};

use crate::error::Result;
use crate::schema::SCHEMA;

/// Handle to the PostgreSQL store.
///
/// Each `Store` owns one connection. Horizontal scale-out is by
/// opening more stores (one per robot runtime process); claim
/// correctness does not depend on connection count.
pub struct Store {
    pub(crate) client: Client,
}

impl Store {
    /// Connect to PostgreSQL and spawn the connection driver task.
    pub async fn connect(dsn: &str) -> Result<Self> {
        let (client, connection) = tokio_postgres::connect(dsn, NoTls).await?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("postgres connection error: {e}");
            }
        });
        debug!("connected to postgres");
        Ok(Self { client })
    }

    /// Create the three tables and their indexes if missing.
    pub async fn init_schema(&self) -> Result<()> {
        self.client.batch_execute(SCHEMA).await?;
        Ok(())
    }
}
