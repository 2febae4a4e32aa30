// pdf2search-store - PostgreSQL persistence layer
//
// One `Store` handle owns a tokio-postgres client and exposes the
// three relations of the pipeline:
// - documents:             the catalog (path-keyed, immutable rows)
// - enhancements:          artifact store, upsert on (doc, type, robot)
// - pending_enhancements:  work queue, one live row per (doc, type)
//
// The queue's claim is a single skip-locked statement; every other
// status change goes through the guarded `set_status`.

mod artifacts;
mod catalog;
mod error;
mod queue;
mod schema;
mod store;

pub use error::{Result, StoreError};
pub use store::Store;
