// pdf2search-search - Elasticsearch projection and query surface
//
// The search index is a derived view of the catalog + artifact store,
// never a source of truth. Physical indices are versioned
// (`<alias>_v1`, `<alias>_v2`, ...) behind one stable alias so mapping
// changes migrate with zero read downtime:
//
//   initialize -> create <alias>_v1, point alias at it
//   migrate    -> create _v<k+1>, server-side reindex, atomic alias
//                 swap, write-block the old index
//   rollback   -> atomic swap back to _v<k-1> (refused at v1)
//   cleanup    -> drop all but the newest N physical indices
//
// Queries always run against the alias.

mod client;
mod error;
mod index;
mod mapping;
mod projection;
mod queries;

pub use client::EsClient;
pub use error::{Result, SearchError};
pub use index::{IndexManager, IndexStatus};
pub use mapping::index_mapping;
pub use projection::{project, IndexedPaper};
pub use queries::{SearchFilters, SearchHit, SearchOptions, SortOrder, VenueBucket, SEARCH_FIELDS};
