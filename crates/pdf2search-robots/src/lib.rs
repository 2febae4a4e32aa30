// pdf2search-robots - Enhancement producers and their runtime
//
// A robot is a named producer of one enhancement type. The runtime
// claims one unit of work at a time from the queue, hands the owning
// document to the robot's handler, and advances the unit through the
// state machine based on the tagged outcome.
//
// Shipped robots:
// - pdf-extractor:   FULL_TEXT via the external `pdftotext` extractor
// - paperpile-sync:  PAPERPILE_METADATA from a Paperpile CSV manifest

pub mod extract;
pub mod manifest;
pub mod paperpile_sync;
pub mod pdf_extractor;
pub mod runtime;

pub use extract::{ExtractionError, Extractor, PdftotextExtractor};
pub use manifest::{load_manifest, ManifestError, ManifestRow};
pub use paperpile_sync::PaperpileSyncRobot;
pub use pdf_extractor::PdfExtractorRobot;
pub use runtime::{HandlerOutcome, ProcessedOutcome, Robot, RobotRunner, RunSummary};
