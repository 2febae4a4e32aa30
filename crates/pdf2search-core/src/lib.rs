// pdf2search-core - Domain model for the enhancement pipeline
//
// This crate is pure data and logic (the "essence" of the system):
// - Documents, enhancements, and pending work units
// - The pending-enhancement state machine with guarded transitions
// - JSONB content sanitization
// - Extracted-text normalization
//
// Storage concerns live in: pdf2search-store (PostgreSQL)
// Search concerns live in:  pdf2search-search (Elasticsearch)
// Robots live in:           pdf2search-robots

pub mod cleaning;
pub mod content;
pub mod document;
pub mod status;

pub use cleaning::clean_text;
pub use content::sanitize_content;
pub use document::{
    latest_enhancement, metadata_content, Document, Enhancement, EnhancementType,
    PendingEnhancement, UnknownEnhancementType,
};
pub use status::{PendingStatus, StateTransitionError, UnknownStatus};
