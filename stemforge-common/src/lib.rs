//! # StemForge Common Library
//!
//! Shared code for StemForge services including:
//! - Error types
//! - Configuration loading and jobs-root resolution
//! - Note event domain types and the note-merge algorithm

pub mod config;
pub mod error;
pub mod notes;

pub use error::{Error, Result};
pub use notes::{merge_note_events, NoteEvent};
