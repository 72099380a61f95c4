//! Data models for the Audio Engineer service

mod job;

pub use job::{ArtifactCategory, Artifacts, JobError, JobRecord, JobState};
