//! HTTP note reviewer client

use super::NoteValidator;
use anyhow::{bail, Context};
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use stemforge_common::NoteEvent;

/// Calls a configured review endpoint with a compact summary of the
/// transcribed tracks and returns the reviewer's report text.
///
/// Review is advisory. Callers treat every error from this client as
/// a warning, never as a pipeline failure.
pub struct LlmNoteValidator {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl LlmNoteValidator {
    pub fn new(endpoint: String, api_key: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_default();
        Self {
            client,
            endpoint,
            api_key,
        }
    }

    fn track_summary(name: &str, events: &[NoteEvent]) -> serde_json::Value {
        let (min_pitch, max_pitch) = events.iter().fold((127u8, 0u8), |(lo, hi), e| {
            (lo.min(e.pitch), hi.max(e.pitch))
        });
        let span = events
            .iter()
            .map(|e| e.end())
            .fold(0.0f64, |acc, end| acc.max(end));
        json!({
            "track": name,
            "note_count": events.len(),
            "pitch_range": if events.is_empty() { json!(null) } else { json!([min_pitch, max_pitch]) },
            "span_seconds": span,
            "notes": events,
        })
    }
}

#[async_trait]
impl NoteValidator for LlmNoteValidator {
    async fn review(&self, tracks: &[(String, Vec<NoteEvent>)]) -> anyhow::Result<String> {
        let payload = json!({
            "task": "review_transcription",
            "instructions": "Review these transcribed note tracks for musical plausibility: \
                             out-of-range pitches, implausible note density, and tracks that \
                             appear empty or degenerate. Reply with a short plain-text report.",
            "tracks": tracks
                .iter()
                .map(|(name, events)| Self::track_summary(name, events))
                .collect::<Vec<_>>(),
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .context("send review request")?;

        let status = response.status();
        let body = response.text().await.context("read review response")?;
        if !status.is_success() {
            bail!("reviewer endpoint returned {}: {}", status, body);
        }

        // Accept either a JSON envelope with a `report` field or raw text
        match serde_json::from_str::<serde_json::Value>(&body) {
            Ok(value) => match value.get("report").and_then(|r| r.as_str()) {
                Some(report) => Ok(report.to_string()),
                None => Ok(body),
            },
            Err(_) => Ok(body),
        }
    }
}
