use crate::call::TranscriptEntry;
use anyhow::{Context, Result};
use async_nats::Client;
use tracing::info;

/// Publishes saved transcripts to NATS for a downstream collaborator to
/// store. The coordinator itself keeps no state past the call's lifetime.
pub struct TranscriptArchiver {
    client: Client,
}

impl TranscriptArchiver {
    /// Connect to NATS server
    pub async fn connect(url: &str) -> Result<Self> {
        info!("Connecting to NATS at {}", url);

        let client = async_nats::connect(url)
            .await
            .context("Failed to connect to NATS")?;

        info!("Connected to NATS successfully");

        Ok(Self { client })
    }

    /// Publish a call's transcript to the archive subject
    pub async fn archive(&self, call_id: &str, entries: Vec<TranscriptEntry>) -> Result<()> {
        let subject = format!("transcripts.archive.{}", call_id);

        let message = super::messages::TranscriptArchiveMessage {
            call_id: call_id.to_string(),
            archived_at: chrono::Utc::now().to_rfc3339(),
            entries,
        };

        let payload = serde_json::to_vec(&message)?;

        self.client
            .publish(subject.clone(), payload.into())
            .await
            .context("Failed to publish transcript archive")?;

        info!(
            "Published transcript archive to {} ({} entries)",
            subject,
            message.entries.len()
        );

        Ok(())
    }
}
