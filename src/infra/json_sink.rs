use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::app::ports::Sink;
use crate::error::{Result, ScraperError};
use crate::types::CanonicalEvent;

/// Writes a run's events as one pretty-printed JSON array, replacing any previous file.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Sink for JsonFileSink {
    async fn write(&self, events: &[CanonicalEvent]) -> Result<()> {
        let json = serde_json::to_string_pretty(events)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                ScraperError::Sink(format!(
                    "Failed to create output directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        tokio::fs::write(&self.path, json).await.map_err(|e| {
            ScraperError::Sink(format!(
                "Failed to write '{}': {}",
                self.path.display(),
                e
            ))
        })?;

        info!(
            path = %self.path.display(),
            events = events.len(),
            "Wrote events to sink"
        );
        Ok(())
    }

    fn location(&self) -> Option<String> {
        Some(self.path.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Location, NormalizedDate, SourceKind};
    use tempfile::tempdir;

    fn event(title: &str) -> CanonicalEvent {
        CanonicalEvent {
            title: Some(title.to_string()),
            description: None,
            price: None,
            date: NormalizedDate::unknown(),
            location: Location::with_defaults(None, "Montreal", "ca"),
            tags: vec!["jazz".to_string()],
            organizer_name: None,
            organizer_image_url: None,
            event_url: None,
            image_url: None,
            source: SourceKind::Facebook,
        }
    }

    #[tokio::test]
    async fn test_writes_json_array_creating_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/out/events.json");
        let sink = JsonFileSink::new(&path);

        sink.write(&[event("Jazz Night"), event("Comedy Hour")])
            .await
            .unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let events = written.as_array().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0]["title"], "Jazz Night");
        assert_eq!(events[0]["location"]["city"], "Montreal");
        assert!(events[0]["location"]["latitude"].is_null());
    }

    #[tokio::test]
    async fn test_empty_run_writes_empty_array() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.json");

        JsonFileSink::new(&path).write(&[]).await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap().trim(), "[]");
    }
}
