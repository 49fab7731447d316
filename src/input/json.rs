use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::core::{ClimateEvent, Story};

/// Event archive schema version this build understands
const SCHEMA_VERSION: u32 = 1;

/// On-disk event archive: a year of observed events plus schema metadata
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventArchive {
    schema_version: u32,
    #[serde(default)]
    #[allow(dead_code)]
    year: Option<u16>,
    events: Vec<ClimateEvent>,
}

/// Load climate events from a JSON archive file
pub fn load_events(path: impl AsRef<Path>) -> Result<Vec<ClimateEvent>> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read event archive {}", path.display()))?;
    parse_events(&contents)
        .with_context(|| format!("Failed to load event archive {}", path.display()))
}

/// Parse an event archive from JSON text
pub fn parse_events(contents: &str) -> Result<Vec<ClimateEvent>> {
    let archive: EventArchive =
        serde_json::from_str(contents).context("Failed to parse event archive")?;
    if archive.schema_version != SCHEMA_VERSION {
        anyhow::bail!(
            "Unsupported event archive schema version {} (expected {})",
            archive.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(archive.events)
}

/// Load a story definition from a JSON file
pub fn load_story(path: impl AsRef<Path>) -> Result<Story> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read story file {}", path.display()))?;
    parse_story(&contents).with_context(|| format!("Failed to load story {}", path.display()))
}

/// Parse a story definition from JSON text
pub fn parse_story(contents: &str) -> Result<Story> {
    let story: Story = serde_json::from_str(contents).context("Failed to parse story")?;
    Ok(story)
}
