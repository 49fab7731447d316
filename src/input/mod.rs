pub mod json;

pub use json::{load_events, load_story};

use anyhow::Result;

use crate::core::{ClimateEvent, Story};

/// Input format detection result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// An event archive: `{ "schemaVersion": ..., "events": [...] }`
    EventArchive,
    /// A story definition: `{ "id": ..., "steps": [...] }`
    Story,
    Unknown,
}

/// Detect what a JSON document contains by its top-level keys
///
/// Both file kinds are JSON, so extension sniffing is useless; the
/// distinguishing keys are "events" (archive) vs "steps" (story).
pub fn detect_format(contents: &str) -> InputFormat {
    let value: serde_json::Value = match serde_json::from_str(contents) {
        Ok(value) => value,
        Err(_) => return InputFormat::Unknown,
    };
    let object = match value.as_object() {
        Some(object) => object,
        None => return InputFormat::Unknown,
    };

    if object.contains_key("schemaVersion") && object.contains_key("events") {
        return InputFormat::EventArchive;
    }
    if object.contains_key("steps") {
        return InputFormat::Story;
    }
    InputFormat::Unknown
}

/// Everything a loaded file can hold
#[derive(Debug, Clone)]
pub enum LoadedFile {
    Events(Vec<ClimateEvent>),
    Story(Story),
}

/// Load a JSON file, auto-detecting whether it is an archive or a story
pub fn load_file(path: &str) -> Result<LoadedFile> {
    let contents = std::fs::read_to_string(path)?;

    match detect_format(&contents) {
        InputFormat::EventArchive => Ok(LoadedFile::Events(json::parse_events(&contents)?)),
        InputFormat::Story => Ok(LoadedFile::Story(json::parse_story(&contents)?)),
        InputFormat::Unknown => anyhow::bail!("Unknown input format: {}", path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_format() {
        assert_eq!(
            detect_format(r#"{ "schemaVersion": 1, "events": [] }"#),
            InputFormat::EventArchive
        );
        assert_eq!(
            detect_format(r#"{ "id": "s1", "title": "T", "steps": [] }"#),
            InputFormat::Story
        );
        assert_eq!(detect_format(r#"{ "foo": 1 }"#), InputFormat::Unknown);
        assert_eq!(detect_format("[1, 2]"), InputFormat::Unknown);
        assert_eq!(detect_format("not json"), InputFormat::Unknown);
    }
}
