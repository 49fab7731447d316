use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

use earthstory::input;
use earthstory::{
    ConsoleRenderer, EventStore, MachineState, PlaybackDriver, Story, StoryEvent, StoryMachine,
};

/// Persistent player settings
#[derive(Serialize, Deserialize)]
struct AppSettings {
    /// Driver poll cadence in milliseconds
    tick_ms: u64,
    /// Pace for steps (and generated stories) without their own delay
    default_delay_ms: u64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            tick_ms: 25,
            default_delay_ms: 1500,
        }
    }
}

impl AppSettings {
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("earthstory").join("settings.json"))
    }

    fn load() -> Self {
        if let Some(path) = Self::config_path() {
            if path.exists() {
                if let Ok(contents) = fs::read_to_string(&path) {
                    if let Ok(settings) = serde_json::from_str(&contents) {
                        return settings;
                    }
                }
            }
        }
        Self::default()
    }

    fn save(&self) {
        if let Some(path) = Self::config_path() {
            if let Some(parent) = path.parent() {
                let _ = fs::create_dir_all(parent);
            }
            if let Ok(json) = serde_json::to_string_pretty(self) {
                let _ = fs::write(&path, json);
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let events_path = args
        .next()
        .context("Usage: earthstory <events.json> [story.json]")?;
    let story_path = args.next();

    let settings = AppSettings::load();

    let events = input::load_events(&events_path)?;
    info!(count = events.len(), "loaded event archive");
    let store = EventStore::new(events.clone());

    let story = match story_path {
        Some(path) => input::load_story(&path)?,
        None => Story::from_events(
            "tour",
            "Year in review",
            &events,
            Some(settings.default_delay_ms),
        ),
    };
    info!(story = %story.id, steps = story.len(), "playing story: {}", story.title);

    let machine = Arc::new(Mutex::new(StoryMachine::new()));
    let driver =
        PlaybackDriver::with_tick(machine.clone(), Duration::from_millis(settings.tick_ms));
    let (subscription, render_task) = driver.attach_renderer(ConsoleRenderer, store).await;

    {
        let mut machine = machine.lock().await;
        machine.subscribe(|event| {
            if let StoryEvent::StepChanged {
                step_index,
                progress,
                ..
            } = event
            {
                info!(step = *step_index, "progress {:.0}%", progress * 100.0);
            }
        });
        machine.load_story(story)?;
        machine.play()?;
    }

    let ticker = driver.spawn();

    // steps without their own delay advance at the default cadence
    loop {
        tokio::time::sleep(Duration::from_millis(settings.default_delay_ms)).await;
        let mut machine = machine.lock().await;
        match machine.state() {
            MachineState::Finished | MachineState::Idle | MachineState::Error => break,
            MachineState::Playing => {
                if !machine.auto_advance_pending() {
                    let _ = machine.next();
                }
            }
            _ => {}
        }
    }

    driver.stop();
    let _ = ticker.await;

    // close the render channel and let the renderer drain
    machine.lock().await.unsubscribe(subscription);
    let _ = render_task.await;

    let analytics = machine.lock().await.analytics().clone();
    println!("{}", serde_json::to_string_pretty(&analytics)?);

    settings.save();
    Ok(())
}
