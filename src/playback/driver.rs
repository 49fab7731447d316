use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::core::{EventStore, Step, Story};
use crate::playback::events::{StoryEvent, SubscriptionId};
use crate::playback::machine::StoryMachine;
use crate::playback::MachineState;

/// Default poll cadence for expired auto-advance deadlines
const DEFAULT_TICK: Duration = Duration::from_millis(25);

/// Capacity of the channel between the machine and the renderer task
const RENDER_QUEUE: usize = 32;

/// Wall-clock automation for a shared [`StoryMachine`]
///
/// The machine itself only fires deadlines when told the time; this driver
/// supplies the clock by ticking `update()` from a background task until
/// the story finishes or [`stop`](PlaybackDriver::stop) is called. It can
/// also bridge execute-step notifications to a [`StepRenderer`] running in
/// its own task, with events resolved against an [`EventStore`].
pub struct PlaybackDriver {
    machine: Arc<Mutex<StoryMachine>>,
    stop_signal: Arc<AtomicBool>,
    tick: Duration,
}

impl PlaybackDriver {
    pub fn new(machine: Arc<Mutex<StoryMachine>>) -> Self {
        Self::with_tick(machine, DEFAULT_TICK)
    }

    /// Create a driver with a custom poll cadence
    pub fn with_tick(machine: Arc<Mutex<StoryMachine>>, tick: Duration) -> Self {
        Self {
            machine,
            stop_signal: Arc::new(AtomicBool::new(false)),
            tick,
        }
    }

    /// Shared handle to the driven machine
    pub fn machine(&self) -> Arc<Mutex<StoryMachine>> {
        self.machine.clone()
    }

    /// Spawn the tick loop
    ///
    /// Runs until the stop signal is raised or the machine reaches the
    /// finished state. The returned handle resolves when the loop exits.
    pub fn spawn(&self) -> JoinHandle<()> {
        let machine = self.machine.clone();
        let stop_signal = self.stop_signal.clone();
        let tick = self.tick;

        tokio::spawn(async move {
            loop {
                if stop_signal.load(Ordering::SeqCst) {
                    break;
                }
                {
                    let mut machine = machine.lock().await;
                    machine.update();
                    if machine.state() == MachineState::Finished {
                        break;
                    }
                }
                tokio::time::sleep(tick).await;
            }
            debug!("playback driver stopped");
        })
    }

    /// Ask the tick loop to exit at its next iteration
    pub fn stop(&self) {
        self.stop_signal.store(true, Ordering::SeqCst);
    }

    /// Wire a renderer to the machine's execute-step notifications
    ///
    /// Steps cross an mpsc channel into a spawned render task, so a slow
    /// renderer cannot stall the machine; if the queue backs up, steps are
    /// dropped with a warning. Unsubscribing the returned id closes the
    /// channel and lets the render task drain and exit.
    pub async fn attach_renderer<R>(
        &self,
        renderer: R,
        store: EventStore,
    ) -> (SubscriptionId, JoinHandle<()>)
    where
        R: crate::render::StepRenderer + 'static,
    {
        let (tx, mut rx) = mpsc::channel::<(Arc<Story>, Step, usize)>(RENDER_QUEUE);

        let subscription = {
            let mut machine = self.machine.lock().await;
            machine.subscribe(move |event| {
                if let StoryEvent::ExecuteStep {
                    story,
                    step,
                    step_index,
                } = event
                {
                    if tx.try_send((story.clone(), step.clone(), *step_index)).is_err() {
                        warn!(step = *step_index, "render queue full, dropping step");
                    }
                }
            })
        };

        let render_task = tokio::spawn(async move {
            let mut renderer = renderer;
            while let Some((story, step, step_index)) = rx.recv().await {
                let event = store.get(&step.event_id).cloned();
                renderer
                    .render_step(&story, &step, step_index, event.as_ref())
                    .await;
            }
            debug!("render task drained");
        });

        (subscription, render_task)
    }
}
