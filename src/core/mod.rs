pub mod event;
pub mod session;
pub mod story;

pub use event::{
    ClimateEvent, Coordinates, EventKind, EventMetadata, EventStore, GeoBounds, Instrument,
    Severity,
};
pub use session::PlaybackAnalytics;
pub use story::{Step, Story};
