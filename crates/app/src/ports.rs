//! Port definitions: traits that adapters implement.
//!
//! Ports are the boundaries between the application core and the outside world.
//! They are defined here (in `app`) so that both the use-case layer and the
//! adapter layer can depend on them without creating circular dependencies.

pub mod resources;
pub mod state_store;
pub mod trigger_history;
pub mod webhook;

pub use resources::{
    Camera, Classification, Detection, GenericResource, InboundMessage, Media,
    NotificationTransport, OutboundMessage, SendReceipt, SmsTransport, TrackedFrame,
    VideoSaveRequest, VideoStore, Vision,
};
pub use state_store::StateStore;
pub use trigger_history::TriggerHistory;
pub use webhook::WebhookClient;
