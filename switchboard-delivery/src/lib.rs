// ABOUTME: Pluggable delivery backend abstraction for switchboard.
// ABOUTME: Provides trait-based backends (UI automation, inbox file, webhook) plus test doubles.

pub mod backends;
pub mod cache;
pub mod envelope;
pub mod notify;
pub mod registry;
pub mod target;
pub mod testing;
pub mod traits;
pub mod ui;

pub use backends::{InboxBackend, UiAutomationBackend, WebhookBackend};
pub use cache::{CacheSection, CoordinationCache};
pub use envelope::{DispatchMeta, MessageType, OutboundMessage, ParseEnumError, Priority};
pub use registry::{DriverKind, DriverPreference, DriverRegistry};
pub use target::{AgentTarget, Point};
pub use traits::{BackendError, BackendKind, DeliveryBackend, SimpleBackendAdapter, SimpleSender};
pub use ui::UiDriver;
