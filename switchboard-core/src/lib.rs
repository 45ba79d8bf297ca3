// ABOUTME: Message routing core for multi-agent coordination
// ABOUTME: Validation, queueing, the routing worker, coordinate resolution and the messaging gateway

pub mod config;
pub mod coordinates;
pub mod dispatch;
pub mod gateway;
pub mod lifecycle;
pub mod message;
pub mod metrics;
pub mod paths;
pub mod queue;
pub mod router;
pub mod validator;

pub use coordinates::{CoordinateStore, ResolveError};
pub use dispatch::{DispatchResult, DispatchStatus};
pub use gateway::{GatewayBuilder, MessagingGateway};
pub use lifecycle::{AgentState, LifecycleError, LifecycleTracker};
pub use message::{InboundMessage, Message, RawTimestamp, RoutingResult};
pub use queue::{MessageQueue, QueueDiscipline};
pub use router::{MessageRouter, RouteRecord, RouterOptions};
pub use validator::{validate, ValidationError};

// Re-export delivery types used across the public API
pub use switchboard_delivery::{AgentTarget, DispatchMeta, MessageType, Point, Priority};
