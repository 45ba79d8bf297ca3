// ABOUTME: Backend implementations (UI automation, inbox file, webhook).
// ABOUTME: Each backend implements the DeliveryBackend trait.

pub mod inbox;
pub mod ui_automation;
pub mod webhook;

pub use inbox::InboxBackend;
pub use ui_automation::UiAutomationBackend;
pub use webhook::WebhookBackend;
