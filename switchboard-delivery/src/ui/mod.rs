// ABOUTME: UiDriver trait abstracting the OS-level mouse/keyboard/clipboard operations.
// ABOUTME: The UI automation backend sequences these steps; drivers only perform them.

pub mod xdotool;

use crate::target::Point;
use crate::traits::BackendError;
use async_trait::async_trait;

pub use xdotool::XdotoolDriver;

/// Primitive UI operations the automation backend is built from.
#[async_trait]
pub trait UiDriver: Send + Sync {
    /// Driver name for logging
    fn name(&self) -> &'static str;

    /// Bring the window with the given title to the foreground.
    async fn activate_window(&self, title: &str) -> Result<(), BackendError>;

    /// Move the pointer to `at` and left-click.
    async fn click(&self, at: Point) -> Result<(), BackendError>;

    /// Put `text` on the clipboard and paste it into the focused input.
    async fn paste_text(&self, text: &str) -> Result<(), BackendError>;

    /// Submit the focused input.
    async fn press_enter(&self) -> Result<(), BackendError>;

    /// Copy the visible text of the window with the given title.
    async fn read_text(&self, title: &str) -> Result<String, BackendError>;
}

/// Driver that performs nothing and logs each step. Used on hosts without a display.
#[derive(Debug, Default, Clone)]
pub struct NoopDriver;

#[async_trait]
impl UiDriver for NoopDriver {
    fn name(&self) -> &'static str {
        "noop"
    }

    async fn activate_window(&self, title: &str) -> Result<(), BackendError> {
        tracing::debug!(window = %title, "noop driver: activate window");
        Ok(())
    }

    async fn click(&self, at: Point) -> Result<(), BackendError> {
        tracing::debug!(at = %at, "noop driver: click");
        Ok(())
    }

    async fn paste_text(&self, text: &str) -> Result<(), BackendError> {
        tracing::debug!(len = text.len(), "noop driver: paste");
        Ok(())
    }

    async fn press_enter(&self) -> Result<(), BackendError> {
        tracing::debug!("noop driver: enter");
        Ok(())
    }

    async fn read_text(&self, _title: &str) -> Result<String, BackendError> {
        Err(BackendError::Unsupported(
            "noop driver cannot read window text".to_string(),
        ))
    }
}
