// ABOUTME: Resolved delivery descriptor for one logical agent.
// ABOUTME: A target is exactly one of UI automation coordinates, an inbox directory, or a channel.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Screen coordinate in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Where and how a message for a given agent is delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AgentTarget {
    /// Type into a monitored window: focus it, click the input box, paste.
    UiAutomation {
        window_title: String,
        focus_xy: Point,
        input_xy: Point,
    },
    /// Drop a Markdown file into a directory the agent polls.
    Inbox { path: PathBuf },
    /// Push to an external channel (webhook URL and/or channel reference).
    Channel {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        webhook_url: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        channel_id: Option<String>,
    },
}

impl AgentTarget {
    pub fn ui(window_title: impl Into<String>, focus_xy: Point, input_xy: Point) -> Self {
        Self::UiAutomation {
            window_title: window_title.into(),
            focus_xy,
            input_xy,
        }
    }

    pub fn inbox(path: impl Into<PathBuf>) -> Self {
        Self::Inbox { path: path.into() }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::UiAutomation { .. } => "ui_automation",
            Self::Inbox { .. } => "inbox",
            Self::Channel { .. } => "channel",
        }
    }

    pub fn is_ui(&self) -> bool {
        matches!(self, Self::UiAutomation { .. })
    }
}
