// ABOUTME: Coordinate store - maps agent ids to delivery targets loaded from a JSON file.
// ABOUTME: Tolerates flat, nested, and legacy entry shapes; falls back to a default roster.

use anyhow::{anyhow, Context, Result};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use switchboard_delivery::{AgentTarget, Point};
use thiserror::Error;

/// Agents present when no coordinate file could be loaded.
pub const DEFAULT_ROSTER: [&str; 8] = [
    "Agent-1", "Agent-2", "Agent-3", "Agent-4", "Agent-5", "Agent-6", "Agent-7", "Agent-8",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("agent not found: {0}")]
    NotFound(String),
}

#[derive(Debug, Clone, Default)]
pub struct CoordinateStore {
    targets: BTreeMap<String, AgentTarget>,
    source: Option<PathBuf>,
    defaulted: bool,
}

impl CoordinateStore {
    /// Load targets from `path`. Never fails: unreadable or malformed
    /// files produce the default roster.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let loaded = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))
            .and_then(|raw| Self::from_json_str(&raw));
        match loaded {
            Ok(mut store) => {
                tracing::info!(
                    path = %path.display(),
                    agents = store.targets.len(),
                    "Coordinates loaded"
                );
                store.source = Some(path.to_path_buf());
                store
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Coordinate file unusable, using default roster"
                );
                Self::defaults()
            }
        }
    }

    /// Parse a coordinate document. Entries that cannot be understood are skipped.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let doc: Value = serde_json::from_str(raw).context("Coordinate file is not valid JSON")?;
        let Value::Object(top) = doc else {
            return Err(anyhow!("Coordinate file must be a JSON object"));
        };
        let agents = match top.get("agents") {
            Some(Value::Object(nested)) => nested,
            Some(_) => return Err(anyhow!("\"agents\" must be a JSON object")),
            None => &top,
        };

        let mut targets = BTreeMap::new();
        for (agent_id, entry) in agents {
            let Value::Object(entry) = entry else {
                tracing::warn!(agent = %agent_id, "Skipping non-object coordinate entry");
                continue;
            };
            match normalize_entry(agent_id, entry) {
                Some(target) => {
                    targets.insert(agent_id.clone(), target);
                }
                None => {
                    tracing::warn!(agent = %agent_id, "Skipping coordinate entry with no usable target");
                }
            }
        }

        Ok(Self {
            targets,
            source: None,
            defaulted: false,
        })
    }

    /// Deterministic placeholder roster: a 4x2 grid of windows.
    pub fn defaults() -> Self {
        let targets = DEFAULT_ROSTER
            .iter()
            .enumerate()
            .map(|(i, agent_id)| {
                let col = (i % 4) as i32;
                let row = (i / 4) as i32;
                let input = Point::new(240 + col * 480, 460 + row * 540);
                let focus = Point::new(input.x, input.y - 40);
                (agent_id.to_string(), AgentTarget::ui(*agent_id, focus, input))
            })
            .collect();
        Self {
            targets,
            source: None,
            defaulted: true,
        }
    }

    pub fn get_target(&self, agent_id: &str) -> Result<&AgentTarget, ResolveError> {
        self.targets
            .get(agent_id)
            .ok_or_else(|| ResolveError::NotFound(agent_id.to_string()))
    }

    /// Known agent ids in sorted order.
    pub fn agent_ids(&self) -> Vec<String> {
        self.targets.keys().cloned().collect()
    }

    pub fn targets(&self) -> &BTreeMap<String, AgentTarget> {
        &self.targets
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// True when the default roster is in use.
    pub fn is_default(&self) -> bool {
        self.defaulted
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}

fn window_title(map: &Map<String, Value>, agent_id: &str) -> String {
    map.get("window_title")
        .and_then(Value::as_str)
        .filter(|t| !t.trim().is_empty())
        .unwrap_or(agent_id)
        .to_string()
}

fn normalize_entry(agent_id: &str, entry: &Map<String, Value>) -> Option<AgentTarget> {
    if let Some(raw_input) = entry.get("chat_input_coordinates") {
        let input_xy = parse_point(raw_input)?;
        let focus_xy = match entry.get("onboarding_input_coords") {
            Some(raw) => parse_point(raw)?,
            None => input_xy,
        };
        return Some(AgentTarget::ui(window_title(entry, agent_id), focus_xy, input_xy));
    }

    if let Some(Value::Object(legacy)) = entry.get("pyautogui_target") {
        let focus_xy = parse_point(legacy.get("focus_xy")?)?;
        let input_xy = parse_point(legacy.get("input_xy")?)?;
        return Some(AgentTarget::ui(window_title(legacy, agent_id), focus_xy, input_xy));
    }

    if let Some(path) = ["inbox_path", "inbox"]
        .iter()
        .find_map(|key| entry.get(*key).and_then(Value::as_str))
    {
        return Some(AgentTarget::inbox(path));
    }

    let webhook_url = entry
        .get("webhook_url")
        .and_then(Value::as_str)
        .map(str::to_string);
    let channel_id = entry.get("channel_id").and_then(|v| match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    });
    if webhook_url.is_some() || channel_id.is_some() {
        return Some(AgentTarget::Channel {
            webhook_url,
            channel_id,
        });
    }

    None
}

/// Accept `[x, y]` or `{"x": .., "y": ..}`.
fn parse_point(raw: &Value) -> Option<Point> {
    let (x, y) = match raw {
        Value::Array(items) if items.len() == 2 => (&items[0], &items[1]),
        Value::Object(map) => (map.get("x")?, map.get("y")?),
        _ => return None,
    };
    Some(Point::new(coordinate(x)?, coordinate(y)?))
}

fn coordinate(raw: &Value) -> Option<i32> {
    let n = raw.as_f64()?;
    if n.is_finite() && n >= f64::from(i32::MIN) && n <= f64::from(i32::MAX) {
        Some(n.round() as i32)
    } else {
        None
    }
}
