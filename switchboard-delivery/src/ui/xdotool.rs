// ABOUTME: X11 UI driver that shells out to xdotool and xclip.
// ABOUTME: Each operation is one short-lived child process; failures surface as Driver errors.

use super::UiDriver;
use crate::target::Point;
use crate::traits::BackendError;
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command as ProcessCommand;

/// Driver backed by the `xdotool` and `xclip` binaries.
#[derive(Debug, Clone)]
pub struct XdotoolDriver {
    xdotool: String,
    xclip: String,
}

impl Default for XdotoolDriver {
    fn default() -> Self {
        Self {
            xdotool: "xdotool".to_string(),
            xclip: "xclip".to_string(),
        }
    }
}

impl XdotoolDriver {
    pub fn new(xdotool: impl Into<String>, xclip: impl Into<String>) -> Self {
        Self {
            xdotool: xdotool.into(),
            xclip: xclip.into(),
        }
    }

    /// Confirm the binaries exist and an X display is reachable.
    pub fn detect() -> anyhow::Result<Self> {
        if std::env::var_os("DISPLAY").is_none() {
            anyhow::bail!("DISPLAY is not set");
        }
        let driver = Self::default();
        let status = std::process::Command::new(&driver.xdotool)
            .arg("version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| anyhow::anyhow!("xdotool not runnable: {}", e))?;
        if !status.success() {
            anyhow::bail!("xdotool version exited with {}", status);
        }
        Ok(driver)
    }

    async fn xdotool(&self, args: &[&str]) -> Result<String, BackendError> {
        run(&self.xdotool, args, None).await
    }
}

async fn run(program: &str, args: &[&str], stdin: Option<&str>) -> Result<String, BackendError> {
    tracing::trace!(program, ?args, "ui driver command");
    let mut child = ProcessCommand::new(program)
        .args(args)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| BackendError::Driver(format!("failed to spawn {}: {}", program, e)))?;

    if let Some(input) = stdin {
        if let Some(mut pipe) = child.stdin.take() {
            pipe.write_all(input.as_bytes()).await?;
            // Dropping the pipe closes stdin so xclip can finish.
        }
    }

    let output = child.wait_with_output().await?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(BackendError::Driver(format!(
            "{} {} failed ({}): {}",
            program,
            args.join(" "),
            output.status,
            stderr.trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[async_trait]
impl UiDriver for XdotoolDriver {
    fn name(&self) -> &'static str {
        "xdotool"
    }

    async fn activate_window(&self, title: &str) -> Result<(), BackendError> {
        self.xdotool(&["search", "--name", title, "windowactivate", "--sync"])
            .await
            .map(|_| ())
    }

    async fn click(&self, at: Point) -> Result<(), BackendError> {
        let x = at.x.to_string();
        let y = at.y.to_string();
        self.xdotool(&["mousemove", "--sync", &x, &y, "click", "1"])
            .await
            .map(|_| ())
    }

    async fn paste_text(&self, text: &str) -> Result<(), BackendError> {
        run(&self.xclip, &["-selection", "clipboard"], Some(text)).await?;
        self.xdotool(&["key", "--clearmodifiers", "ctrl+v"])
            .await
            .map(|_| ())
    }

    async fn press_enter(&self) -> Result<(), BackendError> {
        self.xdotool(&["key", "--clearmodifiers", "Return"])
            .await
            .map(|_| ())
    }

    async fn read_text(&self, title: &str) -> Result<String, BackendError> {
        self.activate_window(title).await?;
        self.xdotool(&["key", "--clearmodifiers", "ctrl+a", "ctrl+c"])
            .await?;
        run(&self.xclip, &["-selection", "clipboard", "-o"], None).await
    }
}
