//! Opening URLs in the user's browser.

use std::io;
use std::sync::Arc;

use tracing::debug;

use crate::infrastructure::traits::CommandRunner;

/// Opens a URL for the user.
pub trait BrowserLauncher: Send + Sync {
    fn open(&self, url: &str) -> io::Result<()>;
}

/// Launches the platform opener (or a configured command) via `CommandRunner`.
pub struct SystemBrowser {
    cmd: Arc<dyn CommandRunner>,
    command: Option<String>,
}

impl SystemBrowser {
    /// `command` overrides the platform default, e.g. `"firefox"`.
    pub fn new(cmd: Arc<dyn CommandRunner>, command: Option<String>) -> Self {
        Self { cmd, command }
    }

    /// Program and leading arguments used to open a URL.
    pub fn opener(&self) -> (String, Vec<String>) {
        if let Some(command) = self.command.as_deref().filter(|c| !c.trim().is_empty()) {
            let mut parts = command.split_whitespace().map(str::to_string);
            let program = parts.next().unwrap_or_default();
            return (program, parts.collect());
        }
        platform_opener()
    }
}

fn platform_opener() -> (String, Vec<String>) {
    if cfg!(target_os = "macos") {
        ("open".into(), vec![])
    } else if cfg!(windows) {
        ("cmd".into(), vec!["/C".into(), "start".into(), "".into()])
    } else {
        ("xdg-open".into(), vec![])
    }
}

impl BrowserLauncher for SystemBrowser {
    fn open(&self, url: &str) -> io::Result<()> {
        let (program, mut args) = self.opener();
        args.push(url.to_string());
        debug!("open browser: {} {:?}", program, args);

        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let status = self.cmd.launch(&program, &args)?;
        if status.success() {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::Other,
                format!("{} exited with {}", program, status),
            ))
        }
    }
}
