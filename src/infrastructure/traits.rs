//! I/O boundary traits for testability
//!
//! These traits abstract external I/O operations, allowing services
//! to be tested with mock implementations.

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::process::{ExitStatus, Stdio};

use colored::Colorize;

/// Filesystem abstraction for testability.
pub trait FileSystem: Send + Sync {
    /// Read file contents to string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Replace file content atomically (temp file in the same directory, then rename).
    fn write_atomic(&self, path: &Path, content: &str) -> io::Result<()>;

    /// Like `write_atomic`, but the file is readable by the owner only.
    fn write_private(&self, path: &Path, content: &str) -> io::Result<()>;

    /// Check if path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Create directory and all parent directories.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Create parent directories if needed.
    fn ensure_parent(&self, path: &Path) -> io::Result<()>;
}

/// External command runner abstraction.
pub trait CommandRunner: Send + Sync {
    /// Start a command detached from our stdio and wait for that process only.
    ///
    /// Children it leaves running (e.g. a browser) do not hold us up.
    fn launch(&self, cmd: &str, args: &[&str]) -> io::Result<ExitStatus>;
}

/// Line-based user interaction.
pub trait Prompter: Send + Sync {
    /// Show `message` and return the entered line without the trailing newline.
    fn prompt(&self, message: &str) -> io::Result<String>;

    /// Ask a yes/no question. Empty input selects `default`.
    fn confirm(&self, message: &str, default: bool) -> io::Result<bool> {
        let suffix = if default { "(Y/n)" } else { "(y/N)" };
        let answer = self.prompt(&format!("{message} {suffix}"))?;
        Ok(parse_confirmation(&answer, default))
    }
}

/// Interpret a yes/no answer: anything starting with `y` is yes.
pub fn parse_confirmation(answer: &str, default: bool) -> bool {
    let answer = answer.trim().to_lowercase();
    match answer.chars().next() {
        None => default,
        Some(c) => c == 'y',
    }
}

// ============================================================
// REAL IMPLEMENTATIONS
// ============================================================

/// Real filesystem implementation.
#[derive(Debug, Default)]
pub struct RealFileSystem;

impl RealFileSystem {
    fn persist(path: &Path, content: &str, private: bool) -> io::Result<()> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.as_file().sync_all()?;

        #[cfg(unix)]
        {
            if private {
                use std::os::unix::fs::PermissionsExt;
                tmp.as_file()
                    .set_permissions(std::fs::Permissions::from_mode(0o600))?;
            }
        }
        #[cfg(not(unix))]
        let _ = private;

        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }
}

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn write_atomic(&self, path: &Path, content: &str) -> io::Result<()> {
        Self::persist(path, content, false)
    }

    fn write_private(&self, path: &Path, content: &str) -> io::Result<()> {
        Self::persist(path, content, true)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn ensure_parent(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                self.create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}

/// Real command runner implementation.
#[derive(Debug, Default)]
pub struct RealCommandRunner;

impl CommandRunner for RealCommandRunner {
    fn launch(&self, cmd: &str, args: &[&str]) -> io::Result<ExitStatus> {
        std::process::Command::new(cmd)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?
            .wait()
    }
}

/// Prompter reading from stdin, prompting on stdout.
#[derive(Debug, Default)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn prompt(&self, message: &str) -> io::Result<String> {
        let mut stdout = io::stdout();
        write!(stdout, "{} ", message.cyan())?;
        stdout.flush()?;

        let mut line = String::new();
        let read = io::stdin().lock().read_line(&mut line)?;
        if read == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "input closed while waiting for an answer",
            ));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}
