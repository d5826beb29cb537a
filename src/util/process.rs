//! Subprocess execution utilities.
//!
//! The build engine runs every toolchain step as a synchronous child
//! process. [`ProcessBuilder`] assembles the argv, and the exec methods
//! cover the three shapes the engine needs: run-and-require-success,
//! run-and-capture-stdout, and run-with-a-watchdog-timeout for test
//! executables that may hang.

use std::ffi::OsStr;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use thiserror::Error;

/// Typed child-process failure, surfaced instead of aborting the build
/// from deep inside a call chain.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("`{command}` failed with {status}")]
    CommandFailed { command: String, status: ExitStatus },
}

/// Captured result of a child process run.
#[derive(Debug)]
pub struct CapturedOutput {
    pub stdout: Vec<u8>,
    pub status: ExitStatus,
    /// Whether the watchdog killed the child. Always false for runs
    /// without a timeout.
    pub timed_out: bool,
}

/// Append-only argv builder for subprocess execution.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
        }
    }

    /// Create a builder from an argv prefix: the first element is the
    /// program, the rest become leading arguments. Toolchain entries in the
    /// build config are exactly this shape (`["avr-gcc", "-mmcu=atmega2560"]`).
    pub fn from_argv(argv: &[String]) -> Result<Self> {
        let (program, rest) = argv
            .split_first()
            .ok_or_else(|| anyhow!("empty command line"))?;
        Ok(ProcessBuilder::new(program).args(rest))
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    /// Get the program path.
    pub fn get_program(&self) -> &Path {
        &self.program
    }

    /// Get the arguments.
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Display the full command for diagnostics.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }

    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }

    /// Spawn, wait, and require a successful exit.
    ///
    /// The child inherits stdout/stderr so toolchain diagnostics pass
    /// through. A non-zero exit or signal termination comes back as
    /// [`ProcessError::CommandFailed`].
    pub fn exec_and_check(&self) -> Result<()> {
        tracing::debug!("running `{}`", self.display_command());

        let status = self
            .build_command()
            .status()
            .with_context(|| format!("failed to spawn `{}`", self.program.display()))?;

        if !status.success() {
            return Err(ProcessError::CommandFailed {
                command: self.display_command(),
                status,
            }
            .into());
        }
        Ok(())
    }

    /// Spawn, wait, and collect stdout into memory.
    pub fn exec_capture(&self) -> Result<CapturedOutput> {
        tracing::debug!("running `{}`", self.display_command());

        let output = self
            .build_command()
            .stdout(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to spawn `{}`", self.program.display()))?
            .wait_with_output()
            .with_context(|| format!("failed to wait for `{}`", self.program.display()))?;

        Ok(CapturedOutput {
            stdout: output.stdout,
            status: output.status,
            timed_out: false,
        })
    }

    /// Spawn with a watchdog: if the child has not exited within `timeout`,
    /// it is killed and the result records `timed_out`.
    ///
    /// The watchdog is a sibling thread that sleeps and kills; it shares
    /// nothing with this thread beyond its join value. The stdout reader
    /// terminates on the EOF the kill produces, so no partial-read state
    /// leaks out.
    pub fn exec_capture_timeout(&self, timeout: Duration) -> Result<CapturedOutput> {
        tracing::debug!(
            "running `{}` with a {:?} watchdog",
            self.display_command(),
            timeout
        );

        let mut child = self
            .build_command()
            .stdout(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to spawn `{}`", self.program.display()))?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("child stdout was not piped"))?;

        let child = Arc::new(Mutex::new(child));
        let (cancel_tx, cancel_rx) = mpsc::channel::<()>();

        let watchdog = {
            let child = Arc::clone(&child);
            thread::spawn(move || match cancel_rx.recv_timeout(timeout) {
                Err(RecvTimeoutError::Timeout) => match child.lock() {
                    Ok(mut child) => child.kill().is_ok(),
                    Err(_) => false,
                },
                _ => false,
            })
        };

        let mut buf = Vec::new();
        stdout
            .read_to_end(&mut buf)
            .with_context(|| format!("failed to read output of `{}`", self.program.display()))?;

        let status = child
            .lock()
            .map_err(|_| anyhow!("watchdog poisoned the child handle"))?
            .wait()
            .with_context(|| format!("failed to wait for `{}`", self.program.display()))?;

        let _ = cancel_tx.send(());
        let timed_out = watchdog
            .join()
            .map_err(|_| anyhow!("watchdog thread panicked"))?;

        Ok(CapturedOutput {
            stdout: buf,
            status,
            timed_out,
        })
    }
}

/// Find an executable in PATH.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}

/// Find a C compiler: `$CC` first, then the common names.
pub fn find_c_compiler() -> Option<PathBuf> {
    if let Ok(cc) = std::env::var("CC") {
        if let Some(path) = find_executable(&cc) {
            return Some(path);
        }
    }

    for compiler in &["cc", "gcc", "clang"] {
        if let Some(path) = find_executable(compiler) {
            return Some(path);
        }
    }

    None
}

/// Find the ar archiver: `$AR` first, then the common names.
pub fn find_ar() -> Option<PathBuf> {
    if let Ok(ar) = std::env::var("AR") {
        if let Some(path) = find_executable(&ar) {
            return Some(path);
        }
    }

    for archiver in &["ar", "llvm-ar"] {
        if let Some(path) = find_executable(archiver) {
            return Some(path);
        }
    }

    None
}
