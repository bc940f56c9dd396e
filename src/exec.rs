//! Command execution against the daemon host.
//!
//! All shell work in the harness funnels through [`CommandExecutor`]:
//! directory creation, file copies, staging, compose invocations, and
//! daemon restarts. The contract is one synchronous attempt with no retry
//! and no timeout of its own; fallback policy lives in callers.

use std::borrow::Cow;
use std::path::Path;
use std::process::Command;

use tracing::{debug, info};

use crate::error::{HarnessError, HarnessResult};

/// Captured output of a successful command.
#[derive(Debug, Clone, Default)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
}

/// The single I/O primitive higher components are built on.
///
/// A non-zero exit status, a missing program, or a transport failure all
/// surface as one opaque error with the captured cause attached; there is
/// no partial-success signaling.
pub trait CommandExecutor {
    /// Run `program` with `args`, optionally in `dir`, and capture output.
    fn exec_in(
        &self,
        dir: Option<&Path>,
        program: &str,
        args: &[&str],
    ) -> HarnessResult<ExecOutput>;

    /// Run `program` with `args` in the current directory.
    fn exec(&self, program: &str, args: &[&str]) -> HarnessResult<ExecOutput> {
        self.exec_in(None, program, args)
    }
}

/// Render a command line for logging, shell-escaping each argument.
pub(crate) fn render_command(program: &str, args: &[&str]) -> String {
    let mut line = String::from(program);
    for arg in args {
        line.push(' ');
        line.push_str(&shell_escape::escape(Cow::Borrowed(*arg)));
    }
    line
}

fn run(dir: Option<&Path>, program: &str, args: &[&str]) -> HarnessResult<ExecOutput> {
    let rendered = render_command(program, args);
    info!("exec: {rendered}");

    let mut cmd = Command::new(program);
    cmd.args(args);
    if let Some(dir) = dir {
        cmd.current_dir(dir);
    }

    let output = cmd.output().map_err(|source| HarnessError::Spawn {
        command: rendered.clone(),
        source,
    })?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if !output.status.success() {
        debug!("exec failed ({}): {}", output.status, stderr.trim());
        return Err(HarnessError::Exec {
            command: rendered,
            detail: format!("{}: {}", output.status, stderr.trim()),
        });
    }

    Ok(ExecOutput { stdout, stderr })
}

/// Runs programs directly, with no privilege elevation.
///
/// Used for compose invocations and in tests, where `sudo` is neither
/// needed nor available.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessExecutor;

impl CommandExecutor for ProcessExecutor {
    fn exec_in(
        &self,
        dir: Option<&Path>,
        program: &str,
        args: &[&str],
    ) -> HarnessResult<ExecOutput> {
        run(dir, program, args)
    }
}

/// Runs programs through a privilege-elevation wrapper (`sudo` by default).
///
/// Host-mutating commands (installing files, staging remote copies,
/// restarting the daemon) go through this executor.
#[derive(Debug, Clone)]
pub struct PrivilegedExecutor {
    elevate: String,
}

impl PrivilegedExecutor {
    pub fn new(elevate: impl Into<String>) -> Self {
        Self {
            elevate: elevate.into(),
        }
    }
}

impl Default for PrivilegedExecutor {
    fn default() -> Self {
        Self::new("sudo")
    }
}

impl CommandExecutor for PrivilegedExecutor {
    fn exec_in(
        &self,
        dir: Option<&Path>,
        program: &str,
        args: &[&str],
    ) -> HarnessResult<ExecOutput> {
        let mut wrapped = Vec::with_capacity(args.len() + 1);
        wrapped.push(program);
        wrapped.extend_from_slice(args);
        run(dir, &self.elevate, &wrapped)
    }
}
