//! Local test-harness orchestration for containerized services.
//!
//! Brings up, synchronizes, and tears down a named group of services on a
//! daemon host for integration testing:
//!
//! - Privileged command execution against the host
//! - Content-digest comparison so only changed files are re-copied
//! - Compose lifecycle (up with bounded readiness wait, targeted
//!   shutdown, single-service rebuild)
//! - Daemon restart with fallback across init systems
//!
//! The [`daemon::LocalDaemon`] facade composes these into the operations
//! one test session needs. All operations are synchronous and blocking;
//! callers serialize compose operations per working directory.

pub mod compose;
pub mod config;
pub mod daemon;
pub mod digest;
pub mod error;
pub mod exec;
pub mod mock_exec;
pub mod restart;

pub use compose::{ComposeHandle, ComposeOrchestrator, ServiceMap};
pub use config::HarnessConfig;
pub use daemon::{HostResolver, LocalDaemon, Loopback};
pub use digest::{PathPair, differing, local_digests, remote_digests};
pub use error::{HarnessError, HarnessResult};
pub use exec::{CommandExecutor, ExecOutput, PrivilegedExecutor, ProcessExecutor};
pub use restart::{RestartCommand, RestartPlan};
