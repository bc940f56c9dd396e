//! Local daemon facade: everything one test session needs from the host.
//!
//! Composes the executor, digest comparator, compose orchestrator, and
//! restart plan into the operations a test driver calls: IP resolution,
//! install, diff, compose up/down, rebuild-one-service, restart-daemon.
//! One facade is created per test session and owns no long-lived state
//! beyond its configuration.

use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;

use tracing::debug;

use crate::compose::{ComposeHandle, ComposeOrchestrator, ServiceMap};
use crate::config::HarnessConfig;
use crate::digest::{self, PathPair};
use crate::error::HarnessResult;
use crate::exec::{CommandExecutor, PrivilegedExecutor, ProcessExecutor};
use crate::restart::RestartPlan;

/// Resolve the address the daemon's services will be reachable on.
///
/// Pluggable so that remote daemons can be supported without redesigning
/// the facade; the default resolver assumes the daemon runs locally.
pub trait HostResolver {
    fn resolve(&self) -> HarnessResult<IpAddr>;
}

/// The daemon runs on this machine.
#[derive(Debug, Clone, Copy, Default)]
pub struct Loopback;

impl HostResolver for Loopback {
    fn resolve(&self) -> HarnessResult<IpAddr> {
        Ok(IpAddr::V4(Ipv4Addr::LOCALHOST))
    }
}

/// Facade over one daemon host for the duration of a test session.
///
/// `H` executes host-mutating commands (privileged), `C` executes compose
/// invocations (unprivileged), `R` resolves the host address.
pub struct LocalDaemon<H, C, R = Loopback> {
    host_exec: H,
    compose: ComposeOrchestrator<C>,
    resolver: R,
    restart_plan: RestartPlan,
    config: HarnessConfig,
}

impl LocalDaemon<PrivilegedExecutor, ProcessExecutor, Loopback> {
    /// A daemon facade with the standard executors: sudo-wrapped host
    /// commands, direct compose invocations, loopback host resolution.
    pub fn new(config: HarnessConfig) -> Self {
        Self::with_parts(
            PrivilegedExecutor::new(config.elevate_program.clone()),
            ProcessExecutor,
            Loopback,
            config,
        )
    }
}

impl<H, C, R> LocalDaemon<H, C, R>
where
    H: CommandExecutor,
    C: CommandExecutor,
    R: HostResolver,
{
    pub fn with_parts(host_exec: H, compose_exec: C, resolver: R, config: HarnessConfig) -> Self {
        let compose = ComposeOrchestrator::new(compose_exec, &config);
        Self {
            host_exec,
            compose,
            resolver,
            restart_plan: RestartPlan::default(),
            config,
        }
    }

    /// Replace the default restart candidates.
    pub fn with_restart_plan(mut self, plan: RestartPlan) -> Self {
        self.restart_plan = plan;
        self
    }

    /// The address where composed services will be reachable. Exposed
    /// because test drivers often need the address before the services
    /// exist.
    pub fn ip(&self) -> HarnessResult<IpAddr> {
        self.resolver.resolve()
    }

    /// Put a file from the local machine onto the daemon host, creating
    /// parent directories as needed and overwriting existing content.
    pub fn install_file(&self, local: &Path, remote: &Path) -> HarnessResult<()> {
        if let Some(parent) = remote.parent() {
            let dir = parent.to_string_lossy().into_owned();
            self.host_exec.exec("mkdir", &["-p", dir.as_str()])?;
        }
        let src = local.to_string_lossy().into_owned();
        let dst = remote.to_string_lossy().into_owned();
        self.host_exec.exec("cp", &[src.as_str(), dst.as_str()])?;
        Ok(())
    }

    /// The subset of `pairs` whose local and remote contents differ, in
    /// input order. Installing only these avoids redundant copies and the
    /// service restarts they would trigger.
    pub fn differing_files(&self, pairs: &[PathPair]) -> HarnessResult<Vec<PathPair>> {
        digest::differing(&self.host_exec, pairs)
    }

    /// Bring up the services of `services` not in `already_running` and
    /// wait for readiness within the configured timeout. The returned
    /// handle (or `None`) is the unit of teardown for [`Self::shutdown`].
    pub fn compose_services(
        &self,
        dir: &Path,
        already_running: &[String],
        services: &ServiceMap,
    ) -> HarnessResult<Option<ComposeHandle>> {
        let ip = self.ip()?;
        debug!("composing services in {} against {ip}", dir.display());
        self.compose
            .up(dir, already_running, services, self.config.service_timeout)
    }

    /// Force a rebuild of one service's image.
    pub fn rebuild_service(&self, dir: &Path, name: &str) -> HarnessResult<()> {
        self.compose.rebuild(dir, name)
    }

    /// Tear down whatever the matching `compose_services` call started.
    /// Passing `None` (all services were already running) is a no-op.
    pub fn shutdown(&self, handle: Option<ComposeHandle>) -> HarnessResult<()> {
        self.compose.shutdown(handle)
    }

    /// Restart the container daemon itself, falling back across the
    /// configured restart candidates.
    pub fn restart_daemon(&self) -> HarnessResult<()> {
        self.restart_plan.run(&self.host_exec)
    }
}
