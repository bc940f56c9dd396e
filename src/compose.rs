//! Compose service-group lifecycle: up, shutdown, rebuild.
//!
//! The compose descriptor itself is opaque to the harness; it only names
//! services within the working directory and interprets the compose CLI's
//! exit status and service listing. Operations against one working
//! directory are not safe to run concurrently; callers serialize them.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::config::HarnessConfig;
use crate::error::{HarnessError, HarnessResult};
use crate::exec::CommandExecutor;

/// Named services and their (opaque) definitions inside one descriptor.
pub type ServiceMap = BTreeMap<String, String>;

/// The unit of teardown: exactly the services one `up` call started.
///
/// `up` returns `None` instead when every requested service was already
/// running, and shutdown of `None` is a guaranteed no-op, so teardown is
/// safe to call unconditionally at the end of a test run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeHandle {
    dir: PathBuf,
    started: Vec<String>,
}

impl ComposeHandle {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Services this `up` call started, in the order they were requested.
    pub fn services(&self) -> &[String] {
        &self.started
    }
}

/// Drives the compose tooling for one daemon host.
pub struct ComposeOrchestrator<E> {
    exec: E,
    program: String,
    poll_interval: Duration,
}

impl<E: CommandExecutor> ComposeOrchestrator<E> {
    pub fn new(exec: E, config: &HarnessConfig) -> Self {
        Self {
            exec,
            program: config.compose_program.clone(),
            poll_interval: config.poll_interval,
        }
    }

    /// Bring up every service in `services` not listed in
    /// `already_running`, then block until all of them report ready or
    /// `timeout` elapses.
    ///
    /// Returns `Ok(None)` when nothing needed starting (no compose
    /// invocation happens at all). On timeout the whole operation fails
    /// and no teardown is attempted; partially started services belong to
    /// the caller.
    pub fn up(
        &self,
        dir: &Path,
        already_running: &[String],
        services: &ServiceMap,
        timeout: Duration,
    ) -> HarnessResult<Option<ComposeHandle>> {
        let to_start: Vec<String> = services
            .keys()
            .filter(|name| !already_running.contains(*name))
            .cloned()
            .collect();

        if to_start.is_empty() {
            info!("all requested services already running; nothing to start");
            return Ok(None);
        }

        let mut args: Vec<&str> = vec!["up", "-d"];
        args.extend(to_start.iter().map(String::as_str));
        self.exec.exec_in(Some(dir), &self.program, &args)?;

        self.wait_ready(dir, &to_start, timeout)?;

        Ok(Some(ComposeHandle {
            dir: dir.to_path_buf(),
            started: to_start,
        }))
    }

    /// Stop and remove exactly the services recorded in `handle`; other
    /// services in the same descriptor are left alone. `None` is a no-op.
    pub fn shutdown(&self, handle: Option<ComposeHandle>) -> HarnessResult<()> {
        let Some(handle) = handle else {
            debug!("shutdown of empty handle; nothing to do");
            return Ok(());
        };

        let mut stop: Vec<&str> = vec!["stop"];
        stop.extend(handle.started.iter().map(String::as_str));
        self.exec.exec_in(Some(&handle.dir), &self.program, &stop)?;

        let mut rm: Vec<&str> = vec!["rm", "-f"];
        rm.extend(handle.started.iter().map(String::as_str));
        self.exec.exec_in(Some(&handle.dir), &self.program, &rm)?;
        Ok(())
    }

    /// Force a rebuild of one service's image without touching the rest of
    /// the group.
    pub fn rebuild(&self, dir: &Path, service: &str) -> HarnessResult<()> {
        self.exec
            .exec_in(Some(dir), &self.program, &["build", "--no-cache", service])?;
        Ok(())
    }

    /// Poll the compose listing until every service in `services` is
    /// running, or fail hard once `timeout` has elapsed.
    fn wait_ready(&self, dir: &Path, services: &[String], timeout: Duration) -> HarnessResult<()> {
        let deadline = Instant::now() + timeout;
        loop {
            let output = self.exec.exec_in(
                Some(dir),
                &self.program,
                &["ps", "--services", "--filter", "status=running"],
            )?;
            let running: HashSet<&str> = output
                .stdout
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .collect();

            if services.iter().all(|s| running.contains(s.as_str())) {
                info!("services ready: {}", services.join(", "));
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(HarnessError::Timeout(timeout));
            }
            thread::sleep(self.poll_interval);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_exec::MockExecutor;

    fn fast_config() -> HarnessConfig {
        HarnessConfig {
            poll_interval: Duration::from_millis(5),
            ..HarnessConfig::default()
        }
    }

    fn group(names: &[&str]) -> ServiceMap {
        names
            .iter()
            .map(|n| ((*n).to_string(), String::new()))
            .collect()
    }

    #[test]
    fn up_is_a_noop_when_everything_already_runs() {
        let mock = MockExecutor::new();
        let orchestrator = ComposeOrchestrator::new(mock.clone(), &fast_config());

        let handle = orchestrator
            .up(
                Path::new("/srv/compose"),
                &["db".to_string(), "web".to_string()],
                &group(&["web", "db"]),
                Duration::from_secs(1),
            )
            .unwrap();

        assert!(handle.is_none());
        assert_eq!(mock.call_count(), 0);
    }

    #[test]
    fn up_starts_only_missing_services_and_waits_for_them() {
        let mock = MockExecutor::new();
        mock.respond_when("ps --services", "db\nweb\n");
        let orchestrator = ComposeOrchestrator::new(mock.clone(), &fast_config());

        let handle = orchestrator
            .up(
                Path::new("/srv/compose"),
                &["db".to_string()],
                &group(&["web", "db"]),
                Duration::from_secs(1),
            )
            .unwrap()
            .expect("web needed starting");

        assert_eq!(handle.services(), ["web".to_string()]);
        let calls = mock.calls();
        assert_eq!(calls[0], "docker-compose up -d web");
        assert!(calls[1].contains("ps --services"));
    }

    #[test]
    fn up_times_out_when_services_never_report_ready() {
        let mock = MockExecutor::new();
        mock.respond_when("ps --services", "db\n");
        let orchestrator = ComposeOrchestrator::new(mock, &fast_config());

        let err = orchestrator
            .up(
                Path::new("/srv/compose"),
                &[],
                &group(&["web"]),
                Duration::from_millis(20),
            )
            .unwrap_err();

        assert!(matches!(err, HarnessError::Timeout(_)));
    }

    #[test]
    fn up_propagates_compose_failure() {
        let mock = MockExecutor::new();
        mock.fail_when("up -d");
        let orchestrator = ComposeOrchestrator::new(mock, &fast_config());

        let err = orchestrator
            .up(
                Path::new("/srv/compose"),
                &[],
                &group(&["web"]),
                Duration::from_secs(1),
            )
            .unwrap_err();

        assert!(matches!(err, HarnessError::Exec { .. }));
    }

    #[test]
    fn shutdown_of_none_is_a_noop() {
        let mock = MockExecutor::new();
        let orchestrator = ComposeOrchestrator::new(mock.clone(), &fast_config());

        orchestrator.shutdown(None).unwrap();
        assert_eq!(mock.call_count(), 0);
    }

    #[test]
    fn shutdown_stops_exactly_the_started_services() {
        let mock = MockExecutor::new();
        let orchestrator = ComposeOrchestrator::new(mock.clone(), &fast_config());

        let handle = ComposeHandle {
            dir: PathBuf::from("/srv/compose"),
            started: vec!["web".to_string(), "worker".to_string()],
        };
        orchestrator.shutdown(Some(handle)).unwrap();

        assert_eq!(
            mock.calls(),
            vec![
                "docker-compose stop web worker",
                "docker-compose rm -f web worker",
            ]
        );
    }

    #[test]
    fn rebuild_targets_one_service() {
        let mock = MockExecutor::new();
        let orchestrator = ComposeOrchestrator::new(mock.clone(), &fast_config());

        orchestrator
            .rebuild(Path::new("/srv/compose"), "web")
            .unwrap();
        assert_eq!(mock.calls(), vec!["docker-compose build --no-cache web"]);
    }
}
