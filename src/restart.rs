//! Daemon restart fallback across host init systems.
//!
//! Different hosts expose different restart mechanisms (init script,
//! service manager, systemd unit) and the harness has no way to know
//! which is present without introspecting the host. The plan tries a
//! fixed priority order and accepts the first success.

use tracing::{info, warn};

use crate::error::{HarnessError, HarnessResult};
use crate::exec::CommandExecutor;

/// One candidate restart invocation.
#[derive(Debug, Clone)]
pub struct RestartCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl RestartCommand {
    pub fn new(
        program: impl Into<String>,
        args: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

/// Ordered restart candidates, built once and immutable afterwards.
#[derive(Debug, Clone)]
pub struct RestartPlan {
    candidates: Vec<RestartCommand>,
}

impl Default for RestartPlan {
    /// The docker restart candidates, legacy mechanisms first.
    fn default() -> Self {
        Self::new(vec![
            RestartCommand::new("/etc/init.d/docker", ["restart"]),
            RestartCommand::new("service", ["docker", "restart"]),
            RestartCommand::new("systemctl", ["restart", "docker", "docker.socket"]),
        ])
    }
}

impl RestartPlan {
    pub fn new(candidates: Vec<RestartCommand>) -> Self {
        Self { candidates }
    }

    /// Try each candidate in order and stop at the first success. Early
    /// return happens only on success; a failed candidate hands over to
    /// the next one, and when every candidate has failed the last error
    /// is reported.
    pub fn run<E: CommandExecutor>(&self, exec: &E) -> HarnessResult<()> {
        let mut last_err = None;
        for candidate in &self.candidates {
            let args: Vec<&str> = candidate.args.iter().map(String::as_str).collect();
            match exec.exec(&candidate.program, &args) {
                Ok(_) => {
                    info!("daemon restarted via {}", candidate.program);
                    return Ok(());
                }
                Err(err) => {
                    warn!("restart candidate {} failed: {err}", candidate.program);
                    last_err = Some(err);
                }
            }
        }
        match last_err {
            Some(err) => Err(HarnessError::RestartExhausted(Box::new(err))),
            // An empty plan has nothing to fail.
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_exec::MockExecutor;

    fn plan(names: &[&str]) -> RestartPlan {
        RestartPlan::new(
            names
                .iter()
                .map(|n| RestartCommand::new(*n, ["restart"]))
                .collect(),
        )
    }

    #[test]
    fn stops_at_first_success_without_trying_later_candidates() {
        let mock = MockExecutor::new();
        mock.fail_when("candidate-a");
        let result = plan(&["candidate-a", "candidate-b", "candidate-c"]).run(&mock);

        assert!(result.is_ok());
        let calls = mock.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].contains("candidate-a"));
        assert!(calls[1].contains("candidate-b"));
    }

    #[test]
    fn first_candidate_failing_does_not_short_circuit() {
        // The dangerous shape of this loop returns after the first
        // attempt regardless of outcome; a failing first candidate must
        // still reach the second.
        let mock = MockExecutor::new();
        mock.fail_when("candidate-a");
        assert!(plan(&["candidate-a", "candidate-b"]).run(&mock).is_ok());
        assert_eq!(mock.call_count(), 2);
    }

    #[test]
    fn all_failing_reports_the_last_error() {
        let mock = MockExecutor::new();
        mock.fail_when("candidate-a");
        mock.fail_when("candidate-b");
        let err = plan(&["candidate-a", "candidate-b"]).run(&mock).unwrap_err();

        match err {
            HarnessError::RestartExhausted(last) => {
                assert!(last.to_string().contains("candidate-b"));
                assert!(!last.to_string().contains("candidate-a"));
            }
            other => panic!("expected RestartExhausted, got {other:?}"),
        }
    }

    #[test]
    fn empty_plan_succeeds_vacuously() {
        let mock = MockExecutor::new();
        assert!(RestartPlan::new(Vec::new()).run(&mock).is_ok());
        assert_eq!(mock.call_count(), 0);
    }

    #[test]
    fn default_plan_tries_init_script_first() {
        let mock = MockExecutor::new();
        RestartPlan::default().run(&mock).unwrap();
        let calls = mock.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].starts_with("/etc/init.d/docker"));
    }
}
