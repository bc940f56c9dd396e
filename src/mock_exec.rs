//! Scripted command executor for tests.
//!
//! Records every rendered invocation and answers from a script of canned
//! outcomes, so lifecycle logic can be exercised without docker, compose,
//! or sudo being present. Clones share the same call log and script.

use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::error::{HarnessError, HarnessResult};
use crate::exec::{CommandExecutor, ExecOutput, render_command};

#[derive(Clone, Default)]
pub struct MockExecutor {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    rules: Vec<Rule>,
    calls: Vec<String>,
}

struct Rule {
    needle: String,
    outcome: Outcome,
}

enum Outcome {
    Succeed(String),
    Fail,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands whose rendered line contains `needle` fail with a scripted
    /// execution error. Earlier rules win over later ones.
    pub fn fail_when(&self, needle: impl Into<String>) {
        self.push_rule(needle.into(), Outcome::Fail);
    }

    /// Commands whose rendered line contains `needle` succeed and produce
    /// `stdout`.
    pub fn respond_when(&self, needle: impl Into<String>, stdout: impl Into<String>) {
        self.push_rule(needle.into(), Outcome::Succeed(stdout.into()));
    }

    /// Every rendered command line seen so far, in invocation order.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.lock().calls.len()
    }

    fn push_rule(&self, needle: String, outcome: Outcome) {
        self.lock().rules.push(Rule { needle, outcome });
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("mock executor state poisoned")
    }
}

impl CommandExecutor for MockExecutor {
    fn exec_in(
        &self,
        _dir: Option<&Path>,
        program: &str,
        args: &[&str],
    ) -> HarnessResult<ExecOutput> {
        let rendered = render_command(program, args);
        let mut inner = self.lock();
        inner.calls.push(rendered.clone());

        for rule in &inner.rules {
            if rendered.contains(&rule.needle) {
                return match &rule.outcome {
                    Outcome::Succeed(stdout) => Ok(ExecOutput {
                        stdout: stdout.clone(),
                        stderr: String::new(),
                    }),
                    Outcome::Fail => Err(HarnessError::Exec {
                        command: rendered,
                        detail: "scripted failure".to_string(),
                    }),
                };
            }
        }

        // Unscripted commands succeed with empty output.
        Ok(ExecOutput::default())
    }
}
