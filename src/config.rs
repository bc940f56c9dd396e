//! Configuration for the test harness.

use std::time::Duration;

/// Configuration shared by the daemon facade and its components.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Program that drives the compose descriptor (e.g. `docker-compose`).
    pub compose_program: String,
    /// Program used to elevate privileges for host-mutating commands.
    pub elevate_program: String,
    /// How long `up` waits for newly started services to report ready.
    pub service_timeout: Duration,
    /// Delay between readiness polls.
    pub poll_interval: Duration,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            compose_program: "docker-compose".to_string(),
            elevate_program: "sudo".to_string(),
            service_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_millis(500),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_sane() {
        let config = HarnessConfig::default();
        assert_eq!(config.compose_program, "docker-compose");
        assert_eq!(config.elevate_program, "sudo");
        assert!(config.poll_interval < config.service_timeout);
    }
}
