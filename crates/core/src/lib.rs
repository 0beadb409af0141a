pub mod advice;
pub mod cooldown;
pub mod domain;
pub mod tasks;

pub mod config {
    use anyhow::Context;
    use std::path::PathBuf;
    use std::time::Duration;

    pub const DEFAULT_ENDPOINT: &str =
        "https://sqkkpx87r3.ap-south-1.awsapprunner.com/get-predictions";
    pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
    pub const DEFAULT_COOLDOWN_SECS: u64 = 90;

    const STATE_DIR_NAME: &str = "fund_advisor";

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub endpoint: String,
        pub timeout: Duration,
        pub cooldown_window: Duration,
        pub state_dir: Option<PathBuf>,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let endpoint = std::env::var("ADVISOR_ENDPOINT")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

            let timeout_secs = parse_secs("ADVISOR_TIMEOUT_SECS")?.unwrap_or(DEFAULT_TIMEOUT_SECS);
            let cooldown_secs =
                parse_secs("ADVISOR_COOLDOWN_SECS")?.unwrap_or(DEFAULT_COOLDOWN_SECS);
            anyhow::ensure!(cooldown_secs > 0, "ADVISOR_COOLDOWN_SECS must be positive");

            Ok(Self {
                endpoint,
                timeout: Duration::from_secs(timeout_secs),
                cooldown_window: Duration::from_secs(cooldown_secs),
                state_dir: std::env::var_os("ADVISOR_STATE_DIR").map(PathBuf::from),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
            })
        }

        /// Directory holding the persisted cooldown deadline.
        pub fn resolve_state_dir(&self) -> anyhow::Result<PathBuf> {
            if let Some(dir) = &self.state_dir {
                return Ok(dir.clone());
            }
            let base = dirs::state_dir()
                .or_else(dirs::data_local_dir)
                .context("no state directory available; set ADVISOR_STATE_DIR")?;
            Ok(base.join(STATE_DIR_NAME))
        }
    }

    fn parse_secs(key: &str) -> anyhow::Result<Option<u64>> {
        match std::env::var(key) {
            Ok(s) => s
                .trim()
                .parse::<u64>()
                .map(Some)
                .with_context(|| format!("{key} must be a whole number of seconds (got {s:?})")),
            Err(_) => Ok(None),
        }
    }
}
