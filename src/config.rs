use std::path::PathBuf;
use std::time::Duration;

use crate::retry::RetryConfig;
use crate::sync::SyncConfig;
use crate::types::LogLevel;

/// Application configuration.
pub struct Config {
    pub passport: String,
    pub password: Option<String>,
    pub local_root: PathBuf,
    pub strm_base_url: String,
    pub log_file: Option<PathBuf>,
    pub api_base: String,
    pub login_base: String,

    pub parent_id: u64,
    pub request_delay: Duration,
    pub dir_delay: Duration,
    pub timeout: Duration,
    pub max_retries: u32,

    pub log_level: LogLevel,

    pub sidecar_only: bool,
    pub force_regenerate: bool,
    pub dry_run: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("passport", &self.passport)
            .field("password", &"<redacted>")
            .field("local_root", &self.local_root)
            .field("parent_id", &self.parent_id)
            .field("strm_base_url", &self.strm_base_url)
            .field("sidecar_only", &self.sidecar_only)
            .field("force_regenerate", &self.force_regenerate)
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

fn parse_delay(name: &str, secs: f64) -> anyhow::Result<Duration> {
    Duration::try_from_secs_f64(secs)
        .map_err(|_| anyhow::anyhow!("--{} must be a non-negative number of seconds, got {}", name, secs))
}

impl Config {
    pub fn from_cli(cli: crate::cli::Cli) -> anyhow::Result<Self> {
        if cli.local_path.trim().is_empty() {
            anyhow::bail!("--local-path must not be empty");
        }
        if cli.timeout == 0 {
            anyhow::bail!("--timeout must be at least 1 second");
        }

        let log_file = Some(cli.log_file)
            .filter(|f| !f.trim().is_empty())
            .map(|f| expand_tilde(&f));

        Ok(Self {
            passport: cli.passport,
            password: cli.password.filter(|p| !p.is_empty()),
            local_root: expand_tilde(&cli.local_path),
            strm_base_url: cli.strm_base_url.trim_end_matches('/').to_string(),
            log_file,
            api_base: cli.api_base,
            login_base: cli.login_base,
            parent_id: cli.parent_id,
            request_delay: parse_delay("request-delay", cli.request_delay)?,
            dir_delay: parse_delay("dir-delay", cli.dir_delay)?,
            timeout: Duration::from_secs(cli.timeout),
            max_retries: cli.max_retries,
            log_level: cli.log_level,
            sidecar_only: cli.sidecar_only,
            force_regenerate: cli.force_regenerate,
            dry_run: cli.dry_run,
        })
    }

    /// The engine's view of this configuration.
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            local_root: self.local_root.clone(),
            strm_base_url: self.strm_base_url.clone(),
            sidecar_only: self.sidecar_only,
            force_regenerate: self.force_regenerate,
            dry_run: self.dry_run,
            request_delay: self.request_delay,
            dir_delay: self.dir_delay,
            retry: RetryConfig {
                max_retries: self.max_retries,
                ..RetryConfig::default()
            },
        }
    }
}
