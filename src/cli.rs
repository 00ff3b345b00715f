use clap::builder::FalseyValueParser;
use clap::{ArgAction, Parser};

use crate::remote::pan123::{DEFAULT_API_BASE, DEFAULT_LOGIN_BASE};
use crate::types::LogLevel;

#[derive(Parser, Debug)]
#[command(
    name = "strm-mirror",
    about = "Mirror a 123pan drive into .strm pointer files and subtitles"
)]
pub struct Cli {
    /// Remote directory ID to start from (0 is the drive root)
    #[arg(long, env = "PARENT_ID", default_value_t = 0)]
    pub parent_id: u64,

    /// Local media library root
    #[arg(long, env = "LIBRARY_PATH", default_value = "./EmbyLibrary")]
    pub local_path: String,

    /// 123pan account (phone number or e-mail)
    #[arg(short = 'u', long, env = "P123_USER")]
    pub passport: String,

    /// 123pan password (if not provided, will prompt).
    /// WARNING: passing via --password is visible in process listings.
    /// Prefer the P123_PASS environment variable instead.
    #[arg(short = 'p', long, env = "P123_PASS", hide_env_values = true)]
    pub password: Option<String>,

    /// Direct-link service URL written at the start of every pointer file
    #[arg(long, env = "DIRECT_LINK_SERVICE_URL", default_value = "http://172.17.0.1:8123")]
    pub strm_base_url: String,

    /// Only download subtitles; don't write pointer files for media
    #[arg(long, env = "SYNC_SUBTITLE_ONLY", action = ArgAction::SetTrue, value_parser = FalseyValueParser::new())]
    pub sidecar_only: bool,

    /// Rewrite pointer files even if they already exist
    #[arg(long, env = "FORCE_REGENERATE", action = ArgAction::SetTrue, value_parser = FalseyValueParser::new())]
    pub force_regenerate: bool,

    /// List the remote tree without writing anything locally
    #[arg(long)]
    pub dry_run: bool,

    /// Seconds to wait after each processed file or directory
    #[arg(long, default_value_t = 1.0)]
    pub request_delay: f64,

    /// Seconds to wait after each directory listing
    #[arg(long, default_value_t = 2.0)]
    pub dir_delay: f64,

    /// Retries after a failed download or listing (attempts = retries + 1)
    #[arg(long, default_value_t = 2)]
    pub max_retries: u32,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Also write the log to this file (empty to disable)
    #[arg(long, default_value = "strm_generator.log")]
    pub log_file: String,

    /// 123pan file API base URL
    #[arg(long, default_value = DEFAULT_API_BASE, hide = true)]
    pub api_base: String,

    /// 123pan sign-in base URL
    #[arg(long, default_value = DEFAULT_LOGIN_BASE, hide = true)]
    pub login_base: String,
}
