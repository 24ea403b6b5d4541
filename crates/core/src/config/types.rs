use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub triage: TriageConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Locations of every durable file and directory.
///
/// Relative paths are resolved against the working directory.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PathsConfig {
    /// Master registry, one URL per line.
    #[serde(default = "default_registry")]
    pub registry: PathBuf,
    /// Working set the current batch is copied into.
    #[serde(default = "default_working_set")]
    pub working_set: PathBuf,
    #[serde(default = "default_cursor")]
    pub cursor: PathBuf,
    #[serde(default = "default_drain_marker")]
    pub drain_marker: PathBuf,
    #[serde(default = "default_counter")]
    pub counter: PathBuf,
    /// Where the fetcher deposits output before triage.
    #[serde(default = "default_holding_dir")]
    pub holding_dir: PathBuf,
    #[serde(default = "default_final_store")]
    pub final_store: PathBuf,
    /// Scanned by `extract` for `.zip` files.
    #[serde(default = "default_archives_dir")]
    pub archives_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            registry: default_registry(),
            working_set: default_working_set(),
            cursor: default_cursor(),
            drain_marker: default_drain_marker(),
            counter: default_counter(),
            holding_dir: default_holding_dir(),
            final_store: default_final_store(),
            archives_dir: default_archives_dir(),
        }
    }
}

fn default_registry() -> PathBuf {
    PathBuf::from("all_links.txt")
}

fn default_working_set() -> PathBuf {
    PathBuf::from("links.txt")
}

fn default_cursor() -> PathBuf {
    PathBuf::from("batch_progress.txt")
}

fn default_drain_marker() -> PathBuf {
    PathBuf::from("batch_progress.done")
}

fn default_counter() -> PathBuf {
    PathBuf::from("counter.txt")
}

fn default_holding_dir() -> PathBuf {
    PathBuf::from("temp")
}

fn default_final_store() -> PathBuf {
    PathBuf::from("VIDEOS")
}

fn default_archives_dir() -> PathBuf {
    PathBuf::from("archives")
}

/// Batch partitioning
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BatchConfig {
    /// Registry lines per batch (default: 10)
    #[serde(default = "default_batch_size")]
    pub size: usize,
    /// Advance the cursor automatically after a batch run (default: false)
    #[serde(default)]
    pub auto_advance: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            size: default_batch_size(),
            auto_advance: false,
        }
    }
}

fn default_batch_size() -> usize {
    10
}

/// Backoff shape between fetch attempts
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BackoffKind {
    #[default]
    Fixed,
    Exponential,
}

/// Retry budget per URL
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetryConfig {
    /// Fetch attempts per URL (default: 7)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay after the first failed attempt (default: 5000)
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    #[serde(default)]
    pub backoff: BackoffKind,
    /// Growth factor for exponential backoff (default: 2.0)
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    /// Upper bound for exponential backoff (default: 60000)
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: default_delay_ms(),
            backoff: BackoffKind::Fixed,
            multiplier: default_multiplier(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    7
}

fn default_delay_ms() -> u64 {
    5000
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_max_delay_ms() -> u64 {
    60_000
}

/// Available fetch backends
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FetcherBackend {
    #[default]
    Http,
    Command,
}

/// Content fetcher configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FetcherConfig {
    #[serde(default)]
    pub backend: FetcherBackend,
    /// Wait after a fetch reports completion before scanning (default: 0)
    #[serde(default)]
    pub settle_ms: u64,
    #[serde(default)]
    pub http: HttpFetcherConfig,
    #[serde(default)]
    pub command: CommandFetcherConfig,
}

impl FetcherConfig {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

/// HTTP backend configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpFetcherConfig {
    /// Request timeout in seconds (default: 300)
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpFetcherConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_http_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_http_timeout() -> u64 {
    300
}

fn default_user_agent() -> String {
    concat!("reelbatch/", env!("CARGO_PKG_VERSION")).to_string()
}

/// External downloader configuration (required when backend = "command")
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CommandFetcherConfig {
    /// Program to run, looked up on PATH
    #[serde(default)]
    pub program: Option<String>,
    /// Arguments; `{url}` and `{dest}` are substituted per attempt
    #[serde(default = "default_command_args")]
    pub args: Vec<String>,
    /// Kill the program after this many seconds (default: 600)
    #[serde(default = "default_command_timeout")]
    pub timeout_secs: u64,
}

impl Default for CommandFetcherConfig {
    fn default() -> Self {
        Self {
            program: None,
            args: default_command_args(),
            timeout_secs: default_command_timeout(),
        }
    }
}

fn default_command_args() -> Vec<String> {
    vec!["{url}".to_string()]
}

fn default_command_timeout() -> u64 {
    600
}

/// Size triage and naming of committed artifacts
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TriageConfig {
    /// Artifacts larger than this are discarded (default: 100 MiB)
    #[serde(default = "default_max_size_bytes")]
    pub max_size_bytes: u64,
    /// Canonical name prefix (default: "Video_")
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
    /// Canonical extension without the dot (default: "mp4")
    #[serde(default = "default_extension")]
    pub extension: String,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            max_size_bytes: default_max_size_bytes(),
            file_prefix: default_file_prefix(),
            extension: default_extension(),
        }
    }
}

impl TriageConfig {
    /// Canonical file name for a sequence id.
    pub fn canonical_name(&self, id: u64) -> String {
        format!("{}{}.{}", self.file_prefix, id, self.extension)
    }
}

fn default_max_size_bytes() -> u64 {
    100 * 1024 * 1024
}

fn default_file_prefix() -> String {
    "Video_".to_string()
}

fn default_extension() -> String {
    "mp4".to_string()
}

/// Metrics export
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MetricsConfig {
    /// Write Prometheus text exposition here after each command
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub textfile: Option<PathBuf>,
}
