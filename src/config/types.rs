use serde::Deserialize;

/// Main configuration structure for Play-Sweeper
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Control API listener configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8384,
        }
    }
}

/// Worker pool configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Number of worker threads; each one runs at most one job at a time
    pub workers: usize,

    /// Prefix used to name worker threads
    #[serde(rename = "thread-prefix")]
    pub thread_prefix: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: 10,
            thread_prefix: "scraper".to_string(),
        }
    }
}

/// Crawl job behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Attempts made per fetch unit before giving up
    #[serde(rename = "retry-limit")]
    pub retry_limit: u32,

    /// Records requested per collection page
    #[serde(rename = "page-size")]
    pub page_size: usize,

    /// Number of loaded records scheduled for enrichment per job
    #[serde(rename = "details-batch-size")]
    pub details_batch_size: usize,

    /// Attempts made to load one previously dumped file
    #[serde(rename = "read-retry-limit")]
    pub read_retry_limit: u32,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            retry_limit: 5,
            page_size: crate::fetch::MAX_RECORD_SIZE_PER_PAGE,
            details_batch_size: 1000,
            read_retry_limit: 3,
        }
    }
}

/// HTTP collaborator configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Store root, e.g. `https://play.google.com/store/apps`
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Value of the `hl` query parameter
    pub language: String,

    /// Value of the `gl` query parameter
    pub country: String,

    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    #[serde(rename = "connect-timeout-secs")]
    pub connect_timeout_secs: u64,

    #[serde(rename = "user-agent")]
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: "https://play.google.com/store/apps".to_string(),
            language: "en".to_string(),
            country: "us".to_string(),
            timeout_secs: 30,
            connect_timeout_secs: 10,
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0 Safari/537.36"
                .to_string(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving the chunked JSON dumps
    #[serde(rename = "output-dir")]
    pub output_dir: String,

    /// Directory receiving the process log file
    #[serde(rename = "log-dir")]
    pub log_dir: String,

    /// Leading component of every dump file name
    #[serde(rename = "file-prefix")]
    pub file_prefix: String,

    /// Maximum number of records written to a single chunk file
    #[serde(rename = "max-records-per-file")]
    pub max_records_per_file: usize,

    /// Attempts made to write one chunk file
    #[serde(rename = "dump-retry-limit")]
    pub dump_retry_limit: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: "opt".to_string(),
            log_dir: "log".to_string(),
            file_prefix: "sweeper".to_string(),
            max_records_per_file: 25_000,
            dump_retry_limit: 3,
        }
    }
}
