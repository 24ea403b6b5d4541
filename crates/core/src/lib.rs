pub mod archive;
pub mod batch;
pub mod config;
pub mod driver;
pub mod fetcher;
pub mod metrics;
pub mod placer;
pub mod registry;
pub mod retry;
pub mod sequence;
pub mod store;
pub mod testing;
pub mod triage;

pub use archive::{extract_archives, ArchiveError, ExtractionReport};
pub use batch::{AdvanceOutcome, BatchCursor, BatchStatus, PrepareOutcome, PreparedBatch};
pub use config::{
    load_config, load_config_from_env, load_config_from_str, validate_config, Config,
    ConfigError, FetcherBackend,
};
pub use driver::{BatchDriver, BatchReport, DriverError, DriverPhase};
pub use fetcher::{
    ArtifactLocator, CommandFetcher, ContentFetcher, FetchError, HttpFetcher, MediaFileLocator,
};
pub use registry::{Annotation, LinkRecord, LinkRegistry, RegistryError};
pub use retry::{
    AttemptOutcome, DownloadAttempt, Resolution, RetryOrchestrator, RetryPolicy, Sleeper,
    TokioSleeper, UrlResolution,
};
pub use sequence::SequenceCounter;
pub use store::{FileStore, MemoryStore, StoreError, TextStore};
pub use triage::{ArtifactTriage, TriageError, TriageOutcome, VideoArtifact};
