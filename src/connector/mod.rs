use std::sync::{Arc, Mutex};

use self::config::LogMiningConfig;
use self::metrics::ReplicationMetrics;
use self::offset::ReplicationOffset;
use self::replicate::log::MiningDeps;
use self::replicate::session::MiningSession;
use self::scn::{DatabaseVersion, Scn};
use self::source::{CallbackError, DmlParser, EventDispatcher, SchemaProvider, SourceContext};

pub mod config;
pub mod metrics;
pub mod offset;
pub mod replicate;
pub mod scn;
pub mod source;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("oracle error: {0}")]
    Oracle(Arc<oracle::Error>),
    #[error("I/O error: {0}")]
    Io(Arc<std::io::Error>),
    #[error(
        "online redo logs do not contain the offset SCN {offset} \
         (oldest retrievable is {oldest}); clean the offset and re-snapshot"
    )]
    OffsetNotInRedoLogs { offset: Scn, oldest: Scn },
    #[error("none of the log files contains offset SCN {0}; clean the offset and re-snapshot")]
    NoLogsContainOffset(Scn),
    #[error("max SCN cannot be resolved for database version {0}")]
    UnsupportedDatabaseVersion(DatabaseVersion),
    #[error("cannot parse database version from banner: {0}")]
    UnparseableVersionBanner(String),
    #[error("supplemental logging not properly configured: {0}")]
    SupplementalLogging(String),
    #[error("emission worker is not running")]
    EmissionWorkerStopped,
    #[error(transparent)]
    Emission(#[from] CallbackError),
}

impl From<oracle::Error> for Error {
    fn from(value: oracle::Error) -> Self {
        Self::Oracle(Arc::new(value))
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(Arc::new(value))
    }
}

/// Oracle error codes that signal session or network loss rather than a
/// real fault: connection lost contact, destination host unreachable,
/// recursive SQL error, immediate shutdown in progress.
const TRANSIENT_ORA_CODES: &[i32] = &[3135, 12543, 604, 1089];

impl Error {
    /// Whether the mining task should reconnect and resume instead of
    /// failing.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Io(_) => true,
            Error::Oracle(e) => {
                if let Some(code) = oracle_error_code(e) {
                    if TRANSIENT_ORA_CODES.contains(&code) {
                        return true;
                    }
                }
                e.to_string()
                    .to_uppercase()
                    .contains("NO MORE DATA TO READ FROM SOCKET")
            }
            _ => false,
        }
    }
}

pub(crate) fn oracle_error_code(error: &oracle::Error) -> Option<i32> {
    match error {
        oracle::Error::OciError(db) | oracle::Error::DpiError(db) => Some(db.code()),
        _ => None,
    }
}

/// Collects the first failure seen by the emission worker so the mining
/// thread can abort its loop with it.
#[derive(Debug, Clone, Default)]
pub struct ErrorHandler {
    inner: Arc<Mutex<Option<Error>>>,
}

impl ErrorHandler {
    /// Records a producer-side failure. Only the first one is kept.
    pub fn set_producer_error(&self, error: Error) {
        let mut slot = self.inner.lock().unwrap();
        if slot.is_none() {
            *slot = Some(error);
        }
    }

    pub fn take(&self) -> Option<Error> {
        self.inner.lock().unwrap().take()
    }
}

/// Ties the configuration and the collaborators together and drives a
/// mining session until stopped.
pub struct Connector {
    config: LogMiningConfig,
    parser: Arc<dyn DmlParser>,
    dispatcher: Arc<dyn EventDispatcher>,
    schemas: Arc<dyn SchemaProvider>,
    metrics: Arc<ReplicationMetrics>,
}

impl Connector {
    pub fn new(
        config: LogMiningConfig,
        parser: Arc<dyn DmlParser>,
        dispatcher: Arc<dyn EventDispatcher>,
        schemas: Arc<dyn SchemaProvider>,
    ) -> Self {
        Self {
            config,
            parser,
            dispatcher,
            schemas,
            metrics: Arc::new(ReplicationMetrics::default()),
        }
    }

    /// Health counters for the management surface.
    pub fn metrics(&self) -> &Arc<ReplicationMetrics> {
        &self.metrics
    }

    /// Mines committed changes from `offset` until `ctx` stops or a fatal
    /// error occurs, advancing `offset` as transactions terminate.
    pub fn replicate<S: MiningSession>(
        &self,
        session: &mut S,
        offset: &mut ReplicationOffset,
        ctx: &SourceContext,
    ) -> Result<()> {
        let deps = MiningDeps {
            parser: self.parser.clone(),
            dispatcher: self.dispatcher.clone(),
            schemas: self.schemas.clone(),
        };
        replicate::replicate(session, &self.config, offset, &deps, ctx, &self.metrics)
    }
}
