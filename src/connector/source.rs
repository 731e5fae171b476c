use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::scn::Scn;

/// Owner-qualified table name as reported by the mining view.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableRef {
    pub owner: String,
    pub name: String,
}

impl TableRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.owner, self.name)
    }
}

/// Column layout of a monitored table, as resolved by the schema catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub table: TableRef,
    pub columns: Vec<String>,
}

/// Schema catalog and table filter. Tables it does not know are not
/// monitored; their changes are skipped before they reach the buffer.
pub trait SchemaProvider: Send + Sync {
    fn table_schema(&self, table: &TableRef) -> Option<Arc<TableSchema>>;

    /// Tables whose supplemental-logging configuration must be verified.
    fn monitored_tables(&self) -> Vec<TableRef>;
}

/// Structured result of parsing one redo statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowChange {
    Insert {
        new: Vec<Option<String>>,
    },
    Update {
        old: Vec<Option<String>>,
        new: Vec<Option<String>>,
    },
    Delete {
        old: Vec<Option<String>>,
    },
}

#[derive(Debug, thiserror::Error)]
#[error("{message}; statement: {redo_sql}")]
pub struct ParseError {
    pub message: String,
    pub redo_sql: String,
}

/// Turns a redo statement plus the table's schema into a structured change.
pub trait DmlParser: Send + Sync {
    fn parse(&self, redo_sql: &str, schema: &TableSchema) -> Result<RowChange, ParseError>;
}

/// One committed change handed to the downstream sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    pub table: TableRef,
    pub change: RowChange,
    /// SCN at which the DML was mined.
    pub scn: Scn,
    pub commit_scn: Scn,
    pub commit_timestamp: DateTime<Utc>,
    /// Smallest first SCN among transactions still open at commit time, so
    /// the sink knows the oldest position that may still be emitted later.
    pub smallest_open_scn: Option<Scn>,
    /// Changes left in this transaction after this one; zero marks the last.
    pub remaining: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The downstream queue has shut down. Emission aborts cleanly; this is
    /// not a producer failure.
    #[error("downstream dispatcher is shut down")]
    Closed,
    #[error("dispatch failed: {0}")]
    Failed(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Accepts committed records. May block on downstream backpressure.
pub trait EventDispatcher: Send + Sync {
    fn dispatch(&self, record: ChangeRecord) -> Result<(), DispatchError>;
}

#[derive(Debug, thiserror::Error)]
pub enum CallbackError {
    #[error("failed to parse redo statement: {0}")]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Executed once per buffered DML when its transaction commits.
pub trait CommitCallback: Send {
    fn execute(
        &self,
        timestamp: DateTime<Utc>,
        smallest_open_scn: Option<Scn>,
        commit_scn: Scn,
        remaining: usize,
    ) -> Result<(), CallbackError>;
}

/// The commit callback used by the mining loop: parses the redo statement
/// and hands the result to the dispatcher. Holds shared references plus the
/// per-DML parameters; everything needed at commit time is captured here.
pub struct DispatchOnCommit {
    pub parser: Arc<dyn DmlParser>,
    pub dispatcher: Arc<dyn EventDispatcher>,
    pub schema: Arc<TableSchema>,
    pub table: TableRef,
    pub redo_sql: String,
    pub scn: Scn,
}

impl CommitCallback for DispatchOnCommit {
    fn execute(
        &self,
        timestamp: DateTime<Utc>,
        smallest_open_scn: Option<Scn>,
        commit_scn: Scn,
        remaining: usize,
    ) -> Result<(), CallbackError> {
        let change = self.parser.parse(&self.redo_sql, &self.schema)?;
        self.dispatcher.dispatch(ChangeRecord {
            table: self.table.clone(),
            change,
            scn: self.scn,
            commit_scn,
            commit_timestamp: timestamp,
            smallest_open_scn,
            remaining,
        })?;
        Ok(())
    }
}

/// Shared liveness flag for the mining task. The loop polls it between
/// cycles and each emission task polls it between callbacks.
#[derive(Debug, Clone)]
pub struct SourceContext {
    running: Arc<AtomicBool>,
}

impl SourceContext {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }
}

impl Default for SourceContext {
    fn default() -> Self {
        Self::new()
    }
}
