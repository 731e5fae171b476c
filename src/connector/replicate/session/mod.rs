use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use oracle::sql_type::FromSql;

use crate::connector::config::LogMiningStrategy;
use crate::connector::scn::Scn;
use crate::connector::source::TableRef;
use crate::connector::Result;

mod oracle_session;

pub use oracle_session::{OracleMiningSession, OracleSessionConfig};

/// Transaction identifier as reported by the mining view (XID), kept as an
/// opaque uppercase-hex string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId(String);

impl TransactionId {
    pub fn from_raw(bytes: &[u8]) -> Self {
        let mut hex = String::with_capacity(bytes.len() * 2);
        for byte in bytes {
            hex.push_str(&format!("{byte:02X}"));
        }
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TransactionId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromSql for TransactionId {
    fn from_sql(val: &oracle::SqlValue) -> oracle::Result<Self> {
        let raw: Vec<u8> = val.get()?;
        Ok(Self::from_raw(&raw))
    }
}

/// One redo or archive log file, with the SCN range it covers. The next
/// change of the current redo is the database's maximum SCN sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFile {
    pub name: String,
    pub first_change: Scn,
    pub next_change: Scn,
}

/// One classified row from a mining fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MiningRow {
    Dml {
        txn_id: TransactionId,
        scn: Scn,
        table: TableRef,
        redo_sql: String,
        change_time: DateTime<Utc>,
    },
    Commit {
        txn_id: TransactionId,
        scn: Scn,
        timestamp: DateTime<Utc>,
    },
    Rollback {
        txn_id: TransactionId,
    },
}

/// Everything the mining loop needs from the database session.
///
/// The bundled [`OracleMiningSession`] implements this against a live
/// connection; tests drive the loop with a scripted in-memory session.
pub trait MiningSession {
    /// Re-establishes the connection after a transient fault.
    fn reconnect(&mut self) -> Result<()>;

    fn current_scn(&mut self) -> Result<Scn>;

    fn database_time(&mut self) -> Result<DateTime<Utc>>;

    /// The database's maximum SCN sentinel for its version.
    fn max_scn(&mut self) -> Result<Scn>;

    /// Oldest first-change SCN still retrievable from the online logs (and
    /// archives within the retention window).
    fn oldest_online_first_change(&mut self, archive_retention: Duration) -> Result<Scn>;

    fn list_online_logs(&mut self) -> Result<Vec<LogFile>>;

    /// Archived logs whose range reaches past `offset_scn`, restricted to
    /// the retention window when one is set.
    fn list_archived_logs(
        &mut self,
        offset_scn: Scn,
        archive_retention: Duration,
    ) -> Result<Vec<LogFile>>;

    /// Members of the CURRENT online redo group(s); changes to this set
    /// signal a log switch.
    fn current_log_files(&mut self) -> Result<HashSet<String>>;

    /// File names currently registered with the mining session.
    fn registered_files(&mut self) -> Result<Vec<String>>;

    fn register_file(&mut self, file: &LogFile) -> Result<()>;

    fn deregister_file(&mut self, name: &str) -> Result<()>;

    fn begin_mining(
        &mut self,
        start_scn: Scn,
        end_scn: Scn,
        strategy: LogMiningStrategy,
        continuous: bool,
    ) -> Result<()>;

    fn end_mining(&mut self) -> Result<()>;

    /// Streams classified rows for the window, in SCN order. Both bounds
    /// are inclusive; the one-SCN overlap between consecutive windows is
    /// absorbed by the buffer's de-duplication guards.
    fn fetch(
        &mut self,
        start_scn: Scn,
        end_scn: Scn,
    ) -> Result<Box<dyn Iterator<Item = Result<MiningRow>> + '_>>;

    /// Writes the data dictionary into the redo stream
    /// (`CATALOG_IN_REDO` strategy).
    fn build_dictionary(&mut self) -> Result<()>;

    fn set_nls_session_parameters(&mut self) -> Result<()>;

    /// Fails unless supplemental logging is enabled database-wide or on
    /// every monitored table.
    fn verify_supplemental_logging(&mut self, tables: &[TableRef]) -> Result<()>;

    /// Creates and seeds the auxiliary flush table if missing.
    fn ensure_flush_table(&mut self) -> Result<()>;

    /// Forces the log writer(s) to persist buffered redo so the next fetch
    /// sees everything up to the current SCN.
    fn flush_log_writer(&mut self) -> Result<()>;
}
