use std::collections::{HashMap, HashSet};
use std::time::Duration;

use chrono::{DateTime, Utc};
use oracle::sql_type::{OracleType, ToSql};
use oracle::{Connection, RowValue};
use serde::{Deserialize, Serialize};

use crate::connector::config::{LogMiningConfig, LogMiningStrategy};
use crate::connector::scn::{DatabaseVersion, Scn};
use crate::connector::source::TableRef;
use crate::connector::{oracle_error_code, Error, Result};

use super::{LogFile, MiningRow, MiningSession, TransactionId};

/// `oracle`'s `ToSql` implementation for `&str` uses the `NVARCHAR2` type,
/// which Oracle expects to be UTF16 encoded by default. Bind as `VARCHAR2`
/// instead, which Oracle expects to be UTF8 encoded by default.
struct VarcharBind<'a>(&'a str);

impl ToSql for VarcharBind<'_> {
    fn oratype(&self, _conn: &Connection) -> oracle::Result<OracleType> {
        Ok(OracleType::Varchar2(self.0.len() as u32))
    }

    fn to_sql(&self, val: &mut oracle::SqlValue) -> oracle::Result<()> {
        val.set(&self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleSessionConfig {
    pub username: String,
    pub password: String,
    /// `host:port/service` for the mining connection.
    pub connect_string: String,
    /// Connect strings of the other RAC nodes. Each node has its own log
    /// writer, and all of them must flush before a fetch; empty for
    /// single-instance databases.
    #[serde(default)]
    pub rac_flush_connect_strings: Vec<String>,
}

const FLUSH_TABLE: &str = "LOG_MINING_FLUSH";

const FLUSH_RETRIES: usize = 3;
const FLUSH_RETRY_BACKOFF: Duration = Duration::from_millis(250);

const CONTENTS_QUERY: &str = "\
SELECT SCN, TIMESTAMP, XID, OPERATION_CODE, SEG_OWNER, TABLE_NAME, SQL_REDO, CSF \
FROM V$LOGMNR_CONTENTS \
WHERE SCN >= :start_scn AND SCN <= :end_scn \
AND OPERATION_CODE IN (1, 2, 3, 7, 36)";

const ONLINE_LOGS_QUERY: &str = "\
SELECT MIN(F.MEMBER) AS NAME, \
L.FIRST_CHANGE# AS FIRST_CHANGE, \
TO_CHAR(L.NEXT_CHANGE#) AS NEXT_CHANGE \
FROM V$LOG L \
INNER JOIN V$LOGFILE F ON L.GROUP# = F.GROUP# \
WHERE L.STATUS != 'UNUSED' \
GROUP BY L.GROUP#, L.FIRST_CHANGE#, L.NEXT_CHANGE# \
ORDER BY L.FIRST_CHANGE#";

const CURRENT_LOG_FILES_QUERY: &str = "\
SELECT F.MEMBER FROM V$LOG L \
INNER JOIN V$LOGFILE F ON L.GROUP# = F.GROUP# \
WHERE L.STATUS = 'CURRENT'";

const NLS_SESSION_PARAMETERS: &str = "\
ALTER SESSION SET \
NLS_DATE_FORMAT = 'YYYY-MM-DD HH24:MI:SS' \
NLS_TIMESTAMP_FORMAT = 'YYYY-MM-DD HH24:MI:SS.FF' \
NLS_TIMESTAMP_TZ_FORMAT = 'YYYY-MM-DD HH24:MI:SS.FF TZH:TZM' \
NLS_NUMERIC_CHARACTERS = '.,'";

/// [`MiningSession`] against a live database.
///
/// Owns the mining connection plus one cached auxiliary connection per RAC
/// peer for log-writer flushes.
pub struct OracleMiningSession {
    config: OracleSessionConfig,
    connection: Connection,
    flush_connections: HashMap<String, Connection>,
    fetch_size: u32,
    version: Option<DatabaseVersion>,
}

impl OracleMiningSession {
    pub fn connect(config: OracleSessionConfig, mining: &LogMiningConfig) -> Result<Self> {
        let connection =
            Connection::connect(&config.username, &config.password, &config.connect_string)?;
        Ok(Self {
            config,
            connection,
            flush_connections: HashMap::new(),
            fetch_size: mining.fetch_size,
            version: None,
        })
    }

    fn database_version(&mut self) -> Result<DatabaseVersion> {
        if let Some(version) = self.version {
            return Ok(version);
        }
        let banner: String = self.connection.query_row_as(
            "SELECT BANNER FROM V$VERSION WHERE BANNER LIKE 'Oracle%'",
            &[],
        )?;
        let version = parse_version_banner(&banner)
            .ok_or_else(|| Error::UnparseableVersionBanner(banner.clone()))?;
        self.version = Some(version);
        Ok(version)
    }

    fn execute_call(&self, statement: &str) -> Result<()> {
        log::trace!("{statement}");
        self.connection.execute(statement, &[])?;
        Ok(())
    }

    fn flush_connection(&mut self, connect_string: &str) -> Result<&Connection> {
        if !self.flush_connections.contains_key(connect_string) {
            let connection = Connection::connect(
                &self.config.username,
                &self.config.password,
                connect_string,
            )?;
            self.flush_connections
                .insert(connect_string.to_owned(), connection);
        }
        Ok(&self.flush_connections[connect_string])
    }

    /// Flushes one RAC peer with a bounded retry; a peer that keeps failing
    /// gets its cached connection dropped so the next attempt redials it.
    fn flush_peer(&mut self, connect_string: &str, scn: Scn) -> Result<()> {
        let mut attempt = 0;
        loop {
            if attempt > 0 {
                std::thread::sleep(FLUSH_RETRY_BACKOFF);
            }
            let result = self.flush_connection(connect_string).and_then(|connection| {
                connection
                    .execute(&format!("UPDATE {FLUSH_TABLE} SET LAST_SCN = :scn"), &[&scn])?;
                connection.commit()?;
                Ok(())
            });
            match result {
                Ok(()) => return Ok(()),
                Err(e) => {
                    log::warn!(
                        "cannot flush log writer of node {connect_string} \
                         (attempt {}): {e}",
                        attempt + 1
                    );
                    self.flush_connections.remove(connect_string);
                    attempt += 1;
                    if attempt >= FLUSH_RETRIES {
                        return Err(e);
                    }
                }
            }
        }
    }
}

impl MiningSession for OracleMiningSession {
    fn reconnect(&mut self) -> Result<()> {
        self.connection = Connection::connect(
            &self.config.username,
            &self.config.password,
            &self.config.connect_string,
        )?;
        self.flush_connections.clear();
        Ok(())
    }

    fn current_scn(&mut self) -> Result<Scn> {
        let scn = self
            .connection
            .query_row_as::<Scn>("SELECT CURRENT_SCN FROM V$DATABASE", &[])?;
        Ok(scn)
    }

    fn database_time(&mut self) -> Result<DateTime<Utc>> {
        let time = self
            .connection
            .query_row_as::<DateTime<Utc>>("SELECT SYSTIMESTAMP FROM DUAL", &[])?;
        Ok(time)
    }

    fn max_scn(&mut self) -> Result<Scn> {
        let version = self.database_version()?;
        Scn::max_for_version(version).ok_or(Error::UnsupportedDatabaseVersion(version))
    }

    fn oldest_online_first_change(&mut self, archive_retention: Duration) -> Result<Scn> {
        if archive_retention.is_zero() {
            let scn = self
                .connection
                .query_row_as::<Scn>("SELECT MIN(FIRST_CHANGE#) FROM V$LOG", &[])?;
            return Ok(scn);
        }
        let sql = "\
            SELECT MIN(FIRST_CHANGE) FROM ( \
            SELECT MIN(FIRST_CHANGE#) AS FIRST_CHANGE FROM V$LOG \
            UNION ALL \
            SELECT MIN(FIRST_CHANGE#) AS FIRST_CHANGE FROM V$ARCHIVED_LOG \
            WHERE NAME IS NOT NULL AND STATUS = 'A' \
            AND FIRST_TIME >= SYSDATE - :retention_days)";
        let mut stmt = self.connection.statement(sql).build()?;
        stmt.bind("retention_days", &days(archive_retention))?;
        let rows = stmt.query_as::<Scn>(&[])?;
        for row in rows {
            return Ok(row?);
        }
        Ok(Scn::ZERO)
    }

    fn list_online_logs(&mut self) -> Result<Vec<LogFile>> {
        let max_scn = self.max_scn()?;
        let rows = self
            .connection
            .query_as::<(String, Scn, Option<String>)>(ONLINE_LOGS_QUERY, &[])?;
        let mut logs = vec![];
        for row in rows {
            let (name, first_change, next_change) = row?;
            let next_change = next_change
                .and_then(|value| value.parse().ok())
                .unwrap_or(max_scn);
            logs.push(LogFile {
                name,
                first_change,
                next_change,
            });
        }
        Ok(logs)
    }

    fn list_archived_logs(
        &mut self,
        offset_scn: Scn,
        archive_retention: Duration,
    ) -> Result<Vec<LogFile>> {
        let max_scn = self.max_scn()?;
        let mut sql = String::from(
            "SELECT NAME, FIRST_CHANGE# AS FIRST_CHANGE, TO_CHAR(NEXT_CHANGE#) AS NEXT_CHANGE \
             FROM V$ARCHIVED_LOG \
             WHERE NAME IS NOT NULL AND STATUS = 'A' AND NEXT_CHANGE# > :offset_scn",
        );
        if !archive_retention.is_zero() {
            sql.push_str(" AND FIRST_TIME >= SYSDATE - :retention_days");
        }
        sql.push_str(" ORDER BY SEQUENCE#");

        let mut stmt = self.connection.statement(&sql).build()?;
        stmt.bind("offset_scn", &offset_scn)?;
        if !archive_retention.is_zero() {
            stmt.bind("retention_days", &days(archive_retention))?;
        }
        let rows = stmt.query_as::<(String, Scn, Option<String>)>(&[])?;
        let mut logs = vec![];
        for row in rows {
            let (name, first_change, next_change) = row?;
            let next_change = next_change
                .and_then(|value| value.parse().ok())
                .unwrap_or(max_scn);
            logs.push(LogFile {
                name,
                first_change,
                next_change,
            });
        }
        Ok(logs)
    }

    fn current_log_files(&mut self) -> Result<HashSet<String>> {
        let rows = self
            .connection
            .query_as::<String>(CURRENT_LOG_FILES_QUERY, &[])?;
        let mut names = HashSet::new();
        for row in rows {
            names.insert(row?);
        }
        Ok(names)
    }

    fn registered_files(&mut self) -> Result<Vec<String>> {
        let rows = self
            .connection
            .query_as::<String>("SELECT FILENAME FROM V$LOGMNR_LOGS", &[])?;
        let mut names = vec![];
        for row in rows {
            names.push(row?);
        }
        Ok(names)
    }

    fn register_file(&mut self, file: &LogFile) -> Result<()> {
        let sql = "BEGIN DBMS_LOGMNR.ADD_LOGFILE(LOGFILENAME => :name, \
                   OPTIONS => DBMS_LOGMNR.ADDFILE); END;";
        log::trace!("{sql}, {}", file.name);
        self.connection
            .execute_named(sql, &[("name", &VarcharBind(&file.name))])?;
        Ok(())
    }

    fn deregister_file(&mut self, name: &str) -> Result<()> {
        let sql = "BEGIN DBMS_LOGMNR.REMOVE_LOGFILE(LOGFILENAME => :name); END;";
        log::trace!("{sql}, {name}");
        self.connection
            .execute_named(sql, &[("name", &VarcharBind(name))])?;
        Ok(())
    }

    fn begin_mining(
        &mut self,
        start_scn: Scn,
        end_scn: Scn,
        strategy: LogMiningStrategy,
        continuous: bool,
    ) -> Result<()> {
        let sql = format!(
            "BEGIN DBMS_LOGMNR.START_LOGMNR(\
             STARTSCN => :start_scn, ENDSCN => :end_scn, \
             OPTIONS => {}); END;",
            mining_options(strategy, continuous)
        );
        log::trace!("{sql}, {start_scn}, {end_scn}");
        self.connection
            .execute_named(&sql, &[("start_scn", &start_scn), ("end_scn", &end_scn)])?;
        Ok(())
    }

    fn end_mining(&mut self) -> Result<()> {
        let sql = "BEGIN DBMS_LOGMNR.END_LOGMNR; END;";
        log::trace!("{sql}");
        match self.connection.execute(sql, &[]) {
            Ok(_) => Ok(()),
            // ORA-01307: no LogMiner session is active
            Err(e) if oracle_error_code(&e) == Some(1307) => {
                log::info!("log mining session was already closed");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn fetch(
        &mut self,
        start_scn: Scn,
        end_scn: Scn,
    ) -> Result<Box<dyn Iterator<Item = Result<MiningRow>> + '_>> {
        let stmt = self
            .connection
            .statement(CONTENTS_QUERY)
            .fetch_array_size(self.fetch_size)
            .build()?;
        let rows = stmt.into_result_set_named::<RawContent>(&[
            ("start_scn", &start_scn),
            ("end_scn", &end_scn),
        ])?;
        let stitched = Stitch::new(rows.map(|row| row.map_err(Error::from)));
        Ok(Box::new(stitched.filter_map(|row| match row {
            Ok(raw) => classify(raw).map(Ok),
            Err(e) => Some(Err(e)),
        })))
    }

    fn build_dictionary(&mut self) -> Result<()> {
        log::trace!("building data dictionary into redo");
        self.execute_call(
            "BEGIN DBMS_LOGMNR_D.BUILD(OPTIONS => DBMS_LOGMNR_D.STORE_IN_REDO_LOGS); END;",
        )
    }

    fn set_nls_session_parameters(&mut self) -> Result<()> {
        self.execute_call(NLS_SESSION_PARAMETERS)
    }

    fn verify_supplemental_logging(&mut self, tables: &[TableRef]) -> Result<()> {
        let all: String = self
            .connection
            .query_row_as("SELECT SUPPLEMENTAL_LOG_DATA_ALL FROM V$DATABASE", &[])?;
        if all.eq_ignore_ascii_case("YES") {
            return Ok(());
        }

        let min: String = self
            .connection
            .query_row_as("SELECT SUPPLEMENTAL_LOG_DATA_MIN FROM V$DATABASE", &[])?;
        if !min.eq_ignore_ascii_case("YES") {
            return Err(Error::SupplementalLogging(
                "not enabled at the database; \
                 use: ALTER DATABASE ADD SUPPLEMENTAL LOG DATA"
                    .into(),
            ));
        }

        // Without database-wide ALL logging, every monitored table must log
        // all columns itself.
        for table in tables {
            let mut stmt = self
                .connection
                .statement(
                    "SELECT LOG_GROUP_TYPE FROM ALL_LOG_GROUPS \
                     WHERE OWNER = :owner AND TABLE_NAME = :table_name",
                )
                .build()?;
            stmt.bind("owner", &VarcharBind(&table.owner))?;
            stmt.bind("table_name", &VarcharBind(&table.name))?;
            let mut all_columns = false;
            for row in stmt.query_as::<String>(&[])? {
                if row?.eq_ignore_ascii_case("ALL COLUMN LOGGING") {
                    all_columns = true;
                }
            }
            if !all_columns {
                return Err(Error::SupplementalLogging(format!(
                    "not configured for table {table}; use: \
                     ALTER TABLE {table} ADD SUPPLEMENTAL LOG DATA (ALL) COLUMNS"
                )));
            }
        }
        Ok(())
    }

    fn ensure_flush_table(&mut self) -> Result<()> {
        let existing = self.connection.query_row_as::<String>(
            &format!("SELECT TABLE_NAME FROM USER_TABLES WHERE TABLE_NAME = '{FLUSH_TABLE}'"),
            &[],
        );
        match existing {
            Ok(_) => {}
            Err(oracle::Error::NoDataFound) => {
                self.execute_call(&format!(
                    "CREATE TABLE {FLUSH_TABLE} (LAST_SCN NUMBER(19,0))"
                ))?;
            }
            Err(e) => return Err(e.into()),
        }

        let records: u64 = self
            .connection
            .query_row_as(&format!("SELECT COUNT(*) FROM {FLUSH_TABLE}"), &[])?;
        if records == 0 {
            self.connection
                .execute(&format!("INSERT INTO {FLUSH_TABLE} VALUES (0)"), &[])?;
            self.connection.commit()?;
        }
        Ok(())
    }

    fn flush_log_writer(&mut self) -> Result<()> {
        let scn = self.current_scn()?;
        if self.config.rac_flush_connect_strings.is_empty() {
            log::trace!("updating {FLUSH_TABLE} with SCN {scn}");
            self.connection
                .execute(&format!("UPDATE {FLUSH_TABLE} SET LAST_SCN = :scn"), &[&scn])?;
            self.connection.commit()?;
            return Ok(());
        }

        let peers = self.config.rac_flush_connect_strings.clone();
        for peer in &peers {
            self.flush_peer(peer, scn)?;
        }
        Ok(())
    }
}

fn days(retention: Duration) -> f64 {
    retention.as_secs_f64() / 86_400.0
}

fn parse_version_banner(banner: &str) -> Option<DatabaseVersion> {
    banner.split_whitespace().find_map(|token| {
        let mut parts = token.split('.');
        let major = parts.next()?.parse().ok()?;
        let maintenance = parts.next()?.parse().ok()?;
        Some(DatabaseVersion { major, maintenance })
    })
}

fn mining_options(strategy: LogMiningStrategy, continuous: bool) -> String {
    let dictionary = match strategy {
        LogMiningStrategy::OnlineCatalog => "DBMS_LOGMNR.DICT_FROM_ONLINE_CATALOG",
        LogMiningStrategy::CatalogInRedo => {
            "DBMS_LOGMNR.DICT_FROM_REDO_LOGS + DBMS_LOGMNR.DDL_DICT_TRACKING"
        }
    };
    let mut options = format!("{dictionary} + DBMS_LOGMNR.NO_ROWID_IN_STMT");
    if continuous {
        options.push_str(" + DBMS_LOGMNR.CONTINUOUS_MINE");
    }
    options
}

const OP_CODE_INSERT: u8 = 1;
const OP_CODE_DELETE: u8 = 2;
const OP_CODE_UPDATE: u8 = 3;
const OP_CODE_COMMIT: u8 = 7;
const OP_CODE_ROLLBACK: u8 = 36;

/// A raw row from `V$LOGMNR_CONTENTS`.
#[derive(Debug, Clone, RowValue)]
struct RawContent {
    scn: Scn,
    timestamp: DateTime<Utc>,
    xid: Vec<u8>,
    operation_code: u8,
    seg_owner: Option<String>,
    table_name: Option<String>,
    sql_redo: Option<String>,
    csf: u8,
}

fn classify(raw: RawContent) -> Option<MiningRow> {
    let txn_id = TransactionId::from_raw(&raw.xid);
    match raw.operation_code {
        OP_CODE_INSERT | OP_CODE_DELETE | OP_CODE_UPDATE => {
            let (Some(owner), Some(table_name), Some(redo_sql)) =
                (raw.seg_owner, raw.table_name, raw.sql_redo)
            else {
                log::warn!(
                    "DML row at SCN {} without owner, table or redo, skipped",
                    raw.scn
                );
                return None;
            };
            Some(MiningRow::Dml {
                txn_id,
                scn: raw.scn,
                table: TableRef::new(owner, table_name),
                redo_sql,
                change_time: raw.timestamp,
            })
        }
        OP_CODE_COMMIT => Some(MiningRow::Commit {
            txn_id,
            scn: raw.scn,
            timestamp: raw.timestamp,
        }),
        OP_CODE_ROLLBACK => Some(MiningRow::Rollback { txn_id }),
        _ => None,
    }
}

/// Reassembles statements split across rows by the continuation flag.
///
/// A row with `CSF = 1` continues in the next row; the final fragment has
/// `CSF = 0`. Output rows always have `CSF = 0`.
struct Stitch<I> {
    rows: I,
    pending: Option<RawContent>,
}

impl<I> Stitch<I> {
    fn new(rows: I) -> Self {
        Self {
            rows,
            pending: None,
        }
    }
}

impl<I: Iterator<Item = Result<RawContent>>> Iterator for Stitch<I> {
    type Item = Result<RawContent>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let row = match self.rows.next() {
                Some(Ok(row)) => row,
                Some(Err(e)) => return Some(Err(e)),
                None => return self.pending.take().map(Ok),
            };

            if let Some(mut previous) = self.pending.take() {
                previous.sql_redo = match (previous.sql_redo, row.sql_redo) {
                    (Some(mut head), Some(tail)) => {
                        head.push_str(&tail);
                        Some(head)
                    }
                    (head, tail) => head.or(tail),
                };
                if row.csf == 0 {
                    previous.csf = 0;
                    return Some(Ok(previous));
                }
                self.pending = Some(previous);
            } else if row.csf == 0 {
                return Some(Ok(row));
            } else {
                self.pending = Some(row);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(scn: u64, code: u8, sql: Option<&str>, csf: u8) -> RawContent {
        RawContent {
            scn: Scn::new(scn),
            timestamp: Utc::now(),
            xid: vec![0, 0, 0, 0, 0, 0, 0, scn as u8],
            operation_code: code,
            seg_owner: Some("INVENTORY".into()),
            table_name: Some("ORDERS".into()),
            sql_redo: sql.map(Into::into),
            csf,
        }
    }

    #[test]
    fn parses_version_banners() {
        let banner =
            "Oracle Database 19c Enterprise Edition Release 19.0.0.0.0 - Production";
        assert_eq!(
            parse_version_banner(banner),
            Some(DatabaseVersion {
                major: 19,
                maintenance: 0
            })
        );
        let banner = "Oracle Database 11g Release 11.2.0.4.0 - 64bit Production";
        assert_eq!(
            parse_version_banner(banner),
            Some(DatabaseVersion {
                major: 11,
                maintenance: 2
            })
        );
        assert_eq!(parse_version_banner("no digits here"), None);
    }

    #[test]
    fn mining_options_per_strategy() {
        assert_eq!(
            mining_options(LogMiningStrategy::OnlineCatalog, false),
            "DBMS_LOGMNR.DICT_FROM_ONLINE_CATALOG + DBMS_LOGMNR.NO_ROWID_IN_STMT"
        );
        assert_eq!(
            mining_options(LogMiningStrategy::CatalogInRedo, true),
            "DBMS_LOGMNR.DICT_FROM_REDO_LOGS + DBMS_LOGMNR.DDL_DICT_TRACKING \
             + DBMS_LOGMNR.NO_ROWID_IN_STMT + DBMS_LOGMNR.CONTINUOUS_MINE"
        );
    }

    #[test]
    fn stitches_continuation_rows() {
        let rows = vec![
            Ok(raw(1, OP_CODE_INSERT, Some("insert into t values ("), 1)),
            Ok(raw(1, OP_CODE_INSERT, Some("'abc')"), 0)),
            Ok(raw(2, OP_CODE_COMMIT, None, 0)),
        ];
        let stitched: Vec<_> = Stitch::new(rows.into_iter())
            .map(Result::unwrap)
            .collect();
        assert_eq!(stitched.len(), 2);
        assert_eq!(
            stitched[0].sql_redo.as_deref(),
            Some("insert into t values ('abc')")
        );
        assert_eq!(stitched[0].csf, 0);
        assert_eq!(stitched[1].operation_code, OP_CODE_COMMIT);
    }

    #[test]
    fn stitches_multi_fragment_statements() {
        let rows = vec![
            Ok(raw(1, OP_CODE_UPDATE, Some("a"), 1)),
            Ok(raw(1, OP_CODE_UPDATE, Some("b"), 1)),
            Ok(raw(1, OP_CODE_UPDATE, Some("c"), 0)),
        ];
        let stitched: Vec<_> = Stitch::new(rows.into_iter())
            .map(Result::unwrap)
            .collect();
        assert_eq!(stitched.len(), 1);
        assert_eq!(stitched[0].sql_redo.as_deref(), Some("abc"));
    }

    #[test]
    fn classifies_operation_codes() {
        let row = classify(raw(5, OP_CODE_INSERT, Some("insert"), 0)).unwrap();
        assert!(matches!(
            row,
            MiningRow::Dml { scn, .. } if scn == Scn::new(5)
        ));
        let row = classify(raw(6, OP_CODE_COMMIT, None, 0)).unwrap();
        assert!(matches!(
            row,
            MiningRow::Commit { scn, .. } if scn == Scn::new(6)
        ));
        assert!(matches!(
            classify(raw(7, OP_CODE_ROLLBACK, None, 0)).unwrap(),
            MiningRow::Rollback { .. }
        ));
        // DDL and other codes are not surfaced.
        assert!(classify(raw(8, 5, Some("create table"), 0)).is_none());
    }

    #[test]
    fn dml_without_redo_is_skipped() {
        assert!(classify(raw(5, OP_CODE_INSERT, None, 0)).is_none());
    }
}
