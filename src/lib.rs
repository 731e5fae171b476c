//! Streaming extraction of committed row-level changes from an Oracle
//! database via its LogMiner facility.
//!
//! LogMiner output is interleaved at the log-record grain: one scan over
//! `V$LOGMNR_CONTENTS` returns rows from many concurrent transactions mixed
//! together, with commit and rollback markers only appearing when each
//! transaction ends. This crate buffers per-transaction work, releases it on
//! commit in commit order, discards it on rollback, and advances its durable
//! offset only once every transaction older than the watermark has
//! terminated.
//!
//! The entry point is [`Connector`], which drives a [`MiningSession`]
//! (either the bundled live Oracle implementation or a custom one) and feeds
//! committed changes to an [`EventDispatcher`].

pub mod connector;

pub use connector::config::{LogMiningConfig, LogMiningStrategy};
pub use connector::metrics::{MetricsSnapshot, ReplicationMetrics};
pub use connector::offset::ReplicationOffset;
pub use connector::replicate::buffer::TransactionalBuffer;
pub use connector::replicate::log::AdaptiveController;
pub use connector::replicate::session::{
    LogFile, MiningRow, MiningSession, OracleMiningSession, OracleSessionConfig, TransactionId,
};
pub use connector::scn::{DatabaseVersion, Scn};
pub use connector::source::{
    CallbackError, ChangeRecord, CommitCallback, DispatchError, DmlParser, EventDispatcher,
    ParseError, RowChange, SchemaProvider, SourceContext, TableRef, TableSchema,
};
pub use connector::{Connector, Error, ErrorHandler, Result};
