use std::sync::Arc;
use std::time::Duration;

use crate::connector::config::{LogMiningConfig, LogMiningStrategy};
use crate::connector::metrics::{warn_counted, ReplicationMetrics};
use crate::connector::offset::ReplicationOffset;
use crate::connector::scn::Scn;
use crate::connector::source::{
    DispatchOnCommit, DmlParser, EventDispatcher, SchemaProvider, SourceContext,
};
use crate::connector::{ErrorHandler, Result};

use super::buffer::TransactionalBuffer;
use super::session::{MiningRow, MiningSession};

pub mod adaptive;
pub(crate) mod planner;

pub use adaptive::AdaptiveController;

/// Shared collaborators each buffered DML's commit callback closes over.
#[derive(Clone)]
pub(crate) struct MiningDeps {
    pub parser: Arc<dyn DmlParser>,
    pub dispatcher: Arc<dyn EventDispatcher>,
    pub schemas: Arc<dyn SchemaProvider>,
}

/// The Mine/Advance cycle: size the next window, pace, watch for log
/// switches, fetch and classify rows into the buffer, then move the
/// watermark and the durable offset forward.
///
/// Windows are inclusive on both ends and each cycle restarts at the
/// previous end SCN, so consecutive windows overlap by one SCN. The
/// buffer's register- and commit-side guards absorb the replayed rows.
#[allow(clippy::too_many_arguments)]
pub(crate) fn mine<S: MiningSession>(
    session: &mut S,
    config: &LogMiningConfig,
    buffer: &mut TransactionalBuffer,
    offset: &mut ReplicationOffset,
    controller: &mut AdaptiveController,
    start_scn: &mut Scn,
    deps: &MiningDeps,
    ctx: &SourceContext,
    metrics: &Arc<ReplicationMetrics>,
    errors: &ErrorHandler,
) -> Result<()> {
    let archive_retention = Duration::from_secs(config.archive_log_retention_hours * 3600);
    let mut current_files = session.current_log_files()?;

    while ctx.is_running() {
        if let Some(error) = errors.take() {
            return Err(error);
        }

        session.flush_log_writer()?;
        let current_scn = session.current_scn()?;
        metrics.set_current_scn(current_scn);

        let end_scn = controller.next_end_scn(current_scn, *start_scn);
        metrics.set_batch_size(controller.batch_size());
        metrics.set_sleep_ms(controller.sleep_ms());
        log::trace!("start SCN: {start_scn}, end SCN: {end_scn}");

        std::thread::sleep(Duration::from_millis(controller.sleep_ms()));

        let files_now = session.current_log_files()?;
        if files_now != current_files {
            log::debug!("log switch occurred, from {current_files:?} to {files_now:?}");
            metrics.increment_log_switches();
            // A long-running mining session leaks PGA; a switch is the
            // moment to start a fresh one.
            session.end_mining()?;
            if !config.continuous_mine {
                if config.strategy == LogMiningStrategy::CatalogInRedo {
                    session.build_dictionary()?;
                }
                abandon_stale_transactions(
                    session,
                    config,
                    buffer,
                    offset,
                    start_scn,
                    metrics,
                    archive_retention,
                )?;
                planner::plan_log_files(session, offset.scn(), archive_retention)?;
            }
            current_files = files_now;
        }

        session.begin_mining(*start_scn, end_scn, config.strategy, config.continuous_mine)?;

        let rows = session.fetch(*start_scn, end_scn)?;
        for row in rows {
            dispatch_row(row?, buffer, offset, deps, ctx);
        }

        log::trace!("largest SCN: {}", buffer.largest_scn());
        advance(buffer, offset, start_scn, end_scn);
    }
    Ok(())
}

fn dispatch_row(
    row: MiningRow,
    buffer: &mut TransactionalBuffer,
    offset: &mut ReplicationOffset,
    deps: &MiningDeps,
    ctx: &SourceContext,
) {
    match row {
        MiningRow::Dml {
            txn_id,
            scn,
            table,
            redo_sql,
            change_time,
        } => {
            let Some(schema) = deps.schemas.table_schema(&table) else {
                log::trace!("ignoring change on unmonitored table {table}");
                return;
            };
            let callback = DispatchOnCommit {
                parser: deps.parser.clone(),
                dispatcher: deps.dispatcher.clone(),
                schema,
                table,
                redo_sql: redo_sql.clone(),
                scn,
            };
            buffer.register(txn_id, scn, change_time, redo_sql, Box::new(callback));
        }
        MiningRow::Commit {
            txn_id,
            scn,
            timestamp,
        } => {
            let debug_context = format!("txid: {txn_id}, commit SCN: {scn}");
            if buffer.commit(&txn_id, scn, offset, timestamp, ctx, &debug_context) {
                offset.advance_commit_scn(scn);
            }
        }
        MiningRow::Rollback { txn_id } => {
            let debug_context = format!("txid: {txn_id}");
            buffer.rollback(&txn_id, &debug_context);
        }
    }
}

/// The Advance step. The next window starts at the buffer's watermark when
/// transactions are open, at the window end otherwise; an unchanged
/// watermark during an idle stretch is pushed forward so it cannot pin the
/// window. The durable offset only moves when nothing older is in flight.
fn advance(
    buffer: &mut TransactionalBuffer,
    offset: &mut ReplicationOffset,
    start_scn: &mut Scn,
    end_scn: Scn,
) {
    let largest = buffer.largest_scn();
    let next_start = if largest.is_unset() { end_scn } else { largest };
    if next_start <= *start_scn {
        buffer.reset_largest_scn(Some(end_scn));
    }
    *start_scn = end_scn;
    if buffer.is_empty() {
        offset.advance_scn(end_scn);
        buffer.reset_largest_scn(None);
    }
}

/// When the offset has fallen behind the oldest retrievable log, every
/// transaction that started back there is unrecoverable. Drop them and move
/// the offset to the oldest mineable position instead of failing the task.
fn abandon_stale_transactions<S: MiningSession>(
    session: &mut S,
    config: &LogMiningConfig,
    buffer: &mut TransactionalBuffer,
    offset: &mut ReplicationOffset,
    start_scn: &mut Scn,
    metrics: &Arc<ReplicationMetrics>,
    archive_retention: Duration,
) -> Result<()> {
    if config.transaction_retention_hours == 0 {
        return Ok(());
    }
    let oldest = session.oldest_online_first_change(archive_retention)?;
    if offset.scn() < oldest {
        warn_counted!(
            metrics,
            "all transactions with first SCN <= {oldest} will be abandoned, offset: {}",
            offset.scn()
        );
        buffer.abandon_long_transactions(oldest);
        offset.advance_scn(oldest);
        if *start_scn < oldest {
            *start_scn = oldest;
        }
    }
    Ok(())
}
