use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::connector::config::{LogMiningConfig, LogMiningStrategy};
use crate::connector::metrics::{error_counted, warn_counted, ReplicationMetrics};
use crate::connector::offset::ReplicationOffset;
use crate::connector::scn::Scn;
use crate::connector::source::SourceContext;
use crate::connector::{Error, ErrorHandler, Result};

pub mod buffer;
pub mod log;
pub mod session;

use self::log::{AdaptiveController, MiningDeps};
use buffer::TransactionalBuffer;
use session::MiningSession;

const RECONNECT_BACKOFF: Duration = Duration::from_millis(500);

/// Runs the replication task until the context stops or a fatal error
/// occurs.
///
/// The outer loop gives resilience across network disconnections: a
/// transient fault tears the session down, reconnects, and resumes mining
/// from the preserved start SCN, with all buffered transactions intact.
pub(crate) fn replicate<S: MiningSession>(
    session: &mut S,
    config: &LogMiningConfig,
    offset: &mut ReplicationOffset,
    deps: &MiningDeps,
    ctx: &SourceContext,
    metrics: &Arc<ReplicationMetrics>,
) -> Result<()> {
    let errors = ErrorHandler::default();
    let mut buffer = TransactionalBuffer::new(
        config.emission_queue_size,
        metrics.clone(),
        errors.clone(),
    )?;
    let mut controller = AdaptiveController::new(config);
    let mut start_scn = offset.scn();

    let result = loop {
        if !ctx.is_running() {
            break Ok(());
        }
        match connect_and_mine(
            session,
            config,
            &mut buffer,
            offset,
            &mut controller,
            &mut start_scn,
            deps,
            ctx,
            metrics,
            &errors,
        ) {
            Ok(()) => break Ok(()),
            Err(e) if e.is_transient() => {
                warn_counted!(metrics, "disconnection occurred, reconnecting: {e}");
                metrics.increment_network_problems();
                std::thread::sleep(RECONNECT_BACKOFF);
                if let Err(reconnect_error) = session.reconnect() {
                    if !reconnect_error.is_transient() {
                        error_counted!(metrics, "reconnect failed: {reconnect_error}");
                        break Err(reconnect_error);
                    }
                    warn_counted!(metrics, "reconnect failed, retrying: {reconnect_error}");
                }
            }
            Err(e) => {
                error_counted!(metrics, "mining session was stopped due to: {e}");
                break Err(e);
            }
        }
    };

    ::log::debug!(
        "replication stopping, start SCN: {start_scn}, offset SCN: {}",
        offset.scn()
    );
    buffer.close();
    result
}

/// The Connect and Prepare states: session setup and verification, offset
/// fail-fast, dictionary build and the initial log file plan, then the
/// mining cycle.
#[allow(clippy::too_many_arguments)]
fn connect_and_mine<S: MiningSession>(
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

    session.ensure_flush_table()?;
    session.set_nls_session_parameters()?;

    let skew = Utc::now() - session.database_time()?;
    metrics.set_time_skew_ms(skew.num_milliseconds());
    ::log::debug!("database clock skew: {} ms", skew.num_milliseconds());

    session.verify_supplemental_logging(&deps.schemas.monitored_tables())?;

    if !config.continuous_mine {
        let oldest = session.oldest_online_first_change(archive_retention)?;
        if *start_scn < oldest {
            return Err(Error::OffsetNotInRedoLogs {
                offset: *start_scn,
                oldest,
            });
        }
    }

    if config.strategy == LogMiningStrategy::CatalogInRedo {
        session.build_dictionary()?;
    }
    if !config.continuous_mine {
        self::log::planner::plan_log_files(session, *start_scn, archive_retention)?;
    }

    self::log::mine(
        session, config, buffer, offset, controller, start_scn, deps, ctx, metrics, errors,
    )
}
