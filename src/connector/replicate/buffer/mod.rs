use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use fxhash::FxHashMap;

use crate::connector::metrics::{warn_counted, ReplicationMetrics};
use crate::connector::offset::ReplicationOffset;
use crate::connector::scn::Scn;
use crate::connector::source::{CommitCallback, SourceContext};
use crate::connector::{ErrorHandler, Result};

use super::session::TransactionId;

mod transaction;
mod worker;

pub use transaction::Transaction;

use worker::{EmissionTask, EmissionWorker};

/// Buffers per-transaction work until the transaction's fate is known:
/// callbacks run on commit, are cleared on rollback, and are dropped on
/// abandonment.
///
/// Not internally synchronized. The struct is owned by the mining thread,
/// which is its only writer; committed work is moved to a dedicated
/// emission thread, so emission order equals commit-arrival order.
pub struct TransactionalBuffer {
    transactions: FxHashMap<TransactionId, Transaction>,
    abandoned: HashSet<TransactionId>,
    rolled_back: HashSet<TransactionId>,
    largest_scn: Scn,
    last_committed_scn: Arc<AtomicU64>,
    pending_emissions: Arc<AtomicUsize>,
    worker: EmissionWorker,
    metrics: Arc<ReplicationMetrics>,
}

impl TransactionalBuffer {
    pub fn new(
        queue_capacity: usize,
        metrics: Arc<ReplicationMetrics>,
        errors: ErrorHandler,
    ) -> Result<Self> {
        let last_committed_scn = Arc::new(AtomicU64::new(0));
        let pending_emissions = Arc::new(AtomicUsize::new(0));
        let worker = EmissionWorker::spawn(
            queue_capacity,
            last_committed_scn.clone(),
            pending_emissions.clone(),
            metrics.clone(),
            errors,
        )?;
        Ok(Self {
            transactions: FxHashMap::default(),
            abandoned: HashSet::new(),
            rolled_back: HashSet::new(),
            largest_scn: Scn::ZERO,
            last_committed_scn,
            pending_emissions,
            worker,
            metrics,
        })
    }

    /// Largest last SCN among open transactions, or zero when none are open.
    /// The mining loop uses it as the advance-to hint for the next window.
    pub fn largest_scn(&self) -> Scn {
        self.largest_scn
    }

    /// Highest commit SCN already handed to the emission worker and
    /// completed. Guards against double emission after a restart.
    pub fn last_committed_scn(&self) -> Scn {
        Scn::new(self.last_committed_scn.load(Ordering::Relaxed))
    }

    pub fn rolled_back_ids(&self) -> &HashSet<TransactionId> {
        &self.rolled_back
    }

    /// Pushes the watermark forward when the system is idle, or clears it.
    pub fn reset_largest_scn(&mut self, value: Option<Scn>) {
        self.largest_scn = value.unwrap_or(Scn::ZERO);
    }

    /// True when no transaction is open and no emission is in flight.
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty() && self.pending_emissions.load(Ordering::SeqCst) == 0
    }

    /// Buffers one DML and the callback to run when its transaction
    /// commits. DMLs for abandoned or rolled-back transactions are dropped;
    /// so is a replay of the statement most recently recorded at the same
    /// SCN (overlapping mining windows re-emit rows).
    pub fn register(
        &mut self,
        txn_id: TransactionId,
        scn: Scn,
        change_time: DateTime<Utc>,
        redo_sql: String,
        callback: Box<dyn CommitCallback>,
    ) {
        if self.abandoned.contains(&txn_id) {
            warn_counted!(
                self.metrics,
                "another DML for abandoned transaction {txn_id} ignored: {redo_sql}"
            );
            return;
        }
        if self.rolled_back.contains(&txn_id) {
            warn_counted!(
                self.metrics,
                "DML for rolled back transaction {txn_id} ignored: SCN={scn}, {redo_sql}"
            );
            return;
        }

        let transaction = self
            .transactions
            .entry(txn_id)
            .or_insert_with(|| Transaction::new(scn));
        if transaction.is_duplicate(scn, &redo_sql) {
            log::trace!("duplicate redo at SCN {scn} dropped: {redo_sql}");
            return;
        }
        transaction.add(scn, redo_sql, callback);

        if scn > self.largest_scn {
            self.largest_scn = scn;
        }
        self.metrics.set_active_transactions(self.transactions.len());
        self.metrics.increment_captured_dml();
        self.metrics.observe_change_lag(change_time);
    }

    /// Schedules the transaction's callbacks on the emission worker and
    /// removes it from the buffer.
    ///
    /// Returns false when the transaction is unknown (already rolled back,
    /// abandoned, or never seen) or was already emitted in a previous run —
    /// the restart offset allows re-mining committed transactions, and this
    /// guard is what keeps them from reaching the sink twice.
    pub fn commit(
        &mut self,
        txn_id: &TransactionId,
        commit_scn: Scn,
        offset: &ReplicationOffset,
        timestamp: DateTime<Utc>,
        ctx: &SourceContext,
        debug_context: &str,
    ) -> bool {
        let Some(transaction) = self.transactions.remove(txn_id) else {
            return false;
        };
        self.abandoned.remove(txn_id);

        let already_emitted = offset.commit_scn().is_some_and(|emitted| emitted > commit_scn)
            || self.last_committed_scn() > commit_scn;
        if already_emitted {
            warn_counted!(
                self.metrics,
                "transaction {txn_id} was already processed, ignored; \
                 offset commit SCN {:?}, transaction commit SCN {commit_scn}, \
                 last committed SCN {}",
                offset.commit_scn(),
                self.last_committed_scn()
            );
            self.recalculate_largest_scn();
            self.metrics.set_active_transactions(self.transactions.len());
            return false;
        }

        let smallest_open_scn = self.smallest_open_scn();
        self.recalculate_largest_scn();
        log::trace!(
            "COMMIT, {debug_context}, smallest open SCN: {smallest_open_scn:?}, largest SCN: {}",
            self.largest_scn
        );

        self.pending_emissions.fetch_add(1, Ordering::SeqCst);
        let submitted = self.worker.submit(EmissionTask {
            callbacks: transaction.into_callbacks(),
            timestamp,
            smallest_open_scn,
            commit_scn,
            ctx: ctx.clone(),
        });
        if submitted.is_err() {
            self.pending_emissions.fetch_sub(1, Ordering::SeqCst);
            warn_counted!(
                self.metrics,
                "emission worker is gone, commit SCN {commit_scn} not emitted"
            );
            return false;
        }

        self.metrics.set_active_transactions(self.transactions.len());
        true
    }

    /// Clears the transaction's buffered work. Returns false when it was
    /// not in the buffer.
    pub fn rollback(&mut self, txn_id: &TransactionId, debug_context: &str) -> bool {
        let Some(transaction) = self.transactions.remove(txn_id) else {
            return false;
        };
        log::debug!(
            "transaction rolled back, {debug_context}, statements: {:?}",
            transaction.redo_statements().collect::<Vec<_>>()
        );
        self.abandoned.remove(txn_id);
        self.rolled_back.insert(txn_id.clone());
        self.recalculate_largest_scn();
        self.metrics.set_active_transactions(self.transactions.len());
        self.metrics.increment_rolled_back_transactions();
        true
    }

    /// Drops every transaction whose first SCN is at or below the
    /// threshold. Their ids are remembered so late-arriving DMLs stay
    /// dropped: an offset that lands before the oldest retrievable log is
    /// unrecoverable, and the alternative to abandoning is crashing.
    pub fn abandon_long_transactions(&mut self, threshold_scn: Scn) {
        let stale: Vec<TransactionId> = self
            .transactions
            .iter()
            .filter(|(_, transaction)| transaction.first_scn() <= threshold_scn)
            .map(|(id, _)| id.clone())
            .collect();
        for txn_id in stale {
            if let Some(transaction) = self.transactions.remove(&txn_id) {
                warn_counted!(
                    self.metrics,
                    "long running transaction {txn_id} abandoned and ignored: {transaction:?}"
                );
                self.abandoned.insert(txn_id);
                self.metrics.increment_abandoned_transactions();
            }
        }
        self.recalculate_largest_scn();
        self.metrics.set_active_transactions(self.transactions.len());
    }

    /// Lets the emission worker drain for up to a second, then shuts it
    /// down and clears all buffered state.
    pub fn close(&mut self) {
        self.transactions.clear();
        self.worker.close();
    }

    #[cfg(test)]
    pub(crate) fn transaction(&self, txn_id: &TransactionId) -> Option<&Transaction> {
        self.transactions.get(txn_id)
    }

    /// Smallest first SCN among open transactions. Called after the
    /// committing transaction is removed, so the result is the oldest
    /// position that may still be emitted after this commit.
    fn smallest_open_scn(&self) -> Option<Scn> {
        let smallest = self
            .transactions
            .values()
            .map(Transaction::first_scn)
            .min();
        self.metrics.set_oldest_scn(smallest);
        smallest
    }

    fn recalculate_largest_scn(&mut self) {
        self.largest_scn = self
            .transactions
            .values()
            .map(Transaction::last_scn)
            .max()
            .unwrap_or(Scn::ZERO);
    }
}

impl std::fmt::Debug for TransactionalBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionalBuffer")
            .field("transactions", &self.transactions)
            .field("largest_scn", &self.largest_scn)
            .field("abandoned", &self.abandoned)
            .field("rolled_back", &self.rolled_back)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::{self, Receiver, SyncSender};
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    use crate::connector::source::{CallbackError, DispatchError, ParseError};
    use crate::connector::Error;

    const TXN: &str = "0A0B";
    const OTHER_TXN: &str = "0C0D";

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Emitted {
        label: &'static str,
        smallest_open_scn: Option<Scn>,
        commit_scn: Scn,
        remaining: usize,
    }

    /// Records every execution; optionally waits for a release signal
    /// first, to pin down cross-thread orderings in tests.
    struct Recording {
        label: &'static str,
        emitted: Arc<Mutex<Vec<Emitted>>>,
        gate: Option<Mutex<Receiver<()>>>,
    }

    impl CommitCallback for Recording {
        fn execute(
            &self,
            _timestamp: DateTime<Utc>,
            smallest_open_scn: Option<Scn>,
            commit_scn: Scn,
            remaining: usize,
        ) -> std::result::Result<(), CallbackError> {
            if let Some(gate) = &self.gate {
                gate.lock().unwrap().recv().unwrap();
            }
            self.emitted.lock().unwrap().push(Emitted {
                label: self.label,
                smallest_open_scn,
                commit_scn,
                remaining,
            });
            Ok(())
        }
    }

    struct Failing;

    impl CommitCallback for Failing {
        fn execute(
            &self,
            _timestamp: DateTime<Utc>,
            _smallest_open_scn: Option<Scn>,
            _commit_scn: Scn,
            _remaining: usize,
        ) -> std::result::Result<(), CallbackError> {
            Err(CallbackError::Parse(ParseError {
                message: "unparseable".into(),
                redo_sql: "garbage".into(),
            }))
        }
    }

    struct ClosedDownstream;

    impl CommitCallback for ClosedDownstream {
        fn execute(
            &self,
            _timestamp: DateTime<Utc>,
            _smallest_open_scn: Option<Scn>,
            _commit_scn: Scn,
            _remaining: usize,
        ) -> std::result::Result<(), CallbackError> {
            Err(CallbackError::Dispatch(DispatchError::Closed))
        }
    }

    struct Fixture {
        buffer: TransactionalBuffer,
        metrics: Arc<ReplicationMetrics>,
        errors: ErrorHandler,
        emitted: Arc<Mutex<Vec<Emitted>>>,
        ctx: SourceContext,
    }

    impl Fixture {
        fn new() -> Self {
            let _ = env_logger::builder().is_test(true).try_init();
            let metrics = Arc::new(ReplicationMetrics::default());
            let errors = ErrorHandler::default();
            let buffer =
                TransactionalBuffer::new(64, metrics.clone(), errors.clone()).unwrap();
            Self {
                buffer,
                metrics,
                errors,
                emitted: Arc::new(Mutex::new(Vec::new())),
                ctx: SourceContext::new(),
            }
        }

        fn recording(&self, label: &'static str) -> Box<Recording> {
            Box::new(Recording {
                label,
                emitted: self.emitted.clone(),
                gate: None,
            })
        }

        fn gated(&self, label: &'static str) -> (Box<Recording>, SyncSender<()>) {
            let (release, gate) = mpsc::sync_channel(1);
            let callback = Box::new(Recording {
                label,
                emitted: self.emitted.clone(),
                gate: Some(Mutex::new(gate)),
            });
            (callback, release)
        }

        fn register(&mut self, txn: &str, scn: u64, sql: &str, callback: Box<dyn CommitCallback>) {
            self.buffer
                .register(txn.into(), Scn::new(scn), Utc::now(), sql.into(), callback);
        }

        fn commit(&mut self, txn: &str, commit_scn: u64, offset: &ReplicationOffset) -> bool {
            self.buffer.commit(
                &txn.into(),
                Scn::new(commit_scn),
                offset,
                Utc::now(),
                &self.ctx,
                "test",
            )
        }

        fn wait_until_empty(&self) {
            let deadline = Instant::now() + Duration::from_secs(5);
            while !self.buffer.is_empty() {
                assert!(Instant::now() < deadline, "buffer did not drain");
                std::thread::sleep(Duration::from_millis(5));
            }
        }
    }

    #[test]
    fn empty_on_creation() {
        let fixture = Fixture::new();
        assert!(fixture.buffer.is_empty());
        assert_eq!(fixture.buffer.largest_scn(), Scn::ZERO);
    }

    #[test]
    fn not_empty_after_register() {
        let mut fixture = Fixture::new();
        let callback = fixture.recording("a");
        fixture.register(TXN, 1, "insert", callback);
        assert!(!fixture.buffer.is_empty());
        assert_eq!(fixture.buffer.largest_scn(), Scn::new(1));
        assert_eq!(fixture.metrics.snapshot().captured_dml, 1);
        assert_eq!(fixture.metrics.snapshot().active_transactions, 1);
    }

    #[test]
    fn not_empty_while_emission_in_flight() {
        let mut fixture = Fixture::new();
        let (callback, release) = fixture.gated("a");
        fixture.register(TXN, 1, "insert", callback);
        assert!(fixture.commit(TXN, 2, &ReplicationOffset::default()));
        assert!(!fixture.buffer.is_empty());
        release.send(()).unwrap();
        fixture.wait_until_empty();
        assert_eq!(fixture.buffer.last_committed_scn(), Scn::new(2));
        assert_eq!(fixture.metrics.snapshot().committed_transactions, 1);
    }

    #[test]
    fn callbacks_run_in_insertion_order_with_countdown() {
        let mut fixture = Fixture::new();
        for (scn, label) in [(1, "first"), (2, "second"), (3, "third")] {
            let callback = fixture.recording(label);
            fixture.register(TXN, scn, label, callback);
        }
        assert!(fixture.commit(TXN, 4, &ReplicationOffset::default()));
        fixture.wait_until_empty();
        let emitted = fixture.emitted.lock().unwrap();
        assert_eq!(
            emitted
                .iter()
                .map(|e| (e.label, e.remaining))
                .collect::<Vec<_>>(),
            [("first", 2), ("second", 1), ("third", 0)]
        );
        assert!(emitted.iter().all(|e| e.commit_scn == Scn::new(4)));
    }

    #[test]
    fn out_of_order_commits() {
        // A@1 and B@10 open; B commits first. B's callback must see A as
        // the smallest open position, A's must see none, and the committed
        // watermark must end at A's commit SCN because emission is FIFO.
        let mut fixture = Fixture::new();
        let callback = fixture.recording("a");
        fixture.register(TXN, 1, "insert a", callback);
        let (callback, release_b) = fixture.gated("b");
        fixture.register(OTHER_TXN, 10, "insert b", callback);

        let offset = ReplicationOffset::default();
        assert!(fixture.commit(OTHER_TXN, 11, &offset));
        // B is gated, so its emission has not completed when A commits.
        assert!(fixture.commit(TXN, 2, &offset));
        release_b.send(()).unwrap();
        fixture.wait_until_empty();

        let emitted = fixture.emitted.lock().unwrap();
        assert_eq!(emitted.len(), 2);
        assert_eq!(emitted[0].label, "b");
        assert_eq!(emitted[0].smallest_open_scn, Some(Scn::new(1)));
        assert_eq!(emitted[1].label, "a");
        assert_eq!(emitted[1].smallest_open_scn, None);
        assert_eq!(fixture.buffer.last_committed_scn(), Scn::new(2));
    }

    #[test]
    fn commit_of_unknown_transaction_is_rejected() {
        let mut fixture = Fixture::new();
        assert!(!fixture.commit(TXN, 5, &ReplicationOffset::default()));
    }

    #[test]
    fn replayed_commit_is_suppressed_by_offset_guard() {
        let mut fixture = Fixture::new();
        let callback = fixture.recording("a");
        fixture.register(TXN, 1, "insert", callback);
        // The durable offset says a later commit was already emitted.
        let offset = ReplicationOffset::new(Scn::new(1), Scn::new(10), true);
        assert!(!fixture.commit(TXN, 5, &offset));
        assert!(fixture.buffer.is_empty());
        assert!(fixture.emitted.lock().unwrap().is_empty());
        assert!(fixture.metrics.snapshot().warnings > 0);
    }

    #[test]
    fn replayed_commit_is_suppressed_by_last_committed_guard() {
        let mut fixture = Fixture::new();
        let callback = fixture.recording("a");
        fixture.register(TXN, 1, "insert", callback);
        assert!(fixture.commit(TXN, 10, &ReplicationOffset::default()));
        fixture.wait_until_empty();
        assert_eq!(fixture.buffer.last_committed_scn(), Scn::new(10));

        // The same window mined again re-registers and re-commits.
        let callback = fixture.recording("a-replay");
        fixture.register(TXN, 1, "insert", callback);
        assert!(!fixture.commit(TXN, 5, &ReplicationOffset::default()));
        assert!(fixture.buffer.is_empty());
        assert_eq!(fixture.emitted.lock().unwrap().len(), 1);
    }

    #[test]
    fn rollback_clears_transaction() {
        let mut fixture = Fixture::new();
        let callback = fixture.recording("a");
        fixture.register(TXN, 1, "insert", callback);
        assert!(fixture.buffer.rollback(&TXN.into(), "test"));
        assert!(fixture.buffer.is_empty());
        assert_eq!(fixture.buffer.largest_scn(), Scn::ZERO);
        assert!(fixture.buffer.rolled_back_ids().contains(&TXN.into()));
        assert!(!fixture.buffer.rollback(&TXN.into(), "test"));
    }

    #[test]
    fn rollback_of_first_transaction_keeps_second() {
        let mut fixture = Fixture::new();
        let callback = fixture.recording("a");
        fixture.register(TXN, 1, "insert a", callback);
        let callback = fixture.recording("b");
        fixture.register(OTHER_TXN, 10, "insert b", callback);
        assert!(fixture.buffer.rollback(&TXN.into(), "test"));
        assert!(!fixture.buffer.is_empty());
        assert_eq!(fixture.buffer.largest_scn(), Scn::new(10));
        assert!(fixture.buffer.rolled_back_ids().contains(&TXN.into()));
        assert!(!fixture.buffer.rolled_back_ids().contains(&OTHER_TXN.into()));
    }

    #[test]
    fn register_after_rollback_is_dropped() {
        let mut fixture = Fixture::new();
        let callback = fixture.recording("a");
        fixture.register(TXN, 1, "insert", callback);
        fixture.buffer.rollback(&TXN.into(), "test");
        let callback = fixture.recording("late");
        fixture.register(TXN, 2, "late insert", callback);
        assert!(fixture.buffer.is_empty());
    }

    #[test]
    fn duplicate_redo_at_same_scn_is_stored_once() {
        let mut fixture = Fixture::new();
        for sql in ["x", "x"] {
            let callback = fixture.recording("a");
            fixture.register(TXN, 1, sql, callback);
        }
        let callback = fixture.recording("a");
        fixture.register(TXN, 10, "x", callback);
        let callback = fixture.recording("a");
        fixture.register(TXN, 10, "x", callback);
        let txn = fixture.buffer.transaction(&TXN.into()).unwrap();
        assert_eq!(txn.redo_at(Scn::new(10)), ["x"]);
        // Same SCN, different statement: both kept.
        let callback = fixture.recording("a");
        fixture.register(TXN, 10, "y", callback);
        let txn = fixture.buffer.transaction(&TXN.into()).unwrap();
        assert_eq!(txn.redo_at(Scn::new(10)), ["x", "y"]);
        // Same statement at SCN 1 and SCN 10 was kept both times.
        assert_eq!(txn.redo_at(Scn::new(1)), ["x"]);
    }

    #[test]
    fn duplicate_redo_across_transactions_is_kept() {
        let mut fixture = Fixture::new();
        let callback = fixture.recording("a");
        fixture.register(TXN, 1, "same insert", callback);
        let callback = fixture.recording("b");
        fixture.register(OTHER_TXN, 1, "same insert", callback);
        assert_eq!(
            fixture
                .buffer
                .transaction(&TXN.into())
                .unwrap()
                .redo_at(Scn::new(1)),
            ["same insert"]
        );
        assert_eq!(
            fixture
                .buffer
                .transaction(&OTHER_TXN.into())
                .unwrap()
                .redo_at(Scn::new(1)),
            ["same insert"]
        );
    }

    #[test]
    fn abandoning_sole_transaction_empties_buffer() {
        let mut fixture = Fixture::new();
        let callback = fixture.recording("a");
        fixture.register(TXN, 1, "insert", callback);
        fixture.buffer.abandon_long_transactions(Scn::new(1));
        assert!(fixture.buffer.is_empty());
        assert_eq!(fixture.buffer.largest_scn(), Scn::ZERO);
        // Late DML for the abandoned transaction must not resurrect it.
        let callback = fixture.recording("late");
        fixture.register(TXN, 2, "late insert", callback);
        assert!(fixture.buffer.is_empty());
        assert_eq!(fixture.metrics.snapshot().abandoned_transactions, 1);
    }

    #[test]
    fn abandonment_threshold_spares_newer_transactions() {
        let mut fixture = Fixture::new();
        let callback = fixture.recording("a");
        fixture.register(TXN, 1, "insert a", callback);
        let callback = fixture.recording("b");
        fixture.register(OTHER_TXN, 10, "insert b", callback);
        fixture.buffer.abandon_long_transactions(Scn::new(1));
        assert!(!fixture.buffer.is_empty());
        assert_eq!(fixture.buffer.largest_scn(), Scn::new(10));
        assert!(fixture.buffer.transaction(&OTHER_TXN.into()).is_some());
    }

    #[test]
    fn abandoned_then_committed_is_rejected() {
        let mut fixture = Fixture::new();
        let callback = fixture.recording("a");
        fixture.register(TXN, 1, "insert", callback);
        fixture.buffer.abandon_long_transactions(Scn::new(5));
        assert!(!fixture.commit(TXN, 6, &ReplicationOffset::default()));
        assert!(fixture.emitted.lock().unwrap().is_empty());
    }

    #[test]
    fn reset_largest_scn_overrides_watermark() {
        let mut fixture = Fixture::new();
        let callback = fixture.recording("a");
        fixture.register(TXN, 7, "insert", callback);
        assert_eq!(fixture.buffer.largest_scn(), Scn::new(7));
        fixture.buffer.reset_largest_scn(Some(Scn::new(42)));
        assert_eq!(fixture.buffer.largest_scn(), Scn::new(42));
        fixture.buffer.reset_largest_scn(None);
        assert_eq!(fixture.buffer.largest_scn(), Scn::ZERO);
    }

    #[test]
    fn callback_failure_reaches_error_handler() {
        let mut fixture = Fixture::new();
        fixture.register(TXN, 1, "garbage", Box::new(Failing));
        assert!(fixture.commit(TXN, 2, &ReplicationOffset::default()));
        fixture.wait_until_empty();
        let error = fixture.errors.take().expect("producer error expected");
        assert!(matches!(error, Error::Emission(_)));
        // The failed commit must not move the emitted watermark.
        assert_eq!(fixture.buffer.last_committed_scn(), Scn::ZERO);
    }

    #[test]
    fn closed_downstream_aborts_cleanly() {
        let mut fixture = Fixture::new();
        fixture.register(TXN, 1, "insert", Box::new(ClosedDownstream));
        assert!(fixture.commit(TXN, 2, &ReplicationOffset::default()));
        fixture.wait_until_empty();
        assert!(fixture.errors.take().is_none());
        assert_eq!(fixture.buffer.last_committed_scn(), Scn::ZERO);
    }

    #[test]
    fn stopped_context_short_circuits_emission() {
        let mut fixture = Fixture::new();
        let callback = fixture.recording("a");
        fixture.register(TXN, 1, "insert", callback);
        fixture.ctx.stop();
        assert!(fixture.commit(TXN, 2, &ReplicationOffset::default()));
        fixture.wait_until_empty();
        assert!(fixture.emitted.lock().unwrap().is_empty());
    }

    #[test]
    fn close_drains_scheduled_work() {
        let mut fixture = Fixture::new();
        let callback = fixture.recording("a");
        fixture.register(TXN, 1, "insert", callback);
        assert!(fixture.commit(TXN, 2, &ReplicationOffset::default()));
        fixture.buffer.close();
        assert_eq!(fixture.emitted.lock().unwrap().len(), 1);
        assert!(fixture.buffer.is_empty());
    }
}
