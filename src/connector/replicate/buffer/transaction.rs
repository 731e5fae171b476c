use std::collections::BTreeMap;

use crate::connector::scn::Scn;
use crate::connector::source::CommitCallback;

/// One open transaction's buffered work.
///
/// Mining is SCN-ordered within a transaction, so every insertion arrives at
/// or after `last_scn`; `first_scn` never changes after creation.
pub struct Transaction {
    first_scn: Scn,
    last_scn: Scn,
    callbacks: Vec<Box<dyn CommitCallback>>,
    redo_by_scn: BTreeMap<Scn, Vec<String>>,
}

impl Transaction {
    pub fn new(first_scn: Scn) -> Self {
        Self {
            first_scn,
            last_scn: first_scn,
            callbacks: Vec::new(),
            redo_by_scn: BTreeMap::new(),
        }
    }

    pub fn first_scn(&self) -> Scn {
        self.first_scn
    }

    pub fn last_scn(&self) -> Scn {
        self.last_scn
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    /// Oracle can re-emit a row when consecutive mining windows overlap by
    /// one SCN. Such a replay shows up as the same statement at the current
    /// `last_scn`; anything at a strictly later SCN, or different text at
    /// the same SCN, is new work.
    pub fn is_duplicate(&self, scn: Scn, redo_sql: &str) -> bool {
        self.last_scn == scn
            && self
                .redo_by_scn
                .get(&scn)
                .is_some_and(|statements| statements.iter().any(|sql| sql == redo_sql))
    }

    pub fn add(&mut self, scn: Scn, redo_sql: String, callback: Box<dyn CommitCallback>) {
        debug_assert!(scn >= self.last_scn);
        self.callbacks.push(callback);
        self.redo_by_scn.entry(scn).or_default().push(redo_sql);
        self.last_scn = scn;
    }

    pub fn into_callbacks(self) -> Vec<Box<dyn CommitCallback>> {
        self.callbacks
    }

    pub fn redo_at(&self, scn: Scn) -> &[String] {
        self.redo_by_scn
            .get(&scn)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// All buffered statements in SCN order, for rollback logging and dumps.
    pub fn redo_statements(&self) -> impl Iterator<Item = &str> {
        self.redo_by_scn
            .values()
            .flatten()
            .map(String::as_str)
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("first_scn", &self.first_scn)
            .field("last_scn", &self.last_scn)
            .field("redo_by_scn", &self.redo_by_scn)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    use crate::connector::source::CallbackError;

    struct Noop;

    impl CommitCallback for Noop {
        fn execute(
            &self,
            _timestamp: DateTime<Utc>,
            _smallest_open_scn: Option<Scn>,
            _commit_scn: Scn,
            _remaining: usize,
        ) -> Result<(), CallbackError> {
            Ok(())
        }
    }

    #[test]
    fn add_advances_last_scn() {
        let mut txn = Transaction::new(Scn::new(5));
        assert_eq!(txn.first_scn(), Scn::new(5));
        assert_eq!(txn.last_scn(), Scn::new(5));
        txn.add(Scn::new(5), "a".into(), Box::new(Noop));
        txn.add(Scn::new(9), "b".into(), Box::new(Noop));
        assert_eq!(txn.first_scn(), Scn::new(5));
        assert_eq!(txn.last_scn(), Scn::new(9));
        assert_eq!(txn.len(), 2);
    }

    #[test]
    fn duplicate_only_at_current_scn_with_same_sql() {
        let mut txn = Transaction::new(Scn::new(1));
        txn.add(Scn::new(1), "x".into(), Box::new(Noop));
        txn.add(Scn::new(10), "x".into(), Box::new(Noop));
        assert!(txn.is_duplicate(Scn::new(10), "x"));
        assert!(!txn.is_duplicate(Scn::new(10), "y"));
        // Same statement at an earlier SCN is no longer current.
        assert!(!txn.is_duplicate(Scn::new(1), "x"));
    }

    #[test]
    fn redo_grouped_by_scn_in_order() {
        let mut txn = Transaction::new(Scn::new(1));
        txn.add(Scn::new(1), "a".into(), Box::new(Noop));
        txn.add(Scn::new(3), "b".into(), Box::new(Noop));
        txn.add(Scn::new(3), "c".into(), Box::new(Noop));
        assert_eq!(txn.redo_at(Scn::new(3)), ["b", "c"]);
        assert_eq!(txn.redo_statements().collect::<Vec<_>>(), ["a", "b", "c"]);
    }
}
