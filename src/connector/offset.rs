use serde::{Deserialize, Serialize};

use super::scn::Scn;

/// The durable replication position.
///
/// Only two invariants matter for durability: `scn` and `commit_scn` never
/// move backwards. On restart the connector mines from `scn`; transactions
/// re-observed with a commit SCN at or below `commit_scn` are suppressed by
/// the buffer's at-least-once guard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationOffset {
    scn: Scn,
    commit_scn: Scn,
    #[serde(skip_serializing_if = "Option::is_none")]
    lcr_position: Option<String>,
    snapshot_completed: bool,
}

impl ReplicationOffset {
    pub fn new(scn: Scn, commit_scn: Scn, snapshot_completed: bool) -> Self {
        Self {
            scn,
            commit_scn,
            lcr_position: None,
            snapshot_completed,
        }
    }

    pub fn scn(&self) -> Scn {
        self.scn
    }

    /// `None` until the first transaction has been emitted.
    pub fn commit_scn(&self) -> Option<Scn> {
        (!self.commit_scn.is_unset()).then_some(self.commit_scn)
    }

    pub fn lcr_position(&self) -> Option<&str> {
        self.lcr_position.as_deref()
    }

    pub fn snapshot_completed(&self) -> bool {
        self.snapshot_completed
    }

    /// Moves the mining position forward. Regressions are ignored.
    pub fn advance_scn(&mut self, scn: Scn) {
        if scn > self.scn {
            self.scn = scn;
        }
    }

    /// Moves the emitted-commit watermark forward. Regressions are ignored.
    pub fn advance_commit_scn(&mut self, commit_scn: Scn) {
        if commit_scn > self.commit_scn {
            self.commit_scn = commit_scn;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scn_is_monotone() {
        let mut offset = ReplicationOffset::new(Scn::new(100), Scn::ZERO, true);
        offset.advance_scn(Scn::new(50));
        assert_eq!(offset.scn(), Scn::new(100));
        offset.advance_scn(Scn::new(150));
        assert_eq!(offset.scn(), Scn::new(150));
    }

    #[test]
    fn commit_scn_is_monotone_and_optional() {
        let mut offset = ReplicationOffset::default();
        assert_eq!(offset.commit_scn(), None);
        offset.advance_commit_scn(Scn::new(10));
        offset.advance_commit_scn(Scn::new(5));
        assert_eq!(offset.commit_scn(), Some(Scn::new(10)));
    }

    #[test]
    fn serializes_round_trip() {
        let offset = ReplicationOffset::new(Scn::new(42), Scn::new(40), true);
        let json = serde_json::to_string(&offset).unwrap();
        let back: ReplicationOffset = serde_json::from_str(&json).unwrap();
        assert_eq!(back, offset);
    }
}
