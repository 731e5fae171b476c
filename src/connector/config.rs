use serde::{Deserialize, Serialize};

/// Where LogMiner finds the data dictionary it uses to resolve object names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogMiningStrategy {
    /// Resolve against the online catalog. Skips DDL tracking and reacts
    /// faster to changes, but mined tables must keep their current shape.
    OnlineCatalog,
    /// Write the dictionary into the redo stream and rebuild it on every log
    /// switch. Slower, but captures DDL.
    CatalogInRedo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogMiningConfig {
    pub strategy: LogMiningStrategy,

    /// Let Oracle manage log file switches itself (`CONTINUOUS_MINE`).
    /// Only available up to 18c; when set, explicit log file registration is
    /// skipped entirely.
    pub continuous_mine: bool,

    /// Mining window size in SCNs when neither behind nor ahead.
    pub batch_size_default: u64,
    pub batch_size_min: u64,
    pub batch_size_max: u64,
    /// Unit by which the adaptive controller grows or shrinks the window.
    pub batch_size_step: u64,

    /// Pause between mining cycles when keeping pace with the database.
    pub sleep_ms_default: u64,
    pub sleep_ms_min: u64,
    pub sleep_ms_max: u64,
    /// Unit by which the adaptive controller speeds up or slows down polling.
    pub sleep_ms_step: u64,

    /// Array fetch size for the `V$LOGMNR_CONTENTS` cursor.
    pub fetch_size: u32,

    /// Transactions whose start has fallen out of the online redo window are
    /// abandoned rather than blocking the offset forever. Zero disables
    /// abandonment, retaining transactions indefinitely.
    pub transaction_retention_hours: u64,

    /// Archived logs older than this are not considered when planning the
    /// file set for an offset. Zero means no age limit.
    pub archive_log_retention_hours: u64,

    /// Capacity of the commit-emission queue between the mining thread and
    /// the emission worker. A full queue backpressures mining.
    pub emission_queue_size: usize,

    /// Largest batch the downstream queue hands to its consumer. Owned by
    /// the host pipeline; carried here so one struct configures the task.
    pub max_batch_size: usize,
    /// Downstream queue poll interval. Owned by the host pipeline.
    pub poll_interval_ms: u64,
}

impl Default for LogMiningConfig {
    fn default() -> Self {
        Self {
            strategy: LogMiningStrategy::OnlineCatalog,
            continuous_mine: false,
            batch_size_default: 20_000,
            batch_size_min: 1_000,
            batch_size_max: 100_000,
            batch_size_step: 1_000,
            sleep_ms_default: 1_000,
            sleep_ms_min: 0,
            sleep_ms_max: 3_000,
            sleep_ms_step: 200,
            fetch_size: 10_000,
            transaction_retention_hours: 4,
            archive_log_retention_hours: 0,
            emission_queue_size: 8_192,
            max_batch_size: 2_048,
            poll_interval_ms: 1_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_consistent() {
        let config = LogMiningConfig::default();
        assert!(config.batch_size_min <= config.batch_size_default);
        assert!(config.batch_size_default <= config.batch_size_max);
        assert!(config.sleep_ms_min <= config.sleep_ms_default);
        assert!(config.sleep_ms_default <= config.sleep_ms_max);
    }

    #[test]
    fn deserializes_partial_config() {
        let config: LogMiningConfig =
            serde_json::from_str(r#"{"strategy": "catalog_in_redo", "continuous_mine": true}"#)
                .unwrap();
        assert_eq!(config.strategy, LogMiningStrategy::CatalogInRedo);
        assert!(config.continuous_mine);
        assert_eq!(config.fetch_size, 10_000);
    }
}
