use crate::connector::config::LogMiningConfig;
use crate::connector::scn::Scn;

/// Sizes each mining window and paces polling so the connector keeps up
/// with the database head without hammering it.
///
/// The only other writer of these two knobs is the operator, through the
/// clamped setters.
#[derive(Debug, Clone)]
pub struct AdaptiveController {
    batch_size: u64,
    sleep_ms: u64,
    batch_default: u64,
    batch_min: u64,
    batch_max: u64,
    batch_step: u64,
    sleep_min: u64,
    sleep_max: u64,
    sleep_step: u64,
}

impl AdaptiveController {
    pub fn new(config: &LogMiningConfig) -> Self {
        Self {
            batch_size: config.batch_size_default,
            sleep_ms: config.sleep_ms_default,
            batch_default: config.batch_size_default,
            batch_min: config.batch_size_min,
            batch_max: config.batch_size_max,
            batch_step: config.batch_size_step,
            sleep_min: config.sleep_ms_min,
            sleep_max: config.sleep_ms_max,
            sleep_step: config.sleep_ms_step,
        }
    }

    pub fn batch_size(&self) -> u64 {
        self.batch_size
    }

    pub fn sleep_ms(&self) -> u64 {
        self.sleep_ms
    }

    /// Operator override through the management surface.
    pub fn set_batch_size(&mut self, batch_size: u64) {
        self.batch_size = batch_size.clamp(self.batch_min, self.batch_max);
    }

    /// Operator override through the management surface.
    pub fn set_sleep_ms(&mut self, sleep_ms: u64) {
        self.sleep_ms = sleep_ms.clamp(self.sleep_min, self.sleep_max);
    }

    /// Picks the upper bound of the next mining window and adjusts the
    /// knobs for the cycle after it.
    ///
    /// The window top is `start_scn + batch_size`. A top more than one
    /// default batch beyond the database head means the window outran the
    /// database: shrink the batch and cap the window at the head, without
    /// slowing down. A head more than one default batch beyond the top
    /// means mining is behind: grow the batch. Otherwise polling pace
    /// adapts: caught up (head inside the window) slows down, a fully
    /// mineable window speeds up.
    pub fn next_end_scn(&mut self, current_scn: Scn, start_scn: Scn) -> Scn {
        let top = start_scn.saturating_add(self.batch_size);

        let mut top_in_far_future = false;
        if top.gap_from(current_scn) > self.batch_default {
            self.shrink_batch();
            top_in_far_future = true;
        }
        if current_scn.gap_from(top) > self.batch_default {
            self.grow_batch();
        }

        if current_scn < top {
            if !top_in_far_future {
                self.slow_down();
            }
            current_scn
        } else {
            self.speed_up();
            top
        }
    }

    fn grow_batch(&mut self) {
        self.batch_size = (self.batch_size + self.batch_step).min(self.batch_max);
    }

    fn shrink_batch(&mut self) {
        self.batch_size = self.batch_size.saturating_sub(self.batch_step).max(self.batch_min);
    }

    fn slow_down(&mut self) {
        self.sleep_ms = (self.sleep_ms + self.sleep_step).min(self.sleep_max);
    }

    fn speed_up(&mut self) {
        self.sleep_ms = self.sleep_ms.saturating_sub(self.sleep_step).max(self.sleep_min);
    }
}
