//! Start and stop condition detectors for the data line.
//!
//! Each detector is a one-shot latch that sets on its trigger edge of the
//! data line while the clock is high, paired with a resetter flip-flop
//! clocked on the rising clock edge. The resetter consumes a detection on
//! the rising edge after it latched and re-arms on the rising edge after
//! that, so every occurrence is reported exactly once. Data-line edges while
//! the clock is low are ordinary bit traffic and never latch.

use crate::bus::{Edge, Level};

/// A bus condition recognized on the data line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Condition {
    /// Data fell while the clock was high: a transaction begins.
    Start,
    /// Data rose while the clock was high: the transaction ends.
    Stop,
}

/// One-shot condition latch with its consume resetter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ConditionLatch {
    trigger: Edge,
    latched: bool,
    resetter: bool,
}

impl ConditionLatch {
    /// Creates an armed latch triggered by `trigger` edges of the data line.
    #[must_use]
    pub const fn new(trigger: Edge) -> Self {
        Self {
            trigger,
            latched: false,
            resetter: false,
        }
    }

    /// Returns `true` while a detection is latched and unconsumed.
    #[must_use]
    pub const fn is_latched(&self) -> bool {
        self.latched
    }

    /// Applies a data-line edge, sampling the clock level at that instant.
    ///
    /// Returns `true` when this edge latched a fresh detection. The latch is
    /// held in reset while the resetter marks the previous detection as
    /// consumed.
    pub fn observe(&mut self, edge: Edge, clk: Level) -> bool {
        if edge == self.trigger && clk.is_high() && !self.resetter {
            self.latched = true;
            return true;
        }
        false
    }

    /// Clocks the resetter flip-flop on a rising clock edge.
    ///
    /// A latched detection is consumed here; one more rising edge with the
    /// latch clear re-arms the detector.
    #[allow(clippy::missing_const_for_fn)]
    pub fn clock_rising(&mut self) {
        self.resetter = self.latched;
        if self.resetter {
            self.latched = false;
        }
    }

    /// Drops any latched detection without consuming it.
    #[allow(clippy::missing_const_for_fn)]
    pub fn clear(&mut self) {
        self.latched = false;
    }

    /// Asynchronous reset: clears the latch and the resetter.
    #[allow(clippy::missing_const_for_fn)]
    pub fn reset(&mut self) {
        self.latched = false;
        self.resetter = false;
    }
}

/// The start/stop detector pair watching one data line.
///
/// The two latches are mutually exclusive: latching one clears the other, so
/// when both edges occur within a single clock-high period the most recent
/// condition wins and chronology on the wire is preserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct BusConditions {
    start: ConditionLatch,
    stop: ConditionLatch,
}

impl Default for BusConditions {
    fn default() -> Self {
        Self::new()
    }
}

impl BusConditions {
    /// Creates both detectors armed.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            start: ConditionLatch::new(Edge::Falling),
            stop: ConditionLatch::new(Edge::Rising),
        }
    }

    /// Applies a data-line edge at the current clock level.
    ///
    /// Returns the condition freshly latched by this edge, if any.
    pub fn observe_data_edge(&mut self, edge: Edge, clk: Level) -> Option<Condition> {
        if self.start.observe(edge, clk) {
            self.stop.clear();
            return Some(Condition::Start);
        }
        if self.stop.observe(edge, clk) {
            self.start.clear();
            return Some(Condition::Stop);
        }
        None
    }

    /// Clocks both resetters on a rising clock edge, consuming detections.
    pub fn clock_rising(&mut self) {
        self.start.clock_rising();
        self.stop.clock_rising();
    }

    /// Returns `true` while a start detection is latched.
    #[must_use]
    pub const fn start_latched(&self) -> bool {
        self.start.is_latched()
    }

    /// Returns `true` while a stop detection is latched.
    #[must_use]
    pub const fn stop_latched(&self) -> bool {
        self.stop.is_latched()
    }

    /// Asynchronous reset of both detectors.
    pub fn reset(&mut self) {
        self.start.reset();
        self.stop.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::{BusConditions, Condition, ConditionLatch};
    use crate::bus::{Edge, Level};

    #[test]
    fn start_latches_on_data_fall_with_clock_high() {
        let mut conditions = BusConditions::new();
        let latched = conditions.observe_data_edge(Edge::Falling, Level::High);
        assert_eq!(latched, Some(Condition::Start));
        assert!(conditions.start_latched());
        assert!(!conditions.stop_latched());
    }

    #[test]
    fn stop_latches_on_data_rise_with_clock_high() {
        let mut conditions = BusConditions::new();
        let latched = conditions.observe_data_edge(Edge::Rising, Level::High);
        assert_eq!(latched, Some(Condition::Stop));
        assert!(conditions.stop_latched());
        assert!(!conditions.start_latched());
    }

    #[test]
    fn data_edges_while_clock_low_never_latch() {
        let mut conditions = BusConditions::new();
        assert_eq!(conditions.observe_data_edge(Edge::Falling, Level::Low), None);
        assert_eq!(conditions.observe_data_edge(Edge::Rising, Level::Low), None);
        assert!(!conditions.start_latched());
        assert!(!conditions.stop_latched());
    }

    #[test]
    fn rising_clock_consumes_a_detection_exactly_once() {
        let mut latch = ConditionLatch::new(Edge::Falling);
        assert!(latch.observe(Edge::Falling, Level::High));
        assert!(latch.is_latched());

        latch.clock_rising();
        assert!(!latch.is_latched());

        // Still blocked until the resetter re-arms on the next rising edge.
        assert!(!latch.observe(Edge::Falling, Level::High));
        latch.clock_rising();
        assert!(latch.observe(Edge::Falling, Level::High));
    }

    #[test]
    fn most_recent_condition_wins_within_one_high_period() {
        let mut conditions = BusConditions::new();
        conditions.observe_data_edge(Edge::Falling, Level::High);
        conditions.observe_data_edge(Edge::Rising, Level::High);
        assert!(conditions.stop_latched());
        assert!(!conditions.start_latched());

        conditions.observe_data_edge(Edge::Falling, Level::High);
        assert!(conditions.start_latched());
        assert!(!conditions.stop_latched());
    }

    #[test]
    fn reset_clears_latches_and_resetters() {
        let mut conditions = BusConditions::new();
        conditions.observe_data_edge(Edge::Falling, Level::High);
        conditions.clock_rising();
        conditions.reset();

        // A reset detector latches again immediately, with no re-arm edge.
        assert_eq!(
            conditions.observe_data_edge(Edge::Falling, Level::High),
            Some(Condition::Start)
        );
    }

    #[test]
    fn untriggered_edge_is_ignored_by_a_single_latch() {
        let mut latch = ConditionLatch::new(Edge::Rising);
        assert!(!latch.observe(Edge::Falling, Level::High));
        assert!(!latch.is_latched());
    }
}
