//! Cycle-accurate slave-side I2C bus interface simulation core.

/// Open-drain line and two-wire bus primitives.
pub mod bus;
pub use bus::{edge_between, DriverId, Edge, Level, LineDrive, OpenDrainLine, TwoWire};

/// Start/stop condition detectors with consume-once latches.
pub mod detect;
pub use detect::{BusConditions, Condition, ConditionLatch};

/// Bit counting, byte framing, and shift registers.
pub mod framing;
pub use framing::{
    BitCounter, Direction, InputShift, OutputShift, ACK_BIT_MARK, LSB_BIT_MARK, READER_BIT_MARK,
};

/// Bus-addressable register file with update/capture pulses.
pub mod regfile;
pub use regfile::RegisterFile;

/// Public host-facing configuration, trace, and snapshot contracts.
pub mod api;
pub use api::{
    ConfigError, EngineConfig, EngineSnapshot, ResetPolarity, SnapshotError, SnapshotVersion,
    TraceEvent, TraceSink, DEFAULT_DEVICE_ADDRESS, DEFAULT_REGISTER_COUNT, MAX_DEVICE_ADDRESS,
    MAX_REGISTER_COUNT,
};

/// Slave-side protocol engine.
pub mod engine;
pub use engine::{I2cSlave, ProtocolState};

/// Closed-loop bus harness with a bit-banging master port.
pub mod testbench;
pub use testbench::{BusMaster, Simulation, TraceRecorder};

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
