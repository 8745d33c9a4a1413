//! Closed-loop harness: a wired-AND bus, the slave engine, and a
//! bit-banging master port.

use crate::api::{TraceEvent, TraceSink};
use crate::bus::{DriverId, Level, LineDrive, TwoWire};
use crate::engine::I2cSlave;

/// Drive feedback settles in one round; the bound guards the loop.
const SETTLE_ROUNDS: usize = 4;

/// Records trace events in dispatch order for later inspection.
#[derive(Debug, Clone, Default)]
pub struct TraceRecorder {
    events: Vec<TraceEvent>,
}

impl TraceRecorder {
    /// An empty recorder.
    #[must_use]
    pub const fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Recorded events, oldest first.
    #[must_use]
    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    /// Discards all recorded events.
    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl TraceSink for TraceRecorder {
    fn on_event(&mut self, event: TraceEvent) {
        self.events.push(event);
    }
}

/// A slave engine wired to an open-drain bus with one external driver
/// port.
///
/// After every external drive change the simulation re-resolves the
/// lines and re-evaluates the engine until its drive contribution stops
/// changing, so callers never observe a half-settled instant.
#[derive(Debug, Clone)]
pub struct Simulation {
    bus: TwoWire,
    engine: I2cSlave,
    trace: TraceRecorder,
    master: DriverId,
    slave: DriverId,
    instant: u64,
}

impl Simulation {
    /// Wires `engine` to a fresh bus alongside an external driver port.
    #[must_use]
    pub fn new(engine: I2cSlave) -> Self {
        let mut bus = TwoWire::new();
        let master = bus.attach();
        let slave = bus.attach();
        bus.drive_data(slave, engine.data_drive());
        Self {
            bus,
            engine,
            trace: TraceRecorder::new(),
            master,
            slave,
            instant: 0,
        }
    }

    /// Sets the external driver's clock-line contribution and settles.
    pub fn set_clk_drive(&mut self, drive: LineDrive) {
        self.instant += 1;
        self.bus.drive_clk(self.master, drive);
        self.settle();
    }

    /// Sets the external driver's data-line contribution and settles.
    pub fn set_data_drive(&mut self, drive: LineDrive) {
        self.instant += 1;
        self.bus.drive_data(self.master, drive);
        self.settle();
    }

    /// Updates the engine's reset input and re-syncs its line drive.
    pub fn set_reset_level(&mut self, level: Level) {
        self.instant += 1;
        self.engine.set_reset_level(level);
        let drive = self.engine.data_drive();
        self.bus.drive_data(self.slave, drive);
    }

    /// Number of externally applied transitions so far.
    #[must_use]
    pub const fn instant(&self) -> u64 {
        self.instant
    }

    /// Resolved clock-line level.
    #[must_use]
    pub fn clk(&self) -> Level {
        self.bus.clk()
    }

    /// Resolved data-line level.
    #[must_use]
    pub fn data(&self) -> Level {
        self.bus.data()
    }

    /// The simulated slave engine.
    #[must_use]
    pub const fn engine(&self) -> &I2cSlave {
        &self.engine
    }

    /// Mutable access to the slave engine, for register setup and
    /// inspection between bus operations.
    #[allow(clippy::missing_const_for_fn)]
    pub fn engine_mut(&mut self) -> &mut I2cSlave {
        &mut self.engine
    }

    /// The underlying two-wire bus.
    #[must_use]
    pub const fn bus(&self) -> &TwoWire {
        &self.bus
    }

    /// Trace events recorded so far, oldest first.
    #[must_use]
    pub fn trace(&self) -> &[TraceEvent] {
        self.trace.events()
    }

    /// Discards recorded trace events.
    pub fn clear_trace(&mut self) {
        self.trace.clear();
    }

    fn settle(&mut self) {
        for _ in 0..SETTLE_ROUNDS {
            let clk = self.bus.clk();
            let data = self.bus.data();
            let drive = self.engine.evaluate_with_trace(clk, data, &mut self.trace);
            if self.bus.data_line().drive(self.slave) == drive {
                return;
            }
            self.bus.drive_data(self.slave, drive);
        }
    }
}

/// Bit-banging bus master driving a [`Simulation`].
///
/// Operations follow the two-wire convention: data transitions while
/// the clock is low carry bits, transitions while it is high signal
/// start and stop.
#[derive(Debug, Clone)]
pub struct BusMaster {
    sim: Simulation,
}

impl BusMaster {
    /// Wires a master port to `engine` through a fresh simulation.
    #[must_use]
    pub fn new(engine: I2cSlave) -> Self {
        Self {
            sim: Simulation::new(engine),
        }
    }

    /// The underlying simulation.
    #[must_use]
    pub const fn simulation(&self) -> &Simulation {
        &self.sim
    }

    /// Mutable access to the underlying simulation.
    #[allow(clippy::missing_const_for_fn)]
    pub fn simulation_mut(&mut self) -> &mut Simulation {
        &mut self.sim
    }

    /// Issues a start condition, repeated-start safe.
    pub fn start(&mut self) {
        self.sim.set_data_drive(LineDrive::Released);
        self.sim.set_clk_drive(LineDrive::Released);
        self.sim.set_data_drive(LineDrive::Low);
        self.sim.set_clk_drive(LineDrive::Low);
    }

    /// Issues a stop condition, releasing both lines.
    pub fn stop(&mut self) {
        self.sim.set_clk_drive(LineDrive::Low);
        self.sim.set_data_drive(LineDrive::Low);
        self.sim.set_clk_drive(LineDrive::Released);
        self.sim.set_data_drive(LineDrive::Released);
    }

    /// Clocks out `byte` most-significant bit first and samples the
    /// slave's acknowledgement slot.
    ///
    /// Returns `true` when the slave pulled the data line low.
    pub fn write_byte(&mut self, byte: u8) -> bool {
        for bit in (0..8).rev() {
            let drive = if (byte >> bit) & 1 == 0 {
                LineDrive::Low
            } else {
                LineDrive::Released
            };
            self.sim.set_data_drive(drive);
            self.sim.set_clk_drive(LineDrive::Released);
            self.sim.set_clk_drive(LineDrive::Low);
        }
        self.sim.set_data_drive(LineDrive::Released);
        self.sim.set_clk_drive(LineDrive::Released);
        let acked = self.sim.data().is_low();
        self.sim.set_clk_drive(LineDrive::Low);
        acked
    }

    /// Clocks in one byte from the slave, then drives the
    /// acknowledgement slot low when `ack` is set.
    pub fn read_byte(&mut self, ack: bool) -> u8 {
        self.sim.set_data_drive(LineDrive::Released);
        let mut byte = 0;
        for _ in 0..8 {
            self.sim.set_clk_drive(LineDrive::Released);
            byte = (byte << 1) | self.sim.data().bit();
            self.sim.set_clk_drive(LineDrive::Low);
        }
        let ack_drive = if ack {
            LineDrive::Low
        } else {
            LineDrive::Released
        };
        self.sim.set_data_drive(ack_drive);
        self.sim.set_clk_drive(LineDrive::Released);
        self.sim.set_clk_drive(LineDrive::Low);
        self.sim.set_data_drive(LineDrive::Released);
        byte
    }

    /// Runs a complete write transaction against the engine's own
    /// address: start, address byte, register index, data bytes, stop.
    ///
    /// Returns `true` when every byte was acknowledged.
    pub fn write_transaction(&mut self, index: u8, bytes: &[u8]) -> bool {
        let address = self.sim.engine().config().device_address;
        self.start();
        let mut acked = self.write_byte(address << 1);
        acked &= self.write_byte(index);
        for &byte in bytes {
            acked &= self.write_byte(byte);
        }
        self.stop();
        acked
    }

    /// Runs a complete read transaction against the engine's own
    /// address, acknowledging every byte except the last.
    ///
    /// Returns `None` when the address byte goes unacknowledged.
    pub fn read_transaction(&mut self, count: usize) -> Option<Vec<u8>> {
        let address = self.sim.engine().config().device_address;
        self.start();
        if !self.write_byte((address << 1) | 1) {
            self.stop();
            return None;
        }
        let mut bytes = Vec::with_capacity(count);
        for remaining in (0..count).rev() {
            bytes.push(self.read_byte(remaining > 0));
        }
        self.stop();
        Some(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::BusMaster;
    use crate::api::{EngineConfig, TraceEvent};
    use crate::bus::Level;
    use crate::engine::{I2cSlave, ProtocolState};

    fn master() -> BusMaster {
        BusMaster::new(I2cSlave::new(EngineConfig::default()).unwrap())
    }

    #[test]
    fn write_transaction_lands_in_write_registers() {
        let mut master = master();
        assert!(master.write_transaction(0, &[0x11, 0x22]));

        let engine = master.simulation().engine();
        assert_eq!(engine.write_register(0), Some(0x11));
        assert_eq!(engine.write_register(1), Some(0x22));
        assert_eq!(engine.protocol_state(), ProtocolState::Idle);
        assert_eq!(engine.index_pointer(), 0);
    }

    #[test]
    fn read_transaction_streams_read_registers() {
        let mut master = master();
        for (index, value) in [0x50, 0x60, 0x70].into_iter().enumerate() {
            assert!(master
                .simulation_mut()
                .engine_mut()
                .set_read_register(index, value));
        }

        assert_eq!(master.read_transaction(3), Some(vec![0x50, 0x60, 0x70]));
        assert_eq!(
            master.simulation().engine().protocol_state(),
            ProtocolState::Idle
        );
    }

    #[test]
    fn index_write_then_repeated_start_read() {
        let mut master = master();
        master.simulation_mut().engine_mut().set_read_register(2, 0x9C);
        let address = 0x55;

        master.start();
        assert!(master.write_byte(address << 1));
        assert!(master.write_byte(0x02));
        master.start();
        assert!(master.write_byte((address << 1) | 1));
        assert_eq!(master.read_byte(false), 0x9C);
        master.stop();
    }

    #[test]
    fn instant_counts_external_transitions() {
        let mut master = master();
        assert_eq!(master.simulation().instant(), 0);

        master.start();
        assert_eq!(master.simulation().instant(), 4);

        master.write_byte(0x55 << 1);
        assert!(master.simulation().instant() > 4);
    }

    #[test]
    fn foreign_address_goes_unacknowledged() {
        let mut master = master();
        master.start();
        assert!(!master.write_byte(0x22 << 1));
        master.stop();
        assert_eq!(
            master.simulation().engine().protocol_state(),
            ProtocolState::Idle
        );
    }

    #[test]
    fn reset_releases_the_data_line() {
        let mut master = master();
        master.start();
        master.write_byte(0x55 << 1);

        master.simulation_mut().set_reset_level(Level::High);
        assert!(master.simulation().data().is_high());
        assert_eq!(
            master.simulation().engine().protocol_state(),
            ProtocolState::Idle
        );
    }

    #[test]
    fn trace_records_bus_conditions() {
        let config = EngineConfig {
            tracing_enabled: true,
            ..EngineConfig::default()
        };
        let mut master = BusMaster::new(I2cSlave::new(config).unwrap());
        master.start();
        master.write_byte(0x55 << 1);
        master.stop();

        let trace = master.simulation().trace();
        assert!(trace.contains(&TraceEvent::StartDetected));
        assert!(trace.contains(&TraceEvent::StopDetected));
    }
}
