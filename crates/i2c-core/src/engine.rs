//! Slave-side protocol engine evaluated on bus line transitions.
//!
//! Falling-edge work follows a fixed commit sequence:
//! 1. Deassert update/capture pulses left from the previous cycle
//! 2. Load the index pointer from the completed byte
//! 3. Strobe the addressed write-register
//! 4. Capture the addressed read-register into the output shift register
//!    (an out-of-range pointer shifts it onward instead)
//! 5. Shift the output register and refresh the data-line drive
//! 6. Update the protocol state register
//! 7. Advance or restart the bit counter
//!
//! Effects are planned from pre-edge register values and committed as a
//! batch, so no step of the sequence observes a same-edge write.

#![allow(
    clippy::pedantic,
    clippy::nursery,
    clippy::similar_names,
    clippy::struct_excessive_bools,
    unknown_lints,
    missing_docs
)]

use crate::api::{
    ConfigError, EngineConfig, EngineSnapshot, SnapshotError, SnapshotVersion, TraceEvent,
    TraceSink,
};
use crate::bus::{edge_between, Edge, Level, LineDrive};
use crate::detect::{BusConditions, Condition};
use crate::framing::{BitCounter, Direction, InputShift, OutputShift};
use crate::regfile::RegisterFile;

/// Protocol state register of the slave engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ProtocolState {
    /// Not addressed; waiting for a start condition.
    #[default]
    Idle,
    /// Shifting in the device-address byte after a start condition.
    DeviceAddress,
    /// Transmitting read-register bytes to the master.
    Read,
    /// Shifting in the register index byte of a write transaction.
    IndexPointer,
    /// Shifting in data bytes committed to write-registers.
    Write,
}

/// An open-drain drive level for a transmitted bit: a `1` rides the
/// pull-up, a `0` pulls the line low.
const fn drive_for_bit(bit: u8) -> LineDrive {
    if bit == 0 {
        LineDrive::Low
    } else {
        LineDrive::Released
    }
}

/// Discards trace events when no sink is attached.
struct NullSink;

impl TraceSink for NullSink {
    fn on_event(&mut self, _event: TraceEvent) {}
}

/// Side effects planned for one falling-edge evaluation.
///
/// All fields are derived from pre-edge register values; `commit_falling`
/// applies them in the documented sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FallingEffects {
    next_state: ProtocolState,
    restart_frame: bool,
    address_resolved: Option<(bool, Direction)>,
    pointer_load: Option<u8>,
    write_strobe: Option<u8>,
    capture_read: bool,
    shift_output: bool,
    drive: Option<LineDrive>,
}

/// Slave-side two-wire bus interface engine.
///
/// The engine consumes resolved `CLK` and `DATA` levels through
/// [`evaluate`](Self::evaluate) and answers with its own drive
/// contribution on the data line. All protocol sequencing reacts to
/// line transitions; evaluating unchanged levels is a no-op.
#[derive(Debug, Clone)]
pub struct I2cSlave {
    config: EngineConfig,
    state: ProtocolState,
    conditions: BusConditions,
    bit_counter: BitCounter,
    input_shift: InputShift,
    output_shift: OutputShift,
    registers: RegisterFile,
    master_acked: bool,
    data_drive: LineDrive,
    prev_clk: Level,
    prev_data: Level,
    reset_level: Level,
}

impl I2cSlave {
    /// Builds an engine with idle bus history and a released data line.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the configuration fails
    /// [`EngineConfig::validate`].
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            state: ProtocolState::Idle,
            conditions: BusConditions::new(),
            bit_counter: BitCounter::new(),
            input_shift: InputShift::new(),
            output_shift: OutputShift::new(),
            registers: RegisterFile::new(config.register_count),
            master_acked: false,
            data_drive: LineDrive::Released,
            prev_clk: Level::High,
            prev_data: Level::High,
            reset_level: config.reset_polarity.deasserted_level(),
            config,
        })
    }

    /// Reacts to the resolved bus levels and returns the engine's drive
    /// contribution on the data line.
    pub fn evaluate(&mut self, clk: Level, data: Level) -> LineDrive {
        let mut sink = NullSink;
        self.step(clk, data, &mut sink)
    }

    /// Same as [`evaluate`](Self::evaluate), dispatching trace events to
    /// `sink` in evaluation order.
    ///
    /// Events are dispatched only when [`EngineConfig::tracing_enabled`]
    /// is set.
    pub fn evaluate_with_trace(
        &mut self,
        clk: Level,
        data: Level,
        sink: &mut dyn TraceSink,
    ) -> LineDrive {
        self.step(clk, data, sink)
    }

    /// Updates the asynchronous reset input.
    ///
    /// Asserting reset clears all transaction state immediately, without
    /// waiting for a clock edge. While the level stays asserted,
    /// evaluation ignores bus activity and holds the data line released.
    pub fn set_reset_level(&mut self, level: Level) {
        self.reset_level = level;
        if self.config.reset_polarity.is_asserted(level) {
            self.apply_reset();
        }
    }

    /// The configuration the engine was built with.
    #[must_use]
    pub const fn config(&self) -> EngineConfig {
        self.config
    }

    /// Current protocol state register value.
    #[must_use]
    pub const fn protocol_state(&self) -> ProtocolState {
        self.state
    }

    /// Current frame position, `0..=8`.
    #[must_use]
    pub const fn bit_count(&self) -> u8 {
        self.bit_counter.value()
    }

    /// Current index pointer value.
    #[must_use]
    pub const fn index_pointer(&self) -> u8 {
        self.registers.pointer()
    }

    /// The engine's drive contribution on the data line.
    #[must_use]
    pub const fn data_drive(&self) -> LineDrive {
        self.data_drive
    }

    /// Master acknowledgement sampled in the most recent ack slot.
    #[must_use]
    pub const fn master_acked(&self) -> bool {
        self.master_acked
    }

    /// Number of register slots per direction.
    #[must_use]
    pub fn register_count(&self) -> usize {
        self.registers.len()
    }

    /// Value of a write-register slot, if `index` is in range.
    #[must_use]
    pub fn write_register(&self, index: usize) -> Option<u8> {
        self.registers.write_register(index)
    }

    /// Value of a read-register slot, if `index` is in range.
    #[must_use]
    pub fn read_register(&self, index: usize) -> Option<u8> {
        self.registers.read_register(index)
    }

    /// Presents `value` on a read-register slot for subsequent bus reads.
    ///
    /// Returns `false` when `index` is out of range.
    pub fn set_read_register(&mut self, index: usize, value: u8) -> bool {
        self.registers.set_read_register(index, value)
    }

    /// Whether the slot's update pulse is asserted this cycle.
    #[must_use]
    pub fn update_pulse(&self, index: usize) -> bool {
        self.registers.update_pulse(index)
    }

    /// Whether the slot's capture pulse is asserted this cycle.
    #[must_use]
    pub fn capture_pulse(&self, index: usize) -> bool {
        self.registers.capture_pulse(index)
    }

    /// Exports the complete engine state.
    #[must_use]
    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            version: SnapshotVersion::V1,
            config: self.config,
            state: self.state,
            bit_counter: self.bit_counter,
            input_shift: self.input_shift,
            output_shift: self.output_shift,
            conditions: self.conditions,
            registers: self.registers.clone(),
            master_acked: self.master_acked,
            data_drive: self.data_drive,
            prev_clk: self.prev_clk,
            prev_data: self.prev_data,
            reset_level: self.reset_level,
        }
    }

    /// Rebuilds an engine from an exported snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError`] when the embedded configuration fails
    /// validation, the register file does not match the configured slot
    /// count, or its banks and pulse vectors disagree in length.
    pub fn from_snapshot(snapshot: EngineSnapshot) -> Result<Self, SnapshotError> {
        snapshot.config.validate()?;
        if snapshot.registers.len() != snapshot.config.register_count {
            return Err(SnapshotError::RegisterCountMismatch {
                expected: snapshot.config.register_count,
                found: snapshot.registers.len(),
            });
        }
        if !snapshot.registers.is_consistent() {
            return Err(SnapshotError::InconsistentRegisterFile);
        }
        Ok(Self {
            config: snapshot.config,
            state: snapshot.state,
            conditions: snapshot.conditions,
            bit_counter: snapshot.bit_counter,
            input_shift: snapshot.input_shift,
            output_shift: snapshot.output_shift,
            registers: snapshot.registers,
            master_acked: snapshot.master_acked,
            data_drive: snapshot.data_drive,
            prev_clk: snapshot.prev_clk,
            prev_data: snapshot.prev_data,
            reset_level: snapshot.reset_level,
        })
    }

    fn step(&mut self, clk: Level, data: Level, sink: &mut dyn TraceSink) -> LineDrive {
        if self.config.reset_polarity.is_asserted(self.reset_level) {
            self.apply_reset();
            self.emit(sink, TraceEvent::ResetApplied);
            self.prev_clk = clk;
            self.prev_data = data;
            return self.data_drive;
        }

        let clk_edge = edge_between(self.prev_clk, clk);
        let data_edge = edge_between(self.prev_data, data);
        self.prev_clk = clk;
        self.prev_data = data;

        if let Some(edge) = data_edge {
            match self.conditions.observe_data_edge(edge, clk) {
                Some(Condition::Start) => self.emit(sink, TraceEvent::StartDetected),
                Some(Condition::Stop) => {
                    self.emit(sink, TraceEvent::StopDetected);
                    self.clear_transaction(sink);
                }
                None => {}
            }
        }

        match clk_edge {
            Some(Edge::Rising) => {
                if self.bit_counter.at_ack_bit() {
                    let acked = data.is_low();
                    self.master_acked = acked;
                    self.emit(sink, TraceEvent::MasterAck { acked });
                } else {
                    self.input_shift.shift_in(data);
                }
                self.conditions.clock_rising();
            }
            Some(Edge::Falling) => {
                let fx = self.plan_falling();
                self.commit_falling(fx, sink);
            }
            None => {}
        }

        self.data_drive
    }

    /// Derives this falling edge's side effects from pre-edge values.
    fn plan_falling(&self) -> FallingEffects {
        let mut fx = FallingEffects {
            next_state: self.state,
            restart_frame: false,
            address_resolved: None,
            pointer_load: None,
            write_strobe: None,
            capture_read: false,
            shift_output: false,
            drive: None,
        };

        // A latched start overrides byte framing: re-enter address
        // framing with a realigned counter and a released line.
        if self.conditions.start_latched() {
            fx.next_state = ProtocolState::DeviceAddress;
            fx.restart_frame = true;
            fx.drive = Some(LineDrive::Released);
            return fx;
        }

        let matched = self.input_shift.matches_address(self.config.device_address);
        let direction = self.input_shift.direction();

        if self.bit_counter.at_lsb_bit() {
            // The byte is complete. Decide the upcoming ack slot's drive
            // and prefetch the next read byte before the slot begins.
            if self.state == ProtocolState::DeviceAddress {
                fx.address_resolved = Some((matched, direction));
            }
            fx.capture_read = match self.state {
                ProtocolState::DeviceAddress => matched && direction.is_read(),
                ProtocolState::Read => true,
                _ => false,
            };
            let ack_next = match self.state {
                ProtocolState::DeviceAddress => matched,
                ProtocolState::IndexPointer | ProtocolState::Write => true,
                _ => false,
            };
            fx.drive = Some(if ack_next {
                LineDrive::Low
            } else {
                LineDrive::Released
            });
        } else if self.bit_counter.at_ack_bit() {
            // The ack slot is over: take the state transition and either
            // begin driving the prefetched byte's first bit or release.
            fx.next_state = match self.state {
                ProtocolState::Idle => ProtocolState::Idle,
                ProtocolState::DeviceAddress => {
                    if !matched {
                        ProtocolState::Idle
                    } else if direction.is_read() {
                        ProtocolState::Read
                    } else {
                        ProtocolState::IndexPointer
                    }
                }
                ProtocolState::Read => {
                    if self.master_acked {
                        ProtocolState::Read
                    } else {
                        ProtocolState::Idle
                    }
                }
                ProtocolState::IndexPointer | ProtocolState::Write => ProtocolState::Write,
            };
            match self.state {
                ProtocolState::IndexPointer => fx.pointer_load = Some(self.input_shift.byte()),
                ProtocolState::Write => fx.write_strobe = Some(self.input_shift.byte()),
                _ => {}
            }
            let continue_read = match self.state {
                ProtocolState::DeviceAddress => matched && direction.is_read(),
                ProtocolState::Read => self.master_acked,
                _ => false,
            };
            fx.drive = Some(if continue_read {
                drive_for_bit(self.output_shift.msb())
            } else {
                LineDrive::Released
            });
        } else if self.state == ProtocolState::Read {
            // Data bit positions: shift and present the next output bit.
            fx.shift_output = true;
            fx.drive = Some(drive_for_bit((self.output_shift.byte() >> 6) & 1));
        }

        fx
    }

    /// Applies planned effects in the documented commit sequence.
    fn commit_falling(&mut self, fx: FallingEffects, sink: &mut dyn TraceSink) {
        self.registers.clear_pulses();

        if let Some((matched, direction)) = fx.address_resolved {
            self.emit(sink, TraceEvent::AddressResolved { matched, direction });
        }
        if let Some(value) = fx.pointer_load {
            self.registers.set_pointer(value);
            self.emit(sink, TraceEvent::PointerLoaded { value });
        }
        if let Some(byte) = fx.write_strobe {
            if let Some(index) = self.registers.strobe_write(byte) {
                self.emit(sink, TraceEvent::RegisterWritten { index, value: byte });
            }
        }
        if fx.capture_read {
            if let Some((index, value)) = self.registers.capture_read() {
                self.output_shift.load(value);
                self.emit(sink, TraceEvent::RegisterCaptured { index, value });
            } else {
                // No slot to fetch: shift onward so bytes read past the
                // file drain to zero.
                self.output_shift.shift();
            }
        }
        if fx.shift_output {
            self.output_shift.shift();
        }
        if let Some(drive) = fx.drive {
            self.set_drive(drive, sink);
        }
        if fx.next_state != self.state {
            self.emit(
                sink,
                TraceEvent::StateChanged {
                    from: self.state,
                    to: fx.next_state,
                },
            );
            self.state = fx.next_state;
        }
        if fx.restart_frame {
            self.bit_counter.reset();
        } else {
            self.bit_counter.advance();
        }
    }

    /// Stop-condition clear: back to idle with a zeroed pointer and
    /// shift registers. The bit counter realigns on the next start.
    fn clear_transaction(&mut self, sink: &mut dyn TraceSink) {
        if self.state != ProtocolState::Idle {
            self.emit(
                sink,
                TraceEvent::StateChanged {
                    from: self.state,
                    to: ProtocolState::Idle,
                },
            );
            self.state = ProtocolState::Idle;
        }
        self.registers.clear_transaction();
        self.input_shift.reset();
        self.output_shift.reset();
        self.set_drive(LineDrive::Released, sink);
    }

    /// Asynchronous reset clear. Register file contents persist; only
    /// protocol and transaction state return to power-on values.
    fn apply_reset(&mut self) {
        self.state = ProtocolState::Idle;
        self.conditions.reset();
        self.bit_counter.reset();
        self.input_shift.reset();
        self.output_shift.reset();
        self.registers.clear_transaction();
        self.master_acked = false;
        self.data_drive = LineDrive::Released;
    }

    fn set_drive(&mut self, drive: LineDrive, sink: &mut dyn TraceSink) {
        if self.data_drive != drive {
            self.data_drive = drive;
            self.emit(sink, TraceEvent::DriveChanged { drive });
        }
    }

    fn emit(&self, sink: &mut dyn TraceSink, event: TraceEvent) {
        if self.config.tracing_enabled {
            sink.on_event(event);
        }
    }
}
