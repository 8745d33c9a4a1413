//! Public host-facing configuration, trace, and snapshot contracts.

use thiserror::Error;

use crate::bus::{Level, LineDrive};
use crate::detect::BusConditions;
use crate::engine::ProtocolState;
use crate::framing::{BitCounter, Direction, InputShift, OutputShift};
use crate::regfile::RegisterFile;

/// Widest value a 7-bit device address can take.
pub const MAX_DEVICE_ADDRESS: u8 = 0x7F;

/// Most register slots addressable through the 8-bit index pointer.
pub const MAX_REGISTER_COUNT: usize = 256;

/// Device address used by the reference configuration.
pub const DEFAULT_DEVICE_ADDRESS: u8 = 0x55;

/// Register slot count used by the reference configuration.
pub const DEFAULT_REGISTER_COUNT: usize = 5;

/// Polarity of the asynchronous reset input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ResetPolarity {
    /// Reset asserts while the input is high.
    #[default]
    ActiveHigh,
    /// Reset asserts while the input is low.
    ActiveLow,
}

impl ResetPolarity {
    /// Returns `true` when `level` asserts reset under this polarity.
    #[must_use]
    pub const fn is_asserted(self, level: Level) -> bool {
        match self {
            Self::ActiveHigh => level.is_high(),
            Self::ActiveLow => level.is_low(),
        }
    }

    /// The input level at which reset is released.
    #[must_use]
    pub const fn deasserted_level(self) -> Level {
        match self {
            Self::ActiveHigh => Level::Low,
            Self::ActiveLow => Level::High,
        }
    }
}

/// Top-level immutable configuration for a slave engine instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct EngineConfig {
    /// 7-bit device address matched against the first byte of a transaction.
    pub device_address: u8,
    /// Register slots per direction, `1..=256`.
    pub register_count: usize,
    /// Active level of the asynchronous reset input.
    pub reset_polarity: ResetPolarity,
    /// Enables deterministic trace callback dispatch.
    pub tracing_enabled: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            device_address: DEFAULT_DEVICE_ADDRESS,
            register_count: DEFAULT_REGISTER_COUNT,
            reset_polarity: ResetPolarity::ActiveHigh,
            tracing_enabled: false,
        }
    }
}

impl EngineConfig {
    /// Checks the address width and register count bounds.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DeviceAddressOutOfRange`] for addresses wider
    /// than 7 bits and [`ConfigError::RegisterCountOutOfRange`] for a slot
    /// count of zero or above [`MAX_REGISTER_COUNT`].
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.device_address > MAX_DEVICE_ADDRESS {
            return Err(ConfigError::DeviceAddressOutOfRange {
                address: self.device_address,
            });
        }
        if self.register_count == 0 || self.register_count > MAX_REGISTER_COUNT {
            return Err(ConfigError::RegisterCountOutOfRange {
                count: self.register_count,
            });
        }
        Ok(())
    }
}

/// Configuration rejected at engine construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ConfigError {
    /// Device addresses are 7 bits wide on the bus.
    #[error("device address {address:#04x} does not fit in 7 bits")]
    DeviceAddressOutOfRange {
        /// The rejected address value.
        address: u8,
    },
    /// The 8-bit index pointer addresses at most 256 slots.
    #[error("register count {count} outside supported range 1..=256")]
    RegisterCountOutOfRange {
        /// The rejected slot count.
        count: usize,
    },
}

/// Deterministic trace events emitted during evaluation when enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum TraceEvent {
    /// A start condition latched on the bus.
    StartDetected,
    /// A stop condition latched on the bus.
    StopDetected,
    /// Asynchronous reset was asserted.
    ResetApplied,
    /// The protocol state register changed value.
    StateChanged {
        /// State before the transition.
        from: ProtocolState,
        /// State after the transition.
        to: ProtocolState,
    },
    /// The address byte completed and was compared.
    AddressResolved {
        /// Whether the 7-bit compare matched the device address.
        matched: bool,
        /// Transfer direction requested by the master.
        direction: Direction,
    },
    /// The index pointer was loaded from a received byte.
    PointerLoaded {
        /// New pointer value.
        value: u8,
    },
    /// A received byte was committed to a write-register.
    RegisterWritten {
        /// Slot index written.
        index: u8,
        /// Byte stored in the slot.
        value: u8,
    },
    /// A read-register was loaded into the output shift register.
    RegisterCaptured {
        /// Slot index captured.
        index: u8,
        /// Byte fetched for transmission.
        value: u8,
    },
    /// The master's acknowledgement slot was sampled.
    MasterAck {
        /// `true` when the master held data low (acknowledged).
        acked: bool,
    },
    /// The slave's data-line drive intent changed.
    DriveChanged {
        /// New drive contribution.
        drive: LineDrive,
    },
}

/// Sink trait for deterministic trace hooks.
pub trait TraceSink {
    /// Records an event in evaluation order.
    fn on_event(&mut self, event: TraceEvent);
}

/// Stable snapshot wire-version identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u16)]
pub enum SnapshotVersion {
    /// Initial schema revision for i2c-core v0.1.x.
    V1 = 1,
}

impl SnapshotVersion {
    /// Converts a wire value to a known snapshot version.
    #[must_use]
    pub const fn from_u16(version: u16) -> Option<Self> {
        match version {
            1 => Some(Self::V1),
            _ => None,
        }
    }
}

/// Serializable full-state snapshot for import/export and replay fixtures.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct EngineSnapshot {
    /// Snapshot schema version.
    pub version: SnapshotVersion,
    /// Engine configuration at export time.
    pub config: EngineConfig,
    /// Protocol state register.
    pub state: ProtocolState,
    /// Frame position counter.
    pub bit_counter: BitCounter,
    /// Receive shift register.
    pub input_shift: InputShift,
    /// Transmit shift register.
    pub output_shift: OutputShift,
    /// Start/stop detector latches and resetters.
    pub conditions: BusConditions,
    /// Register file contents, pulses, and pointer.
    pub registers: RegisterFile,
    /// Master acknowledgement sampled in the last ack slot.
    pub master_acked: bool,
    /// Slave drive contribution on the data line.
    pub data_drive: LineDrive,
    /// Clock level at the end of the last evaluation.
    pub prev_clk: Level,
    /// Data level at the end of the last evaluation.
    pub prev_data: Level,
    /// Reset input level at the end of the last evaluation.
    pub reset_level: Level,
}

/// Snapshot rejected at import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum SnapshotError {
    /// The embedded configuration fails validation.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The register file does not match the configured slot count.
    #[error("register file holds {found} slots but configuration names {expected}")]
    RegisterCountMismatch {
        /// Slot count named by the configuration.
        expected: usize,
        /// Slot count found in the register file.
        found: usize,
    },
    /// The register file's banks and pulse vectors disagree in length.
    #[error("register file banks and pulse vectors disagree in length")]
    InconsistentRegisterFile,
}

#[cfg(test)]
mod tests {
    use super::{
        ConfigError, EngineConfig, ResetPolarity, SnapshotVersion, DEFAULT_DEVICE_ADDRESS,
        DEFAULT_REGISTER_COUNT, MAX_DEVICE_ADDRESS,
    };
    use crate::bus::Level;

    #[test]
    fn default_config_matches_reference_device() {
        let config = EngineConfig::default();
        assert_eq!(config.device_address, DEFAULT_DEVICE_ADDRESS);
        assert_eq!(config.register_count, DEFAULT_REGISTER_COUNT);
        assert_eq!(config.reset_polarity, ResetPolarity::ActiveHigh);
        assert!(!config.tracing_enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_wide_device_address() {
        let config = EngineConfig {
            device_address: MAX_DEVICE_ADDRESS + 1,
            ..EngineConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::DeviceAddressOutOfRange { address: 0x80 })
        );
    }

    #[test]
    fn validate_rejects_empty_and_oversized_register_files() {
        let empty = EngineConfig {
            register_count: 0,
            ..EngineConfig::default()
        };
        assert_eq!(
            empty.validate(),
            Err(ConfigError::RegisterCountOutOfRange { count: 0 })
        );

        let oversized = EngineConfig {
            register_count: 257,
            ..EngineConfig::default()
        };
        assert_eq!(
            oversized.validate(),
            Err(ConfigError::RegisterCountOutOfRange { count: 257 })
        );

        let full = EngineConfig {
            register_count: 256,
            ..EngineConfig::default()
        };
        assert!(full.validate().is_ok());
    }

    #[test]
    fn reset_polarity_maps_levels_both_ways() {
        assert!(ResetPolarity::ActiveHigh.is_asserted(Level::High));
        assert!(!ResetPolarity::ActiveHigh.is_asserted(Level::Low));
        assert!(ResetPolarity::ActiveLow.is_asserted(Level::Low));
        assert!(!ResetPolarity::ActiveLow.is_asserted(Level::High));
        assert_eq!(ResetPolarity::ActiveHigh.deasserted_level(), Level::Low);
        assert_eq!(ResetPolarity::ActiveLow.deasserted_level(), Level::High);
    }

    #[test]
    fn snapshot_version_roundtrip_is_stable() {
        assert_eq!(SnapshotVersion::from_u16(1), Some(SnapshotVersion::V1));
        assert_eq!(SnapshotVersion::from_u16(2), None);
    }

    #[test]
    fn config_errors_format_their_payloads() {
        let address = ConfigError::DeviceAddressOutOfRange { address: 0x80 };
        assert_eq!(
            address.to_string(),
            "device address 0x80 does not fit in 7 bits"
        );

        let count = ConfigError::RegisterCountOutOfRange { count: 300 };
        assert_eq!(
            count.to_string(),
            "register count 300 outside supported range 1..=256"
        );
    }
}
