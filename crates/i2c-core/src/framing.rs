//! Bit and byte framing for the serial transfer.
//!
//! A byte on the wire is eight data bits followed by an acknowledgement
//! slot. The modulo-9 bit counter tracks where inside that frame the
//! current clock period sits; three positions matter to the protocol
//! engine and are named here.

use crate::bus::Level;

/// Counter position of the final data-bit shift of a transmitted byte.
///
/// During the address byte this is the period in which the direction bit
/// arrives on the wire.
pub const READER_BIT_MARK: u8 = 6;

/// Counter position at which the byte's last data bit has been sampled.
pub const LSB_BIT_MARK: u8 = 7;

/// Counter position of the acknowledgement slot.
pub const ACK_BIT_MARK: u8 = 8;

/// Transfer direction requested by the low bit of the address byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Direction {
    /// Master transmits, slave receives.
    Write,
    /// Slave transmits, master receives.
    Read,
}

impl Direction {
    /// Decodes the direction flag from an address byte's low bit.
    #[must_use]
    pub const fn from_lsb(bit: u8) -> Self {
        if bit & 1 == 1 {
            Self::Read
        } else {
            Self::Write
        }
    }

    /// Returns `true` for [`Direction::Read`].
    #[must_use]
    pub const fn is_read(self) -> bool {
        matches!(self, Self::Read)
    }
}

/// Modulo-9 bit counter aligning byte boundaries and the ack slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct BitCounter {
    count: u8,
}

impl BitCounter {
    /// Creates a counter at position 0.
    #[must_use]
    pub const fn new() -> Self {
        Self { count: 0 }
    }

    /// Current position, `0..=8`.
    #[must_use]
    pub const fn value(self) -> u8 {
        self.count
    }

    /// Returns `true` at [`READER_BIT_MARK`].
    #[must_use]
    pub const fn at_reader_bit(self) -> bool {
        self.count == READER_BIT_MARK
    }

    /// Returns `true` at [`LSB_BIT_MARK`].
    #[must_use]
    pub const fn at_lsb_bit(self) -> bool {
        self.count == LSB_BIT_MARK
    }

    /// Returns `true` at [`ACK_BIT_MARK`].
    #[must_use]
    pub const fn at_ack_bit(self) -> bool {
        self.count == ACK_BIT_MARK
    }

    /// Advances one position, realigning to 0 after the ack slot.
    #[allow(clippy::missing_const_for_fn)]
    pub fn advance(&mut self) {
        if self.count >= ACK_BIT_MARK {
            self.count = 0;
        } else {
            self.count += 1;
        }
    }

    /// Realigns to position 0.
    #[allow(clippy::missing_const_for_fn)]
    pub fn reset(&mut self) {
        self.count = 0;
    }
}

/// Input shift register accumulating sampled data bits MSB-first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct InputShift {
    bits: u8,
}

impl InputShift {
    /// Creates an empty shift register.
    #[must_use]
    pub const fn new() -> Self {
        Self { bits: 0 }
    }

    /// Shifts in one sampled line level at the LSB end.
    #[allow(clippy::missing_const_for_fn)]
    pub fn shift_in(&mut self, sample: Level) {
        self.bits = (self.bits << 1) | sample.bit();
    }

    /// The accumulated byte; meaningful once eight bits have shifted in.
    #[must_use]
    pub const fn byte(self) -> u8 {
        self.bits
    }

    /// The top seven bits, compared against the device address.
    #[must_use]
    pub const fn address_bits(self) -> u8 {
        self.bits >> 1
    }

    /// The direction flag carried in the byte's low bit.
    #[must_use]
    pub const fn direction(self) -> Direction {
        Direction::from_lsb(self.bits)
    }

    /// Returns `true` when the top seven bits equal `device_address`.
    #[must_use]
    pub const fn matches_address(self, device_address: u8) -> bool {
        self.address_bits() == device_address
    }

    /// Clears the register.
    #[allow(clippy::missing_const_for_fn)]
    pub fn reset(&mut self) {
        self.bits = 0;
    }
}

/// Output shift register emitting slave data MSB-first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct OutputShift {
    bits: u8,
}

impl OutputShift {
    /// Creates an empty shift register.
    #[must_use]
    pub const fn new() -> Self {
        Self { bits: 0 }
    }

    /// Loads a full byte to transmit.
    #[allow(clippy::missing_const_for_fn)]
    pub fn load(&mut self, byte: u8) {
        self.bits = byte;
    }

    /// The bit currently presented on the wire, `0` or `1`.
    #[must_use]
    pub const fn msb(self) -> u8 {
        self.bits >> 7
    }

    /// Shifts left one position, zero-filling the vacated LSB.
    #[allow(clippy::missing_const_for_fn)]
    pub fn shift(&mut self) {
        self.bits <<= 1;
    }

    /// Remaining register contents.
    #[must_use]
    pub const fn byte(self) -> u8 {
        self.bits
    }

    /// Clears the register.
    #[allow(clippy::missing_const_for_fn)]
    pub fn reset(&mut self) {
        self.bits = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::{BitCounter, Direction, InputShift, OutputShift, ACK_BIT_MARK};
    use crate::bus::Level;

    #[test]
    fn counter_walks_the_nine_bit_frame_and_realigns() {
        let mut counter = BitCounter::new();
        for expected in 0..=8 {
            assert_eq!(counter.value(), expected);
            counter.advance();
        }
        assert_eq!(counter.value(), 0);
    }

    #[test]
    fn counter_marks_fire_at_their_positions() {
        let mut counter = BitCounter::new();
        let mut reader = Vec::new();
        let mut lsb = Vec::new();
        let mut ack = Vec::new();
        for position in 0..=ACK_BIT_MARK {
            if counter.at_reader_bit() {
                reader.push(position);
            }
            if counter.at_lsb_bit() {
                lsb.push(position);
            }
            if counter.at_ack_bit() {
                ack.push(position);
            }
            counter.advance();
        }
        assert_eq!(reader, vec![6]);
        assert_eq!(lsb, vec![7]);
        assert_eq!(ack, vec![8]);
    }

    #[test]
    fn counter_reset_realigns_mid_frame() {
        let mut counter = BitCounter::new();
        counter.advance();
        counter.advance();
        counter.reset();
        assert_eq!(counter.value(), 0);
    }

    #[test]
    fn input_shift_accumulates_msb_first() {
        let mut input = InputShift::new();
        for bit in [1, 0, 1, 0, 0, 1, 0, 1] {
            input.shift_in(Level::from_bool(bit == 1));
        }
        assert_eq!(input.byte(), 0xA5);
    }

    #[test]
    fn address_byte_splits_into_address_and_direction() {
        let mut input = InputShift::new();
        let byte = (0x55 << 1) | 1;
        for position in (0..8).rev() {
            input.shift_in(Level::from_bool(byte & (1 << position) != 0));
        }
        assert_eq!(input.address_bits(), 0x55);
        assert_eq!(input.direction(), Direction::Read);
        assert!(input.matches_address(0x55));
        assert!(!input.matches_address(0x2A));
    }

    #[test]
    fn direction_decodes_from_the_low_bit() {
        assert_eq!(Direction::from_lsb(0), Direction::Write);
        assert_eq!(Direction::from_lsb(1), Direction::Read);
        assert!(Direction::Read.is_read());
        assert!(!Direction::Write.is_read());
    }

    #[test]
    fn output_shift_emits_msb_first_and_zero_fills() {
        let mut output = OutputShift::new();
        output.load(0xC1);
        let mut bits = Vec::new();
        for _ in 0..8 {
            bits.push(output.msb());
            output.shift();
        }
        assert_eq!(bits, vec![1, 1, 0, 0, 0, 0, 0, 1]);
        assert_eq!(output.byte(), 0);
    }

    #[test]
    fn shift_register_resets_clear_contents() {
        let mut input = InputShift::new();
        input.shift_in(Level::High);
        input.reset();
        assert_eq!(input.byte(), 0);

        let mut output = OutputShift::new();
        output.load(0xFF);
        output.reset();
        assert_eq!(output.byte(), 0);
    }
}
