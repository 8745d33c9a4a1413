//! Bus-addressable register file with transfer notification pulses.
//!
//! Two independent arrays share one 8-bit index pointer: write-registers
//! receive master data, read-registers supply slave data. Each slot carries
//! an `update` pulse (freshly written) and a `capture` pulse (freshly read)
//! for the surrounding application. Register contents belong to that
//! application and survive bus reset; only the pointer and the pulses are
//! per-transaction state.

/// Register arrays, notification pulses, and the shared index pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RegisterFile {
    write_registers: Vec<u8>,
    read_registers: Vec<u8>,
    update: Vec<bool>,
    capture: Vec<bool>,
    pointer: u8,
}

impl RegisterFile {
    /// Creates a file with `count` slots per direction, all zeroed.
    ///
    /// `count` is validated at engine construction; values above 256 are
    /// unreachable through a configured engine.
    #[must_use]
    pub fn new(count: usize) -> Self {
        Self {
            write_registers: vec![0; count],
            read_registers: vec![0; count],
            update: vec![false; count],
            capture: vec![false; count],
            pointer: 0,
        }
    }

    /// Number of slots per direction.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn len(&self) -> usize {
        self.write_registers.len()
    }

    /// Returns `true` for a zero-slot file.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn is_empty(&self) -> bool {
        self.write_registers.is_empty()
    }

    /// Returns `true` while both banks and both pulse vectors share one
    /// slot count.
    ///
    /// Construction guarantees agreement; a deserialized file may not,
    /// so imports check before accepting one.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn is_consistent(&self) -> bool {
        let len = self.write_registers.len();
        self.read_registers.len() == len
            && self.update.len() == len
            && self.capture.len() == len
    }

    /// Current index pointer.
    #[must_use]
    pub const fn pointer(&self) -> u8 {
        self.pointer
    }

    /// Loads the index pointer from a freshly received byte.
    #[allow(clippy::missing_const_for_fn)]
    pub fn set_pointer(&mut self, value: u8) {
        self.pointer = value;
    }

    /// Returns `true` while the pointer addresses an existing slot.
    #[must_use]
    pub fn pointer_in_range(&self) -> bool {
        usize::from(self.pointer) < self.len()
    }

    /// Commits a received byte to the slot under the pointer.
    ///
    /// In range: stores the byte, raises that slot's `update` pulse, and
    /// advances the pointer. Out of range: suppressed entirely. Returns the
    /// index written, if any.
    pub fn strobe_write(&mut self, byte: u8) -> Option<u8> {
        let index = self.pointer;
        let slot = self.write_registers.get_mut(usize::from(index))?;
        *slot = byte;
        self.update[usize::from(index)] = true;
        self.pointer = self.pointer.wrapping_add(1);
        Some(index)
    }

    /// Fetches the read-register under the pointer for transmission.
    ///
    /// In range: raises that slot's `capture` pulse, advances the pointer,
    /// and returns `(index, value)`. Out of range: suppressed entirely.
    pub fn capture_read(&mut self) -> Option<(u8, u8)> {
        let index = self.pointer;
        let value = *self.read_registers.get(usize::from(index))?;
        self.capture[usize::from(index)] = true;
        self.pointer = self.pointer.wrapping_add(1);
        Some((index, value))
    }

    /// Deasserts every `update` and `capture` pulse.
    pub fn clear_pulses(&mut self) {
        self.update.fill(false);
        self.capture.fill(false);
    }

    /// Clears per-transaction state: the pointer and all pulses.
    ///
    /// Register contents persist; they belong to the application.
    pub fn clear_transaction(&mut self) {
        self.pointer = 0;
        self.clear_pulses();
    }

    /// Write-register contents at `index`, if in range.
    #[must_use]
    pub fn write_register(&self, index: usize) -> Option<u8> {
        self.write_registers.get(index).copied()
    }

    /// Read-register contents at `index`, if in range.
    #[must_use]
    pub fn read_register(&self, index: usize) -> Option<u8> {
        self.read_registers.get(index).copied()
    }

    /// Host-side store into the read-register array. Returns `false` when
    /// `index` is out of range.
    pub fn set_read_register(&mut self, index: usize, value: u8) -> bool {
        match self.read_registers.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// The `update` pulse for `index`; `false` when out of range.
    #[must_use]
    pub fn update_pulse(&self, index: usize) -> bool {
        self.update.get(index).copied().unwrap_or(false)
    }

    /// The `capture` pulse for `index`; `false` when out of range.
    #[must_use]
    pub fn capture_pulse(&self, index: usize) -> bool {
        self.capture.get(index).copied().unwrap_or(false)
    }

    /// Test-only constructor bypassing the shared-length guarantee.
    #[cfg(test)]
    pub(crate) fn from_vectors(
        write_registers: Vec<u8>,
        read_registers: Vec<u8>,
        update: Vec<bool>,
        capture: Vec<bool>,
    ) -> Self {
        Self {
            write_registers,
            read_registers,
            update,
            capture,
            pointer: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::RegisterFile;

    #[test]
    fn strobe_write_stores_pulses_and_advances() {
        let mut file = RegisterFile::new(3);
        file.set_pointer(1);

        assert_eq!(file.strobe_write(0xAB), Some(1));
        assert_eq!(file.write_register(1), Some(0xAB));
        assert!(file.update_pulse(1));
        assert!(!file.update_pulse(0));
        assert_eq!(file.pointer(), 2);
    }

    #[test]
    fn constructed_files_hold_vector_agreement() {
        assert!(RegisterFile::new(5).is_consistent());
        assert!(RegisterFile::new(0).is_consistent());
    }

    #[test]
    fn truncated_pulse_vectors_break_consistency() {
        let file = RegisterFile::from_vectors(vec![0; 5], vec![0; 5], Vec::new(), Vec::new());
        assert!(!file.is_consistent());

        let file =
            RegisterFile::from_vectors(vec![0; 5], vec![0; 4], vec![false; 5], vec![false; 5]);
        assert!(!file.is_consistent());
    }

    #[test]
    fn out_of_range_strobe_is_fully_suppressed() {
        let mut file = RegisterFile::new(2);
        file.set_pointer(2);

        assert_eq!(file.strobe_write(0xFF), None);
        assert_eq!(file.pointer(), 2);
        assert!(!file.update_pulse(0));
        assert!(!file.update_pulse(1));
    }

    #[test]
    fn capture_read_fetches_pulses_and_advances() {
        let mut file = RegisterFile::new(3);
        assert!(file.set_read_register(0, 0x11));
        assert!(file.set_read_register(1, 0x22));

        assert_eq!(file.capture_read(), Some((0, 0x11)));
        assert!(file.capture_pulse(0));
        assert_eq!(file.pointer(), 1);

        assert_eq!(file.capture_read(), Some((1, 0x22)));
        assert!(file.capture_pulse(1));
    }

    #[test]
    fn out_of_range_capture_is_fully_suppressed() {
        let mut file = RegisterFile::new(1);
        file.set_pointer(1);

        assert_eq!(file.capture_read(), None);
        assert_eq!(file.pointer(), 1);
        assert!(!file.capture_pulse(0));
    }

    #[test]
    fn clear_transaction_resets_pointer_and_pulses_only() {
        let mut file = RegisterFile::new(2);
        assert!(file.set_read_register(1, 0x7E));
        let _ = file.strobe_write(0x42);
        let _ = file.capture_read();
        file.set_pointer(9);

        file.clear_transaction();

        assert_eq!(file.pointer(), 0);
        assert!(!file.update_pulse(0));
        assert!(!file.capture_pulse(0));
        assert_eq!(file.write_register(0), Some(0x42));
        assert_eq!(file.read_register(1), Some(0x7E));
    }

    #[test]
    fn host_accessors_bounds_check() {
        let mut file = RegisterFile::new(2);
        assert!(!file.set_read_register(2, 0xAA));
        assert_eq!(file.write_register(2), None);
        assert_eq!(file.read_register(5), None);
        assert!(!file.update_pulse(17));
        assert_eq!(file.len(), 2);
        assert!(!file.is_empty());
    }

    #[test]
    fn full_width_file_wraps_the_pointer() {
        let mut file = RegisterFile::new(256);
        file.set_pointer(255);

        assert_eq!(file.strobe_write(0x5A), Some(255));
        assert_eq!(file.pointer(), 0);
        assert!(file.pointer_in_range());
    }
}
