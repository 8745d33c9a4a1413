//! Open-drain bus line primitives for the two-wire interface.
//!
//! A line is high only while every attached driver releases it. Drivers can
//! pull low or release; actively driving high is unrepresentable, so the
//! open-drain contract holds by construction.

/// Logical level observed on a bus line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Level {
    /// The line is pulled to ground by at least one driver.
    Low,
    /// The line floats high through the pull-up.
    High,
}

impl Level {
    /// Returns `true` for [`Level::High`].
    #[must_use]
    pub const fn is_high(self) -> bool {
        matches!(self, Self::High)
    }

    /// Returns `true` for [`Level::Low`].
    #[must_use]
    pub const fn is_low(self) -> bool {
        matches!(self, Self::Low)
    }

    /// Converts a boolean sample (`true` = high) into a level.
    #[must_use]
    pub const fn from_bool(high: bool) -> Self {
        if high {
            Self::High
        } else {
            Self::Low
        }
    }

    /// Returns the level as a single framing bit (`1` = high).
    #[must_use]
    pub const fn bit(self) -> u8 {
        match self {
            Self::High => 1,
            Self::Low => 0,
        }
    }
}

/// Transition between two successive samples of the same line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Edge {
    /// Low-to-high transition.
    Rising,
    /// High-to-low transition.
    Falling,
}

/// Derives the edge between the previous and current sample, if any.
#[must_use]
pub const fn edge_between(previous: Level, current: Level) -> Option<Edge> {
    match (previous, current) {
        (Level::Low, Level::High) => Some(Edge::Rising),
        (Level::High, Level::Low) => Some(Edge::Falling),
        (Level::Low, Level::Low) | (Level::High, Level::High) => None,
    }
}

/// Drive contribution of a single participant on an open-drain line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum LineDrive {
    /// The driver floats the line and lets the pull-up or others decide.
    #[default]
    Released,
    /// The driver actively pulls the line to ground.
    Low,
}

impl LineDrive {
    /// Returns `true` while the driver pulls the line low.
    #[must_use]
    pub const fn is_driving(self) -> bool {
        matches!(self, Self::Low)
    }
}

/// Handle for one allocated driver slot, minted by [`OpenDrainLine::attach`]
/// or [`TwoWire::attach`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct DriverId(usize);

impl DriverId {
    const fn index(self) -> usize {
        self.0
    }
}

/// A single shared open-drain wire with a slot per attached driver.
///
/// The resolved level is the wired-AND across all slots: high only while no
/// driver pulls low.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct OpenDrainLine {
    drives: Vec<LineDrive>,
}

impl OpenDrainLine {
    /// Creates a line with no drivers attached.
    #[must_use]
    pub const fn new() -> Self {
        Self { drives: Vec::new() }
    }

    /// Attaches a new driver, initially released.
    #[must_use]
    pub fn attach(&mut self) -> DriverId {
        self.drives.push(LineDrive::Released);
        DriverId(self.drives.len() - 1)
    }

    /// Number of attached drivers.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn driver_count(&self) -> usize {
        self.drives.len()
    }

    /// Sets the drive contributed by `driver`.
    pub fn set_drive(&mut self, driver: DriverId, drive: LineDrive) {
        self.drives[driver.index()] = drive;
    }

    /// Returns the drive currently contributed by `driver`.
    #[must_use]
    pub fn drive(&self, driver: DriverId) -> LineDrive {
        self.drives[driver.index()]
    }

    /// Number of drivers currently pulling the line low.
    #[must_use]
    pub fn low_driver_count(&self) -> usize {
        self.drives.iter().filter(|d| d.is_driving()).count()
    }

    /// Resolves the observable level of the line.
    #[must_use]
    pub fn resolved(&self) -> Level {
        Level::from_bool(self.low_driver_count() == 0)
    }
}

/// The two-wire serial bus: one clock line and one data line.
///
/// A driver attaches to both lines at once and owns the same slot on each,
/// matching a physical device with two pins on the bus.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct TwoWire {
    clk: OpenDrainLine,
    data: OpenDrainLine,
}

impl TwoWire {
    /// Creates a bus with no participants.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            clk: OpenDrainLine::new(),
            data: OpenDrainLine::new(),
        }
    }

    /// Attaches a participant to both lines and returns its driver handle.
    ///
    /// Both lines allocate slots in lockstep, so one id serves both.
    #[must_use]
    pub fn attach(&mut self) -> DriverId {
        let id = self.clk.attach();
        let _ = self.data.attach();
        id
    }

    /// Sets the clock-line drive contributed by `driver`.
    pub fn drive_clk(&mut self, driver: DriverId, drive: LineDrive) {
        self.clk.set_drive(driver, drive);
    }

    /// Sets the data-line drive contributed by `driver`.
    pub fn drive_data(&mut self, driver: DriverId, drive: LineDrive) {
        self.data.set_drive(driver, drive);
    }

    /// Resolved clock-line level.
    #[must_use]
    pub fn clk(&self) -> Level {
        self.clk.resolved()
    }

    /// Resolved data-line level.
    #[must_use]
    pub fn data(&self) -> Level {
        self.data.resolved()
    }

    /// Read access to the clock line for driver-level inspection.
    #[must_use]
    pub const fn clk_line(&self) -> &OpenDrainLine {
        &self.clk
    }

    /// Read access to the data line for driver-level inspection.
    #[must_use]
    pub const fn data_line(&self) -> &OpenDrainLine {
        &self.data
    }
}
