//! Conversion of NTP time to the epoch of the system clock.
//!
//! NTP counts seconds since 1900-01-01. Small systems usually keep their clock relative to some
//! later epoch, which one is a property of the C library or RTC driver in use.

/// Seconds between 1900-01-01 and the Unix epoch, 1970-01-01.
pub const NTP_UNIX_OFFSET: u32 = 2_208_988_800;

/// Seconds between 1900-01-01 and 2000-01-01, the epoch of the AVR libc.
pub const NTP_Y2K_OFFSET: u32 = 3_155_673_600;

/// The epoch a system clock counts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Epoch {
    /// 1970-01-01 00:00:00 UTC.
    Unix,
    /// 2000-01-01 00:00:00 UTC.
    Y2k,
}

impl Epoch {
    /// Seconds from the NTP epoch to this epoch.
    pub fn ntp_offset(self) -> u32 {
        match self {
            Epoch::Unix => NTP_UNIX_OFFSET,
            Epoch::Y2k => NTP_Y2K_OFFSET,
        }
    }

    /// Convert NTP seconds to seconds since this epoch.
    ///
    /// Wraps like the 32 bit NTP era does, timestamps after 2036 are sent as small numbers.
    pub fn from_ntp(self, secs: u32) -> u32 {
        secs.wrapping_sub(self.ntp_offset())
    }
}

impl Default for Epoch {
    fn default() -> Self {
        Epoch::Unix
    }
}
