//! Simple Network Time Protocol messages (RFC 4330).
//!
//! Only the fixed 48 byte header is handled. Extension fields and the optional authenticator are
//! never sent and are ignored on receipt.
use core::fmt;
use byteorder::{ByteOrder, NetworkEndian};

use super::{Error, Result};

/// The well-known server port.
pub const SERVER_PORT: u16 = 123;

/// The length of the fixed message.
pub const PACKET_LEN: usize = field::TRANSMIT.end;

enum_with_unknown! {
    /// Warning of an impending leap second.
    pub enum LeapIndicator(u8) {
        /// No warning.
        NoWarning = 0,
        /// The last minute of the day has 61 seconds.
        Insert = 1,
        /// The last minute of the day has 59 seconds.
        Delete = 2,
        /// The clock of the server is not synchronized.
        Alarm = 3,
    }
}

enum_with_unknown! {
    /// Association mode.
    pub enum Mode(u8) {
        /// Reserved.
        Reserved = 0,
        /// Symmetric active.
        SymmetricActive = 1,
        /// Symmetric passive.
        SymmetricPassive = 2,
        /// A client request.
        Client = 3,
        /// A server reply.
        Server = 4,
        /// An unsolicited broadcast.
        Broadcast = 5,
    }
}

/// A 64 bit NTP timestamp, seconds and binary fraction since 1900-01-01.
#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Default)]
pub struct Timestamp {
    /// Whole seconds since the NTP epoch.
    pub secs: u32,
    /// Fraction of a second in units of 2^-32 seconds.
    pub frac: u32,
}

impl Timestamp {
    /// The all zero timestamp which stands for an unknown time.
    pub const UNKNOWN: Timestamp = Timestamp { secs: 0, frac: 0 };

    /// Read a timestamp from 8 octets, in big-endian.
    ///
    /// # Panics
    /// The function panics if `data` is shorter than eight octets.
    pub fn from_bytes(data: &[u8]) -> Self {
        Timestamp {
            secs: NetworkEndian::read_u32(&data[0..4]),
            frac: NetworkEndian::read_u32(&data[4..8]),
        }
    }

    /// Write the timestamp into 8 octets, in big-endian.
    pub fn write_bytes(&self, data: &mut [u8]) {
        NetworkEndian::write_u32(&mut data[0..4], self.secs);
        NetworkEndian::write_u32(&mut data[4..8], self.frac);
    }

    /// Query whether this is the unknown timestamp.
    pub fn is_unknown(&self) -> bool {
        *self == Self::UNKNOWN
    }
}

byte_wrapper! {
    /// A byte sequence representing an SNTP message.
    #[derive(Debug, PartialEq, Eq)]
    pub struct sntp([u8]);
}

mod field {
    use crate::wire::field::Field;

    pub(crate) const LI_VN_MODE: usize = 0;
    pub(crate) const STRATUM:    usize = 1;
    pub(crate) const POLL:       usize = 2;
    pub(crate) const PRECISION:  usize = 3;
    pub(crate) const ROOT_DELAY: Field = 4..8;
    pub(crate) const ROOT_DISP:  Field = 8..12;
    pub(crate) const REF_ID:     Field = 12..16;
    pub(crate) const REFERENCE:  Field = 16..24;
    pub(crate) const ORIGINATE:  Field = 24..32;
    pub(crate) const RECEIVE:    Field = 32..40;
    pub(crate) const TRANSMIT:   Field = 40..48;
}

impl sntp {
    /// Imbue a raw octet buffer with SNTP message structure.
    pub fn new_unchecked(data: &[u8]) -> &Self {
        Self::__from_macro_new_unchecked(data)
    }

    /// Imbue a mutable octet buffer with SNTP message structure.
    pub fn new_unchecked_mut(data: &mut [u8]) -> &mut Self {
        Self::__from_macro_new_unchecked_mut(data)
    }

    /// Shorthand for a combination of [new_unchecked] and [check_len].
    ///
    /// [new_unchecked]: #method.new_unchecked
    /// [check_len]: #method.check_len
    pub fn new_checked(data: &[u8]) -> Result<&Self> {
        Self::new_unchecked(data).check_len()?;
        Ok(Self::new_unchecked(data))
    }

    /// Unwrap the message as a raw byte slice.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Ensure that no accessor method will panic if called.
    /// Returns `Err(Error::Truncated)` if the buffer is shorter than the fixed header.
    pub fn check_len(&self) -> Result<()> {
        if self.0.len() < PACKET_LEN {
            Err(Error::Truncated)
        } else {
            Ok(())
        }
    }

    /// Return the raw leap indicator, version and mode byte.
    #[inline]
    pub fn li_vn_mode(&self) -> u8 {
        self.0[field::LI_VN_MODE]
    }

    /// Return the leap indicator.
    #[inline]
    pub fn leap_indicator(&self) -> LeapIndicator {
        LeapIndicator::from(self.li_vn_mode() >> 6)
    }

    /// Return the protocol version.
    #[inline]
    pub fn version(&self) -> u8 {
        (self.li_vn_mode() >> 3) & 0x07
    }

    /// Return the association mode.
    #[inline]
    pub fn mode(&self) -> Mode {
        Mode::from(self.li_vn_mode() & 0x07)
    }

    /// Return the stratum of the server clock.
    #[inline]
    pub fn stratum(&self) -> u8 {
        self.0[field::STRATUM]
    }

    /// Return the poll interval exponent.
    #[inline]
    pub fn poll(&self) -> i8 {
        self.0[field::POLL] as i8
    }

    /// Return the precision exponent of the server clock.
    #[inline]
    pub fn precision(&self) -> i8 {
        self.0[field::PRECISION] as i8
    }

    /// Return the root delay, in 16.16 fixed point seconds.
    #[inline]
    pub fn root_delay(&self) -> u32 {
        NetworkEndian::read_u32(&self.0[field::ROOT_DELAY])
    }

    /// Return the root dispersion, in 16.16 fixed point seconds.
    #[inline]
    pub fn root_dispersion(&self) -> u32 {
        NetworkEndian::read_u32(&self.0[field::ROOT_DISP])
    }

    /// Return the reference identifier.
    #[inline]
    pub fn ref_id(&self) -> u32 {
        NetworkEndian::read_u32(&self.0[field::REF_ID])
    }

    /// Return the time the server clock was last set.
    pub fn reference_timestamp(&self) -> Timestamp {
        Timestamp::from_bytes(&self.0[field::REFERENCE])
    }

    /// Return the client transmit time echoed by the server.
    pub fn originate_timestamp(&self) -> Timestamp {
        Timestamp::from_bytes(&self.0[field::ORIGINATE])
    }

    /// Return the time the request arrived at the server.
    pub fn receive_timestamp(&self) -> Timestamp {
        Timestamp::from_bytes(&self.0[field::RECEIVE])
    }

    /// Return the time the message departed the sender.
    pub fn transmit_timestamp(&self) -> Timestamp {
        Timestamp::from_bytes(&self.0[field::TRANSMIT])
    }

    /// Set the leap indicator, version and mode byte.
    #[inline]
    pub fn set_li_vn_mode(&mut self, leap: LeapIndicator, version: u8, mode: Mode) {
        let leap: u8 = leap.into();
        let mode: u8 = mode.into();
        self.0[field::LI_VN_MODE] = (leap << 6) | ((version & 0x07) << 3) | (mode & 0x07);
    }

    /// Set the stratum.
    #[inline]
    pub fn set_stratum(&mut self, value: u8) {
        self.0[field::STRATUM] = value
    }

    /// Set the time the message departs.
    pub fn set_transmit_timestamp(&mut self, value: Timestamp) {
        value.write_bytes(&mut self.0[field::TRANSMIT])
    }
}

impl AsRef<[u8]> for sntp {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// A high-level representation of an SNTP message.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Repr {
    /// The leap second warning or alarm.
    pub leap_indicator: LeapIndicator,
    /// The protocol version.
    pub version: u8,
    /// The association mode.
    pub mode: Mode,
    /// The stratum, 0 for unspecified or a kiss-of-death.
    pub stratum: u8,
    /// The time the message departed the sender.
    pub transmit_timestamp: Timestamp,
}

impl Repr {
    /// A client request as sent by this crate: no warning, version 3, client mode, all
    /// timestamps unknown.
    pub const fn client_request(version: u8) -> Self {
        Repr {
            leap_indicator: LeapIndicator::NoWarning,
            version,
            mode: Mode::Client,
            stratum: 0,
            transmit_timestamp: Timestamp::UNKNOWN,
        }
    }

    /// Parse an SNTP message and return a high-level representation.
    pub fn parse(packet: &sntp) -> Result<Repr> {
        packet.check_len()?;
        Ok(Repr {
            leap_indicator: packet.leap_indicator(),
            version: packet.version(),
            mode: packet.mode(),
            stratum: packet.stratum(),
            transmit_timestamp: packet.transmit_timestamp(),
        })
    }

    /// Return the length of a message that will be emitted from this high-level representation.
    pub fn buffer_len(&self) -> usize {
        PACKET_LEN
    }

    /// Emit a high-level representation into an SNTP message.
    ///
    /// All fields not covered by the representation are zeroed.
    pub fn emit(&self, packet: &mut sntp) {
        for byte in packet.0[..PACKET_LEN].iter_mut() {
            *byte = 0;
        }
        packet.set_li_vn_mode(self.leap_indicator, self.version, self.mode);
        packet.set_stratum(self.stratum);
        packet.set_transmit_timestamp(self.transmit_timestamp);
    }
}

impl fmt::Display for Repr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "SNTP v{} mode={:?} stratum={} xmit={}.{:08x}",
               self.version, self.mode, self.stratum,
               self.transmit_timestamp.secs, self.transmit_timestamp.frac)
    }
}
