use core::fmt;

/// The error type for parsing packets.
///
/// None of these are fatal. The layers turn every one of them into a silent drop of the packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// An incoming packet could not be parsed because it was shorter than assumed.
    ///
    /// The packet may be shorter than the minimum length specified or a length field may claim
    /// more data than was actually received.
    Truncated,

    /// An incoming packet had an incorrect checksum and was dropped.
    WrongChecksum,

    /// An incoming packet could not be recognized and was dropped.
    ///
    /// E.g. an Ethernet packet with an unknown EtherType.
    Unrecognized,

    /// An incoming packet was recognized but was self-contradictory.
    ///
    /// Examples: an ARP packet with the wrong address lengths for its hardware type; a UDP
    /// packet claiming to contain less than 8 bytes of data.
    Malformed,

    /// Parsing depends on information derived from a non-implemented feature.
    ///
    /// Similar to `Unrecognized` but in contrast we know that our implementation is incomplete,
    /// e.g. IPv4 options or fragments.
    Unsupported,
}

/// The result type for the wire module.
pub type Result<T> = core::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Truncated     => write!(f, "truncated packet"),
            Error::WrongChecksum => write!(f, "checksum error"),
            Error::Unrecognized  => write!(f, "unrecognized packet"),
            Error::Unsupported   => write!(f, "unsupported option"),
            Error::Malformed     => write!(f, "malformed packet"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}
