//! The process logic of protocol layers.
//!
//! ## Layering
//!
//! Each protocol layer is split into two parts; the packet logic contained in `wire` and the
//! processing part in this module. An endpoint represents the local state of a protocol, such as
//! its own address or a table of neighbors. The state is open to modifications as part of a user
//! program while processing does not take place, similar to reconfiguration on the OS level with
//! utilities such as `arp` or `ifconfig`.
//!
//! ## Receiving
//!
//! Layers process packets by routing the payload to the layer conceptually above them through a
//! small receiver trait per layer. Each receiver gets the mutable bytes of its own payload and
//! the already parsed header information of the layers below it.
//!
//! ## Answering in place
//!
//! No layer ever copies a packet. When an upper layer decides to answer it overwrites its own
//! payload with the answer and returns [`Outcome::Reflect`] with the new length. Each layer below
//! then rewrites its header for the opposite direction and adds its own header length, until the
//! frame is complete and can be queued for transmission in the very record it arrived in.
//!
//! [`Outcome::Reflect`]: enum.Outcome.html#variant.Reflect
pub mod arp;
pub mod eth;
pub mod icmp;
pub mod ip;
pub mod sntp;
pub mod udp;

/// The result type of layer operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors of layer operations, for the most part of generating packets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Error {
    /// The operation was not permitted.
    ///
    /// Returned when the endpoint does not allow or implement an operation, or when a packet it
    /// was asked to operate on is invalid.
    Illegal,

    /// Not enough space for the requested packet.
    ///
    /// Returned when the provided buffer can not hold the headers and payload that were asked
    /// for. In contrast to `Illegal` this would signal that a smaller size may be possible.
    BadSize,

    /// Unable to find a route towards the destination address.
    Unreachable,

    /// The action could not be completed because there were not enough resources.
    ///
    /// The main difference towards `Illegal` is that implies that it would have been legal with
    /// more resources. For the packet ring this is transient, it frees up as soon as queued
    /// packets are transmitted.
    Exhausted,
}

/// What to do with a received packet after a layer processed it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// The packet was consumed or rejected, give back its memory.
    Drop,

    /// The packet was rewritten into an answer of the given length.
    ///
    /// The length covers everything from the start of the buffer that layer was handed.
    Reflect(usize),
}

impl Outcome {
    /// Wrap the reflected length of an upper layer with a header of this layer.
    pub fn with_header(self, header_len: usize) -> Self {
        match self {
            Outcome::Drop => Outcome::Drop,
            Outcome::Reflect(len) => Outcome::Reflect(header_len + len),
        }
    }
}

/// A standard wrapper for a function implementing receive traits.
///
/// Keeps the type alias overhead low by providing a single wrapper type that implements the
/// receive traits for all layers, where applicable.
pub struct FnHandler<F>(pub F);

/// Can convert from a wire error.
///
/// This indicates some layer tried to operate on a packet but failed.
impl From<crate::wire::Error> for Error {
    fn from(_: crate::wire::Error) -> Self {
        Error::Illegal
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            Error::Illegal => write!(f, "operation not permitted"),
            Error::BadSize => write!(f, "buffer too small"),
            Error::Unreachable => write!(f, "destination unreachable"),
            Error::Exhausted => write!(f, "out of packet memory"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}
