//! The IPv4 layer.
//!
//! Validates datagrams for the own address, hands the transport payload to the layer above and
//! turns answers into datagrams back to the sender. There is no routing table: the interface
//! only ever answers its peers and sends to one default router otherwise, see the
//! [interface](../../iface/index.html).
use crate::layer::{FnHandler, Outcome};
use crate::wire::Ipv4Repr;

mod endpoint;

pub use endpoint::Endpoint;

/// An IPv4 receiver.
pub trait Recv {
    /// Inspect the transport payload of one incoming datagram.
    ///
    /// The `payload` extends to the end of the buffer and may be longer than the
    /// `repr.payload_len` bytes of the datagram, which leaves room for answers longer than the
    /// request. An answer reflects the length of the new transport payload.
    fn receive(&mut self, repr: &Ipv4Repr, payload: &mut [u8]) -> Outcome;
}

impl<F> Recv for FnHandler<F>
    where F: FnMut(&Ipv4Repr, &mut [u8]) -> Outcome
{
    fn receive(&mut self, repr: &Ipv4Repr, payload: &mut [u8]) -> Outcome {
        self.0(repr, payload)
    }
}
