//! The ethernet layer.
//!
//! This is tasked with decoding the framed ethernet data that the USB transport delivers and
//! turning answers of the upper layers back into frames addressed to the original sender. The
//! state and logic within the ethernet endpoint is tiny compared to other layers.
use crate::layer::{FnHandler, Outcome};
use crate::wire::EthernetProtocol;

mod endpoint;

pub use endpoint::{Endpoint, MIN_FRAME_LEN};

/// An ethernet receiver.
///
/// Gets the payload of every frame addressed to this endpoint, together with its protocol type.
pub trait Recv {
    /// Inspect the payload of one incoming frame and possibly answer it in place.
    fn receive(&mut self, ethertype: EthernetProtocol, payload: &mut [u8]) -> Outcome;
}

impl<F> Recv for FnHandler<F>
    where F: FnMut(EthernetProtocol, &mut [u8]) -> Outcome
{
    fn receive(&mut self, ethertype: EthernetProtocol, payload: &mut [u8]) -> Outcome {
        self.0(ethertype, payload)
    }
}
