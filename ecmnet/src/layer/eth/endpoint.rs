use crate::layer::{Error, Outcome, Result};
use crate::wire::{ethernet_frame, EthernetAddress, EthernetProtocol, EthernetRepr};
use crate::wire::{arp, ethernet};

use super::Recv;

/// The shortest frame worth looking at, a header with an ARP packet.
///
/// Every supported payload is at least as long, shorter frames are dropped before dispatch.
pub const MIN_FRAME_LEN: usize = ethernet::HEADER_LEN + arp::PACKET_LEN;

/// The ethernet state of an interface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Endpoint {
    /// Our own address.
    ///
    /// We ignore any frames with mismatching destination, except broadcasts.
    addr: EthernetAddress,
}

impl Endpoint {
    /// Create an endpoint with an own hardware address.
    pub fn new(addr: EthernetAddress) -> Self {
        Endpoint { addr }
    }

    /// The own hardware address.
    pub fn addr(&self) -> EthernetAddress {
        self.addr
    }

    /// Change the own hardware address.
    pub fn set_addr(&mut self, addr: EthernetAddress) {
        self.addr = addr;
    }

    /// Query whether frames to some destination are meant for us.
    pub fn accepts(&self, dst_addr: EthernetAddress) -> bool {
        self.addr == dst_addr || dst_addr.is_broadcast()
    }

    /// Process one received frame.
    ///
    /// The payload of acceptable frames is handed to `upper`. When that answers, the frame is
    /// addressed back to its sender and the full frame length is returned.
    pub fn receive<R: Recv>(&self, frame: &mut [u8], upper: &mut R) -> Outcome {
        if frame.len() < MIN_FRAME_LEN {
            net_trace!("eth: runt frame of {} bytes", frame.len());
            return Outcome::Drop;
        }

        let frame = ethernet_frame::new_unchecked_mut(frame);
        let repr = match EthernetRepr::parse(frame) {
            Ok(repr) => repr,
            Err(_) => return Outcome::Drop,
        };

        if !self.accepts(repr.dst_addr) {
            net_trace!("eth: not for us, dst={}", repr.dst_addr);
            return Outcome::Drop;
        }

        match repr.ethertype {
            EthernetProtocol::Arp | EthernetProtocol::Ipv4 => (),
            other => {
                net_trace!("eth: unsupported ethertype {}", other);
                return Outcome::Drop;
            },
        }

        let outcome = upper.receive(repr.ethertype, frame.payload_mut_slice());
        if let Outcome::Reflect(_) = outcome {
            EthernetRepr {
                src_addr: self.addr,
                dst_addr: repr.src_addr,
                ethertype: repr.ethertype,
            }.emit(frame);
        }

        outcome.with_header(ethernet::HEADER_LEN)
    }

    /// Write a frame header for an outgoing frame.
    ///
    /// Returns the payload part of the frame.
    pub fn emit<'f>(&self, frame: &'f mut [u8], dst_addr: EthernetAddress, ethertype: EthernetProtocol)
        -> Result<&'f mut [u8]>
    {
        if frame.len() < ethernet::HEADER_LEN {
            return Err(Error::BadSize);
        }

        let frame = ethernet_frame::new_unchecked_mut(frame);
        EthernetRepr {
            src_addr: self.addr,
            dst_addr,
            ethertype,
        }.emit(frame);
        Ok(frame.payload_mut_slice())
    }
}
