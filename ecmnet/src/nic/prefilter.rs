//! Early filtering of received frames.
//!
//! Only the first [`HEADER_LEN`] bytes of a frame are inspected, as many as fit into the smallest
//! first fragment of any frame the stack handles. These cover the Ethernet header and either the
//! fixed part of an ARP packet or the IPv4 header up to the protocol field.
//!
//! [`HEADER_LEN`]: constant.HEADER_LEN.html
use crate::wire::{arp_packet, ethernet_frame, ipv4_packet};
use crate::wire::{ArpHardware, EthernetAddress, EthernetProtocol, IpProtocol};
use crate::wire::{arp, ethernet};

/// The number of leading bytes that decide about a frame.
pub const HEADER_LEN: usize = 24;

/// The shortest frame that is accepted by default, a header with an ARP packet.
pub const MIN_FRAME_LEN: usize = ethernet::HEADER_LEN + arp::PACKET_LEN;

/// The longest frame that is accepted by default, the minimum datagram size every IPv4 host must
/// be able to receive.
pub const MAX_FRAME_LEN: usize = ethernet::HEADER_LEN + 576;

/// Which frames to accept.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Filter {
    /// The own hardware address, frames to other unicast addresses are dropped.
    pub hardware_addr: EthernetAddress,
    /// The shortest frame length to accept.
    pub min_len: usize,
    /// The longest frame length to accept.
    pub max_len: usize,
}

impl Filter {
    /// Accept frames for a hardware address within the default length limits.
    pub fn new(hardware_addr: EthernetAddress) -> Self {
        Filter {
            hardware_addr,
            min_len: MIN_FRAME_LEN,
            max_len: MAX_FRAME_LEN,
        }
    }
}

/// Determine the length of a frame from its start.
///
/// Returns `None` for frames the stack would drop anyways: foreign destinations, other
/// ethertypes, IPv4 with options or fragmentation or a protocol other than ICMP and UDP, ARP for
/// other hardware or protocol types, and lengths outside the limits of the filter. Also returns
/// `None` when fewer than [`HEADER_LEN`] bytes are given.
///
/// The length of an ARP frame is that of its packet, any padding is not stored.
///
/// [`HEADER_LEN`]: constant.HEADER_LEN.html
pub fn frame_len(header: &[u8], filter: &Filter) -> Option<usize> {
    if header.len() < HEADER_LEN {
        return None;
    }

    let frame = ethernet_frame::new_unchecked(header);
    let dst_addr = frame.dst_addr();
    if dst_addr != filter.hardware_addr && !dst_addr.is_broadcast() {
        return None;
    }

    let len = match frame.ethertype() {
        EthernetProtocol::Ipv4 => {
            let packet = ipv4_packet::new_unchecked(frame.payload_slice());
            if packet.version() != 4 || packet.header_len() != 20 || packet.is_fragment() {
                return None;
            }
            match packet.protocol() {
                IpProtocol::Icmp | IpProtocol::Udp => (),
                _ => return None,
            }
            ethernet::HEADER_LEN + usize::from(packet.total_len())
        },
        EthernetProtocol::Arp => {
            let packet = arp_packet::new_unchecked(frame.payload_slice());
            if packet.hardware_type() != ArpHardware::Ethernet
                || packet.protocol_type() != EthernetProtocol::Ipv4
                || packet.hardware_len() != 6
                || packet.protocol_len() != 4
            {
                return None;
            }
            ethernet::HEADER_LEN + arp::PACKET_LEN
        },
        _ => return None,
    };

    if len < filter.min_len || len > filter.max_len {
        net_trace!("prefilter: frame length {} out of bounds", len);
        return None;
    }

    Some(len)
}
