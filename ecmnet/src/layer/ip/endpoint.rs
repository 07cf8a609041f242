use crate::layer::{Error, Outcome, Result};
use crate::wire::{ipv4, ipv4_packet, Checksum, IpProtocol, Ipv4Address, Ipv4Cidr, Ipv4Repr};

use super::Recv;

/// The IPv4 state of an interface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Endpoint {
    /// The own address and the subnet of the link.
    cidr: Ipv4Cidr,

    /// The time to live of datagrams we send.
    hop_limit: u8,

    /// Whether to verify and fill header checksums.
    checksum: Checksum,
}

impl Endpoint {
    /// Create an endpoint for an address, verifying checksums and with the default time to live.
    pub fn new(cidr: Ipv4Cidr) -> Self {
        Endpoint {
            cidr,
            hop_limit: ipv4::DEFAULT_HOP_LIMIT,
            checksum: Checksum::Manual,
        }
    }

    /// The own address and subnet.
    pub fn cidr(&self) -> Ipv4Cidr {
        self.cidr
    }

    /// Change the own address and subnet.
    pub fn set_cidr(&mut self, cidr: Ipv4Cidr) {
        self.cidr = cidr;
    }

    /// The time to live of sent datagrams.
    pub fn hop_limit(&self) -> u8 {
        self.hop_limit
    }

    /// Change the time to live of sent datagrams.
    pub fn set_hop_limit(&mut self, hop_limit: u8) {
        self.hop_limit = hop_limit;
    }

    /// The checksum handling.
    pub fn checksum(&self) -> Checksum {
        self.checksum
    }

    /// Change the checksum handling.
    pub fn set_checksum(&mut self, checksum: Checksum) {
        self.checksum = checksum;
    }

    /// Process one datagram, the payload of an Ethernet frame.
    ///
    /// ICMP and UDP datagrams for our address or a broadcast are handed to `upper`. An answer is
    /// sent back from our own address to the sender, with a completely rewritten header.
    pub fn receive<R: Recv>(&self, packet: &mut [u8], upper: &mut R) -> Outcome {
        let repr = match Ipv4Repr::parse(ipv4_packet::new_unchecked(packet), self.checksum) {
            Ok(repr) => repr,
            Err(_err) => {
                net_trace!("ip: rejected {:?}", _err);
                return Outcome::Drop;
            },
        };

        if !self.cidr.accepts(repr.dst_addr) {
            net_trace!("ip: not for us, dst={}", repr.dst_addr);
            return Outcome::Drop;
        }

        if !repr.src_addr.is_unicast() {
            net_trace!("ip: no answer possible to {}", repr.src_addr);
            return Outcome::Drop;
        }

        match repr.protocol {
            IpProtocol::Icmp | IpProtocol::Udp => (),
            _ => return Outcome::Drop,
        }

        let packet = ipv4_packet::new_unchecked_mut(packet);
        let outcome = upper.receive(&repr, packet.payload_mut_slice());
        if let Outcome::Reflect(len) = outcome {
            Ipv4Repr {
                src_addr: self.cidr.address(),
                dst_addr: repr.src_addr,
                protocol: repr.protocol,
                payload_len: len,
                hop_limit: self.hop_limit,
            }.emit(packet, self.checksum);
        }

        outcome.with_header(ipv4::HEADER_LEN)
    }

    /// Write the header of a new datagram from our address.
    ///
    /// Returns the payload part of the packet, exactly `payload_len` bytes.
    pub fn emit<'p>(&self, packet: &'p mut [u8], dst_addr: Ipv4Address, protocol: IpProtocol,
                    payload_len: usize) -> Result<&'p mut [u8]>
    {
        let len = ipv4::HEADER_LEN + payload_len;
        if packet.len() < len || len > usize::from(u16::max_value()) {
            return Err(Error::BadSize);
        }

        let packet = ipv4_packet::new_unchecked_mut(&mut packet[..len]);
        Ipv4Repr {
            src_addr: self.cidr.address(),
            dst_addr,
            protocol,
            payload_len,
            hop_limit: self.hop_limit,
        }.emit(packet, self.checksum);
        Ok(packet.payload_mut_slice())
    }
}
