use crate::layer::{Error, Outcome, Result};
use crate::wire::{arp, arp_packet, ArpOperation, ArpRepr};
use crate::wire::{EthernetAddress, Ipv4Address, Ipv4Cidr};

use super::NeighborCache;

/// The ARP state of an interface.
pub struct Endpoint<'a> {
    /// Our own hardware address, the answer to every request for our protocol address.
    hardware_addr: EthernetAddress,

    /// Learned addresses of neighbors, also holds our own protocol address and subnet.
    neighbors: NeighborCache<'a>,
}

impl<'a> Endpoint<'a> {
    /// Create an endpoint answering for the address of the neighbor cache.
    pub fn new(hardware_addr: EthernetAddress, neighbors: NeighborCache<'a>) -> Self {
        Endpoint {
            hardware_addr,
            neighbors,
        }
    }

    /// The own protocol address and subnet.
    pub fn cidr(&self) -> Ipv4Cidr {
        self.neighbors.cidr()
    }

    /// The neighbor cache.
    pub fn neighbors(&self) -> &NeighborCache<'a> {
        &self.neighbors
    }

    /// The neighbor cache, mutably.
    pub fn neighbors_mut(&mut self) -> &mut NeighborCache<'a> {
        &mut self.neighbors
    }

    /// Process one ARP packet, the payload of an Ethernet frame.
    ///
    /// A request for our address is rewritten into the reply. A reply from a neighbor on the link
    /// is remembered. Everything else is dropped silently.
    pub fn receive(&mut self, packet: &mut [u8]) -> Outcome {
        let packet = match arp_packet::new_checked_mut(packet) {
            Ok(packet) => packet,
            Err(_) => return Outcome::Drop,
        };

        let repr = match ArpRepr::parse(packet) {
            Ok(repr) => repr,
            Err(_err) => {
                net_trace!("arp: rejected {:?}", _err);
                return Outcome::Drop;
            },
        };

        let cidr = self.cidr();
        if repr.target_protocol_addr != cidr.address() {
            return Outcome::Drop;
        }

        match repr.operation {
            ArpOperation::Request => {
                net_trace!("arp: answering {}", repr.source_protocol_addr);
                ArpRepr {
                    operation: ArpOperation::Reply,
                    source_hardware_addr: self.hardware_addr,
                    source_protocol_addr: cidr.address(),
                    target_hardware_addr: repr.source_hardware_addr,
                    target_protocol_addr: repr.source_protocol_addr,
                }.emit(packet);
                Outcome::Reflect(arp::PACKET_LEN)
            },
            ArpOperation::Reply if cidr.contains_addr(repr.source_protocol_addr) => {
                let filled = self.neighbors.fill(
                    repr.source_protocol_addr,
                    repr.source_hardware_addr);
                if let Err(_err) = filled {
                    net_debug!("arp: not cached {}: {:?}", repr.source_protocol_addr, _err);
                }
                Outcome::Drop
            },
            _ => Outcome::Drop,
        }
    }

    /// Write a request for the hardware address of a neighbor.
    ///
    /// Returns the length of the ARP packet.
    pub fn emit_request(&self, packet: &mut [u8], target: Ipv4Address) -> Result<usize> {
        if packet.len() < arp::PACKET_LEN {
            return Err(Error::BadSize);
        }

        let packet = arp_packet::new_unchecked_mut(packet);
        ArpRepr {
            operation: ArpOperation::Request,
            source_hardware_addr: self.hardware_addr,
            source_protocol_addr: self.cidr().address(),
            target_hardware_addr: EthernetAddress::default(),
            target_protocol_addr: target,
        }.emit(packet);
        Ok(arp::PACKET_LEN)
    }
}
