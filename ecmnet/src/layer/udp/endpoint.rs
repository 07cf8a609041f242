use crate::layer::{Error, Outcome, Result};
use crate::wire::{udp, udp_packet, Checksum, Ipv4Repr, UdpRepr};

use super::Recv;

/// The port of all devices of the network, requests come from it and replies go to it.
pub const AUTOMATON_PORT: u16 = 65432;

/// The UDP state of an interface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Endpoint {
    /// The automaton port.
    port: u16,

    /// Whether to verify checksums.
    checksum: Checksum,
}

impl Endpoint {
    /// Create an endpoint serving some automaton port.
    pub fn new(port: u16) -> Self {
        Endpoint {
            port,
            checksum: Checksum::Manual,
        }
    }

    /// The automaton port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Change the checksum handling.
    pub fn set_checksum(&mut self, checksum: Checksum) {
        self.checksum = checksum;
    }

    /// Process one UDP datagram.
    ///
    /// The `payload` is the transport payload of the IPv4 datagram `ip`, extending to the end of
    /// the buffer.
    pub fn receive<R: Recv>(&self, ip: &Ipv4Repr, payload: &mut [u8], app: &mut R) -> Outcome {
        let packet = match udp_packet::new_checked_mut(payload) {
            Ok(packet) => packet,
            Err(_) => return Outcome::Drop,
        };

        if usize::from(packet.len()) > ip.payload_len {
            net_trace!("udp: length {} beyond datagram", packet.len());
            return Outcome::Drop;
        }

        let repr = match UdpRepr::parse(packet, ip.src_addr, ip.dst_addr, self.checksum) {
            Ok(repr) => repr,
            Err(_err) => {
                net_trace!("udp: rejected {:?}", _err);
                return Outcome::Drop;
            },
        };

        if repr.src_port == self.port {
            let data = packet.payload_mut_slice();
            let answer = match app.request(data, ip.src_addr, repr.dst_port, repr.payload_len) {
                Some(len) if len <= data.len() => len,
                Some(_len) => {
                    net_debug!("udp: answer of {} bytes does not fit", _len);
                    return Outcome::Drop;
                },
                None => return Outcome::Drop,
            };

            UdpRepr {
                src_port: repr.dst_port,
                dst_port: repr.src_port,
                payload_len: answer,
            }.emit(packet);
            Outcome::Reflect(udp::HEADER_LEN + answer)
        } else if repr.dst_port == self.port {
            let data = packet.payload_slice();
            app.reply(data, ip.src_addr, repr.src_port, repr.payload_len);
            Outcome::Drop
        } else {
            Outcome::Drop
        }
    }

    /// Write the header of a new datagram.
    ///
    /// Returns the payload part, exactly `payload_len` bytes.
    pub fn emit<'p>(&self, packet: &'p mut [u8], src_port: u16, dst_port: u16, payload_len: usize)
        -> Result<&'p mut [u8]>
    {
        let len = udp::HEADER_LEN + payload_len;
        if packet.len() < len || len > usize::from(u16::max_value()) {
            return Err(Error::BadSize);
        }

        let packet = udp_packet::new_unchecked_mut(&mut packet[..len]);
        UdpRepr {
            src_port,
            dst_port,
            payload_len,
        }.emit(packet);
        Ok(packet.payload_mut_slice())
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Endpoint::new(AUTOMATON_PORT)
    }
}
