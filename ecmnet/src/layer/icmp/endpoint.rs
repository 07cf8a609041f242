use crate::layer::Outcome;
use crate::wire::{icmpv4_packet, Checksum, Icmpv4Message};
use crate::wire::icmpv4::Repr;
use crate::wire::ip::checksum;

/// The ICMP state of an interface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Endpoint {
    /// Stay silent on pings.
    deny_echo: bool,

    /// Whether to verify checksums of requests.
    checksum: Checksum,
}

/// The change of the type and code word when turning a request into a reply.
const ECHO_TYPE_DELTA: u16 = 0x0800;

impl Endpoint {
    /// Create an endpoint that answers pings.
    pub fn new() -> Self {
        Endpoint {
            deny_echo: false,
            checksum: Checksum::Manual,
        }
    }

    /// Query whether pings are ignored.
    pub fn deny_echo(&self) -> bool {
        self.deny_echo
    }

    /// Choose whether to ignore pings.
    pub fn set_deny_echo(&mut self, deny_echo: bool) {
        self.deny_echo = deny_echo;
    }

    /// Change the checksum handling.
    pub fn set_checksum(&mut self, checksum: Checksum) {
        self.checksum = checksum;
    }

    /// Process one ICMP message, exactly the payload of a datagram.
    pub fn receive(&self, packet: &mut [u8]) -> Outcome {
        let packet = match icmpv4_packet::new_checked_mut(packet) {
            Ok(packet) => packet,
            Err(_) => return Outcome::Drop,
        };

        let repr = match Repr::parse(packet, self.checksum) {
            Ok(repr) => repr,
            Err(_err) => {
                net_trace!("icmp: rejected {:?}", _err);
                return Outcome::Drop;
            },
        };

        match repr {
            Repr::EchoRequest { .. } if !self.deny_echo => (),
            _ => return Outcome::Drop,
        }

        net_trace!("icmp: {}", repr);
        let len = packet.as_bytes().len();
        packet.set_msg_type(Icmpv4Message::EchoReply);
        let sum = checksum::add_with_carry(packet.checksum(), ECHO_TYPE_DELTA);
        packet.set_checksum(sum);
        Outcome::Reflect(len)
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Endpoint::new()
    }
}
