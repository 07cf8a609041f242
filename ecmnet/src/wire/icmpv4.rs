//! Internet Control Message Protocol messages, as far as echo is concerned.
use core::fmt;
use byteorder::{ByteOrder, NetworkEndian};

use super::{Checksum, Error, Result};
use super::ip::checksum;

enum_with_unknown! {
    /// Internet protocol control message type.
    pub enum Message(u8) {
        /// Echo reply
        EchoReply      =  0,
        /// Destination unreachable
        DstUnreachable =  3,
        /// Echo request
        EchoRequest    =  8,
        /// Time exceeded
        TimeExceeded   = 11,
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Message::EchoReply      => write!(f, "echo reply"),
            Message::DstUnreachable => write!(f, "destination unreachable"),
            Message::EchoRequest    => write!(f, "echo request"),
            Message::TimeExceeded   => write!(f, "time exceeded"),
            Message::Unknown(id)    => write!(f, "{}", id)
        }
    }
}

byte_wrapper! {
    /// A byte sequence representing an ICMPv4 packet.
    #[derive(Debug, PartialEq, Eq)]
    pub struct icmpv4([u8]);
}

mod field {
    use crate::wire::field::*;

    pub(crate) const TYPE:       usize = 0;
    pub(crate) const CODE:       usize = 1;
    pub(crate) const CHECKSUM:   Field = 2..4;

    pub(crate) const ECHO_IDENT: Field = 4..6;
    pub(crate) const ECHO_SEQNO: Field = 6..8;

    pub(crate) const HEADER_END: usize = 8;
    pub(crate) const PAYLOAD:    Rest  = HEADER_END..;
}

impl icmpv4 {
    /// Imbue a raw octet buffer with ICMPv4 packet structure.
    pub fn new_unchecked(buffer: &[u8]) -> &icmpv4 {
        Self::__from_macro_new_unchecked(buffer)
    }

    /// Imbue a mutable octet buffer with ICMPv4 packet structure.
    pub fn new_unchecked_mut(buffer: &mut [u8]) -> &mut icmpv4 {
        Self::__from_macro_new_unchecked_mut(buffer)
    }

    /// Shorthand for a combination of [new_unchecked] and [check_len].
    ///
    /// [new_unchecked]: #method.new_unchecked
    /// [check_len]: #method.check_len
    pub fn new_checked(data: &[u8]) -> Result<&icmpv4> {
        let packet = Self::new_unchecked(data);
        packet.check_len()?;
        Ok(packet)
    }

    /// Mutable version of [new_checked].
    ///
    /// [new_checked]: #method.new_checked
    pub fn new_checked_mut(data: &mut [u8]) -> Result<&mut icmpv4> {
        Self::new_checked(&data[..])?;
        Ok(Self::new_unchecked_mut(data))
    }

    /// Unwrap the packet as a raw byte slice.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Unwrap the packet as a mutable raw byte slice.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }

    /// Ensure that no accessor method will panic if called.
    /// Returns `Err(Error::Truncated)` if the buffer is too short.
    pub fn check_len(&self) -> Result<()> {
        if self.0.len() < field::HEADER_END {
            Err(Error::Truncated)
        } else {
            Ok(())
        }
    }

    /// Return the message type field.
    #[inline]
    pub fn msg_type(&self) -> Message {
        Message::from(self.0[field::TYPE])
    }

    /// Return the message code field.
    #[inline]
    pub fn msg_code(&self) -> u8 {
        self.0[field::CODE]
    }

    /// Return the checksum field.
    #[inline]
    pub fn checksum(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::CHECKSUM])
    }

    /// Return the identifier field (for echo request and reply packets).
    #[inline]
    pub fn echo_ident(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::ECHO_IDENT])
    }

    /// Return the sequence number field (for echo request and reply packets).
    #[inline]
    pub fn echo_seq_no(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::ECHO_SEQNO])
    }

    /// Validate the checksum over the whole buffer.
    pub fn verify_checksum(&self) -> bool {
        checksum::data(&self.0) == !0
    }

    /// Set the message type field.
    #[inline]
    pub fn set_msg_type(&mut self, value: Message) {
        self.0[field::TYPE] = value.into()
    }

    /// Set the message code field.
    #[inline]
    pub fn set_msg_code(&mut self, value: u8) {
        self.0[field::CODE] = value
    }

    /// Set the checksum field.
    #[inline]
    pub fn set_checksum(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::CHECKSUM], value)
    }

    /// Set the identifier field (for echo request and reply packets).
    #[inline]
    pub fn set_echo_ident(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::ECHO_IDENT], value)
    }

    /// Set the sequence number field (for echo request and reply packets).
    #[inline]
    pub fn set_echo_seq_no(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::ECHO_SEQNO], value)
    }

    /// Compute and fill in the checksum over the whole buffer.
    pub fn fill_checksum(&mut self) {
        self.set_checksum(0);
        let checksum = !checksum::data(&self.0);
        self.set_checksum(checksum)
    }

    /// Return the payload behind the echo header.
    pub fn payload_slice(&self) -> &[u8] {
        &self.0[field::PAYLOAD]
    }

    /// Return the payload behind the echo header as a mutable slice.
    pub fn payload_mut_slice(&mut self) -> &mut [u8] {
        &mut self.0[field::PAYLOAD]
    }
}

impl AsRef<[u8]> for icmpv4 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl AsMut<[u8]> for icmpv4 {
    fn as_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

/// A high-level representation of the supported ICMPv4 messages.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Repr {
    /// A ping.
    EchoRequest {
        /// Identifier chosen by the sender.
        ident:  u16,
        /// Sequence number chosen by the sender.
        seq_no: u16,
        /// Length of the echoed data.
        payload: usize,
    },
    /// The answer to a ping.
    EchoReply {
        /// Identifier copied from the request.
        ident:  u16,
        /// Sequence number copied from the request.
        seq_no: u16,
        /// Length of the echoed data.
        payload: usize,
    },
}

impl Repr {
    /// Get the echo reply request if this is an echo request.
    pub fn echo_reply(self) -> Option<Repr> {
        match self {
            Repr::EchoRequest { ident, seq_no, payload, } =>
                Some(Repr::EchoReply { ident, seq_no, payload, }),
            _ => None,
        }
    }

    /// Parse an Internet Control Message Protocol version 4 packet and return
    /// a high-level representation.
    pub fn parse(packet: &icmpv4, checksum: Checksum) -> Result<Repr> {
        packet.check_len()?;
        // Valid checksum is expected.
        if checksum == Checksum::Manual && !packet.verify_checksum() {
            return Err(Error::WrongChecksum)
        }

        match (packet.msg_type(), packet.msg_code()) {
            (Message::EchoRequest, 0) => {
                Ok(Repr::EchoRequest {
                    ident:  packet.echo_ident(),
                    seq_no: packet.echo_seq_no(),
                    payload: packet.payload_slice().len(),
                })
            },

            (Message::EchoReply, 0) => {
                Ok(Repr::EchoReply {
                    ident:  packet.echo_ident(),
                    seq_no: packet.echo_seq_no(),
                    payload: packet.payload_slice().len(),
                })
            },

            // Unknown types are not as specified in the standard and iana registry.
            (Message::Unknown(_), _) => Err(Error::Unrecognized),
            _ => Err(Error::Unsupported),
        }
    }

    /// Return the length of a packet that will be emitted from this high-level representation.
    pub fn buffer_len(&self) -> usize {
        match self {
            Repr::EchoRequest { payload, .. } |
            Repr::EchoReply { payload, .. } => {
                field::HEADER_END + payload
            },
        }
    }

    /// Emit the header of a high-level representation.
    ///
    /// The checksum covers the payload so it must be filled in after the payload was written.
    pub fn emit(&self, packet: &mut icmpv4) {
        let (msg_type, ident, seq_no) = match *self {
            Repr::EchoRequest { ident, seq_no, .. } => (Message::EchoRequest, ident, seq_no),
            Repr::EchoReply { ident, seq_no, .. } => (Message::EchoReply, ident, seq_no),
        };
        packet.set_msg_type(msg_type);
        packet.set_msg_code(0);
        packet.set_echo_ident(ident);
        packet.set_echo_seq_no(seq_no);
        packet.set_checksum(0);
    }
}

impl fmt::Display for Repr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            &Repr::EchoRequest { ident, seq_no, payload } =>
                write!(f, "ICMPv4 echo request id={} seq={} len={}",
                       ident, seq_no, payload),
            &Repr::EchoReply { ident, seq_no, payload } =>
                write!(f, "ICMPv4 echo reply id={} seq={} len={}",
                       ident, seq_no, payload),
        }
    }
}
