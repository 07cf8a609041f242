//! User Datagram Protocol headers.
use core::fmt;
use byteorder::{ByteOrder, NetworkEndian};

use super::{Checksum, Error, IpProtocol, Ipv4Address, Result};
use super::ip::checksum;

byte_wrapper! {
    /// A byte sequence representing a UDP packet.
    #[derive(Debug, PartialEq, Eq)]
    pub struct udp([u8]);
}

mod field {
    #![allow(non_snake_case)]
    use crate::wire::field::Field;

    pub(crate) const SRC_PORT: Field = 0..2;
    pub(crate) const DST_PORT: Field = 2..4;
    pub(crate) const LENGTH:   Field = 4..6;
    pub(crate) const CHECKSUM: Field = 6..8;

    pub(crate) fn PAYLOAD(length: u16) -> Field {
        CHECKSUM.end..(length as usize)
    }
}

/// The length of a UDP header.
pub const HEADER_LEN: usize = field::CHECKSUM.end;

impl udp {
    /// Imbue a raw octet buffer with UDP packet structure.
    pub fn new_unchecked(data: &[u8]) -> &Self {
        Self::__from_macro_new_unchecked(data)
    }

    /// Imbue a mutable octet buffer with UDP packet structure.
    pub fn new_unchecked_mut(data: &mut [u8]) -> &mut Self {
        Self::__from_macro_new_unchecked_mut(data)
    }

    /// Shorthand for a combination of [new_unchecked] and [check_len].
    ///
    /// [new_unchecked]: #method.new_unchecked
    /// [check_len]: #method.check_len
    pub fn new_checked(data: &[u8]) -> Result<&Self> {
        Self::new_unchecked(data).check_len()?;
        Ok(Self::new_unchecked(data))
    }

    /// Mutable version of [new_checked].
    ///
    /// [new_checked]: #method.new_checked
    pub fn new_checked_mut(data: &mut [u8]) -> Result<&mut Self> {
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
    /// Returns `Err(Error::Malformed)` if the length field has a value smaller
    /// than the header length.
    ///
    /// The result of this check is invalidated by calling [set_len].
    ///
    /// [set_len]: #method.set_len
    pub fn check_len(&self) -> Result<()> {
        let buffer_len = self.0.len();
        if buffer_len < field::CHECKSUM.end {
            Err(Error::Truncated)
        } else {
            let field_len = self.len() as usize;
            if buffer_len < field_len {
                Err(Error::Truncated)
            } else if field_len < field::CHECKSUM.end {
                Err(Error::Malformed)
            } else {
                Ok(())
            }
        }
    }

    /// Return the source port field.
    #[inline]
    pub fn src_port(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::SRC_PORT])
    }

    /// Return the destination port field.
    #[inline]
    pub fn dst_port(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::DST_PORT])
    }

    /// Return the length field.
    #[inline]
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::LENGTH])
    }

    /// Return the checksum field.
    #[inline]
    pub fn checksum(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::CHECKSUM])
    }

    /// Set the source port field.
    #[inline]
    pub fn set_src_port(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::SRC_PORT], value)
    }

    /// Set the destination port field.
    #[inline]
    pub fn set_dst_port(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::DST_PORT], value)
    }

    /// Set the length field.
    #[inline]
    pub fn set_len(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::LENGTH], value)
    }

    /// Set the checksum field.
    #[inline]
    pub fn set_checksum(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::CHECKSUM], value)
    }

    /// Compute and fill in the checksum with the IPv4 pseudo header.
    pub fn fill_checksum(&mut self, src_addr: Ipv4Address, dst_addr: Ipv4Address) {
        self.set_checksum(0);
        let checksum = {
            !checksum::combine(&[
                checksum::pseudo_header(src_addr, dst_addr, IpProtocol::Udp, self.len()),
                checksum::data(&self.0[..self.len() as usize])
            ])
        };
        // UDP checksum value of 0 means no checksum; if the checksum really is zero,
        // use all-ones, which indicates that the remote end must verify the checksum.
        // Arithmetically, RFC 1071 checksums of all-zeroes and all-ones behave identically,
        // so no action is necessary on the remote end.
        self.set_checksum(if checksum == 0 { 0xffff } else { checksum })
    }

    /// Validate the packet checksum.
    ///
    /// A zero checksum field means the sender did not compute one, which always verifies.
    pub fn verify_checksum(&self, src_addr: Ipv4Address, dst_addr: Ipv4Address) -> bool {
        if self.checksum() == 0 {
            return true
        }

        checksum::combine(&[
            checksum::pseudo_header(src_addr, dst_addr, IpProtocol::Udp, self.len()),
            checksum::data(&self.0[..self.len() as usize])
        ]) == !0
    }

    /// Return the payload, limited by the length field.
    pub fn payload_slice(&self) -> &[u8] {
        let len = self.len();
        &self.0[field::PAYLOAD(len)]
    }

    /// Return everything behind the header as a mutable slice.
    ///
    /// Not limited by the length field so that a reply may be longer than its request.
    pub fn payload_mut_slice(&mut self) -> &mut [u8] {
        &mut self.0[field::CHECKSUM.end..]
    }
}

impl AsRef<[u8]> for udp {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl AsMut<[u8]> for udp {
    fn as_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

/// A high-level representation of a User Datagram Protocol header.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Repr {
    /// The source port.
    pub src_port: u16,
    /// The destination port.
    pub dst_port: u16,
    /// The length of the payload, without header.
    pub payload_len: usize,
}

impl Repr {
    /// Parse a User Datagram Protocol packet and return a high-level representation.
    pub fn parse(packet: &udp, src_addr: Ipv4Address, dst_addr: Ipv4Address, checksum: Checksum)
        -> Result<Repr>
    {
        packet.check_len()?;
        if checksum == Checksum::Manual && !packet.verify_checksum(src_addr, dst_addr) {
            return Err(Error::WrongChecksum)
        }

        Ok(Repr {
            src_port: packet.src_port(),
            dst_port: packet.dst_port(),
            payload_len: packet.len() as usize - HEADER_LEN,
        })
    }

    /// Return the length of the header that will be emitted from this high-level representation.
    pub fn header_len(&self) -> usize {
        HEADER_LEN
    }

    /// Emit the header of a high-level representation.
    ///
    /// The checksum is left zero, an ECM link is short enough that the Ethernet frame check
    /// sequence of the host covers it.
    pub fn emit(&self, packet: &mut udp) {
        packet.set_src_port(self.src_port);
        packet.set_dst_port(self.dst_port);
        packet.set_len((HEADER_LEN + self.payload_len) as u16);
        packet.set_checksum(0);
    }
}

impl fmt::Display for Repr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "UDP src={} dst={} len={}",
               self.src_port, self.dst_port, self.payload_len)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const SRC_ADDR: Ipv4Address = Ipv4Address([192, 168, 1, 1]);
    const DST_ADDR: Ipv4Address = Ipv4Address([192, 168, 1, 2]);

    static PACKET_BYTES: [u8; 12] =
        [0xbf, 0x00, 0x00, 0x35,
         0x00, 0x0c, 0x12, 0x4d,
         0xaa, 0x00, 0x00, 0xff];

    static PAYLOAD_BYTES: [u8; 4] =
        [0xaa, 0x00, 0x00, 0xff];

    #[test]
    fn test_deconstruct() {
        let packet = udp::new_unchecked(&PACKET_BYTES[..]);
        assert_eq!(packet.src_port(), 48896);
        assert_eq!(packet.dst_port(), 53);
        assert_eq!(packet.len(), 12);
        assert_eq!(packet.checksum(), 0x124d);
        assert_eq!(packet.payload_slice(), &PAYLOAD_BYTES[..]);
        assert_eq!(packet.verify_checksum(SRC_ADDR, DST_ADDR), true);
    }

    #[test]
    fn test_construct() {
        let mut bytes = vec![0xa5; 12];
        let packet = udp::new_unchecked_mut(&mut bytes);
        packet.set_src_port(48896);
        packet.set_dst_port(53);
        packet.set_len(12);
        packet.set_checksum(0xffff);
        packet.payload_mut_slice().copy_from_slice(&PAYLOAD_BYTES[..]);
        packet.fill_checksum(SRC_ADDR, DST_ADDR);
        assert_eq!(packet.as_bytes(), &PACKET_BYTES[..]);
    }

    #[test]
    fn test_impossible_len() {
        let mut bytes = vec![0; 12];
        let packet = udp::new_unchecked_mut(&mut bytes);
        packet.set_len(4);
        assert_eq!(udp::new_checked(&bytes), Err(Error::Malformed));

        let mut bytes = vec![0; 12];
        udp::new_unchecked_mut(&mut bytes).set_len(13);
        assert_eq!(udp::new_checked(&bytes), Err(Error::Truncated));
    }

    #[test]
    fn test_zero_checksum_verifies() {
        let mut bytes = PACKET_BYTES;
        bytes[6] = 0;
        bytes[7] = 0;
        let packet = udp::new_unchecked(&bytes[..]);
        let repr = Repr::parse(packet, SRC_ADDR, DST_ADDR, Checksum::Manual).unwrap();
        assert_eq!(repr, Repr { src_port: 48896, dst_port: 53, payload_len: 4 });
    }

    #[test]
    fn test_emit() {
        let repr = Repr { src_port: 65432, dst_port: 123, payload_len: 48 };
        let mut bytes = vec![0xa5; 56];
        repr.emit(udp::new_unchecked_mut(&mut bytes));
        assert_eq!(&bytes[..8], &[0xff, 0x98, 0x00, 0x7b, 0x00, 0x38, 0x00, 0x00]);
    }
}
