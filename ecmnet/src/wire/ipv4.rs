//! IPv4 addresses, subnets and packet headers.
use core::{fmt, str::FromStr};
use byteorder::{ByteOrder, NetworkEndian};

use super::{Checksum, Error, IpProtocol as Protocol, Result};
use super::ip::checksum;

/// The default time to live of emitted packets.
pub const DEFAULT_HOP_LIMIT: u8 = 64;

/// The length of a header without options, the only kind this crate accepts.
pub const HEADER_LEN: usize = field::DST_ADDR.end;

/// A four-octet IPv4 address.
#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Default)]
pub struct Address(pub [u8; 4]);

impl Address {
    /// An unspecified address.
    pub const UNSPECIFIED: Address = Address([0x00; 4]);

    /// The broadcast address.
    pub const BROADCAST:   Address = Address([0xff; 4]);

    /// Construct an IPv4 address from parts.
    pub const fn new(a0: u8, a1: u8, a2: u8, a3: u8) -> Address {
        Address([a0, a1, a2, a3])
    }

    /// Construct an IPv4 address from a sequence of octets, in big-endian.
    ///
    /// # Panics
    /// The function panics if `data` is not four octets long.
    pub fn from_bytes(data: &[u8]) -> Address {
        let mut bytes = [0; 4];
        bytes.copy_from_slice(data);
        Address(bytes)
    }

    /// Return an IPv4 address as a sequence of octets, in big-endian.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Encode the address into a `u32` in network endian byte order.
    pub fn to_network_integer(self) -> u32 {
        u32::from_be_bytes(self.0)
    }

    /// Decode a network endian `u32` into an address.
    pub fn from_network_integer(num: u32) -> Self {
        Address(num.to_be_bytes())
    }

    /// Query whether the address is an unicast address.
    pub fn is_unicast(&self) -> bool {
        !(self.is_broadcast() ||
          self.is_multicast() ||
          self.is_unspecified())
    }

    /// Query whether the address is the limited broadcast address.
    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }

    /// Query whether the address is a multicast address.
    pub fn is_multicast(&self) -> bool {
        self.0[0] & 0xf0 == 224
    }

    /// Query whether the address falls into the "unspecified" range.
    pub fn is_unspecified(&self) -> bool {
        self.0[0] == 0
    }

    /// Mask the address to some prefix length.
    ///
    /// ```rust
    /// # use ecmnet::wire::Ipv4Address as Address;
    /// let base = Address([192, 168, 200, 40]);
    /// assert_eq!(base.mask(24), Address([192, 168, 200, 0]));
    /// ```
    ///
    /// # Panics
    /// This function panics if `prefix` is greater than 32.
    pub fn mask(&self, prefix: u8) -> Address {
        assert!(prefix <= 32);
        let masked_off = (!0u32)
            .checked_shr(prefix.into())
            .unwrap_or(0);
        let as_int = self.to_network_integer() & !masked_off;
        Address::from_network_integer(as_int)
    }
}

#[cfg(feature = "std")]
impl From<::std::net::Ipv4Addr> for Address {
    fn from(x: ::std::net::Ipv4Addr) -> Address {
        Address(x.octets())
    }
}

#[cfg(feature = "std")]
impl From<Address> for ::std::net::Ipv4Addr {
    fn from(Address(x): Address) -> ::std::net::Ipv4Addr {
        x.into()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let bytes = self.0;
        write!(f, "{}.{}.{}.{}", bytes[0], bytes[1], bytes[2], bytes[3])
    }
}

/// Error emitted when parsing an IPv4 address or CIDR specifier fails.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseCidrError {
    kind: ParseCidrErrorKind,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ParseCidrErrorKind {
    NoSubnet,
    AddrParseError,
    InvalidPrefix,
}

impl fmt::Display for ParseCidrError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self.kind {
            ParseCidrErrorKind::NoSubnet => "missing subnet prefix separator",
            ParseCidrErrorKind::AddrParseError => "invalid address",
            ParseCidrErrorKind::InvalidPrefix => "invalid cidr prefix",
        })
    }
}

impl FromStr for Address {
    type Err = ParseCidrError;

    fn from_str(src: &str) -> core::result::Result<Self, ParseCidrError> {
        let invalid = ParseCidrError { kind: ParseCidrErrorKind::AddrParseError };
        let mut parsed = [0; 4];
        let mut components = src.split('.');
        for octet in parsed.iter_mut() {
            let part = components.next().ok_or_else(|| invalid.clone())?;
            *octet = part.parse().map_err(|_| invalid.clone())?;
        }

        match components.next() {
            Some(_) => Err(invalid),
            None => Ok(Address(parsed)),
        }
    }
}

/// An IPv4 CIDR host: an address and a variable-length subnet masking prefix length.
///
/// This is the configuration of the interface: the own address together with the subnet that is
/// reachable on the link without a router.
#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Default)]
pub struct Cidr {
    address:    Address,
    prefix_len: u8,
}

impl Cidr {
    /// Create an IPv4 CIDR block from the given address and prefix length.
    ///
    /// # Panics
    /// This function panics if the prefix length is larger than 32.
    pub const fn new(address: Address, prefix_len: u8) -> Cidr {
        assert!(prefix_len <= 32);
        Cidr { address, prefix_len }
    }

    /// Create an IPv4 CIDR block from the given address and network mask.
    pub fn from_netmask(addr: Address, netmask: Address) -> Option<Cidr> {
        let netmask = netmask.to_network_integer();
        if netmask.leading_zeros() == 0 && netmask.trailing_zeros() == netmask.count_zeros() {
            Some(Cidr { address: addr, prefix_len: netmask.count_ones() as u8 })
        } else {
            None
        }
    }

    /// Return the address of this IPv4 CIDR block.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Return the prefix length of this IPv4 CIDR block.
    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Return the network mask of this IPv4 CIDR.
    pub fn netmask(&self) -> Address {
        Address::BROADCAST.mask(self.prefix_len)
    }

    /// Determines if the subnet contains a reserved network and broadcast address.
    ///
    /// This is the case if the prefix is shorter than 31 bits according to
    /// [RFC3021](https://tools.ietf.org/html/rfc3021).
    pub fn has_network_and_broadcast(&self) -> bool {
        self.prefix_len < 31
    }

    /// Return the directed broadcast address of this subnet.
    ///
    /// This is the address with all host bits set, `address | !netmask`.
    pub fn broadcast(&self) -> Option<Address> {
        if !self.has_network_and_broadcast() {
            return None;
        }

        let netaddr = self.address.to_network_integer();
        let netmask = self.netmask().to_network_integer();
        Some(Address::from_network_integer(netaddr | !netmask))
    }

    /// Query whether an address lies in the same subnet, that is on the link.
    pub fn contains_addr(&self, address: Address) -> bool {
        self.address.mask(self.prefix_len) == address.mask(self.prefix_len)
    }

    /// The host part of an address, all bits not covered by the prefix.
    pub fn host_part(&self, address: Address) -> u32 {
        address.to_network_integer() & !self.netmask().to_network_integer()
    }

    /// Whether to accept a packet directed at some address.
    ///
    /// These are the own address, the directed broadcast of the subnet and the limited
    /// broadcast.
    pub fn accepts(&self, address: Address) -> bool {
        let broadcast = self.broadcast()
            .map(|broadcast| broadcast == address)
            .unwrap_or(false);
        self.address == address || broadcast || address.is_broadcast()
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix_len)
    }
}

impl FromStr for Cidr {
    type Err = ParseCidrError;

    fn from_str(src :&str) -> core::result::Result<Self, ParseCidrError> {
        let subnet = src.find('/')
            .ok_or(ParseCidrError {
                kind: ParseCidrErrorKind::NoSubnet,
            })?;
        let address: Address = src[..subnet].parse()?;
        let prefix_len = src[subnet+1..]
            .parse()
            .ok()
            .filter(|&prefix| prefix <= 32)
            .ok_or(ParseCidrError {
                kind: ParseCidrErrorKind::InvalidPrefix,
            })?;
        Ok(Cidr { address, prefix_len })
    }
}

byte_wrapper! {
    /// A byte sequence representing an IPv4 packet.
    #[derive(Debug, PartialEq, Eq)]
    pub struct ipv4([u8]);
}

mod field {
    use crate::wire::field::Field;

    pub(crate) const VER_IHL:  usize = 0;
    pub(crate) const DSCP_ECN: usize = 1;
    pub(crate) const LENGTH:   Field = 2..4;
    pub(crate) const IDENT:    Field = 4..6;
    pub(crate) const FLG_OFF:  Field = 6..8;
    pub(crate) const TTL:      usize = 8;
    pub(crate) const PROTOCOL: usize = 9;
    pub(crate) const CHECKSUM: Field = 10..12;
    pub(crate) const SRC_ADDR: Field = 12..16;
    pub(crate) const DST_ADDR: Field = 16..20;
}

impl ipv4 {
    /// Imbue a raw octet buffer with IPv4 packet structure.
    pub fn new_unchecked(buffer: &[u8]) -> &ipv4 {
        Self::__from_macro_new_unchecked(buffer)
    }

    /// Imbue a mutable octet buffer with IPv4 packet structure.
    pub fn new_unchecked_mut(buffer: &mut [u8]) -> &mut ipv4 {
        Self::__from_macro_new_unchecked_mut(buffer)
    }

    /// Shorthand for a combination of [new_unchecked] and [check_len].
    ///
    /// [new_unchecked]: #method.new_unchecked
    /// [check_len]: #method.check_len
    pub fn new_checked(data: &[u8]) -> Result<&ipv4> {
        let packet = Self::new_unchecked(data);
        packet.check_len()?;
        Ok(packet)
    }

    /// View the packet as a raw byte slice.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// View the packet as a mutable raw byte slice.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }

    /// Ensure that no accessor method will panic if called.
    /// Returns `Err(Error::Truncated)` if the buffer is shorter than the total length.
    /// Returns `Err(Error::Malformed)` if the header length is greater
    /// than total length.
    ///
    /// Trailing bytes past the total length, such as Ethernet padding, are allowed.
    pub fn check_len(&self) -> Result<()> {
        let len = self.0.len();
        if len < field::DST_ADDR.end {
            Err(Error::Truncated)
        } else if len < self.header_len() as usize {
            Err(Error::Truncated)
        } else if u16::from(self.header_len()) > self.total_len() {
            Err(Error::Malformed)
        } else if len < self.total_len() as usize {
            Err(Error::Truncated)
        } else {
            Ok(())
        }
    }

    /// Return the version field.
    #[inline]
    pub fn version(&self) -> u8 {
        self.0[field::VER_IHL] >> 4
    }

    /// Return the header length, in octets.
    #[inline]
    pub fn header_len(&self) -> u8 {
        (self.0[field::VER_IHL] & 0x0f) * 4
    }

    /// Return the Differential Services Code Point field.
    pub fn dscp(&self) -> u8 {
        self.0[field::DSCP_ECN] >> 2
    }

    /// Return the total length field.
    #[inline]
    pub fn total_len(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::LENGTH])
    }

    /// Return the fragment identification field.
    #[inline]
    pub fn ident(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::IDENT])
    }

    /// Return the "don't fragment" flag.
    #[inline]
    pub fn dont_frag(&self) -> bool {
        NetworkEndian::read_u16(&self.0[field::FLG_OFF]) & 0x4000 != 0
    }

    /// Return the "more fragments" flag.
    #[inline]
    pub fn more_frags(&self) -> bool {
        NetworkEndian::read_u16(&self.0[field::FLG_OFF]) & 0x2000 != 0
    }

    /// Return the fragment offset, in octets.
    #[inline]
    pub fn frag_offset(&self) -> u16 {
        (NetworkEndian::read_u16(&self.0[field::FLG_OFF]) & 0x1fff) << 3
    }

    /// Query whether the packet is one piece of a fragmented datagram.
    ///
    /// The "don't fragment" flag is allowed, everything else in the flags and offset word must
    /// be zero.
    pub fn is_fragment(&self) -> bool {
        NetworkEndian::read_u16(&self.0[field::FLG_OFF]) & 0x3fff != 0
    }

    /// Return the time to live field.
    #[inline]
    pub fn hop_limit(&self) -> u8 {
        self.0[field::TTL]
    }

    /// Return the protocol field.
    #[inline]
    pub fn protocol(&self) -> Protocol {
        Protocol::from(self.0[field::PROTOCOL])
    }

    /// Return the header checksum field.
    #[inline]
    pub fn checksum(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::CHECKSUM])
    }

    /// Return the source address field.
    #[inline]
    pub fn src_addr(&self) -> Address {
        Address::from_bytes(&self.0[field::SRC_ADDR])
    }

    /// Return the destination address field.
    #[inline]
    pub fn dst_addr(&self) -> Address {
        Address::from_bytes(&self.0[field::DST_ADDR])
    }

    /// Validate the header checksum.
    pub fn verify_checksum(&self) -> bool {
        checksum::data(&self.0[..self.header_len() as usize]) == !0
    }

    /// Set the version and header length byte.
    #[inline]
    pub fn set_version_and_header_len(&mut self, version: u8, header_len: u8) {
        self.0[field::VER_IHL] = (version << 4) | ((header_len / 4) & 0x0f);
    }

    /// Set the whole type of service byte.
    #[inline]
    pub fn set_dscp_ecn(&mut self, value: u8) {
        self.0[field::DSCP_ECN] = value
    }

    /// Set the total length field.
    #[inline]
    pub fn set_total_len(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::LENGTH], value)
    }

    /// Set the fragment identification field.
    #[inline]
    pub fn set_ident(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::IDENT], value)
    }

    /// Set the flags and offset word to an unfragmented datagram.
    #[inline]
    pub fn set_unfragmented(&mut self, dont_frag: bool) {
        let raw = if dont_frag { 0x4000 } else { 0 };
        NetworkEndian::write_u16(&mut self.0[field::FLG_OFF], raw);
    }

    /// Set the time to live field.
    #[inline]
    pub fn set_hop_limit(&mut self, value: u8) {
        self.0[field::TTL] = value
    }

    /// Set the protocol field.
    #[inline]
    pub fn set_protocol(&mut self, value: Protocol) {
        self.0[field::PROTOCOL] = value.into()
    }

    /// Set the header checksum field.
    #[inline]
    pub fn set_checksum(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::CHECKSUM], value)
    }

    /// Set the source address field.
    #[inline]
    pub fn set_src_addr(&mut self, value: Address) {
        self.0[field::SRC_ADDR].copy_from_slice(value.as_bytes())
    }

    /// Set the destination address field.
    #[inline]
    pub fn set_dst_addr(&mut self, value: Address) {
        self.0[field::DST_ADDR].copy_from_slice(value.as_bytes())
    }

    /// Compute and fill in the header checksum.
    pub fn fill_checksum(&mut self) {
        self.set_checksum(0);
        let checksum = !checksum::data(&self.0[..self.header_len() as usize]);
        self.set_checksum(checksum)
    }

    /// Return the payload, limited by the total length field.
    pub fn payload_slice(&self) -> &[u8] {
        let range = self.header_len() as usize..self.total_len() as usize;
        &self.0[range]
    }

    /// Return everything behind the header as a mutable byte slice.
    ///
    /// This is not limited by the total length so that replies can be written past the end of
    /// the datagram they answer.
    pub fn payload_mut_slice(&mut self) -> &mut [u8] {
        let start = self.header_len() as usize;
        &mut self.0[start..]
    }
}

impl AsRef<[u8]> for ipv4 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl AsMut<[u8]> for ipv4 {
    fn as_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

/// A high-level representation of an Internet Protocol version 4 packet header.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Repr {
    /// The source address.
    pub src_addr:    Address,
    /// The destination address.
    pub dst_addr:    Address,
    /// The protocol of the payload.
    pub protocol:    Protocol,
    /// The payload length in octets, without header.
    pub payload_len: usize,
    /// The time to live.
    pub hop_limit:   u8,
}

impl Repr {
    /// Parse an Internet Protocol version 4 packet and return a high-level representation.
    ///
    /// Options and fragments are `Unsupported`, the only accepted header is exactly `0x45`.
    pub fn parse(packet: &ipv4, checksum: Checksum) -> Result<Repr> {
        packet.check_len()?;
        // Version 4 is expected.
        if packet.version() != 4 { return Err(Error::Unrecognized) }
        if packet.header_len() as usize != HEADER_LEN { return Err(Error::Unsupported) }
        if packet.is_fragment() { return Err(Error::Unsupported) }
        if checksum == Checksum::Manual && !packet.verify_checksum() {
            return Err(Error::WrongChecksum)
        }

        let payload_len = packet.total_len() as usize - HEADER_LEN;

        Ok(Repr {
            src_addr:    packet.src_addr(),
            dst_addr:    packet.dst_addr(),
            protocol:    packet.protocol(),
            payload_len,
            hop_limit:   packet.hop_limit(),
        })
    }

    /// Return the length of a header that will be emitted from this high-level representation.
    pub fn buffer_len(&self) -> usize {
        HEADER_LEN
    }

    /// Emit a high-level representation into an Internet Protocol version 4 packet.
    ///
    /// The header is rewritten completely: no options, type of service zero, identification
    /// zero and the "don't fragment" flag set.
    pub fn emit(&self, packet: &mut ipv4, checksum: Checksum) {
        packet.set_version_and_header_len(4, HEADER_LEN as u8);
        packet.set_dscp_ecn(0);
        packet.set_total_len((HEADER_LEN + self.payload_len) as u16);
        packet.set_ident(0);
        packet.set_unfragmented(true);
        packet.set_hop_limit(self.hop_limit);
        packet.set_protocol(self.protocol);
        packet.set_src_addr(self.src_addr);
        packet.set_dst_addr(self.dst_addr);

        match checksum {
            Checksum::Manual => packet.fill_checksum(),
            Checksum::Ignored => packet.set_checksum(0),
        }
    }
}

impl fmt::Display for Repr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "IPv4 src={} dst={} proto={} len={}",
               self.src_addr, self.dst_addr, self.protocol, self.payload_len)
    }
}
