/*! Low-level packet access and construction.

The `wire` module deals with the packet *representation*. It provides two levels of
functionality.

 * First, it provides functions to extract fields from sequences of octets, and to insert fields
   into sequences of octets. This happens through the lowercase byte wrappers, e.g. `ipv4` or
   `udp`, which are unsized views over `[u8]`.
 * Second, in cases where the space of valid field values is much smaller than the space of
   possible field values, it provides a compact, high-level representation of packet data that
   can be parsed from and emitted into a sequence of octets. This happens through the `Repr`
   family of structs and enums.

An important property of the byte wrappers is that they can be laid over the exact bytes stored
in the packet ring. All protocol processing in this crate reads and rewrites packets in place,
no copy is made between receiving a request and sending its answer.

The `check_len` method of each wrapper ensures that no accessor will panic afterwards. Only the
`Repr::parse` functions validate field values beyond that.
*/

// Copyright (C) 2016 whitequark@whitequark.org

mod field {
    pub(crate) type Field = ::core::ops::Range<usize>;
    pub(crate) type Rest  = ::core::ops::RangeFrom<usize>;
}

pub mod arp;
mod error;
pub mod ethernet;
pub mod icmpv4;
pub mod ip;
pub mod ipv4;
pub mod sntp;
pub mod udp;

/// Describes how to handle checksums.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Checksum {
    /// Checksum must be computed or checked manually.
    Manual,

    /// The checksum field is filled or checked by the transport.
    Ignored,
}

pub use self::error::{
    Error,
    Result};

pub use self::ethernet::{
    ethernet as ethernet_frame,
    EtherType as EthernetProtocol,
    Address as EthernetAddress,
    Repr as EthernetRepr};

pub use self::arp::{
    arp as arp_packet,
    Hardware as ArpHardware,
    Operation as ArpOperation,
    Repr as ArpRepr};

pub use self::ip::Protocol as IpProtocol;

pub use self::ipv4::{
    ipv4 as ipv4_packet,
    Address as Ipv4Address,
    Cidr as Ipv4Cidr,
    Repr as Ipv4Repr};

pub use self::icmpv4::{
    icmpv4 as icmpv4_packet,
    Message as Icmpv4Message};

pub use self::udp::{
    udp as udp_packet,
    Repr as UdpRepr};

pub use self::sntp::{
    sntp as sntp_packet,
    Mode as SntpMode,
    Timestamp as NtpTimestamp};
