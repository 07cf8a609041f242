//! The interface, one fixed pipeline of all layers.
//!
//! An [`Interface`] owns the endpoint state of every layer and routes each received frame through
//! Ethernet, ARP or IPv4, ICMP or UDP and finally the application. Received records of the
//! [`PacketBuffer`] are processed with [`poll`], answers are queued for transmission in the same
//! record. New packets are written with the `emit_*` methods into a caller provided buffer, or
//! directly into the ring with the `send_*` methods.
//!
//! ```rust
//! use ecmnet::iface::{Config, Interface};
//! use ecmnet::layer::arp::Neighbor;
//! use ecmnet::storage::PacketBuffer;
//!
//! let mut neighbors = [Neighbor::default(); 10];
//! let mut iface = Interface::new(Config::default(), &mut neighbors[..]);
//! let mut ring = PacketBuffer::new([0u8; 1024]);
//!
//! // Nothing was received yet.
//! assert_eq!(iface.poll(&mut ring, &mut ()), 0);
//! ```
//!
//! [`Interface`]: struct.Interface.html
//! [`PacketBuffer`]: ../storage/struct.PacketBuffer.html
//! [`poll`]: struct.Interface.html#method.poll
use crate::layer::{arp, eth, icmp, ip, sntp, udp};
use crate::layer::{Error, Outcome, Result};
use crate::storage::{PacketBuffer, Shared};
use crate::time::Epoch;
use crate::wire::{ethernet, ipv4, udp as udp_wire};
use crate::wire::{Checksum, EthernetAddress, EthernetProtocol, IpProtocol, Ipv4Address, Ipv4Cidr, Ipv4Repr};
use crate::wire::sntp::{PACKET_LEN as SNTP_PACKET_LEN, SERVER_PORT as SNTP_SERVER_PORT};

/// The length of all headers in front of a UDP payload.
pub const UDP_HEADERS_LEN: usize = ethernet::HEADER_LEN + ipv4::HEADER_LEN + udp_wire::HEADER_LEN;

/// Static configuration of an interface.
///
/// The default is the address plan of a small automation network: the device is
/// `192.168.200.40/24` with a locally administered hardware address and reaches other networks
/// through `192.168.200.3`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Config {
    /// The own hardware address.
    pub hardware_addr: EthernetAddress,
    /// The own address and the subnet of the link.
    pub cidr: Ipv4Cidr,
    /// The next hop for all destinations outside the subnet.
    pub router: Option<Ipv4Address>,
    /// The automaton port that requests are sent from and replies are sent to.
    pub port: u16,
    /// The time-to-live of all sent datagrams.
    pub hop_limit: u8,
    /// Whether checksums of received packets are verified.
    pub checksum: Checksum,
    /// Stay silent on echo requests.
    pub deny_echo: bool,
    /// The epoch of the clock set by SNTP.
    pub epoch: Epoch,
}

/// The result of writing a unicast datagram.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Generated {
    /// The headers were written, the payload starts at this offset of the frame.
    Sent(usize),
    /// The hardware address of the next hop is unknown.
    ///
    /// An ARP request of this length was written into the frame instead. The datagram should be
    /// tried again after the reply had a chance to arrive.
    Deferred(usize),
}

/// The protocol state of one network interface.
pub struct Interface<'a> {
    eth: eth::Endpoint,
    arp: arp::Endpoint<'a>,
    ip: ip::Endpoint,
    icmp: icmp::Endpoint,
    udp: udp::Endpoint,
    sntp: sntp::Endpoint,
    router: Option<Ipv4Address>,
}

/// Routes payloads between the layers for the duration of one frame.
struct Dispatch<'i, 'a, A> {
    arp: &'i mut arp::Endpoint<'a>,
    ip: &'i ip::Endpoint,
    icmp: &'i icmp::Endpoint,
    udp: &'i udp::Endpoint,
    app: &'i mut A,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            hardware_addr: EthernetAddress([0x02, 0x00, 0x00, 0x00, 0x00, 0x40]),
            cidr: Ipv4Cidr::new(Ipv4Address::new(192, 168, 200, 40), 24),
            router: Some(Ipv4Address::new(192, 168, 200, 3)),
            port: udp::AUTOMATON_PORT,
            hop_limit: ipv4::DEFAULT_HOP_LIMIT,
            checksum: Checksum::Manual,
            deny_echo: false,
            epoch: Epoch::Unix,
        }
    }
}

impl<'a> Interface<'a> {
    /// Create an interface with a neighbor cache in the provided storage.
    pub fn new(config: Config, neighbors: &'a mut [arp::Neighbor]) -> Self {
        let cache = arp::NeighborCache::new(neighbors, config.cidr);

        let mut ip = ip::Endpoint::new(config.cidr);
        ip.set_hop_limit(config.hop_limit);
        ip.set_checksum(config.checksum);

        let mut icmp = icmp::Endpoint::new();
        icmp.set_deny_echo(config.deny_echo);
        icmp.set_checksum(config.checksum);

        let mut udp = udp::Endpoint::new(config.port);
        udp.set_checksum(config.checksum);

        Interface {
            eth: eth::Endpoint::new(config.hardware_addr),
            arp: arp::Endpoint::new(config.hardware_addr, cache),
            ip,
            icmp,
            udp,
            sntp: sntp::Endpoint::new(config.epoch),
            router: config.router,
        }
    }

    /// The own hardware address.
    pub fn hardware_addr(&self) -> EthernetAddress {
        self.eth.addr()
    }

    /// The own address and subnet.
    pub fn cidr(&self) -> Ipv4Cidr {
        self.ip.cidr()
    }

    /// Move to another address or subnet.
    ///
    /// All cached neighbors are forgotten.
    pub fn set_cidr(&mut self, cidr: Ipv4Cidr) {
        self.ip.set_cidr(cidr);
        self.arp.neighbors_mut().set_cidr(cidr);
    }

    /// The router for destinations outside the subnet.
    pub fn router(&self) -> Option<Ipv4Address> {
        self.router
    }

    /// Change the router.
    pub fn set_router(&mut self, router: Option<Ipv4Address>) {
        self.router = router;
    }

    /// The cached neighbors.
    pub fn neighbors(&self) -> &arp::NeighborCache<'a> {
        self.arp.neighbors()
    }

    /// The cached neighbors, mutably.
    ///
    /// Can be used to add static entries.
    pub fn neighbors_mut(&mut self) -> &mut arp::NeighborCache<'a> {
        self.arp.neighbors_mut()
    }

    /// The ICMP state.
    pub fn icmp_mut(&mut self) -> &mut icmp::Endpoint {
        &mut self.icmp
    }

    /// The SNTP settings, to create a matching [`sntp::Client`].
    ///
    /// [`sntp::Client`]: ../layer/sntp/struct.Client.html
    pub fn sntp(&self) -> sntp::Endpoint {
        self.sntp
    }

    /// Process one received frame.
    ///
    /// When the frame is answered it is overwritten with the answer and the answer's length is
    /// returned in `Outcome::Reflect`.
    pub fn receive<A: udp::Recv>(&mut self, frame: &mut [u8], app: &mut A) -> Outcome {
        let mut dispatch = Dispatch {
            arp: &mut self.arp,
            ip: &self.ip,
            icmp: &self.icmp,
            udp: &self.udp,
            app,
        };
        self.eth.receive(frame, &mut dispatch)
    }

    /// Process all received records of the ring.
    ///
    /// Answers are queued for transmission in the record of their request, everything else is
    /// released. Returns the number of processed records.
    pub fn poll<S, A>(&mut self, ring: &mut PacketBuffer<S>, app: &mut A) -> usize
    where
        S: AsRef<[u8]> + AsMut<[u8]>,
        A: udp::Recv,
    {
        let mut count = 0;
        while self.poll_one(ring, app) {
            count += 1;
        }
        count
    }

    /// Process all received records of a shared ring.
    ///
    /// Each record is processed within its own critical section, so the transport interrupt is
    /// only ever delayed by the processing of a single packet.
    pub fn poll_shared<S, A>(&mut self, ring: &Shared<S>, app: &mut A) -> usize
    where
        S: AsRef<[u8]> + AsMut<[u8]>,
        A: udp::Recv,
    {
        let mut count = 0;
        while ring.with(|ring| self.poll_one(ring, app)) {
            count += 1;
        }
        count
    }

    fn poll_one<S, A>(&mut self, ring: &mut PacketBuffer<S>, app: &mut A) -> bool
    where
        S: AsRef<[u8]> + AsMut<[u8]>,
        A: udp::Recv,
    {
        let mut handle = match ring.get_input() {
            Some(handle) => handle,
            None => return false,
        };

        match self.receive(ring.payload_mut(&mut handle), app) {
            Outcome::Reflect(len) => {
                ring.shrink(&handle, len);
                ring.reattach_output(handle);
            },
            Outcome::Drop => ring.release_input(handle),
        }

        true
    }

    /// Write a datagram from the automaton port to some host.
    ///
    /// The frame is sent to the host itself when it is on the link, otherwise to the router. When
    /// the hardware address of that next hop is not cached, an ARP request for it is written
    /// instead and the datagram must be retried later. The caller writes the `payload_len` bytes
    /// of payload at the returned offset.
    pub fn emit_unicast_udp(&self, frame: &mut [u8], dst_addr: Ipv4Address, dst_port: u16,
                            payload_len: usize) -> Result<Generated>
    {
        if frame.len() < UDP_HEADERS_LEN + payload_len {
            return Err(Error::BadSize);
        }

        let next_hop = self.next_hop(dst_addr)?;
        match self.arp.neighbors().lookup(next_hop) {
            Some(hardware_addr) => {
                self.emit_udp(frame, hardware_addr, dst_addr, self.udp.port(), dst_port, payload_len)?;
                Ok(Generated::Sent(UDP_HEADERS_LEN))
            },
            None => {
                net_debug!("iface: resolving {} for {}", next_hop, dst_addr);
                let packet = self.eth.emit(frame, EthernetAddress::BROADCAST, EthernetProtocol::Arp)?;
                let len = self.arp.emit_request(packet, next_hop)?;
                Ok(Generated::Deferred(ethernet::HEADER_LEN + len))
            },
        }
    }

    /// Write a datagram to the automaton port of all hosts on the link.
    ///
    /// Returns the offset of the payload in the frame.
    pub fn emit_broadcast_udp(&self, frame: &mut [u8], src_port: u16, payload_len: usize)
        -> Result<usize>
    {
        if frame.len() < UDP_HEADERS_LEN + payload_len {
            return Err(Error::BadSize);
        }

        let dst_addr = self.cidr().broadcast().unwrap_or(Ipv4Address::BROADCAST);
        self.emit_udp(frame, EthernetAddress::BROADCAST, dst_addr, src_port, self.udp.port(), payload_len)?;
        Ok(UDP_HEADERS_LEN)
    }

    /// Queue a datagram to some host for transmission.
    ///
    /// See [`emit_unicast_udp`] for the routing. A deferred datagram is not queued, only the ARP
    /// request is.
    ///
    /// [`emit_unicast_udp`]: #method.emit_unicast_udp
    pub fn send_udp<S>(&self, ring: &mut PacketBuffer<S>, dst_addr: Ipv4Address, dst_port: u16,
                       payload: &[u8]) -> Result<Generated>
    where
        S: AsRef<[u8]> + AsMut<[u8]>,
    {
        self.queue_unicast(ring, dst_addr, dst_port, payload.len(), |data| {
            data.copy_from_slice(payload);
            Ok(())
        })
    }

    /// Queue a datagram to the automaton port of all hosts on the link.
    ///
    /// Returns the length of the queued frame.
    pub fn broadcast_udp<S>(&self, ring: &mut PacketBuffer<S>, src_port: u16, payload: &[u8])
        -> Result<usize>
    where
        S: AsRef<[u8]> + AsMut<[u8]>,
    {
        let len = UDP_HEADERS_LEN + payload.len();
        let mut handle = ring.allocate(len).ok_or_else(exhausted)?;
        let frame = ring.payload_mut(&mut handle);

        match self.emit_broadcast_udp(frame, src_port, payload.len()) {
            Ok(offset) => {
                frame[offset..].copy_from_slice(payload);
                ring.put_output(handle);
                Ok(len)
            },
            Err(err) => {
                ring.discard(handle);
                Err(err)
            },
        }
    }

    /// Queue a time request to an SNTP server.
    ///
    /// The reply is addressed to the automaton port; hand it to an [`sntp::Client`] through the
    /// application receiver.
    ///
    /// [`sntp::Client`]: ../layer/sntp/struct.Client.html
    pub fn send_sntp_request<S>(&self, ring: &mut PacketBuffer<S>, server: Ipv4Address)
        -> Result<Generated>
    where
        S: AsRef<[u8]> + AsMut<[u8]>,
    {
        let sntp = self.sntp;
        self.queue_unicast(ring, server, SNTP_SERVER_PORT, SNTP_PACKET_LEN, |data| {
            sntp.emit_request(data).map(|_| ())
        })
    }

    fn queue_unicast<S, F>(&self, ring: &mut PacketBuffer<S>, dst_addr: Ipv4Address,
                           dst_port: u16, payload_len: usize, fill: F) -> Result<Generated>
    where
        S: AsRef<[u8]> + AsMut<[u8]>,
        F: FnOnce(&mut [u8]) -> Result<()>,
    {
        let mut handle = ring.allocate(UDP_HEADERS_LEN + payload_len).ok_or_else(exhausted)?;
        let frame = ring.payload_mut(&mut handle);

        let generated = self.emit_unicast_udp(frame, dst_addr, dst_port, payload_len)
            .and_then(|generated| match generated {
                Generated::Sent(offset) => fill(&mut frame[offset..]).map(|()| generated),
                Generated::Deferred(_) => Ok(generated),
            });

        match generated {
            Ok(Generated::Sent(_)) => ring.put_output(handle),
            Ok(Generated::Deferred(len)) => {
                ring.shrink(&handle, len);
                ring.put_output(handle);
            },
            Err(_) => ring.discard(handle),
        }

        generated
    }

    fn emit_udp(&self, frame: &mut [u8], hardware_addr: EthernetAddress, dst_addr: Ipv4Address,
                src_port: u16, dst_port: u16, payload_len: usize) -> Result<()>
    {
        let packet = self.eth.emit(frame, hardware_addr, EthernetProtocol::Ipv4)?;
        let datagram_len = udp_wire::HEADER_LEN + payload_len;
        let datagram = self.ip.emit(packet, dst_addr, IpProtocol::Udp, datagram_len)?;
        self.udp.emit(datagram, src_port, dst_port, payload_len)?;
        Ok(())
    }

    fn next_hop(&self, dst_addr: Ipv4Address) -> Result<Ipv4Address> {
        if self.cidr().contains_addr(dst_addr) {
            Ok(dst_addr)
        } else {
            self.router.ok_or(Error::Unreachable)
        }
    }
}

fn exhausted() -> Error {
    net_debug!("iface: packet ring exhausted");
    Error::Exhausted
}

impl<A: udp::Recv> eth::Recv for Dispatch<'_, '_, A> {
    fn receive(&mut self, ethertype: EthernetProtocol, payload: &mut [u8]) -> Outcome {
        match ethertype {
            EthernetProtocol::Arp => self.arp.receive(payload),
            EthernetProtocol::Ipv4 => {
                let ip = self.ip;
                ip.receive(payload, self)
            },
            _ => Outcome::Drop,
        }
    }
}

impl<A: udp::Recv> ip::Recv for Dispatch<'_, '_, A> {
    fn receive(&mut self, repr: &Ipv4Repr, payload: &mut [u8]) -> Outcome {
        match repr.protocol {
            IpProtocol::Icmp => {
                let len = repr.payload_len.min(payload.len());
                self.icmp.receive(&mut payload[..len])
            },
            IpProtocol::Udp => self.udp.receive(repr, payload, &mut *self.app),
            _ => Outcome::Drop,
        }
    }
}
