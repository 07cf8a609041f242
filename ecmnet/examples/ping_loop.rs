//! Pings the stack through a simulated USB link.
//!
//! # Usage
//!
//! The example plays the role of the host computer on the other end of the USB cable. It resolves
//! the device with ARP, sends echo requests and waits for their replies, all as bulk fragments
//! through the same receive and transmit adapters the firmware would use in its interrupt. The
//! device side runs the interface on a shared packet ring.
//!
//!   > $ cargo run --example ping_loop -- --count 4 --size 56
//!
//! With `--sntp` the device also asks the host for the time and sets a software clock from the
//! answer.
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use structopt::StructOpt;

use ecmnet::iface::{Config as IfaceConfig, Interface};
use ecmnet::layer::{arp, sntp, udp, FnHandler};
use ecmnet::nic::{Filter, Receiver, Rx, Transmitter, FRAGMENT_SIZE};
use ecmnet::storage::{PacketBuffer, Shared};
use ecmnet::wire::{arp_packet, ethernet_frame, icmpv4_packet, ipv4_packet, udp_packet};
use ecmnet::wire::{ArpOperation, ArpRepr, Checksum, EthernetAddress, EthernetProtocol};
use ecmnet::wire::{EthernetRepr, Icmpv4Message, IpProtocol, Ipv4Address, Ipv4Cidr, Ipv4Repr};
use ecmnet::wire::{udp as udp_wire, sntp as sntp_wire};

static RING: Shared<[u8; 2048]> = Shared::new(PacketBuffer::zeroed());

fn main() {
    let Config {
        host,
        hostmac,
        peer,
        peermac,
        count,
        size,
        sntp,
    } = Config::from_args();

    let mut neighbors = [arp::Neighbor::default(); 4];
    let config = IfaceConfig {
        hardware_addr: hostmac,
        cidr: host,
        router: Some(peer),
        ..IfaceConfig::default()
    };
    let mut iface = Interface::new(config, &mut neighbors[..]);
    let mut device = Link::new(hostmac);
    let mut clock = Vec::new();

    println!("device {} at {}", hostmac, host);

    // Resolve the device like the host would.
    let request = arp_request(peermac, peer, host.address());
    device.deliver(&request);
    iface.poll_shared(&RING, &mut ());
    match device.collect().first() {
        Some(reply) => println!("{} is at {}", host.address(), ethernet_frame::new_unchecked(reply).src_addr()),
        None => panic!("device did not answer ARP"),
    }

    for seq_no in 0..count {
        let request = echo_request(peermac, hostmac, peer, host.address(), seq_no, size);
        let start = Instant::now();
        device.deliver(&request);
        iface.poll_shared(&RING, &mut ());

        let replies = device.collect();
        let elapsed = start.elapsed();
        match replies.first() {
            Some(reply) if is_echo_reply(reply, seq_no) => {
                println!("{} bytes from {}: icmp_seq={} time={:?}",
                         reply.len() - 34, host.address(), seq_no, elapsed)
            },
            _ => println!("no reply for icmp_seq={}", seq_no),
        }
    }

    if sntp {
        // Tell the device where the host is, the reply would come from there.
        device.deliver(&arp_reply(peermac, peer, hostmac, host.address()));
        iface.poll_shared(&RING, &mut ());

        let queued = RING.with(|ring| iface.send_sntp_request(ring, peer));
        println!("time request: {:?}", queued);

        for request in device.collect() {
            if let Some(answer) = sntp_answer(&request, peermac, hostmac) {
                device.deliver(&answer);
            }
        }

        let mut client = sntp::Client::new(peer, iface.sntp(), FnHandler(|time: sntp::Time| {
            clock.push(time);
        }));
        iface.poll_shared(&RING, &mut client);
        drop(client);

        match clock.last() {
            Some(time) => println!("clock set to {}.{:05}", time.secs, time.ticks),
            None => println!("clock not set"),
        }
    }

    let stats = device.stats;
    println!("{} fragments in, {} fragments out, {} stalls",
             stats.fragments_in, stats.fragments_out, stats.stalls);
}

#[derive(StructOpt)]
struct Config {
    #[structopt(long = "host", default_value = "192.168.200.40/24")]
    host: Ipv4Cidr,
    #[structopt(long = "hostmac", default_value = "02:00:00:00:00:40")]
    hostmac: EthernetAddress,
    #[structopt(long = "peer", default_value = "192.168.200.3")]
    peer: Ipv4Address,
    #[structopt(long = "peermac", default_value = "52:54:00:12:34:56")]
    peermac: EthernetAddress,
    #[structopt(long = "count", default_value = "4")]
    count: u16,
    #[structopt(long = "size", default_value = "56")]
    size: usize,
    #[structopt(long = "sntp")]
    sntp: bool,
}

#[derive(Clone, Copy, Default)]
struct Stats {
    fragments_in: usize,
    fragments_out: usize,
    stalls: usize,
}

/// The USB side of the device, as seen from the host.
struct Link {
    rx: Receiver,
    tx: Transmitter,
    stats: Stats,
}

impl Link {
    fn new(hardware_addr: EthernetAddress) -> Self {
        Link {
            rx: Receiver::new(Filter::new(hardware_addr)),
            tx: Transmitter::new(),
            stats: Stats::default(),
        }
    }

    /// Push a frame to the device, fragment by fragment.
    fn deliver(&mut self, frame: &[u8]) {
        let mut fragments: Vec<&[u8]> = frame.chunks(FRAGMENT_SIZE).collect();
        if frame.len() % FRAGMENT_SIZE == 0 {
            fragments.push(&[]);
        }

        for fragment in fragments {
            loop {
                let rx = &mut self.rx;
                match RING.with(|ring| rx.receive(ring, fragment)) {
                    Rx::Stalled => {
                        // Nobody else drains the ring here, make room by transmitting.
                        self.stats.stalls += 1;
                        self.collect();
                    },
                    _ => break,
                }
            }
            self.stats.fragments_in += 1;
        }
    }

    /// Take all frames the device queued for transmission.
    fn collect(&mut self) -> Vec<Vec<u8>> {
        let mut frames = Vec::new();
        let mut frame = Vec::new();
        let mut out = [0; FRAGMENT_SIZE];

        loop {
            let tx = &mut self.tx;
            let len = match RING.with(|ring| tx.send(ring, &mut out)) {
                Some(len) => len,
                None => break,
            };

            self.stats.fragments_out += 1;
            frame.extend_from_slice(&out[..len]);
            if len < FRAGMENT_SIZE {
                frames.push(core::mem::replace(&mut frame, Vec::new()));
            }
        }

        frames
    }
}

fn arp_request(src_mac: EthernetAddress, src_ip: Ipv4Address, target: Ipv4Address) -> Vec<u8> {
    arp_frame(ArpRepr {
        operation: ArpOperation::Request,
        source_hardware_addr: src_mac,
        source_protocol_addr: src_ip,
        target_hardware_addr: EthernetAddress::default(),
        target_protocol_addr: target,
    }, EthernetAddress::BROADCAST)
}

fn arp_reply(src_mac: EthernetAddress, src_ip: Ipv4Address, dst_mac: EthernetAddress, dst_ip: Ipv4Address)
    -> Vec<u8>
{
    arp_frame(ArpRepr {
        operation: ArpOperation::Reply,
        source_hardware_addr: src_mac,
        source_protocol_addr: src_ip,
        target_hardware_addr: dst_mac,
        target_protocol_addr: dst_ip,
    }, dst_mac)
}

fn arp_frame(repr: ArpRepr, dst_addr: EthernetAddress) -> Vec<u8> {
    let mut frame = vec![0; 42];
    EthernetRepr {
        src_addr: repr.source_hardware_addr,
        dst_addr,
        ethertype: EthernetProtocol::Arp,
    }.emit(ethernet_frame::new_unchecked_mut(&mut frame));
    repr.emit(arp_packet::new_unchecked_mut(&mut frame[14..]));
    frame
}

fn echo_request(src_mac: EthernetAddress, dst_mac: EthernetAddress, src_ip: Ipv4Address,
                dst_ip: Ipv4Address, seq_no: u16, size: usize) -> Vec<u8>
{
    let mut frame = vec![0; 42 + size];
    EthernetRepr {
        src_addr: src_mac,
        dst_addr: dst_mac,
        ethertype: EthernetProtocol::Ipv4,
    }.emit(ethernet_frame::new_unchecked_mut(&mut frame));
    Ipv4Repr {
        src_addr: src_ip,
        dst_addr: dst_ip,
        protocol: IpProtocol::Icmp,
        payload_len: 8 + size,
        hop_limit: 64,
    }.emit(ipv4_packet::new_unchecked_mut(&mut frame[14..]), Checksum::Manual);

    let icmp = icmpv4_packet::new_unchecked_mut(&mut frame[34..]);
    icmp.set_msg_type(Icmpv4Message::EchoRequest);
    icmp.set_msg_code(0);
    icmp.set_echo_ident(0x4242);
    icmp.set_echo_seq_no(seq_no);
    for (i, byte) in icmp.payload_mut_slice().iter_mut().enumerate() {
        *byte = i as u8;
    }
    icmp.fill_checksum();
    frame
}

fn is_echo_reply(frame: &[u8], seq_no: u16) -> bool {
    if frame.len() < 42 {
        return false;
    }
    let icmp = icmpv4_packet::new_unchecked(&frame[34..]);
    icmp.msg_type() == Icmpv4Message::EchoReply
        && icmp.echo_seq_no() == seq_no
        && icmp.verify_checksum()
}

/// Answer a time request with the current system time, as a time server on the host would.
fn sntp_answer(request: &[u8], src_mac: EthernetAddress, dst_mac: EthernetAddress) -> Option<Vec<u8>> {
    let ip = Ipv4Repr::parse(ipv4_packet::new_checked(request.get(14..)?).ok()?, Checksum::Manual).ok()?;
    let datagram = udp_packet::new_checked(request.get(34..)?).ok()?;
    if ip.protocol != IpProtocol::Udp || datagram.dst_port() != sntp_wire::SERVER_PORT {
        return None;
    }

    let now = SystemTime::now().duration_since(UNIX_EPOCH).ok()?;
    let secs = (now.as_secs() as u32).wrapping_add(ecmnet::time::NTP_UNIX_OFFSET);
    let frac = ((u64::from(now.subsec_nanos()) << 32) / 1_000_000_000) as u32;

    let mut frame = vec![0; 42 + sntp_wire::PACKET_LEN];
    EthernetRepr {
        src_addr: src_mac,
        dst_addr: dst_mac,
        ethertype: EthernetProtocol::Ipv4,
    }.emit(ethernet_frame::new_unchecked_mut(&mut frame));
    Ipv4Repr {
        src_addr: ip.dst_addr,
        dst_addr: ip.src_addr,
        protocol: IpProtocol::Udp,
        payload_len: udp_wire::HEADER_LEN + sntp_wire::PACKET_LEN,
        hop_limit: 64,
    }.emit(ipv4_packet::new_unchecked_mut(&mut frame[14..]), Checksum::Manual);
    udp_wire::Repr {
        src_port: sntp_wire::SERVER_PORT,
        dst_port: udp::AUTOMATON_PORT,
        payload_len: sntp_wire::PACKET_LEN,
    }.emit(udp_packet::new_unchecked_mut(&mut frame[34..]));

    let answer = sntp_wire::Repr {
        leap_indicator: sntp_wire::LeapIndicator::NoWarning,
        version: 3,
        mode: sntp_wire::Mode::Server,
        stratum: 2,
        transmit_timestamp: sntp_wire::Timestamp { secs, frac },
    };
    answer.emit(sntp_wire::sntp::new_unchecked_mut(&mut frame[42..]));
    Some(frame)
}
