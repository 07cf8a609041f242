use ecmnet::iface::{Config, Generated, Interface};
use ecmnet::layer::{arp, sntp, udp};
use ecmnet::nic::{Filter, Receiver, Rx, Transmitter, FRAGMENT_SIZE};
use ecmnet::storage::{PacketBuffer, Shared};
use ecmnet::wire::{arp_packet, ethernet_frame, icmpv4_packet, ipv4_packet, udp_packet};
use ecmnet::wire::{ArpOperation, ArpRepr, Checksum, EthernetAddress, EthernetProtocol};
use ecmnet::wire::{EthernetRepr, Icmpv4Message, IpProtocol, Ipv4Address, Ipv4Repr};
use ecmnet::wire::{sntp as sntp_wire, udp as udp_wire};

const MAC_HOST: EthernetAddress = EthernetAddress([0x52, 0x54, 0x00, 0x12, 0x34, 0x56]);
const IP_HOST: Ipv4Address = Ipv4Address::new(192, 168, 200, 1);
const IP_ROUTER: Ipv4Address = Ipv4Address::new(192, 168, 200, 3);

fn device_mac() -> EthernetAddress {
    Config::default().hardware_addr
}

fn device_ip() -> Ipv4Address {
    Config::default().cidr.address()
}

/// Both ends of the USB cable.
struct Link {
    rx: Receiver,
    tx: Transmitter,
}

impl Link {
    fn new() -> Self {
        Link {
            rx: Receiver::new(Filter::new(device_mac())),
            tx: Transmitter::new(),
        }
    }

    /// Push one frame to the device, returns the outcome of the last fragment.
    fn deliver<S>(&mut self, ring: &Shared<S>, frame: &[u8]) -> Rx
    where
        S: AsRef<[u8]> + AsMut<[u8]>,
    {
        let mut fragments: Vec<&[u8]> = frame.chunks(FRAGMENT_SIZE).collect();
        if frame.len() % FRAGMENT_SIZE == 0 {
            fragments.push(&[]);
        }

        let mut result = Rx::Dropped;
        for fragment in fragments {
            let rx = &mut self.rx;
            result = ring.with(|ring| rx.receive(ring, fragment));
            if result == Rx::Stalled {
                break;
            }
        }
        result
    }

    /// Take all frames the device queued for transmission.
    fn collect<S>(&mut self, ring: &Shared<S>) -> Vec<Vec<u8>>
    where
        S: AsRef<[u8]> + AsMut<[u8]>,
    {
        let mut frames = Vec::new();
        let mut frame = Vec::new();
        let mut out = [0; FRAGMENT_SIZE];

        loop {
            let tx = &mut self.tx;
            let len = match ring.with(|ring| tx.send(ring, &mut out)) {
                Some(len) => len,
                None => break,
            };
            frame.extend_from_slice(&out[..len]);
            if len < FRAGMENT_SIZE {
                frames.push(std::mem::replace(&mut frame, Vec::new()));
            }
        }

        frames
    }
}

fn arp_frame(operation: ArpOperation, dst_addr: EthernetAddress, target_hardware_addr: EthernetAddress)
    -> Vec<u8>
{
    let mut frame = vec![0; 60];
    EthernetRepr {
        src_addr: MAC_HOST,
        dst_addr,
        ethertype: EthernetProtocol::Arp,
    }.emit(ethernet_frame::new_unchecked_mut(&mut frame));
    ArpRepr {
        operation,
        source_hardware_addr: MAC_HOST,
        source_protocol_addr: IP_HOST,
        target_hardware_addr,
        target_protocol_addr: device_ip(),
    }.emit(arp_packet::new_unchecked_mut(&mut frame[14..]));
    frame
}

fn ip_frame(protocol: IpProtocol, payload_len: usize) -> Vec<u8> {
    let mut frame = vec![0; 34 + payload_len];
    EthernetRepr {
        src_addr: MAC_HOST,
        dst_addr: device_mac(),
        ethertype: EthernetProtocol::Ipv4,
    }.emit(ethernet_frame::new_unchecked_mut(&mut frame));
    Ipv4Repr {
        src_addr: IP_HOST,
        dst_addr: device_ip(),
        protocol,
        payload_len,
        hop_limit: 64,
    }.emit(ipv4_packet::new_unchecked_mut(&mut frame[14..]), Checksum::Manual);
    frame
}

/// An echo request with an ICMP message of 64 bytes.
fn echo_request(seq_no: u16) -> Vec<u8> {
    let mut frame = ip_frame(IpProtocol::Icmp, 64);
    let icmp = icmpv4_packet::new_unchecked_mut(&mut frame[34..]);
    icmp.set_msg_type(Icmpv4Message::EchoRequest);
    icmp.set_msg_code(0);
    icmp.set_echo_ident(0x1234);
    icmp.set_echo_seq_no(seq_no);
    for (i, byte) in icmp.payload_mut_slice().iter_mut().enumerate() {
        *byte = i as u8;
    }
    icmp.fill_checksum();
    frame
}

fn udp_frame(src_port: u16, dst_port: u16, payload: &[u8]) -> Vec<u8> {
    let mut frame = ip_frame(IpProtocol::Udp, udp_wire::HEADER_LEN + payload.len());
    let datagram = udp_packet::new_unchecked_mut(&mut frame[34..]);
    udp_wire::Repr { src_port, dst_port, payload_len: payload.len() }.emit(datagram);
    datagram.payload_mut_slice().copy_from_slice(payload);
    datagram.fill_checksum(IP_HOST, device_ip());
    frame
}

#[test]
fn resolve_and_ping() {
    let ring = Shared::new(PacketBuffer::new([0u8; 1024]));
    let mut neighbors = [arp::Neighbor::default(); 4];
    let mut iface = Interface::new(Config::default(), &mut neighbors[..]);
    let mut link = Link::new();

    // Padded to the Ethernet minimum by the host, only the packet is stored.
    let request = arp_frame(ArpOperation::Request, EthernetAddress::BROADCAST, EthernetAddress::default());
    assert_eq!(link.deliver(&ring, &request), Rx::Complete);
    assert_eq!(iface.poll_shared(&ring, &mut ()), 1);

    let frames = link.collect(&ring);
    assert_eq!(frames.len(), 1);
    let reply = &frames[0];
    assert_eq!(reply.len(), 42);
    let eth = ethernet_frame::new_unchecked(&reply[..]);
    assert_eq!(eth.dst_addr(), MAC_HOST);
    assert_eq!(eth.src_addr(), device_mac());
    let arp = ArpRepr::parse(arp_packet::new_unchecked(&reply[14..])).unwrap();
    assert_eq!(arp, ArpRepr {
        operation: ArpOperation::Reply,
        source_hardware_addr: device_mac(),
        source_protocol_addr: device_ip(),
        target_hardware_addr: MAC_HOST,
        target_protocol_addr: IP_HOST,
    });
    // Requests are answered, not learned.
    assert!(iface.neighbors().is_empty());

    let request = echo_request(1);
    assert_eq!(link.deliver(&ring, &request), Rx::Complete);
    assert_eq!(iface.poll_shared(&ring, &mut ()), 1);

    let frames = link.collect(&ring);
    assert_eq!(frames.len(), 1);
    let reply = &frames[0];
    assert_eq!(reply.len(), request.len());
    assert_eq!(ethernet_frame::new_unchecked(&reply[..]).dst_addr(), MAC_HOST);

    let ip = Ipv4Repr::parse(ipv4_packet::new_unchecked(&reply[14..]), Checksum::Manual).unwrap();
    assert_eq!(ip.src_addr, device_ip());
    assert_eq!(ip.dst_addr, IP_HOST);
    assert_eq!(ip.protocol, IpProtocol::Icmp);

    let icmp = icmpv4_packet::new_unchecked(&reply[34..]);
    assert_eq!(icmp.msg_type(), Icmpv4Message::EchoReply);
    assert_eq!(icmp.echo_seq_no(), 1);
    assert!(icmp.verify_checksum());
    assert_eq!(icmp.payload_slice(), icmpv4_packet::new_unchecked(&request[34..]).payload_slice());

    ring.with(|ring| assert!(ring.is_idle()));
}

#[test]
fn replies_keep_order() {
    let ring = Shared::new(PacketBuffer::new([0u8; 1024]));
    let mut neighbors = [arp::Neighbor::default(); 4];
    let mut iface = Interface::new(Config::default(), &mut neighbors[..]);
    let mut link = Link::new();

    for seq_no in 0..5 {
        assert_eq!(link.deliver(&ring, &echo_request(seq_no)), Rx::Complete);
    }
    // Not for us, dropped in between.
    let mut foreign = echo_request(100);
    foreign[33] = 99;
    assert_eq!(link.deliver(&ring, &foreign), Rx::Complete);

    assert_eq!(iface.poll_shared(&ring, &mut ()), 6);
    let seq: Vec<_> = link.collect(&ring).iter()
        .map(|frame| icmpv4_packet::new_unchecked(&frame[34..]).echo_seq_no())
        .collect();
    assert_eq!(seq, vec![0, 1, 2, 3, 4]);
}

#[test]
fn backpressure() {
    // Room for a few echo frames only.
    let ring = Shared::new(PacketBuffer::new([0u8; 256]));
    let mut neighbors = [arp::Neighbor::default(); 4];
    let mut iface = Interface::new(Config::default(), &mut neighbors[..]);
    let mut link = Link::new();

    let mut delivered = 0;
    while link.deliver(&ring, &echo_request(delivered)) == Rx::Complete {
        delivered += 1;
    }
    assert!(delivered >= 1);

    // Answer and transmit, then the stalled frame fits.
    assert_eq!(iface.poll_shared(&ring, &mut ()), usize::from(delivered));
    assert_eq!(link.collect(&ring).len(), usize::from(delivered));
    assert_eq!(link.deliver(&ring, &echo_request(delivered)), Rx::Complete);
    assert_eq!(iface.poll_shared(&ring, &mut ()), 1);
    let frames = link.collect(&ring);
    assert_eq!(icmpv4_packet::new_unchecked(&frames[0][34..]).echo_seq_no(), delivered);
}

#[test]
fn automaton_request() {
    let ring = Shared::new(PacketBuffer::new([0u8; 1024]));
    let mut neighbors = [arp::Neighbor::default(); 4];
    let mut iface = Interface::new(Config::default(), &mut neighbors[..]);
    let mut link = Link::new();
    let mut replies = Vec::new();

    let mut app = udp::Callbacks {
        request: |payload: &mut [u8], _: Ipv4Address, dst_port: u16, len: usize| {
            if dst_port != 7 || &payload[..len] != b"relay?" {
                return None;
            }
            payload[..3].copy_from_slice(b"off");
            Some(3)
        },
        reply: |payload: &[u8], src: Ipv4Address, src_port: u16, len: usize| {
            replies.push((payload[..len].to_vec(), src, src_port));
        },
    };

    link.deliver(&ring, &udp_frame(udp::AUTOMATON_PORT, 7, b"relay?"));
    link.deliver(&ring, &udp_frame(udp::AUTOMATON_PORT, 8, b"relay?"));
    link.deliver(&ring, &udp_frame(9, udp::AUTOMATON_PORT, b"done"));
    assert_eq!(iface.poll_shared(&ring, &mut app), 3);
    drop(app);

    assert_eq!(replies, vec![(b"done".to_vec(), IP_HOST, 9)]);
    let frames = link.collect(&ring);
    assert_eq!(frames.len(), 1);
    let datagram = udp_packet::new_unchecked(&frames[0][34..]);
    assert_eq!(datagram.src_port(), 7);
    assert_eq!(datagram.dst_port(), udp::AUTOMATON_PORT);
    assert_eq!(datagram.payload_slice(), b"off");
}

#[test]
fn send_after_resolution() {
    let ring = Shared::new(PacketBuffer::new([0u8; 1024]));
    let mut neighbors = [arp::Neighbor::default(); 4];
    let mut iface = Interface::new(Config::default(), &mut neighbors[..]);
    let mut link = Link::new();

    let sent = ring.with(|ring| iface.send_udp(ring, IP_HOST, 7, b"on"));
    assert_eq!(sent, Ok(Generated::Deferred(42)));

    let frames = link.collect(&ring);
    assert_eq!(frames.len(), 1);
    assert_eq!(ethernet_frame::new_unchecked(&frames[0][..]).dst_addr(), EthernetAddress::BROADCAST);
    let request = ArpRepr::parse(arp_packet::new_unchecked(&frames[0][14..])).unwrap();
    assert_eq!(request.operation, ArpOperation::Request);
    assert_eq!(request.target_protocol_addr, IP_HOST);

    link.deliver(&ring, &arp_frame(ArpOperation::Reply, device_mac(), device_mac()));
    assert_eq!(iface.poll_shared(&ring, &mut ()), 1);
    assert_eq!(iface.neighbors().lookup(IP_HOST), Some(MAC_HOST));

    let sent = ring.with(|ring| iface.send_udp(ring, IP_HOST, 7, b"on"));
    assert_eq!(sent, Ok(Generated::Sent(42)));
    let frames = link.collect(&ring);
    assert_eq!(frames[0].len(), 44);
    assert_eq!(ethernet_frame::new_unchecked(&frames[0][..]).dst_addr(), MAC_HOST);
    assert_eq!(&frames[0][42..], b"on");

    // Other networks go through the router, which is not resolved yet.
    let remote = Ipv4Address::new(10, 1, 1, 1);
    let sent = ring.with(|ring| iface.send_udp(ring, remote, 7, b"on"));
    assert_eq!(sent, Ok(Generated::Deferred(42)));
    let frames = link.collect(&ring);
    let request = ArpRepr::parse(arp_packet::new_unchecked(&frames[0][14..])).unwrap();
    assert_eq!(request.target_protocol_addr, IP_ROUTER);
}

#[derive(Default)]
struct Clock {
    set: Vec<sntp::Time>,
}

impl sntp::Clock for Clock {
    fn set_time(&mut self, time: sntp::Time) {
        self.set.push(time);
    }
}

#[test]
fn time_from_router() {
    let ring = Shared::new(PacketBuffer::new([0u8; 1024]));
    let mut neighbors = [arp::Neighbor::default(); 4];
    let mut iface = Interface::new(Config::default(), &mut neighbors[..]);
    let mut link = Link::new();
    iface.neighbors_mut().fill(IP_ROUTER, MAC_HOST).unwrap();

    let sent = ring.with(|ring| iface.send_sntp_request(ring, IP_ROUTER));
    assert_eq!(sent, Ok(Generated::Sent(42)));
    let frames = link.collect(&ring);
    assert_eq!(frames[0].len(), 90);
    assert_eq!(frames[0][42], 0x1b);

    // 2020-01-01 00:00:00.25 UTC
    let mut answer = [0; 48];
    answer[0] = 0x1c;
    answer[1] = 1;
    answer[40..44].copy_from_slice(&3_786_825_600u32.to_be_bytes());
    answer[44..48].copy_from_slice(&0x4000_0000u32.to_be_bytes());

    let mut frame = udp_frame(sntp_wire::SERVER_PORT, udp::AUTOMATON_PORT, &answer);
    ipv4_packet::new_unchecked_mut(&mut frame[14..]).set_src_addr(IP_ROUTER);
    ipv4_packet::new_unchecked_mut(&mut frame[14..]).fill_checksum();
    // The UDP checksum does not cover the new source anymore.
    udp_packet::new_unchecked_mut(&mut frame[34..]).set_checksum(0);

    let mut client = sntp::Client::new(IP_ROUTER, iface.sntp(), Clock::default());
    link.deliver(&ring, &frame);
    assert_eq!(iface.poll_shared(&ring, &mut client), 1);
    assert_eq!(client.clock().set, vec![sntp::Time { secs: 1_577_836_800, ticks: 15_625 }]);

    // The same answer from the host is ignored.
    link.deliver(&ring, &udp_frame(sntp_wire::SERVER_PORT, udp::AUTOMATON_PORT, &answer));
    iface.poll_shared(&ring, &mut client);
    assert_eq!(client.clock().set.len(), 1);
}
