use crate::layer::{udp, FnHandler, Outcome};
use crate::wire::{ipv4, udp as udp_wire, Checksum, IpProtocol, Ipv4Repr};

const IP_ADDR_HOST: ipv4::Address = ipv4::Address::new(192, 168, 200, 40);
const IP_ADDR_OTHER: ipv4::Address = ipv4::Address::new(192, 168, 200, 41);

fn ip_repr(payload_len: usize) -> Ipv4Repr {
    Ipv4Repr {
        src_addr: IP_ADDR_OTHER,
        dst_addr: IP_ADDR_HOST,
        protocol: IpProtocol::Udp,
        payload_len,
        hop_limit: 64,
    }
}

/// A datagram with valid checksum, padded with `spare` bytes of room.
fn datagram(src_port: u16, dst_port: u16, payload: &[u8], spare: usize) -> Vec<u8> {
    let len = udp_wire::HEADER_LEN + payload.len();
    let mut bytes = vec![0; len + spare];
    let packet = udp_wire::udp::new_unchecked_mut(&mut bytes[..len]);
    udp_wire::Repr { src_port, dst_port, payload_len: payload.len() }.emit(packet);
    packet.payload_mut_slice().copy_from_slice(payload);
    packet.fill_checksum(IP_ADDR_OTHER, IP_ADDR_HOST);
    bytes
}

#[test]
fn answer_request() {
    let endpoint = udp::Endpoint::default();
    let mut bytes = datagram(udp::AUTOMATON_PORT, 7, b"get", 8);
    let ip = ip_repr(11);

    let mut app = FnHandler(|payload: &mut [u8], src: ipv4::Address, dst_port: u16, len: usize| {
        assert_eq!(src, IP_ADDR_OTHER);
        assert_eq!(dst_port, 7);
        assert_eq!(len, 3);
        assert_eq!(payload.len(), 11);
        assert_eq!(&payload[..len], b"get");
        payload[..5].copy_from_slice(b"value");
        Some(5)
    });
    assert_eq!(endpoint.receive(&ip, &mut bytes, &mut app), Outcome::Reflect(13));

    let packet = udp_wire::udp::new_unchecked(&bytes[..13]);
    assert_eq!(packet.src_port(), 7);
    assert_eq!(packet.dst_port(), udp::AUTOMATON_PORT);
    assert_eq!(packet.len(), 13);
    assert_eq!(packet.checksum(), 0);
    assert_eq!(packet.payload_slice(), b"value");
}

#[test]
fn unanswered_request() {
    let endpoint = udp::Endpoint::default();
    let mut bytes = datagram(udp::AUTOMATON_PORT, 7, b"get", 0);
    assert_eq!(endpoint.receive(&ip_repr(11), &mut bytes, &mut ()), Outcome::Drop);

    // An answer beyond the buffer is not sent.
    let mut too_long = FnHandler(|_: &mut [u8], _: ipv4::Address, _: u16, _: usize| Some(100));
    assert_eq!(endpoint.receive(&ip_repr(11), &mut bytes, &mut too_long), Outcome::Drop);
}

#[test]
fn deliver_reply() {
    let endpoint = udp::Endpoint::default();
    let mut bytes = datagram(123, udp::AUTOMATON_PORT, b"time", 0);
    let mut replies = Vec::new();
    let mut app = udp::Callbacks {
        request: |_: &mut [u8], _: ipv4::Address, _: u16, _: usize| -> Option<usize> {
            panic!("not a request")
        },
        reply: |payload: &[u8], src: ipv4::Address, src_port: u16, len: usize| {
            replies.push((payload.to_vec(), src, src_port, len));
        },
    };

    assert_eq!(endpoint.receive(&ip_repr(12), &mut bytes, &mut app), Outcome::Drop);
    assert_eq!(replies, vec![(b"time".to_vec(), IP_ADDR_OTHER, 123, 4)]);
}

#[test]
fn other_ports() {
    let endpoint = udp::Endpoint::default();
    let mut bytes = datagram(53, 53, b"dns", 0);
    let mut app = udp::Callbacks {
        request: |_: &mut [u8], _: ipv4::Address, _: u16, _: usize| -> Option<usize> { panic!("not a request") },
        reply: |_: &[u8], _: ipv4::Address, _: u16, _: usize| panic!("not a reply"),
    };
    assert_eq!(endpoint.receive(&ip_repr(11), &mut bytes, &mut app), Outcome::Drop);
}

#[test]
fn invalid_datagrams() {
    let endpoint = udp::Endpoint::default();
    let mut app = FnHandler(|_: &mut [u8], _: ipv4::Address, _: u16, _: usize| -> Option<usize> {
        panic!("datagram should have been rejected")
    });

    // Length field beyond the datagram.
    let mut bytes = datagram(udp::AUTOMATON_PORT, 7, b"get", 4);
    assert_eq!(endpoint.receive(&ip_repr(10), &mut bytes, &mut app), Outcome::Drop);

    // Length field shorter than the header.
    let mut bytes = datagram(udp::AUTOMATON_PORT, 7, b"get", 0);
    bytes[5] = 4;
    assert_eq!(endpoint.receive(&ip_repr(11), &mut bytes, &mut app), Outcome::Drop);

    let mut bytes = datagram(udp::AUTOMATON_PORT, 7, b"get", 0);
    bytes[8] ^= 1;
    assert_eq!(endpoint.receive(&ip_repr(11), &mut bytes, &mut app), Outcome::Drop);
}

#[test]
fn checksum_optional() {
    let mut endpoint = udp::Endpoint::default();
    let mut bytes = datagram(udp::AUTOMATON_PORT, 7, b"get", 0);
    bytes[8] ^= 1;
    let mut answered = FnHandler(|_: &mut [u8], _: ipv4::Address, _: u16, len: usize| Some(len));

    endpoint.set_checksum(Checksum::Ignored);
    assert_eq!(endpoint.receive(&ip_repr(11), &mut bytes, &mut answered), Outcome::Reflect(11));

    // A zero checksum was never computed and always verifies.
    let mut bytes = datagram(udp::AUTOMATON_PORT, 7, b"get", 0);
    bytes[6] = 0;
    bytes[7] = 0;
    endpoint.set_checksum(Checksum::Manual);
    assert_eq!(endpoint.receive(&ip_repr(11), &mut bytes, &mut answered), Outcome::Reflect(11));
}

#[test]
fn chained_receivers() {
    let endpoint = udp::Endpoint::default();
    let mut bytes = datagram(udp::AUTOMATON_PORT, 9, b"x", 0);
    let first = FnHandler(|_: &mut [u8], _: ipv4::Address, dst_port: u16, _: usize| {
        if dst_port == 8 { Some(0) } else { None }
    });
    let second = FnHandler(|payload: &mut [u8], _: ipv4::Address, _: u16, _: usize| {
        payload[0] = b'y';
        Some(1)
    });

    assert_eq!(endpoint.receive(&ip_repr(9), &mut bytes, &mut (first, second)), Outcome::Reflect(9));
    assert_eq!(bytes[8], b'y');
}

#[test]
fn emit_header() {
    let endpoint = udp::Endpoint::default();
    let mut bytes = vec![0xa5; 20];
    let payload = endpoint.emit(&mut bytes, udp::AUTOMATON_PORT, 123, 4).unwrap();
    assert_eq!(payload.len(), 4);
    assert_eq!(&bytes[..8], &[0xff, 0x98, 0x00, 0x7b, 0x00, 0x0c, 0x00, 0x00]);
    assert!(endpoint.emit(&mut bytes, udp::AUTOMATON_PORT, 123, 13).is_err());
}
