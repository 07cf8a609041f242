use crate::layer::sntp::{frac_to_ticks, Client, Clock, Endpoint, Time, TICKS_PER_SECOND};
use crate::layer::udp::Recv;
use crate::layer::{Error, FnHandler};
use crate::time::Epoch;
use crate::wire::{ipv4, sntp as sntp_wire};

const SERVER: ipv4::Address = ipv4::Address::new(192, 168, 200, 3);

// 2020-01-01 00:00:00 UTC and a half.
const NTP_SECS: u32 = 3_786_825_600;
const UNIX_SECS: u32 = 1_577_836_800;

/// A server reply as it arrives on the wire.
fn reply(li_vn_mode: u8, secs: u32, frac: u32) -> [u8; 48] {
    let mut bytes = [0; 48];
    bytes[0] = li_vn_mode;
    bytes[1] = 2;
    bytes[40..44].copy_from_slice(&secs.to_be_bytes());
    bytes[44..48].copy_from_slice(&frac.to_be_bytes());
    bytes
}

#[derive(Default)]
struct Recorder {
    times: Vec<Time>,
}

impl Clock for Recorder {
    fn set_time(&mut self, time: Time) {
        self.times.push(time);
    }
}

#[test]
fn ticks() {
    assert_eq!(TICKS_PER_SECOND, 62_500);
    assert_eq!(frac_to_ticks(0), 0);
    assert_eq!(frac_to_ticks(0x8000), 0);
    assert_eq!(frac_to_ticks(0x1_0000), 1);
    assert_eq!(frac_to_ticks(0x4000_0000), 15_625);
    assert_eq!(frac_to_ticks(0x8000_0000), 31_249);
    assert_eq!(frac_to_ticks(0xc000_0000), 46_874);
    assert_eq!(frac_to_ticks(0x1234_5678), 4_444);
    // The last tick of the second is never reached.
    assert_eq!(frac_to_ticks(u32::max_value()), 62_498);
}

#[test]
fn ticks_monotonic() {
    let mut last = 0;
    for step in 0..0x1_0000u32 {
        let ticks = frac_to_ticks(step << 16);
        assert!(ticks >= last);
        assert!(u32::from(ticks) < TICKS_PER_SECOND);
        last = ticks;
    }
}

#[test]
fn accept_server_reply() {
    let endpoint = Endpoint::default();
    let bytes = reply(0x1c, NTP_SECS, 0x8000_0000);
    assert_eq!(endpoint.process(&bytes), Some(Time { secs: UNIX_SECS, ticks: 31_249 }));

    // Leap second warnings do not matter.
    let bytes = reply(0x5c, NTP_SECS, 0);
    assert_eq!(endpoint.process(&bytes), Some(Time { secs: UNIX_SECS, ticks: 0 }));

    let y2k = Endpoint::new(Epoch::Y2k);
    let bytes = reply(0x1c, NTP_SECS, 0);
    assert_eq!(y2k.process(&bytes).map(|time| time.secs), Some(631_152_000));
}

#[test]
fn reject_invalid_reply() {
    let endpoint = Endpoint::default();
    // Unsynchronized server.
    assert_eq!(endpoint.process(&reply(0xdc, NTP_SECS, 0)), None);
    // Client mode, broadcast mode.
    assert_eq!(endpoint.process(&reply(0x1b, NTP_SECS, 0)), None);
    assert_eq!(endpoint.process(&reply(0x1d, NTP_SECS, 0)), None);
    // Version 4.
    assert_eq!(endpoint.process(&reply(0x24, NTP_SECS, 0)), None);
    // No transmit time.
    assert_eq!(endpoint.process(&reply(0x1c, 0, 0)), None);
    // Wrong length, in either direction.
    let bytes = reply(0x1c, NTP_SECS, 0);
    assert_eq!(endpoint.process(&bytes[..47]), None);
    let mut long = [0; 52];
    long[..48].copy_from_slice(&bytes);
    assert_eq!(endpoint.process(&long), None);
}

#[test]
fn emit_request() {
    let endpoint = Endpoint::default();
    let mut bytes = [0xff; 50];
    assert_eq!(endpoint.emit_request(&mut bytes), Ok(sntp_wire::PACKET_LEN));
    assert_eq!(bytes[0], 0x1b);
    assert!(bytes[1..48].iter().all(|&b| b == 0));
    assert_eq!(&bytes[48..], &[0xff, 0xff]);

    assert_eq!(endpoint.emit_request(&mut bytes[..47]), Err(Error::BadSize));
}

#[test]
fn client_sets_clock() {
    let mut client = Client::new(SERVER, Endpoint::default(), Recorder::default());
    let bytes = reply(0x1c, NTP_SECS, 0x4000_0000);

    client.reply(&bytes, SERVER, sntp_wire::SERVER_PORT, 48);
    assert_eq!(client.clock().times, vec![Time { secs: UNIX_SECS, ticks: 15_625 }]);

    // Other servers and ports are ignored.
    let other = ipv4::Address::new(192, 168, 200, 4);
    client.reply(&bytes, other, sntp_wire::SERVER_PORT, 48);
    client.reply(&bytes, SERVER, 124, 48);
    // The payload beyond the datagram does not count.
    let mut padded = [0; 64];
    padded[..48].copy_from_slice(&bytes);
    client.reply(&padded, SERVER, sntp_wire::SERVER_PORT, 40);
    assert_eq!(client.into_clock().times.len(), 1);
}

#[test]
fn client_ignores_requests() {
    let mut client = Client::new(SERVER, Endpoint::default(), Recorder::default());
    let mut bytes = reply(0x1c, NTP_SECS, 0);
    assert_eq!(client.request(&mut bytes, SERVER, sntp_wire::SERVER_PORT, 48), None);
    assert!(client.clock().times.is_empty());
}

#[test]
fn function_clock() {
    let mut last = None;
    {
        let mut client = Client::new(SERVER, Endpoint::default(), FnHandler(|time: Time| {
            last = Some(time);
        }));
        client.reply(&reply(0x1c, NTP_SECS + 1, 0), SERVER, sntp_wire::SERVER_PORT, 48);
    }
    assert_eq!(last, Some(Time { secs: UNIX_SECS + 1, ticks: 0 }));
}
