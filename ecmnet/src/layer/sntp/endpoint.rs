use crate::layer::{udp, Error, Result};
use crate::time::Epoch;
use crate::wire::{sntp, sntp_packet, Ipv4Address, SntpMode};
use crate::wire::sntp::{LeapIndicator, Repr};

use super::Clock;

/// The protocol version spoken, and expected in replies.
pub const VERSION: u8 = 3;

/// The rate of the timer that the fraction of a second is expressed in.
pub const TICKS_PER_SECOND: u32 = 62_500;

/// A point in time as delivered to the clock.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Time {
    /// Seconds since the epoch of the clock.
    pub secs: u32,
    /// Timer ticks since the start of the second.
    pub ticks: u16,
}

/// Convert the binary fraction of an NTP timestamp to timer ticks.
///
/// Multiplies with 62500 / 2^32 using shifts and adds only. The set bits of 62500 at positions
/// 15, 14, 13, 12, 10, 5 and 1 are added up with the fraction shifted accordingly, then the
/// result is rounded to 16 bits. Due to the truncating shifts the largest result is 62498, one
/// short of the last tick, so a compare interrupt on that tick still fires.
pub fn frac_to_ticks(frac: u32) -> u16 {
    let mut frac = frac;
    let mut acc = 0u32;
    for bit in (1..=15).rev() {
        frac >>= 1;
        if let 1 | 5 | 10 | 12 | 13 | 14 | 15 = bit {
            acc += frac;
        }
    }
    ((acc + 0x8000) >> 16) as u16
}

/// Validates time server replies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Endpoint {
    epoch: Epoch,
    version: u8,
}

impl Endpoint {
    /// Create an endpoint delivering times relative to an epoch.
    pub fn new(epoch: Epoch) -> Self {
        Endpoint {
            epoch,
            version: VERSION,
        }
    }

    /// The epoch of delivered times.
    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// Extract the time from a reply, the payload of a UDP datagram.
    ///
    /// Only a server reply of our version, with a synchronized server and a transmit timestamp
    /// is accepted.
    pub fn process(&self, payload: &[u8]) -> Option<Time> {
        if payload.len() != sntp::PACKET_LEN {
            return None;
        }

        let repr = Repr::parse(sntp_packet::new_unchecked(payload)).ok()?;
        if repr.mode != SntpMode::Server || repr.version != self.version {
            net_debug!("sntp: unexpected {}", repr);
            return None;
        }

        if repr.leap_indicator == LeapIndicator::Alarm || repr.transmit_timestamp.is_unknown() {
            net_debug!("sntp: server not synchronized");
            return None;
        }

        Some(Time {
            secs: self.epoch.from_ntp(repr.transmit_timestamp.secs),
            ticks: frac_to_ticks(repr.transmit_timestamp.frac),
        })
    }

    /// Write a client request.
    ///
    /// Returns the length of the request.
    pub fn emit_request(&self, payload: &mut [u8]) -> Result<usize> {
        if payload.len() < sntp::PACKET_LEN {
            return Err(Error::BadSize);
        }

        let packet = sntp_packet::new_unchecked_mut(&mut payload[..sntp::PACKET_LEN]);
        Repr::client_request(self.version).emit(packet);
        Ok(sntp::PACKET_LEN)
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Endpoint::new(Epoch::default())
    }
}

/// Sets a clock from the replies of one time server.
///
/// Plugs into the application side of the UDP layer, possibly paired with other receivers.
#[derive(Debug)]
pub struct Client<C> {
    server: Ipv4Address,
    endpoint: Endpoint,
    clock: C,
}

impl<C: Clock> Client<C> {
    /// Create a client for a time server.
    pub fn new(server: Ipv4Address, endpoint: Endpoint, clock: C) -> Self {
        Client {
            server,
            endpoint,
            clock,
        }
    }

    /// The time server.
    pub fn server(&self) -> Ipv4Address {
        self.server
    }

    /// The clock being set.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// The clock being set, mutably.
    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    /// Take back the clock.
    pub fn into_clock(self) -> C {
        self.clock
    }
}

impl<C: Clock> udp::Recv for Client<C> {
    fn reply(&mut self, payload: &[u8], src_addr: Ipv4Address, src_port: u16, len: usize) {
        if src_addr != self.server || src_port != sntp::SERVER_PORT {
            return;
        }

        if let Some(time) = self.endpoint.process(&payload[..len]) {
            net_debug!("sntp: time {}.{:05}", time.secs, time.ticks);
            self.clock.set_time(time);
        }
    }
}
