//! Protocol numbers and the Internet checksum.
use core::fmt;

enum_with_unknown! {
    /// IP datagram encapsulated protocol.
    pub enum Protocol(u8) {
        /// Internet Control Message Protocol.
        Icmp = 0x01,
        /// Transmission Control Protocol, recognized but never handled.
        Tcp  = 0x06,
        /// User Datagram Protocol.
        Udp  = 0x11,
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Protocol::Icmp => write!(f, "ICMP"),
            Protocol::Tcp  => write!(f, "TCP"),
            Protocol::Udp  => write!(f, "UDP"),
            Protocol::Unknown(id) => write!(f, "0x{:02x}", id)
        }
    }
}

/// RFC 1071 one's complement arithmetic.
///
/// All sums are kept *without* the final complement so that they can be combined. A buffer whose
/// checksum field holds the complement of the sum over the rest verifies to `!0`.
pub mod checksum {
    use byteorder::{ByteOrder, NetworkEndian};

    use crate::wire::{IpProtocol, Ipv4Address};

    fn propagate_carries(word: u32) -> u16 {
        let sum = (word >> 16) + (word & 0xffff);
        ((sum >> 16) as u16) + (sum as u16)
    }

    /// Add a word to a sum with end-around carry.
    ///
    /// This is the primitive for patching a checksum after changing a single field.
    pub fn add_with_carry(sum: u16, word: u16) -> u16 {
        let (sum, carry) = sum.overflowing_add(word);
        sum + carry as u16
    }

    /// Compute an RFC 1071 compliant checksum (without the final complement).
    ///
    /// A trailing odd byte counts as the high half of a final word.
    pub fn data(mut data: &[u8]) -> u16 {
        let mut accum = 0;

        // For each 32-byte chunk...
        const CHUNK_SIZE: usize = 32;
        while data.len() >= CHUNK_SIZE {
            let mut d = &data[..CHUNK_SIZE];
            // ... take by 2 bytes and sum them.
            while d.len() >= 2 {
                accum += NetworkEndian::read_u16(d) as u32;
                d = &d[2..];
            }

            data = &data[CHUNK_SIZE..];
        }

        // Sum the rest that does not fit the last 32-byte chunk,
        // taking by 2 bytes.
        while data.len() >= 2 {
            accum += NetworkEndian::read_u16(data) as u32;
            data = &data[2..];
        }

        // Add the last remaining odd byte, if any.
        if let Some(&value) = data.first() {
            accum += (value as u32) << 8;
        }

        propagate_carries(accum)
    }

    /// Combine several RFC 1071 compliant checksums.
    pub fn combine(checksums: &[u16]) -> u16 {
        let mut accum: u32 = 0;
        for &word in checksums {
            accum += word as u32;
        }
        propagate_carries(accum)
    }

    /// Compute the IPv4 pseudo header checksum of an upper layer packet.
    pub fn pseudo_header(src_addr: Ipv4Address, dst_addr: Ipv4Address,
                         protocol: IpProtocol, length: u16) -> u16 {
        let mut proto_len = [0u8; 4];
        proto_len[1] = protocol.into();
        NetworkEndian::write_u16(&mut proto_len[2..4], length);

        combine(&[
            data(src_addr.as_bytes()),
            data(dst_addr.as_bytes()),
            data(&proto_len[..])
        ])
    }
}
