//! The state word in front of every record of the ring.
//!
//! The word is 16 bits in native byte order. The low 14 bits hold the payload length, the high
//! two bits the queue the record belongs to:
//!
//! | bits 15..14 | meaning                                   |
//! |-------------|-------------------------------------------|
//! | `00`        | being written, or end of ring if length 0 |
//! | `01`        | input queue                               |
//! | `10`        | output queue                              |
//! | `11`        | released, skip over it                    |
//!
//! The all ones word (a skip record of the largest length) is reserved to redirect readers to
//! the start of the arena.
use byteorder::{ByteOrder, NativeEndian};

/// Length of the state word.
pub const HEADER_LEN: usize = 2;

/// Records start at multiples of this.
pub const ALIGN: usize = 4;

/// The largest payload length a record can describe.
pub const MAX_LEN: usize = 0x3ffe;

const LEN_MASK: u16 = 0x3fff;
const FLAG_MASK: u16 = 0xc000;
const FLAG_INPUT: u16 = 0x4000;
const FLAG_OUTPUT: u16 = 0x8000;
const FLAG_SKIP: u16 = 0xc000;
const START_OVER: u16 = 0xffff;

/// The decoded state word of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    /// Nothing has been written here yet, readers stop.
    EndOfRing,
    /// Allocated and currently being filled by its writer.
    ///
    /// A pending record of length zero is indistinguishable from `EndOfRing`, which is fine as
    /// readers stop at both.
    Pending(u16),
    /// A finished record waiting for the protocol stack.
    Input(u16),
    /// A finished record waiting for transmission.
    Output(u16),
    /// A released record that readers pass over.
    Skip(u16),
    /// Continue reading at the start of the arena.
    StartOver,
}

impl State {
    /// Decode a raw state word.
    pub fn from_raw(raw: u16) -> Self {
        let len = raw & LEN_MASK;
        match raw & FLAG_MASK {
            _ if raw == START_OVER => State::StartOver,
            0 if len == 0 => State::EndOfRing,
            0 => State::Pending(len),
            FLAG_INPUT => State::Input(len),
            FLAG_OUTPUT => State::Output(len),
            _ => State::Skip(len),
        }
    }

    /// Encode into a raw state word.
    ///
    /// # Panics
    /// This function panics if the length does not fit into the word.
    pub fn into_raw(self) -> u16 {
        let (flag, len) = match self {
            State::EndOfRing => return 0,
            State::StartOver => return START_OVER,
            State::Pending(len) => (0, len),
            State::Input(len) => (FLAG_INPUT, len),
            State::Output(len) => (FLAG_OUTPUT, len),
            State::Skip(len) => (FLAG_SKIP, len),
        };
        assert!(usize::from(len) <= MAX_LEN, "record length {} out of range", len);
        flag | len
    }

    /// The payload length of the record, zero for markers.
    pub fn len(self) -> u16 {
        match self {
            State::EndOfRing | State::StartOver => 0,
            State::Pending(len) | State::Input(len)
                | State::Output(len) | State::Skip(len) => len,
        }
    }

    /// Read the state word at the start of `data`.
    pub fn read(data: &[u8]) -> Self {
        State::from_raw(NativeEndian::read_u16(data))
    }

    /// Write the state word to the start of `data`.
    pub fn write(self, data: &mut [u8]) {
        NativeEndian::write_u16(data, self.into_raw())
    }
}

/// The number of arena bytes occupied by a record with `len` bytes of payload.
pub fn span(len: usize) -> usize {
    (len + HEADER_LEN + ALIGN - 1) / ALIGN * ALIGN
}
