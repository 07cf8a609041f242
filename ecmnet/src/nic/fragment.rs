//! Moving frames as fixed size fragments.
//!
//! A frame is transferred as a sequence of fragments of the full fragment size, terminated by
//! the first fragment that is shorter. A frame whose length is a multiple of the fragment size is
//! terminated with an empty fragment.
use crate::storage::{Handle, PacketBuffer};

use super::prefilter::{self, Filter};

/// The maximum packet size of a full speed bulk endpoint.
pub const FRAGMENT_SIZE: usize = 64;

/// What became of a received fragment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Rx {
    /// The fragment was stored, the frame continues.
    Partial,
    /// The fragment completed a frame, which was queued for input.
    Complete,
    /// The fragment belongs to a frame that is not stored.
    Dropped,
    /// There is no room for the frame in the ring.
    ///
    /// Nothing was consumed. Offer the same fragment again once output records were released.
    Stalled,
}

/// Reassembles received fragments into input records.
#[derive(Debug)]
pub struct Receiver {
    filter: Filter,
    fragment_size: usize,
    state: State,
}

#[derive(Debug)]
enum State {
    /// Expecting the first fragment of a frame.
    Waiting,
    /// Storing a frame.
    Reading {
        handle: Handle,
        len: usize,
        written: usize,
    },
    /// Passing over the rest of a dropped frame.
    Skipping,
}

impl Receiver {
    /// Create a receiver for fragments of the default size.
    pub fn new(filter: Filter) -> Self {
        Receiver::with_fragment_size(filter, FRAGMENT_SIZE)
    }

    /// Create a receiver for fragments of some other size.
    ///
    /// # Panics
    /// This function panics if the fragment size is smaller than the inspected frame header.
    pub fn with_fragment_size(filter: Filter, fragment_size: usize) -> Self {
        assert!(fragment_size >= prefilter::HEADER_LEN, "fragments of {} bytes", fragment_size);
        Receiver {
            filter,
            fragment_size,
            state: State::Waiting,
        }
    }

    /// The filter applied to new frames.
    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// Query whether a frame is partially stored.
    pub fn is_receiving(&self) -> bool {
        match self.state {
            State::Reading { .. } => true,
            _ => false,
        }
    }

    /// Process the next received fragment.
    ///
    /// The first fragment of a frame decides about it through the filter and allocates the full
    /// record. Bytes beyond the length of the frame are ignored. A frame that ends before its
    /// announced length is discarded.
    pub fn receive<S>(&mut self, ring: &mut PacketBuffer<S>, fragment: &[u8]) -> Rx
    where
        S: AsRef<[u8]> + AsMut<[u8]>,
    {
        let last = fragment.len() < self.fragment_size;
        let state = core::mem::replace(&mut self.state, State::Waiting);

        let (handle, len, written) = match state {
            State::Reading { handle, len, written } => (handle, len, written),
            State::Skipping => {
                if !last {
                    self.state = State::Skipping;
                }
                return Rx::Dropped;
            },
            State::Waiting => {
                let len = match prefilter::frame_len(fragment, &self.filter) {
                    Some(len) => len,
                    None => return self.drop_frame(last),
                };

                if last && len > fragment.len() {
                    net_trace!("fragment: frame of {} bytes ends after {}", len, fragment.len());
                    return Rx::Dropped;
                }

                match ring.allocate(len) {
                    Some(handle) => (handle, len, 0),
                    None => return Rx::Stalled,
                }
            },
        };

        let mut handle = handle;
        let count = fragment.len().min(len - written);
        ring.payload_mut(&mut handle)[written..written + count]
            .copy_from_slice(&fragment[..count]);
        let written = written + count;

        if !last {
            self.state = State::Reading { handle, len, written };
            Rx::Partial
        } else if written < len {
            net_trace!("fragment: frame of {} bytes truncated at {}", len, written);
            ring.discard(handle);
            Rx::Dropped
        } else {
            ring.put_input(handle);
            Rx::Complete
        }
    }

    /// Abandon a partially received frame, for example after a bus reset.
    pub fn reset<S>(&mut self, ring: &mut PacketBuffer<S>)
    where
        S: AsRef<[u8]> + AsMut<[u8]>,
    {
        if let State::Reading { handle, .. } = core::mem::replace(&mut self.state, State::Waiting) {
            ring.discard(handle);
        }
    }

    fn drop_frame(&mut self, last: bool) -> Rx {
        if !last {
            self.state = State::Skipping;
        }
        Rx::Dropped
    }
}

/// Splits output records into fragments for transmission.
#[derive(Debug)]
pub struct Transmitter {
    fragment_size: usize,
    current: Option<(Handle, usize)>,
}

impl Transmitter {
    /// Create a transmitter for fragments of the default size.
    pub fn new() -> Self {
        Transmitter::with_fragment_size(FRAGMENT_SIZE)
    }

    /// Create a transmitter for fragments of some other size.
    ///
    /// # Panics
    /// This function panics if the fragment size is zero.
    pub fn with_fragment_size(fragment_size: usize) -> Self {
        assert!(fragment_size > 0);
        Transmitter {
            fragment_size,
            current: None,
        }
    }

    /// Query whether a frame is partially sent.
    pub fn is_sending(&self) -> bool {
        self.current.is_some()
    }

    /// Write the next fragment to send into `out`.
    ///
    /// Returns the length of the fragment, which may be zero to terminate a frame, or `None` when
    /// no frame is queued for output. The record is released with its last fragment.
    ///
    /// # Panics
    /// This function panics if `out` is shorter than the fragment size.
    pub fn send<S>(&mut self, ring: &mut PacketBuffer<S>, out: &mut [u8]) -> Option<usize>
    where
        S: AsRef<[u8]> + AsMut<[u8]>,
    {
        let (handle, sent) = match self.current.take() {
            Some(current) => current,
            None => (ring.get_output()?, 0),
        };

        let payload = ring.payload(&handle);
        let count = (payload.len() - sent).min(self.fragment_size);
        out[..count].copy_from_slice(&payload[sent..sent + count]);

        if count < self.fragment_size {
            ring.release_output(handle);
        } else {
            self.current = Some((handle, sent + count));
        }

        Some(count)
    }
}

impl Default for Transmitter {
    fn default() -> Self {
        Transmitter::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::EthernetAddress;

    const MAC_OWN: EthernetAddress = EthernetAddress([0x02, 0, 0, 0, 0, 0x40]);

    /// A UDP frame of `len` bytes to us, with a counting payload.
    fn frame(len: usize) -> Vec<u8> {
        let mut frame: Vec<u8> = (0..len).map(|i| i as u8).collect();
        frame[..6].copy_from_slice(&MAC_OWN.0);
        frame[12..14].copy_from_slice(&[0x08, 0x00]);
        frame[14] = 0x45;
        frame[16..18].copy_from_slice(&((len - 14) as u16).to_be_bytes());
        frame[20..22].copy_from_slice(&[0, 0]);
        frame[23] = 17;
        frame
    }

    fn fragments(frame: &[u8]) -> Vec<&[u8]> {
        let mut fragments: Vec<_> = frame.chunks(FRAGMENT_SIZE).collect();
        if frame.len() % FRAGMENT_SIZE == 0 {
            fragments.push(&[]);
        }
        fragments
    }

    #[test]
    fn reassemble() {
        let mut ring = PacketBuffer::new([0u8; 512]);
        let mut rx = Receiver::new(Filter::new(MAC_OWN));

        for &len in &[46, 64, 150] {
            let frame = frame(len);
            let fragments = fragments(&frame);
            let (last, init) = fragments.split_last().unwrap();
            for fragment in init {
                assert_eq!(rx.receive(&mut ring, fragment), Rx::Partial);
                assert!(rx.is_receiving());
            }
            assert_eq!(rx.receive(&mut ring, last), Rx::Complete);
            assert!(!rx.is_receiving());

            let handle = ring.get_input().unwrap();
            assert_eq!(ring.payload(&handle), &frame[..]);
            ring.release_input(handle);
        }
    }

    #[test]
    fn trailing_bytes_ignored() {
        let mut ring = PacketBuffer::new([0u8; 256]);
        let mut rx = Receiver::new(Filter::new(MAC_OWN));
        let mut padded = frame(46);
        padded.resize(60, 0);

        assert_eq!(rx.receive(&mut ring, &padded), Rx::Complete);
        let handle = ring.get_input().unwrap();
        assert_eq!(ring.len(&handle), 46);
    }

    #[test]
    fn truncated() {
        let mut ring = PacketBuffer::new([0u8; 256]);
        let mut rx = Receiver::new(Filter::new(MAC_OWN));
        let frame = frame(150);

        // Ends within the first fragment.
        assert_eq!(rx.receive(&mut ring, &frame[..40]), Rx::Dropped);
        // Ends early after a full fragment.
        assert_eq!(rx.receive(&mut ring, &frame[..64]), Rx::Partial);
        assert_eq!(rx.receive(&mut ring, &frame[64..100]), Rx::Dropped);

        assert!(ring.get_input().is_none());
        assert!(ring.is_idle());
    }

    #[test]
    fn skip_foreign() {
        let mut ring = PacketBuffer::new([0u8; 256]);
        let mut rx = Receiver::new(Filter::new(MAC_OWN));
        let mut foreign = frame(150);
        foreign[5] = 0x41;

        for fragment in fragments(&foreign) {
            assert_eq!(rx.receive(&mut ring, fragment), Rx::Dropped);
        }
        // The next frame starts fresh.
        assert_eq!(rx.receive(&mut ring, &frame(46)), Rx::Complete);
        assert!(ring.get_input().is_some());
    }

    #[test]
    fn stall_and_retry() {
        let mut ring = PacketBuffer::new([0u8; 128]);
        let mut rx = Receiver::new(Filter::new(MAC_OWN));
        let mut tx = Transmitter::new();

        // Occupy most of the ring with output.
        let handle = ring.allocate(80).unwrap();
        ring.put_output(handle);

        let frame = frame(46);
        assert_eq!(rx.receive(&mut ring, &frame), Rx::Stalled);
        assert!(!rx.is_receiving());

        let mut out = [0; FRAGMENT_SIZE];
        assert_eq!(tx.send(&mut ring, &mut out), Some(64));
        assert_eq!(tx.send(&mut ring, &mut out), Some(16));

        assert_eq!(rx.receive(&mut ring, &frame), Rx::Complete);
    }

    #[test]
    fn reset_discards() {
        let mut ring = PacketBuffer::new([0u8; 256]);
        let mut rx = Receiver::new(Filter::new(MAC_OWN));
        let frame = frame(150);

        assert_eq!(rx.receive(&mut ring, &frame[..64]), Rx::Partial);
        rx.reset(&mut ring);
        assert!(!rx.is_receiving());
        assert!(ring.is_idle());
    }

    #[test]
    fn transmit() {
        let mut ring = PacketBuffer::new([0u8; 512]);
        let mut tx = Transmitter::new();
        let mut out = [0; FRAGMENT_SIZE];
        assert_eq!(tx.send(&mut ring, &mut out), None);

        for &len in &[42, 128] {
            let mut handle = ring.allocate(len).unwrap();
            for (i, byte) in ring.payload_mut(&mut handle).iter_mut().enumerate() {
                *byte = i as u8;
            }
            ring.put_output(handle);
        }

        assert_eq!(tx.send(&mut ring, &mut out), Some(42));
        assert_eq!(out[41], 41);
        assert!(!tx.is_sending());

        assert_eq!(tx.send(&mut ring, &mut out), Some(64));
        assert!(tx.is_sending());
        assert_eq!(tx.send(&mut ring, &mut out), Some(64));
        assert_eq!(out[63], 127);
        // The terminating empty fragment.
        assert_eq!(tx.send(&mut ring, &mut out), Some(0));
        assert!(!tx.is_sending());

        assert_eq!(tx.send(&mut ring, &mut out), None);
        assert!(ring.is_idle());
    }
}
