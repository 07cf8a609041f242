use core::convert::TryFrom;

use super::record::{self, State, ALIGN, HEADER_LEN, MAX_LEN};

/// A ring of variable length packet records for both directions.
///
/// One contiguous arena holds every packet that is being received, processed or transmitted.
/// Each record is a 16-bit [`State`] word followed by the payload, padded so that the next record
/// starts aligned. The payload starts two bytes into the record, hence behind a 14 byte Ethernet
/// header the network layer is aligned again.
///
/// There is one writer and two readers:
///
/// * The writer appends records with [`allocate`] and finishes them with [`put_input`] or
///   [`put_output`].
/// * The input reader hands out received frames with [`get_input`]. These are either released or
///   turned into replies in place with [`reattach_output`].
/// * The output reader hands out frames to transmit with [`get_output`].
///
/// The output reader never passes a record still waiting for input processing, so replies keep
/// the order of their requests and the output reader is always the slowest cursor. Released
/// records that are not at a cursor are marked as skipped and reclaimed once both readers passed.
/// There is no free list and no dynamic allocation. An exhausted ring is reported to the caller,
/// which decides whether to drop or to retry later.
///
/// The arena must hold at least two alignment units. The last unit of the arena is reserved for
/// the end marker behind a record that reaches the very end.
///
/// [`State`]: enum.State.html
/// [`allocate`]: #method.allocate
/// [`put_input`]: #method.put_input
/// [`put_output`]: #method.put_output
/// [`get_input`]: #method.get_input
/// [`reattach_output`]: #method.reattach_output
/// [`get_output`]: #method.get_output
pub struct PacketBuffer<S> {
    storage: S,
    /// Offset of the reserved end unit, the usable capacity.
    end: usize,
    next_writer: usize,
    input_reader: usize,
    output_reader: usize,
}

/// An exclusive reference to one record in a [`PacketBuffer`].
///
/// Handles are consumed by the operations that hand the record over to another party, so a
/// record can not be finished or released twice through the same handle.
///
/// [`PacketBuffer`]: struct.PacketBuffer.html
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct Handle {
    offset: usize,
}

impl Handle {
    /// The offset of the record within the arena.
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl<const N: usize> PacketBuffer<[u8; N]> {
    /// A ring over a zeroed array, usable in `static` items.
    ///
    /// # Panics
    /// Fails to evaluate if `N` is smaller than two alignment units.
    pub const fn zeroed() -> Self {
        let end = (N / ALIGN - 1) * ALIGN;
        assert!(end >= ALIGN, "packet buffer too small");
        PacketBuffer {
            storage: [0; N],
            end,
            next_writer: 0,
            input_reader: 0,
            output_reader: 0,
        }
    }
}

impl<S: AsRef<[u8]> + AsMut<[u8]>> PacketBuffer<S> {
    /// Set up an empty ring over some storage.
    ///
    /// # Panics
    /// This function panics if the storage is smaller than two alignment units.
    pub fn new(mut storage: S) -> Self {
        let units = storage.as_ref().len() / ALIGN;
        assert!(units >= 2, "packet buffer too small");
        State::EndOfRing.write(storage.as_mut());
        PacketBuffer {
            storage,
            end: (units - 1) * ALIGN,
            next_writer: 0,
            input_reader: 0,
            output_reader: 0,
        }
    }

    /// The number of arena bytes available to records.
    pub fn capacity(&self) -> usize {
        self.end
    }

    /// Query whether both queues are drained and nothing is being written.
    ///
    /// Released records are only reclaimed while the readers scan, so this may report a busy ring
    /// until the next call to [`get_output`].
    ///
    /// [`get_output`]: #method.get_output
    pub fn is_idle(&self) -> bool {
        self.output_reader == self.next_writer
            && self.input_reader == self.next_writer
    }

    fn state(&self, at: usize) -> State {
        State::read(&self.storage.as_ref()[at..])
    }

    fn set_state(&mut self, at: usize, state: State) {
        state.write(&mut self.storage.as_mut()[at..])
    }

    fn next_record(at: usize, len: u16) -> usize {
        at + record::span(len.into())
    }

    fn checked_len(&self, len: usize) -> Option<u16> {
        if len > MAX_LEN || record::span(len) > self.end {
            return None;
        }
        u16::try_from(len).ok()
    }

    /// Allocate a new record with `len` bytes of payload.
    ///
    /// The record stays invisible to both readers until it is finished with [`put_input`] or
    /// [`put_output`]. Returns `None` when the ring has no room left, which is transient: space
    /// returns as soon as the readers release records. Lengths that could never fit also return
    /// `None`.
    ///
    /// [`put_input`]: #method.put_input
    /// [`put_output`]: #method.put_output
    pub fn allocate(&mut self, len: usize) -> Option<Handle> {
        let len = self.checked_len(len)?;
        let offset = self.append(len, None)?;
        Some(Handle { offset })
    }

    /// Write a new record at the writer, optionally moving an old pending record into it.
    fn append(&mut self, len: u16, moved: Option<(usize, u16)>) -> Option<usize> {
        let last_reader = self.output_reader;
        let mut writer = self.next_writer;
        let mut next = Self::next_record(writer, len);

        if writer >= last_reader {
            if next > self.end {
                next = Self::next_record(0, len);
                if writer == last_reader {
                    // Empty ring, all readers can restart at the front.
                    self.input_reader = 0;
                    self.output_reader = 0;
                } else if next < last_reader {
                    self.set_state(writer, State::StartOver);
                } else {
                    net_debug!("ring: no room for {} bytes at the front", len);
                    return None;
                }
                writer = 0;
            }
        } else if next >= last_reader {
            net_debug!("ring: no room for {} bytes", len);
            return None;
        }

        self.set_state(writer, State::Pending(len));
        if let Some((old, old_len)) = moved {
            self.set_state(old, State::Skip(old_len));
            let from = old + HEADER_LEN;
            let len = usize::from(old_len);
            self.storage.as_mut().copy_within(from..from + len, writer + HEADER_LEN);
        }
        self.set_state(next, State::EndOfRing);
        self.next_writer = next;
        Some(writer)
    }

    /// Change the length of a record that has not been finished yet.
    ///
    /// Shrinking always succeeds in place. Growing happens in place when the record is the last
    /// one and there is headroom, otherwise the payload moves to a newly allocated record and the
    /// returned handle points there. On failure the old handle is returned, still valid and with
    /// its payload untouched.
    ///
    /// # Panics
    /// This function panics if the record was already finished.
    pub fn resize(&mut self, handle: Handle, len: usize) -> Result<Handle, Handle> {
        let at = handle.offset;
        let old_len = match self.state(at) {
            State::EndOfRing => 0,
            State::Pending(len) => len,
            other => panic!("resize of a finished record: {:?}", other),
        };

        let len = match self.checked_len(len) {
            Some(len) => len,
            None => return Err(handle),
        };

        let next = Self::next_record(at, len);
        let old_next = Self::next_record(at, old_len);
        if next <= old_next {
            self.shrink_at(at, old_len, len);
            self.set_state(at, State::Pending(len));
            return Ok(handle);
        }

        let fits = if at < self.output_reader {
            next < self.output_reader
        } else {
            next <= self.end
        };

        if old_next == self.next_writer && fits {
            self.set_state(next, State::EndOfRing);
            self.set_state(at, State::Pending(len));
            self.next_writer = next;
            return Ok(handle);
        }

        match self.append(len, Some((at, old_len))) {
            Some(offset) => Ok(Handle { offset }),
            None => Err(handle),
        }
    }

    /// Give back the space behind a record whose length drops from `old_len` to `len`.
    fn shrink_at(&mut self, at: usize, old_len: u16, len: u16) {
        let next = Self::next_record(at, len);
        let old_next = Self::next_record(at, old_len);
        if next == old_next {
            return;
        }

        if self.next_writer == old_next {
            self.next_writer = next;
            self.set_state(next, State::EndOfRing);
        } else {
            let gap = (old_next - next - HEADER_LEN) as u16;
            self.set_state(next, State::Skip(gap));
        }
    }

    /// Reduce the length of a pending or received record in place.
    ///
    /// Used when the answer written over a received frame is shorter than the frame itself.
    ///
    /// # Panics
    /// This function panics if the record is neither pending nor an input, or if `len` is larger
    /// than the current length.
    pub fn shrink(&mut self, handle: &Handle, len: usize) {
        let at = handle.offset;
        let state = self.state(at);
        let old_len = state.len();
        assert!(len <= usize::from(old_len), "shrink from {} to {}", old_len, len);
        // Fits as it is no longer than the old length.
        let len = len as u16;
        let state = match state {
            State::EndOfRing | State::Pending(_) => State::Pending(len),
            State::Input(_) => State::Input(len),
            other => panic!("shrink of a record not owned: {:?}", other),
        };
        self.shrink_at(at, old_len, len);
        self.set_state(at, state);
    }

    /// Abandon a record that has not been finished.
    ///
    /// The space is reclaimed right away if nothing was allocated after it, otherwise readers
    /// skip it.
    ///
    /// # Panics
    /// This function panics if the record was already finished.
    pub fn discard(&mut self, handle: Handle) {
        let at = handle.offset;
        let len = match self.state(at) {
            State::EndOfRing => 0,
            State::Pending(len) => len,
            other => panic!("discard of a finished record: {:?}", other),
        };

        if self.next_writer == Self::next_record(at, len) {
            self.next_writer = at;
            self.set_state(at, State::EndOfRing);
        } else {
            self.set_state(at, State::Skip(len));
        }
    }

    fn finish(&mut self, handle: Handle, state: fn(u16) -> State) {
        let len = match self.state(handle.offset) {
            State::EndOfRing => 0,
            State::Pending(len) => len,
            other => panic!("record finished twice: {:?}", other),
        };
        self.set_state(handle.offset, state(len));
    }

    /// Finish a record and queue it for the protocol stack.
    ///
    /// # Panics
    /// This function panics if the record was already finished.
    pub fn put_input(&mut self, handle: Handle) {
        self.finish(handle, State::Input)
    }

    /// Finish a record and queue it for transmission.
    ///
    /// # Panics
    /// This function panics if the record was already finished.
    pub fn put_output(&mut self, handle: Handle) {
        self.finish(handle, State::Output)
    }

    /// Return the oldest record queued for the protocol stack.
    ///
    /// Output and released records in front of it are passed over. When the output reader sat at
    /// the same place it is pulled along to the first output record or, if there is none, to the
    /// input record found.
    pub fn get_input(&mut self) -> Option<Handle> {
        let mut reader = self.input_reader;
        let mut moved = false;
        let mut drag_output = self.output_reader == reader;

        let state = loop {
            let state = self.state(reader);
            reader = match state {
                State::Output(len) => {
                    if drag_output {
                        self.output_reader = reader;
                        drag_output = false;
                    }
                    Self::next_record(reader, len)
                },
                State::Skip(len) => Self::next_record(reader, len),
                State::StartOver => 0,
                _ => break state,
            };
            moved = true;
        };

        if moved {
            self.input_reader = reader;
            if drag_output {
                self.output_reader = reader;
            }
        }

        match state {
            State::Input(_) => Some(Handle { offset: reader }),
            _ => None,
        }
    }

    /// Return the oldest record queued for transmission.
    ///
    /// Released records in front of it are reclaimed. The output reader stops at records still
    /// queued for input, so this returns `None` while the oldest record awaits processing.
    pub fn get_output(&mut self) -> Option<Handle> {
        let input = self.input_reader;
        let mut reader = self.output_reader;
        let mut moved = false;
        let mut drag_input = false;

        let state = loop {
            let state = self.state(reader);
            let next = match state {
                State::Skip(len) => Self::next_record(reader, len),
                State::StartOver => 0,
                _ => break state,
            };
            moved = true;
            if reader == input {
                drag_input = true;
            }
            reader = next;
        };

        if moved {
            self.output_reader = reader;
            if drag_input {
                self.input_reader = reader;
            }
        }

        match state {
            State::Output(_) => Some(Handle { offset: reader }),
            _ => None,
        }
    }

    /// Drop a received record without answering it.
    ///
    /// # Panics
    /// This function panics if the record is not queued for input.
    pub fn release_input(&mut self, handle: Handle) {
        let at = handle.offset;
        let len = match self.state(at) {
            State::Input(len) => len,
            other => panic!("release of a record not queued for input: {:?}", other),
        };
        let next = Self::next_record(at, len);

        if self.input_reader == at && self.output_reader == at {
            self.input_reader = next;
            self.output_reader = next;
        } else {
            if self.input_reader == at {
                self.input_reader = next;
            }
            self.set_state(at, State::Skip(len));
        }
    }

    /// Give back a record after its transmission.
    ///
    /// # Panics
    /// This function panics if the record is not queued for output.
    pub fn release_output(&mut self, handle: Handle) {
        let at = handle.offset;
        let len = match self.state(at) {
            State::Output(len) => len,
            other => panic!("release of a record not queued for output: {:?}", other),
        };
        let next = Self::next_record(at, len);

        if self.output_reader == at {
            self.output_reader = next;
            if self.input_reader == at {
                self.input_reader = next;
            }
        } else {
            self.set_state(at, State::Skip(len));
        }
    }

    /// Turn a received record into an answer, queueing it for transmission in place.
    ///
    /// # Panics
    /// This function panics if the record is not queued for input.
    pub fn reattach_output(&mut self, handle: Handle) {
        let at = handle.offset;
        let len = match self.state(at) {
            State::Input(len) => len,
            other => panic!("reattach of a record not queued for input: {:?}", other),
        };
        self.set_state(at, State::Output(len));
        if self.input_reader == at {
            self.input_reader = Self::next_record(at, len);
        }
    }

    /// The payload length of a record.
    pub fn len(&self, handle: &Handle) -> usize {
        self.state(handle.offset).len().into()
    }

    /// The payload of a record.
    pub fn payload(&self, handle: &Handle) -> &[u8] {
        let start = handle.offset + HEADER_LEN;
        let len = self.len(handle);
        &self.storage.as_ref()[start..start + len]
    }

    /// The mutable payload of a record.
    pub fn payload_mut(&mut self, handle: &mut Handle) -> &mut [u8] {
        let start = handle.offset + HEADER_LEN;
        let len = self.len(handle);
        &mut self.storage.as_mut()[start..start + len]
    }
}

impl<S> core::fmt::Debug for PacketBuffer<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.debug_struct("PacketBuffer")
            .field("capacity", &self.end)
            .field("next_writer", &self.next_writer)
            .field("input_reader", &self.input_reader)
            .field("output_reader", &self.output_reader)
            .finish()
    }
}
