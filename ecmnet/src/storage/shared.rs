use core::cell::RefCell;

use critical_section::Mutex;

use super::PacketBuffer;

/// A packet ring accessible from interrupt handlers and the main loop alike.
///
/// Every access runs inside a critical section, so the cursors of the ring are only ever seen in
/// a consistent state. Keep the closures short, interrupts are masked while they run.
///
/// ```
/// use ecmnet::storage::{PacketBuffer, Shared};
///
/// static RING: Shared<[u8; 1024]> = Shared::new(PacketBuffer::zeroed());
///
/// let queued = RING.with(|ring| {
///     let handle = ring.allocate(42)?;
///     ring.put_input(handle);
///     Some(())
/// });
/// assert!(queued.is_some());
/// ```
pub struct Shared<S> {
    inner: Mutex<RefCell<PacketBuffer<S>>>,
}

impl<S> Shared<S> {
    /// Wrap a ring for shared access.
    pub const fn new(ring: PacketBuffer<S>) -> Self {
        Shared {
            inner: Mutex::new(RefCell::new(ring)),
        }
    }

    /// Run a closure with exclusive access to the ring.
    ///
    /// # Panics
    /// This function panics when called reentrantly from within its own closure.
    pub fn with<R>(&self, f: impl FnOnce(&mut PacketBuffer<S>) -> R) -> R {
        critical_section::with(|cs| f(&mut self.inner.borrow_ref_mut(cs)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_between_threads() {
        static RING: Shared<[u8; 512]> = Shared::new(PacketBuffer::zeroed());

        let producer = std::thread::spawn(|| {
            let mut sent = 0;
            while sent < 100 {
                let queued = RING.with(|ring| {
                    let mut handle = ring.allocate(20)?;
                    ring.payload_mut(&mut handle)[0] = sent as u8;
                    ring.put_input(handle);
                    Some(())
                });
                if queued.is_some() {
                    sent += 1;
                }
            }
        });

        let mut seen = 0;
        while seen < 100 {
            RING.with(|ring| {
                if let Some(handle) = ring.get_input() {
                    assert_eq!(ring.payload(&handle)[0], seen as u8);
                    ring.release_input(handle);
                    seen += 1;
                }
            });
        }

        producer.join().unwrap();
        assert!(RING.with(|ring| ring.is_idle()));
    }
}
