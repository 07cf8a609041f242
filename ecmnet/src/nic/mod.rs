//! The transport side of the packet ring.
//!
//! A USB-ECM function moves Ethernet frames as a sequence of bulk transfers of a fixed maximum
//! size, with a short transfer terminating each frame. The adapters here sit between such a
//! transport and the [`PacketBuffer`]:
//!
//! * [`prefilter`] decides from the first bytes of a frame whether it is worth storing at all and
//!   how much room it needs, so that frames for other hosts never occupy the ring.
//! * [`fragment`] reassembles received fragments into input records and splits output records
//!   into fragments for transmission.
//!
//! Both only work on byte slices, the actual endpoint registers are the business of the firmware.
//! All methods are short and bounded, they are meant to run in the transport interrupt with the
//! ring borrowed through [`Shared::with`].
//!
//! [`PacketBuffer`]: ../storage/struct.PacketBuffer.html
//! [`Shared::with`]: ../storage/struct.Shared.html#method.with
//! [`prefilter`]: prefilter/index.html
//! [`fragment`]: fragment/index.html
pub mod fragment;
pub mod prefilter;

pub use self::fragment::{Receiver, Rx, Transmitter, FRAGMENT_SIZE};
pub use self::prefilter::{frame_len, Filter};
