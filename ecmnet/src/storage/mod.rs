//! Packet memory shared by the USB side and the protocol stack.
//!
//! All packets live in a single [`PacketBuffer`], a ring of variable length records. The USB
//! receive path writes frames into it, the protocol stack answers them in place, and the USB
//! transmit path sends them back out. The [`Shared`] wrapper makes one ring usable from both
//! interrupt handlers and the main loop.
//!
//! [`PacketBuffer`]: struct.PacketBuffer.html
//! [`Shared`]: struct.Shared.html
mod record;
mod ring;
mod shared;

pub use self::record::{span, State, ALIGN, HEADER_LEN, MAX_LEN};
pub use self::ring::{Handle, PacketBuffer};
pub use self::shared::Shared;
