//! Packet ring and reflecting IPv4 pipeline for small USB-ECM network endpoints.
//!
//! ## Table of contents
//!
//! 1. [Design](#design)
//! 2. [The storage module](storage/index.html), the shared packet ring
//! 3. [The wire module](wire/index.html), byte level packet views
//! 4. [The layers](layer/index.html)
//! 5. [The interface](iface/index.html), wiring the layers into one pipeline
//! 6. [Transport adapters](nic/index.html)
//!
//! ## Design
//!
//! A microcontroller presenting itself as a USB Ethernet adapter has a few kilobytes of memory
//! and two execution contexts: the USB interrupt that moves frames in and out, and the main loop
//! that runs the protocols. Both share one arena, the [`PacketBuffer`], that stores frames of
//! either direction back to back. A received frame is never copied again. The protocol layers
//! validate it in place and, when an answer is due (an ARP reply, an echo reply, a UDP reply),
//! rewrite the very same bytes into the answer and hand the record back for transmission.
//!
//! Nothing within `ecmnet` dynamically allocates memory. Tables such as the neighbor cache are
//! passed in as preallocated storage and a full ring is reported as backpressure to the caller,
//! never as a panic.
//!
//! [`PacketBuffer`]: storage/struct.PacketBuffer.html
#![warn(missing_docs)]
#![warn(unreachable_pub)]

// tests should be able to use `std`
#![cfg_attr(all(
    not(feature = "std"),
    not(test)),
no_std)]

#[macro_use] mod macros;
pub mod iface;
pub mod layer;
pub mod nic;
pub mod storage;
pub mod time;
pub mod wire;
