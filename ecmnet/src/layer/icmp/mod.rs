//! Answering ICMP echo requests.
//!
//! A ping is answered in place by changing the message type. The checksum is patched
//! incrementally instead of summing the whole, possibly long, payload again.
mod endpoint;

pub use endpoint::Endpoint;
