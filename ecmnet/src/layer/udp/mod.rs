//! The UDP layer and the application boundary.
//!
//! The interface speaks UDP with a single, well known port: the automaton port. A datagram *from*
//! that port is a request of a peer device and may be answered in place. A datagram *to* that
//! port is the reply to a request we sent earlier; it is delivered to the application but never
//! answered by the stack itself. Other ports are not served.
//!
//! The application hooks into this through the [`Recv`] trait.
//!
//! [`Recv`]: trait.Recv.html
use crate::layer::FnHandler;
use crate::wire::Ipv4Address;

mod endpoint;
#[cfg(test)]
mod tests;

pub use endpoint::{Endpoint, AUTOMATON_PORT};

/// The application side of the automaton port.
///
/// Both methods default to ignoring the datagram.
pub trait Recv {
    /// Handle a request from a peer.
    ///
    /// The request occupies the first `len` bytes of `payload`, which extends to the end of the
    /// packet buffer. To answer, overwrite `payload` with the answer and return its length. The
    /// answer is sent from the destination port of the request back to the automaton port.
    fn request(&mut self, payload: &mut [u8], src_addr: Ipv4Address, dst_port: u16, len: usize)
        -> Option<usize>
    {
        let _ = (payload, src_addr, dst_port, len);
        None
    }

    /// Handle a reply from a peer.
    fn reply(&mut self, payload: &[u8], src_addr: Ipv4Address, src_port: u16, len: usize) {
        let _ = (payload, src_addr, src_port, len);
    }
}

/// Ignores all datagrams.
impl Recv for () {}

/// Offers requests to the first and then the second receiver, replies go to both.
impl<A: Recv, B: Recv> Recv for (A, B) {
    fn request(&mut self, payload: &mut [u8], src_addr: Ipv4Address, dst_port: u16, len: usize)
        -> Option<usize>
    {
        match self.0.request(payload, src_addr, dst_port, len) {
            Some(answer) => Some(answer),
            None => self.1.request(payload, src_addr, dst_port, len),
        }
    }

    fn reply(&mut self, payload: &[u8], src_addr: Ipv4Address, src_port: u16, len: usize) {
        self.0.reply(payload, src_addr, src_port, len);
        self.1.reply(payload, src_addr, src_port, len);
    }
}

impl<T: Recv + ?Sized> Recv for &'_ mut T {
    fn request(&mut self, payload: &mut [u8], src_addr: Ipv4Address, dst_port: u16, len: usize)
        -> Option<usize>
    {
        (**self).request(payload, src_addr, dst_port, len)
    }

    fn reply(&mut self, payload: &[u8], src_addr: Ipv4Address, src_port: u16, len: usize) {
        (**self).reply(payload, src_addr, src_port, len)
    }
}

/// Serve requests with a function.
impl<F> Recv for FnHandler<F>
    where F: FnMut(&mut [u8], Ipv4Address, u16, usize) -> Option<usize>
{
    fn request(&mut self, payload: &mut [u8], src_addr: Ipv4Address, dst_port: u16, len: usize)
        -> Option<usize>
    {
        self.0(payload, src_addr, dst_port, len)
    }
}

/// A pair of functions for requests and replies.
pub struct Callbacks<Q, R> {
    /// Called for requests.
    pub request: Q,
    /// Called for replies.
    pub reply: R,
}

impl<Q, R> Recv for Callbacks<Q, R>
where
    Q: FnMut(&mut [u8], Ipv4Address, u16, usize) -> Option<usize>,
    R: FnMut(&[u8], Ipv4Address, u16, usize),
{
    fn request(&mut self, payload: &mut [u8], src_addr: Ipv4Address, dst_port: u16, len: usize)
        -> Option<usize>
    {
        (self.request)(payload, src_addr, dst_port, len)
    }

    fn reply(&mut self, payload: &[u8], src_addr: Ipv4Address, src_port: u16, len: usize) {
        (self.reply)(payload, src_addr, src_port, len)
    }
}
