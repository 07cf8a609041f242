//! Setting the clock from SNTP replies.
//!
//! The interface asks a time server with a client request, see
//! [`Interface::send_sntp_request`]. The answer arrives as a reply on the automaton port and is
//! picked up by a [`Client`], which validates it and hands the time to a [`Clock`].
//!
//! The fraction of the second is converted into ticks of a 62500 Hz timer (a 16 MHz clock with a
//! prescaler of 256), so that a periodic timer interrupt can be aligned with the start of the true
//! second.
//!
//! [`Interface::send_sntp_request`]: ../../iface/struct.Interface.html#method.send_sntp_request
//! [`Client`]: struct.Client.html
//! [`Clock`]: trait.Clock.html
use crate::layer::FnHandler;

mod endpoint;
#[cfg(test)]
mod tests;

pub use endpoint::{frac_to_ticks, Client, Endpoint, Time, TICKS_PER_SECOND, VERSION};

/// A clock that can be set from the network.
pub trait Clock {
    /// Set the current time.
    ///
    /// Called as soon as a valid reply was received, the network delay is not accounted for.
    fn set_time(&mut self, time: Time);
}

impl<F: FnMut(Time)> Clock for FnHandler<F> {
    fn set_time(&mut self, time: Time) {
        self.0(time)
    }
}

impl<C: Clock + ?Sized> Clock for &'_ mut C {
    fn set_time(&mut self, time: Time) {
        (**self).set_time(time)
    }
}
