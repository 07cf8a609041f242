//! Answering ARP requests and learning from ARP replies.
//!
//! Restricted to what a single address on a single link needs: requests for the own address are
//! answered in place, replies from the own subnet feed the neighbor cache that outbound unicast
//! generation consults.
mod endpoint;
mod neighbor;

pub use endpoint::Endpoint;

pub use neighbor::{
    Neighbor,
    Cache as NeighborCache,
    Error as NeighborError,
};
