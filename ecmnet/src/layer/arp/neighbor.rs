use crate::wire::{EthernetAddress, Ipv4Address, Ipv4Cidr};

/// A cached neighbor.
///
/// Maps the host part of an address on the link to its hardware address. The default value is an
/// unused slot.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Neighbor {
    host_part: u32,
    hardware_addr: EthernetAddress,
    used: bool,
}

/// Errors when filling the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Error {
    /// There is no storage to add the entry to.
    NoSpace,

    /// The address is not on the link of the cache.
    NotOnLink,
}

/// A fixed size neighbor cache.
///
/// Entries are keyed by the host part of their address within the subnet of the interface. An
/// address that is already present is updated in place, new addresses overwrite the slot that
/// was filled the longest time ago. Entries never expire, the cache is tiny and a peer that
/// changed its hardware address announces itself with the next reply anyways.
///
/// # Examples
///
/// ```rust
/// use ecmnet::layer::arp::{Neighbor, NeighborCache};
/// use ecmnet::wire::{EthernetAddress, Ipv4Address, Ipv4Cidr};
///
/// let mut storage = [Neighbor::default(); 10];
/// let cidr = Ipv4Cidr::new(Ipv4Address::new(192, 168, 200, 40), 24);
/// let mut neighbors = NeighborCache::new(&mut storage[..], cidr);
///
/// let router = Ipv4Address::new(192, 168, 200, 3);
/// let mac = EthernetAddress([0, 1, 2, 3, 4, 5]);
/// neighbors.fill(router, mac).unwrap();
/// assert_eq!(neighbors.lookup(router), Some(mac));
/// ```
#[derive(Debug)]
pub struct Cache<'a> {
    storage: &'a mut [Neighbor],
    cidr: Ipv4Cidr,
    /// The slot that is overwritten next.
    next: usize,
}

impl Neighbor {
    /// The host part of the address, if the slot is in use.
    pub fn host_part(&self) -> Option<u32> {
        if self.used {
            Some(self.host_part)
        } else {
            None
        }
    }

    /// The hardware address of the neighbor.
    pub fn hardware_addr(&self) -> EthernetAddress {
        self.hardware_addr
    }
}

impl<'a> Cache<'a> {
    /// Create a cache for neighbors on the link of `cidr`.
    ///
    /// Slots of the storage that are already in use are kept.
    pub fn new(storage: &'a mut [Neighbor], cidr: Ipv4Cidr) -> Self {
        Cache {
            storage,
            cidr,
            next: 0,
        }
    }

    /// The subnet whose neighbors are cached.
    pub fn cidr(&self) -> Ipv4Cidr {
        self.cidr
    }

    /// Change the subnet, forgetting all neighbors.
    pub fn set_cidr(&mut self, cidr: Ipv4Cidr) {
        self.cidr = cidr;
        self.clear();
    }

    /// Forget all neighbors.
    pub fn clear(&mut self) {
        for slot in self.storage.iter_mut() {
            *slot = Neighbor::default();
        }
        self.next = 0;
    }

    /// The number of neighbors the cache can hold.
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// The number of cached neighbors.
    pub fn len(&self) -> usize {
        self.storage.iter().filter(|slot| slot.used).count()
    }

    /// Query whether no neighbor is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Find the hardware address of a neighbor.
    ///
    /// Addresses that are not on the link are never found.
    pub fn lookup(&self, addr: Ipv4Address) -> Option<EthernetAddress> {
        if !self.cidr.contains_addr(addr) {
            return None;
        }

        let host_part = self.cidr.host_part(addr);
        self.storage.iter()
            .find(|slot| slot.host_part() == Some(host_part))
            .map(|slot| slot.hardware_addr)
    }

    /// Add or update a neighbor.
    pub fn fill(&mut self, addr: Ipv4Address, hardware_addr: EthernetAddress)
        -> Result<(), Error>
    {
        if !self.cidr.contains_addr(addr) {
            return Err(Error::NotOnLink);
        }

        let host_part = self.cidr.host_part(addr);
        let entry = Neighbor { host_part, hardware_addr, used: true };

        if let Some(slot) = self.storage.iter_mut().find(|slot| slot.host_part() == Some(host_part)) {
            *slot = entry;
            return Ok(());
        }

        let len = self.storage.len();
        let slot = self.storage.get_mut(self.next).ok_or(Error::NoSpace)?;
        *slot = entry;
        self.next = (self.next + 1) % len;
        Ok(())
    }

    /// Iterate over all cached neighbors.
    pub fn iter(&self) -> impl Iterator<Item=(Ipv4Address, EthernetAddress)> + '_ {
        let network = self.cidr.address().to_network_integer()
            & self.cidr.netmask().to_network_integer();
        self.storage.iter()
            .filter_map(move |slot| {
                let host_part = slot.host_part()?;
                let addr = Ipv4Address::from_network_integer(network | host_part);
                Some((addr, slot.hardware_addr))
            })
    }
}
