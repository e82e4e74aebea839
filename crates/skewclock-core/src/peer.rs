//! Machine identity and peer addressing.
//!
//! Every machine listens on `base_port + id`. A [`PeerList`] is fixed when the
//! machine is built and its order is significant: event generation addresses
//! peers by position ("first peer", "second peer", "all peers").

use std::fmt;

/// Cluster-unique machine identifier.
pub type MachineId = u16;

/// Network location of one peer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeerAddr {
    /// Peer's machine id.
    pub id: MachineId,
    /// Host name or IP literal the peer listens on.
    pub host: String,
    /// TCP port the peer listens on.
    pub port: u16,
}

impl PeerAddr {
    /// Address of machine `id` under the `base_port + id` convention.
    ///
    /// Returns `None` if the port would overflow.
    pub fn for_machine(id: MachineId, host: impl Into<String>, base_port: u16) -> Option<Self> {
        let port = base_port.checked_add(id)?;
        Some(Self { id, host: host.into(), port })
    }
}

impl fmt::Display for PeerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vm{}@{}:{}", self.id, self.host, self.port)
    }
}

/// Ordered, immutable list of peers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeerList {
    peers: Vec<PeerAddr>,
}

impl PeerList {
    /// Create a peer list, preserving the given order.
    pub fn new(peers: Vec<PeerAddr>) -> Self {
        Self { peers }
    }

    /// Peers of `self_id` in a fully connected cluster of `size` machines,
    /// in ascending id order.
    ///
    /// Machines whose port would overflow `u16` are left out.
    pub fn full_mesh(self_id: MachineId, size: u16, host: &str, base_port: u16) -> Self {
        let peers = (0..size)
            .filter(|id| *id != self_id)
            .filter_map(|id| PeerAddr::for_machine(id, host, base_port))
            .collect();
        Self { peers }
    }

    /// Peer at `index`, if present.
    pub fn get(&self, index: usize) -> Option<&PeerAddr> {
        self.peers.get(index)
    }

    /// Number of peers.
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// True if the machine has no peers.
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Iterate peers in positional order.
    pub fn iter(&self) -> impl Iterator<Item = &PeerAddr> {
        self.peers.iter()
    }

    /// Peer ids in positional order.
    pub fn ids(&self) -> Vec<MachineId> {
        self.peers.iter().map(|p| p.id).collect()
    }

    /// First id that appears more than once, if any.
    pub(crate) fn first_duplicate(&self) -> Option<MachineId> {
        self.peers
            .iter()
            .enumerate()
            .find(|(i, p)| self.peers[..*i].iter().any(|q| q.id == p.id))
            .map(|(_, p)| p.id)
    }
}

impl FromIterator<PeerAddr> for PeerList {
    fn from_iter<I: IntoIterator<Item = PeerAddr>>(iter: I) -> Self {
        Self { peers: iter.into_iter().collect() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_mesh_excludes_self_and_keeps_order() {
        let peers = PeerList::full_mesh(1, 4, "127.0.0.1", 5000);
        assert_eq!(peers.ids(), vec![0, 2, 3]);
        assert_eq!(peers.get(1).map(|p| p.port), Some(5002));
    }

    #[test]
    fn for_machine_rejects_port_overflow() {
        assert!(PeerAddr::for_machine(10, "h", u16::MAX - 5).is_none());
        assert_eq!(PeerAddr::for_machine(2, "h", 6000).map(|p| p.port), Some(6002));
    }

    #[test]
    fn duplicate_detection() {
        let a = PeerAddr::for_machine(1, "h", 5000).unwrap();
        let b = PeerAddr::for_machine(2, "h", 5000).unwrap();
        assert_eq!(PeerList::new(vec![a.clone(), b.clone()]).first_duplicate(), None);
        assert_eq!(PeerList::new(vec![a.clone(), b, a]).first_duplicate(), Some(1));
    }

    #[test]
    fn display_includes_id_and_address() {
        let p = PeerAddr::for_machine(3, "localhost", 5000).unwrap();
        assert_eq!(p.to_string(), "vm3@localhost:5003");
    }
}
