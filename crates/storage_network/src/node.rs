//! Model of a storage node.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{stats::Utilization, transfer::TransferId};

pub type NodeId = String;

/// File which was completely received by a node.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredFile {
    /// Transfer which delivered the file.
    pub transfer_id: TransferId,
    pub file_name: String,
    /// Size in bytes.
    pub size: u64,
    /// Node the file was received from.
    pub source: NodeId,
    pub completed_at: DateTime<Utc>,
}

/// Counters of a node, see [Network::node_metrics](crate::network::Network::node_metrics).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeMetrics {
    /// Number of inbound transfers which were completed.
    pub completed_transfers: u64,
    /// Number of inbound transfers which were cancelled.
    pub failed_transfers: u64,
    /// Total size of all received files.
    pub bytes_received: u64,
    /// Number of distinct file names stored on the node.
    pub files_stored: usize,
    /// Number of inbound transfers in flight.
    pub active_transfers: usize,
}

/// Storage node with fixed capacities.
///
/// Used storage is only changed through [Node::reserve_storage] and [Node::release_storage]
/// and never exceeds storage capacity.
#[derive(Clone, Debug)]
pub struct Node {
    id: NodeId,
    cpu_capacity: u32,
    memory_capacity: u64,
    storage_capacity: u64,
    used_storage: u64,
    bandwidth_capacity: u64,
    used_bandwidth: u64,
    connections: BTreeMap<NodeId, u64>,
    stored_files: BTreeMap<String, StoredFile>,
    completed_transfers: u64,
    failed_transfers: u64,
    bytes_received: u64,
}

impl Node {
    /// Creates new empty [Node].
    /// * `cpu_capacity` --- number of cores.
    /// * `memory_capacity` --- memory in bytes.
    /// * `storage_capacity` --- storage in bytes.
    /// * `bandwidth_capacity` --- network bandwidth in bits/sec.
    pub fn new(
        id: impl Into<NodeId>,
        cpu_capacity: u32,
        memory_capacity: u64,
        storage_capacity: u64,
        bandwidth_capacity: u64,
    ) -> Self {
        Self {
            id: id.into(),
            cpu_capacity,
            memory_capacity,
            storage_capacity,
            used_storage: 0,
            bandwidth_capacity,
            used_bandwidth: 0,
            connections: BTreeMap::new(),
            stored_files: BTreeMap::new(),
            completed_transfers: 0,
            failed_transfers: 0,
            bytes_received: 0,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn cpu_capacity(&self) -> u32 {
        self.cpu_capacity
    }

    pub fn memory_capacity(&self) -> u64 {
        self.memory_capacity
    }

    pub fn storage_capacity(&self) -> u64 {
        self.storage_capacity
    }

    pub fn used_storage(&self) -> u64 {
        self.used_storage
    }

    /// Amount of storage which can still be reserved.
    pub fn free_storage(&self) -> u64 {
        self.storage_capacity - self.used_storage
    }

    pub fn bandwidth_capacity(&self) -> u64 {
        self.bandwidth_capacity
    }

    pub fn used_bandwidth(&self) -> u64 {
        self.used_bandwidth
    }

    /// Reserves `size` bytes if they fit into the remaining capacity.
    ///
    /// Returns `false` and leaves the node untouched otherwise.
    pub fn reserve_storage(&mut self, size: u64) -> bool {
        match self.used_storage.checked_add(size) {
            Some(used) if used <= self.storage_capacity => {
                self.used_storage = used;
                debug!(
                    "node {}: reserved {} bytes, {}/{} used",
                    self.id, size, self.used_storage, self.storage_capacity
                );
                true
            }
            _ => false,
        }
    }

    /// Returns `size` bytes back to the node. Used storage never goes below zero.
    pub fn release_storage(&mut self, size: u64) {
        self.used_storage = self.used_storage.saturating_sub(size);
        debug!(
            "node {}: released {} bytes, {}/{} used",
            self.id, size, self.used_storage, self.storage_capacity
        );
    }

    pub fn utilization(&self) -> Utilization {
        Utilization::new(self.used_storage, self.storage_capacity)
    }

    pub fn network_utilization(&self) -> Utilization {
        Utilization::new(self.used_bandwidth, self.bandwidth_capacity)
    }

    /// Sets bandwidth limit of a directed link to `other`. Connecting again overwrites the limit.
    pub fn connect(&mut self, other: impl Into<NodeId>, bandwidth: u64) {
        self.connections.insert(other.into(), bandwidth);
    }

    /// Bandwidth limit of a link to `other` if there is one.
    pub fn connection(&self, other: &str) -> Option<u64> {
        self.connections.get(other).copied()
    }

    /// All outgoing links with their bandwidth limits.
    pub fn connections(&self) -> impl Iterator<Item = (&str, u64)> {
        self.connections.iter().map(|(id, bandwidth)| (id.as_str(), *bandwidth))
    }

    /// File with a given name stored on the node.
    pub fn stored_file(&self, file_name: &str) -> Option<&StoredFile> {
        self.stored_files.get(file_name)
    }

    pub fn stored_files(&self) -> impl Iterator<Item = &StoredFile> {
        self.stored_files.values()
    }

    /// Takes up to `requested` bits/sec of free bandwidth and returns how much was taken.
    pub(crate) fn allocate_bandwidth(&mut self, requested: u64) -> u64 {
        let allotted = requested.min(self.bandwidth_capacity - self.used_bandwidth);
        self.used_bandwidth += allotted;
        allotted
    }

    pub(crate) fn release_bandwidth(&mut self, bandwidth: u64) {
        self.used_bandwidth = self.used_bandwidth.saturating_sub(bandwidth);
    }

    /// Registers a completely received file. Storage for it was reserved beforehand.
    pub(crate) fn store_file(&mut self, file: StoredFile) {
        self.completed_transfers += 1;
        self.bytes_received += file.size;
        self.stored_files.insert(file.file_name.clone(), file);
    }

    pub(crate) fn record_failed_transfer(&mut self) {
        self.failed_transfers += 1;
    }

    pub(crate) fn metrics(&self, active_transfers: usize) -> NodeMetrics {
        NodeMetrics {
            completed_transfers: self.completed_transfers,
            failed_transfers: self.failed_transfers,
            bytes_received: self.bytes_received,
            files_stored: self.stored_files.len(),
            active_transfers,
        }
    }
}
