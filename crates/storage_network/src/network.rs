//! Network of storage nodes and coordinator of file transfers between them.

use std::collections::BTreeMap;

use log::{debug, info, warn};

use crate::{
    error::NetworkError,
    node::{Node, NodeId, NodeMetrics, StoredFile},
    stats::{percent, NetworkStats},
    transfer::{Transfer, TransferId},
};

/// Owns all nodes and all in-flight transfers.
///
/// Transfers progress only through explicit [Network::advance_transfer] calls, so the pace is
/// controlled by the caller.
#[derive(Default)]
pub struct Network {
    nodes: BTreeMap<NodeId, Node>,
    /// Active transfers grouped by source node.
    transfers: BTreeMap<NodeId, BTreeMap<TransferId, Transfer>>,
    next_transfer_id: TransferId,
}

impl Network {
    /// Creates new [Network] without nodes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a node. A node with the same id is replaced.
    ///
    /// Active transfers from or to a replaced node fail, since their reservations were made on the
    /// old node. Resources of the new node are left untouched.
    pub fn add_node(&mut self, node: Node) {
        debug!(
            "adding node {} with {} bytes of storage and {} bits/sec of bandwidth",
            node.id(),
            node.storage_capacity(),
            node.bandwidth_capacity()
        );
        let id = node.id().to_string();
        if self.nodes.insert(id.clone(), node).is_some() {
            self.fail_transfers_of_replaced(&id);
        }
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Links two nodes in both directions with a given bandwidth limit.
    ///
    /// Nothing is changed if one of the nodes doesn't exist.
    pub fn connect(&mut self, id_a: &str, id_b: &str, bandwidth: u64) -> Result<(), NetworkError> {
        self.ensure_node(id_a)?;
        self.ensure_node(id_b)?;
        if let Some(node) = self.nodes.get_mut(id_a) {
            node.connect(id_b, bandwidth);
        }
        if let Some(node) = self.nodes.get_mut(id_b) {
            node.connect(id_a, bandwidth);
        }
        debug!("connected {} and {} with bandwidth {}", id_a, id_b, bandwidth);
        Ok(())
    }

    /// Starts a transfer of `file_size` bytes from `source_id` to `target_id`.
    ///
    /// Storage on the target is reserved immediately, so the transfer can't fail later because of
    /// space taken by someone else. Returns a snapshot of the created transfer.
    pub fn initiate_transfer(
        &mut self,
        source_id: &str,
        target_id: &str,
        file_name: impl Into<String>,
        file_size: u64,
    ) -> Result<Transfer, NetworkError> {
        let file_name = file_name.into();
        let link_bandwidth = self
            .nodes
            .get(source_id)
            .ok_or_else(|| NetworkError::NodeNotFound(source_id.to_string()))?
            .connection(target_id);
        let target = self
            .nodes
            .get_mut(target_id)
            .ok_or_else(|| NetworkError::NodeNotFound(target_id.to_string()))?;

        if !target.reserve_storage(file_size) {
            warn!(
                "can't transfer {} ({} bytes) from {} to {}: only {} bytes free",
                file_name,
                file_size,
                source_id,
                target_id,
                target.free_storage()
            );
            return Err(NetworkError::InsufficientStorage {
                node: target_id.to_string(),
                requested: file_size,
                available: target.free_storage(),
            });
        }
        let requested_bandwidth = link_bandwidth.unwrap_or(target.bandwidth_capacity());
        let allotted_bandwidth = target.allocate_bandwidth(requested_bandwidth);

        let transfer_id = self.next_transfer_id;
        self.next_transfer_id += 1;
        let transfer = Transfer::new(
            transfer_id,
            source_id.to_string(),
            target_id.to_string(),
            file_name,
            file_size,
            allotted_bandwidth,
        );
        info!(
            "transfer {}: {} ({} bytes) from {} to {} in {} chunks of {} bytes",
            transfer_id,
            transfer.file_name(),
            file_size,
            source_id,
            target_id,
            transfer.chunk_count(),
            transfer.chunk_size()
        );
        self.transfers
            .entry(source_id.to_string())
            .or_default()
            .insert(transfer_id, transfer.clone());
        Ok(transfer)
    }

    /// Delivers up to `max_chunks` pending chunks of a transfer, lowest index first.
    ///
    /// Returns the number of delivered chunks and whether the transfer is complete. Unknown and
    /// already finished transfers give `(0, true)`, so the call is safe to repeat in a polling loop.
    pub fn advance_transfer(
        &mut self,
        source_id: &str,
        target_id: &str,
        transfer_id: TransferId,
        max_chunks: usize,
    ) -> (usize, bool) {
        let Some(transfer) = self
            .transfers
            .get_mut(source_id)
            .and_then(|transfers| transfers.get_mut(&transfer_id))
        else {
            return (0, true);
        };
        if transfer.target() != target_id {
            return (0, true);
        }

        let advanced = transfer.advance(max_chunks);
        debug!(
            "transfer {}: delivered {} chunks, {}/{} done",
            transfer_id,
            advanced,
            transfer.completed_chunks(),
            transfer.chunk_count()
        );
        if !transfer.all_chunks_completed() {
            return (advanced, false);
        }

        let Some(mut transfer) = self.take_transfer(source_id, transfer_id) else {
            return (advanced, true);
        };
        transfer.complete();
        if let Some(target) = self.nodes.get_mut(target_id) {
            target.release_bandwidth(transfer.allotted_bandwidth());
            target.store_file(StoredFile {
                transfer_id,
                file_name: transfer.file_name().to_string(),
                size: transfer.total_size(),
                source: source_id.to_string(),
                completed_at: transfer.completed_at().unwrap_or_else(|| transfer.created_at()),
            });
        }
        info!(
            "transfer {}: {} delivered from {} to {}",
            transfer_id,
            transfer.file_name(),
            source_id,
            target_id
        );
        (advanced, true)
    }

    /// Cancels an in-flight transfer and gives its reserved storage and bandwidth back to the target.
    ///
    /// Returns the failed transfer, or `None` if there is no such active transfer.
    pub fn cancel_transfer(&mut self, source_id: &str, transfer_id: TransferId) -> Option<Transfer> {
        let mut transfer = self.take_transfer(source_id, transfer_id)?;
        transfer.fail();
        self.release_reservation(&transfer);
        warn!(
            "transfer {}: cancelled after {}/{} chunks",
            transfer_id,
            transfer.completed_chunks(),
            transfer.chunk_count()
        );
        Some(transfer)
    }

    /// Starts a transfer of a file stored on `holder_id` to `destination_id`.
    pub fn retrieve_file(
        &mut self,
        holder_id: &str,
        file_name: &str,
        destination_id: &str,
    ) -> Result<Transfer, NetworkError> {
        let holder = self.ensure_node(holder_id)?;
        let file = holder.stored_file(file_name).ok_or_else(|| NetworkError::FileNotFound {
            node: holder_id.to_string(),
            file_name: file_name.to_string(),
        })?;
        let (file_name, size) = (file.file_name.clone(), file.size);
        self.initiate_transfer(holder_id, destination_id, file_name, size)
    }

    /// Active transfer started from `source_id`.
    pub fn transfer(&self, source_id: &str, transfer_id: TransferId) -> Option<&Transfer> {
        self.transfers
            .get(source_id)
            .and_then(|transfers| transfers.get(&transfer_id))
    }

    /// All active transfers ordered by source node and id.
    pub fn active_transfers(&self) -> impl Iterator<Item = &Transfer> {
        self.transfers.values().flat_map(|transfers| transfers.values())
    }

    /// Counters of a node together with the number of its inbound active transfers.
    pub fn node_metrics(&self, id: &str) -> Option<NodeMetrics> {
        let node = self.nodes.get(id)?;
        let active = self
            .active_transfers()
            .filter(|transfer| transfer.target() == id)
            .count();
        Some(node.metrics(active))
    }

    pub fn stats(&self) -> NetworkStats {
        let total_bandwidth = self.nodes.values().map(|node| node.bandwidth_capacity()).sum();
        let used_bandwidth = self.nodes.values().map(|node| node.used_bandwidth()).sum();
        let total_storage = self.nodes.values().map(|node| node.storage_capacity()).sum();
        let used_storage = self.nodes.values().map(|node| node.used_storage()).sum();
        NetworkStats {
            total_nodes: self.nodes.len(),
            total_bandwidth,
            used_bandwidth,
            bandwidth_utilization_percent: percent(used_bandwidth, total_bandwidth),
            total_storage,
            used_storage,
            storage_utilization_percent: percent(used_storage, total_storage),
            active_transfer_count: self.transfers.values().map(|transfers| transfers.len()).sum(),
        }
    }

    fn ensure_node(&self, id: &str) -> Result<&Node, NetworkError> {
        self.nodes
            .get(id)
            .ok_or_else(|| NetworkError::NodeNotFound(id.to_string()))
    }

    /// Gives storage and bandwidth reserved by a failed transfer back to its target.
    fn release_reservation(&mut self, transfer: &Transfer) {
        if let Some(target) = self.nodes.get_mut(transfer.target()) {
            target.release_storage(transfer.total_size());
            target.release_bandwidth(transfer.allotted_bandwidth());
            target.record_failed_transfer();
        }
    }

    fn fail_transfers_of_replaced(&mut self, id: &str) {
        let stale = self
            .active_transfers()
            .filter(|transfer| transfer.source() == id || transfer.target() == id)
            .map(|transfer| (transfer.source().to_string(), transfer.id()))
            .collect::<Vec<_>>();
        for (source_id, transfer_id) in stale {
            let Some(mut transfer) = self.take_transfer(&source_id, transfer_id) else {
                continue;
            };
            transfer.fail();
            // The replaced node's reservations went away together with it.
            if transfer.target() != id {
                self.release_reservation(&transfer);
            }
            warn!(
                "transfer {}: failed because node {} was replaced",
                transfer_id, id
            );
        }
    }

    fn take_transfer(&mut self, source_id: &str, transfer_id: TransferId) -> Option<Transfer> {
        let transfers = self.transfers.get_mut(source_id)?;
        let transfer = transfers.remove(&transfer_id);
        if transfers.is_empty() {
            self.transfers.remove(source_id);
        }
        transfer
    }
}
