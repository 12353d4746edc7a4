//! Point-in-time snapshots of resource usage.

use serde::{Deserialize, Serialize};

/// Usage of a single resource of a node.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Utilization {
    /// Amount currently in use.
    pub used: u64,
    /// Total amount.
    pub capacity: u64,
    /// `used / capacity * 100`, or 0 if capacity is 0.
    pub percent: f64,
}

impl Utilization {
    pub fn new(used: u64, capacity: u64) -> Self {
        Self {
            used,
            capacity,
            percent: percent(used, capacity),
        }
    }
}

/// Aggregated usage of the whole network, see [Network::stats](crate::network::Network::stats).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NetworkStats {
    /// Number of registered nodes.
    pub total_nodes: usize,
    /// Sum of bandwidth capacities of all nodes, bits/sec.
    pub total_bandwidth: u64,
    /// Bandwidth allotted to in-flight transfers, bits/sec.
    pub used_bandwidth: u64,
    pub bandwidth_utilization_percent: f64,
    /// Sum of storage capacities of all nodes, bytes.
    pub total_storage: u64,
    /// Storage used or reserved on all nodes, bytes.
    pub used_storage: u64,
    pub storage_utilization_percent: f64,
    /// Number of transfers which are neither completed nor cancelled.
    pub active_transfer_count: usize,
}

pub(crate) fn percent(used: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        used as f64 * 100.0 / total as f64
    }
}
