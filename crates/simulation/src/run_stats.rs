//! Some stats from a completed simulation.

use serde::{Deserialize, Serialize};
use storage_network::stats::NetworkStats;

/// Some stats from a completed simulation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunStats {
    /// Time of the last simulation event.
    pub total_makespan: f64,
    /// Number of transfers in the plan.
    pub planned_transfers: usize,
    /// Number of transfers which delivered all chunks.
    pub completed_transfers: usize,
    /// Number of transfers which couldn't be initiated.
    pub rejected_transfers: usize,
    /// Total size of completed transfers.
    pub total_bytes_transferred: u64,
    /// Average time between initiation and completion among completed transfers.
    pub average_transfer_time: f64,
    /// Maximum time between initiation and completion among completed transfers.
    pub max_transfer_time: f64,
    /// Network state in the end of the simulation.
    pub network: NetworkStats,
}

impl RunStats {
    /// Initialize new stats for a plan with `planned_transfers` transfers.
    pub fn new(planned_transfers: usize, network: NetworkStats) -> Self {
        RunStats {
            total_makespan: 0.0,
            planned_transfers,
            completed_transfers: 0,
            rejected_transfers: 0,
            total_bytes_transferred: 0,
            average_transfer_time: 0.0,
            max_transfer_time: 0.0,
            network,
        }
    }

    /// Register completed transfer of `size` bytes which took `duration`.
    pub fn register_transfer(&mut self, size: u64, duration: f64) {
        self.average_transfer_time = (self.average_transfer_time * self.completed_transfers as f64 + duration)
            / (self.completed_transfers + 1) as f64;
        self.completed_transfers += 1;
        self.max_transfer_time = self.max_transfer_time.max(duration);
        self.total_bytes_transferred += size;
    }

    pub fn register_rejection(&mut self) {
        self.rejected_transfers += 1;
    }

    /// Finalize result given [total_makespan](RunStats::total_makespan) and final network state.
    pub fn finalize(&mut self, makespan: f64, network: NetworkStats) {
        self.total_makespan = makespan;
        self.network = network;
    }
}
