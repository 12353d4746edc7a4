//! Event handler which drives transfers of a [TransferPlan] through a [Network].

use std::collections::HashMap;

use dslab_core::{cast, log_debug, log_info, log_warn, Event, EventHandler, Id, SimulationContext};
use serde::Serialize;
use storage_network::{network::Network, transfer::TransferId};

use crate::{
    run_stats::RunStats,
    transfer_simulation::{TransferConfig, TransferPlan},
};

/// Event to start the plan.
#[derive(Clone, Serialize)]
pub struct Start {}

/// Event to initiate a planned transfer.
#[derive(Clone, Serialize)]
struct InitiateTransfer {
    plan_index: usize,
}

/// Event which fires when the chunks of the current step reached the target.
#[derive(Clone, Serialize)]
struct ChunksDelivered {
    plan_index: usize,
}

struct ActiveTransfer {
    transfer_id: TransferId,
    started_at: f64,
    allotted_bandwidth: u64,
}

/// Time to push `bytes` through a link of `bandwidth` bits/sec. Zero bandwidth means no throttling.
pub fn transmission_time(bytes: u64, bandwidth: u64) -> f64 {
    if bandwidth == 0 {
        0.0
    } else {
        bytes as f64 * 8.0 / bandwidth as f64
    }
}

/// Initiates planned transfers at their start time and advances them step by step,
/// each step taking as long as its chunks need on the transfer's allotted bandwidth.
pub struct TransferDriver {
    network: Network,
    plan: Vec<TransferConfig>,
    active: HashMap<usize, ActiveTransfer>,
    run_stats: RunStats,
    ctx: SimulationContext,
}

impl TransferDriver {
    /// Expects a plan that passed [`TransferPlan::validate`], which rules out zero `chunks_per_step`.
    pub(crate) fn new(network: Network, plan: TransferPlan, ctx: SimulationContext) -> Self {
        let run_stats = RunStats::new(plan.transfers.len(), network.stats());
        Self {
            network,
            plan: plan.transfers,
            active: HashMap::new(),
            run_stats,
            ctx,
        }
    }

    /// Returns simulation id of the component.
    pub fn id(&self) -> Id {
        self.ctx.id()
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn run_stats(&self) -> &RunStats {
        &self.run_stats
    }

    pub fn finalize(&mut self, makespan: f64) {
        self.run_stats.finalize(makespan, self.network.stats());
    }

    fn on_start(&mut self) {
        log_info!(self.ctx, "starting plan with {} transfers", self.plan.len());
        for (plan_index, transfer) in self.plan.iter().enumerate() {
            self.ctx
                .emit(InitiateTransfer { plan_index }, self.ctx.id(), transfer.start_time);
        }
    }

    fn on_initiate(&mut self, plan_index: usize) {
        let config = &self.plan[plan_index];
        match self.network.initiate_transfer(
            &config.source,
            &config.target,
            config.file_name.clone(),
            config.file_size,
        ) {
            Ok(transfer) => {
                log_info!(
                    self.ctx,
                    "initiated transfer {} of {} from {} to {} with {} bits/sec",
                    transfer.id(),
                    config.file_name,
                    config.source,
                    config.target,
                    transfer.allotted_bandwidth()
                );
                self.active.insert(
                    plan_index,
                    ActiveTransfer {
                        transfer_id: transfer.id(),
                        started_at: self.ctx.time(),
                        allotted_bandwidth: transfer.allotted_bandwidth(),
                    },
                );
                self.schedule_step(plan_index);
            }
            Err(e) => {
                log_warn!(self.ctx, "transfer of {} rejected: {}", config.file_name, e);
                self.run_stats.register_rejection();
            }
        }
    }

    fn on_chunks_delivered(&mut self, plan_index: usize) {
        let Some(active) = self.active.get(&plan_index) else {
            return;
        };
        let transfer_id = active.transfer_id;
        let config = &self.plan[plan_index];
        let (advanced, complete) =
            self.network
                .advance_transfer(&config.source, &config.target, transfer_id, config.chunks_per_step);
        log_debug!(self.ctx, "transfer {}: {} chunks delivered", transfer_id, advanced);
        if !complete {
            self.schedule_step(plan_index);
            return;
        }
        if let Some(active) = self.active.remove(&plan_index) {
            let duration = self.ctx.time() - active.started_at;
            log_info!(
                self.ctx,
                "transfer {} of {} completed in {:.6}",
                transfer_id,
                config.file_name,
                duration
            );
            self.run_stats.register_transfer(config.file_size, duration);
        }
    }

    fn schedule_step(&self, plan_index: usize) {
        let Some(active) = self.active.get(&plan_index) else {
            return;
        };
        let config = &self.plan[plan_index];
        let bytes = self
            .network
            .transfer(&config.source, active.transfer_id)
            .map(|transfer| transfer.pending_bytes(config.chunks_per_step))
            .unwrap_or(0);
        self.ctx.emit(
            ChunksDelivered { plan_index },
            self.ctx.id(),
            transmission_time(bytes, active.allotted_bandwidth),
        );
    }
}

impl EventHandler for TransferDriver {
    fn on(&mut self, event: Event) {
        cast!(match event.data {
            Start {} => {
                self.on_start();
            }
            InitiateTransfer { plan_index } => {
                self.on_initiate(plan_index);
            }
            ChunksDelivered { plan_index } => {
                self.on_chunks_delivered(plan_index);
            }
        })
    }
}
