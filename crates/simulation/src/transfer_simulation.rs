use std::{cell::RefCell, rc::Rc};

use dslab_core::Simulation;
use serde::{Deserialize, Serialize};

use crate::{
    driver::{Start, TransferDriver},
    error::ConfigError,
    run_stats::RunStats,
    system::SystemConfig,
};

fn default_chunks_per_step() -> usize {
    1
}

/// One file transfer to run during the simulation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransferConfig {
    pub source: String,
    pub target: String,
    pub file_name: String,
    /// Bytes.
    pub file_size: u64,
    /// Simulation time when the transfer is initiated.
    #[serde(default)]
    pub start_time: f64,
    /// Maximum number of chunks delivered by one step.
    #[serde(default = "default_chunks_per_step")]
    pub chunks_per_step: usize,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TransferPlan {
    pub transfers: Vec<TransferConfig>,
}

/// Runs a [TransferPlan] on a system in simulated time.
pub struct TransferSimulation {
    sim: Simulation,
    driver: Rc<RefCell<TransferDriver>>,
}

impl TransferSimulation {
    pub fn new(seed: u64, system: SystemConfig, plan: TransferPlan) -> Result<Self, ConfigError> {
        system.validate()?;
        plan.validate(&system)?;
        let network = system.build_network()?;

        let mut sim = Simulation::new(seed);
        let driver = Rc::new(RefCell::new(TransferDriver::new(
            network,
            plan,
            sim.create_context("driver"),
        )));
        sim.add_handler("driver", driver.clone());
        Ok(Self { sim, driver })
    }

    pub fn run(mut self) -> RunStats {
        let driver_id = self.driver.borrow().id();
        self.sim.create_context("root").emit_now(Start {}, driver_id);
        self.sim.step_until_no_events();

        let mut driver = self.driver.borrow_mut();
        driver.finalize(self.sim.time());
        driver.run_stats().clone()
    }
}
