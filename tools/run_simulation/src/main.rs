use std::{error::Error, fs::File, io::Write, path::PathBuf};

use clap::Parser;
use env_logger::Builder;

use storage_sim::{
    system::SystemConfig,
    transfer_simulation::{TransferPlan, TransferSimulation},
};

/// Runs a transfer plan on a simulated storage network.
#[derive(Parser, Debug)]
struct Args {
    /// Path to system config.
    #[arg(short, long)]
    system: PathBuf,

    /// Path to transfer plan.
    #[arg(short, long)]
    plan: PathBuf,

    /// Path to file with results in JSON.
    #[arg(short, long, default_value = None)]
    output: Option<PathBuf>,

    /// Simulation seed.
    #[arg(long, default_value_t = 123)]
    seed: u64,
}

fn main() -> Result<(), Box<dyn Error>> {
    Builder::from_default_env()
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();

    let args = Args::parse();
    let system = SystemConfig::from_yaml(&args.system)?;
    let plan = TransferPlan::from_yaml(&args.plan)?;

    let run_stats = TransferSimulation::new(args.seed, system, plan)?.run();
    println!("Run stats:\n{}", serde_yaml::to_string(&run_stats)?);

    if let Some(output) = args.output {
        File::create(output)?.write_all(serde_json::to_string_pretty(&run_stats)?.as_bytes())?;
    }
    Ok(())
}
