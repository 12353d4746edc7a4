use std::{error::Error, io::Write};

use env_logger::Builder;

use storage_network::{network::Network, node::Node, transfer::MIB};

const GBPS: u64 = 1_000_000_000;

fn main() -> Result<(), Box<dyn Error>> {
    Builder::from_default_env()
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();

    let mut network = Network::new();
    network.add_node(Node::new("node1", 4, 16 * 1024 * MIB, 500 * MIB, GBPS));
    network.add_node(Node::new("node2", 8, 32 * 1024 * MIB, 1000 * MIB, 2 * GBPS));
    network.connect("node1", "node2", GBPS)?;

    let transfer = network.initiate_transfer("node1", "node2", "large_dataset.zip", 100 * MIB)?;
    println!(
        "Transfer initiated: {} ({} chunks of {} bytes)",
        transfer.id(),
        transfer.chunk_count(),
        transfer.chunk_size()
    );

    loop {
        let (chunks_done, completed) = network.advance_transfer("node1", "node2", transfer.id(), 3);
        println!("Transferred {} chunks, completed: {}", chunks_done, completed);
        if completed {
            println!("Transfer completed successfully!");
            break;
        }
        if let Some(progress) = network.transfer("node1", transfer.id()).map(|t| t.progress()) {
            println!("Progress: {:.2}%", progress);
        }
        let stats = network.stats();
        println!("Network utilization: {:.2}%", stats.bandwidth_utilization_percent);
        if let Some(node) = network.node("node2") {
            println!("Storage utilization on node2: {:.2}%", node.utilization().percent);
        }
    }

    println!("\nNetwork stats:\n{}", serde_yaml::to_string(&network.stats())?);
    Ok(())
}
