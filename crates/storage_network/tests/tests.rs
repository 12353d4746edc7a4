use storage_network::{
    error::NetworkError,
    network::Network,
    node::Node,
    transfer::{chunk_count, chunk_size_for, split_into_chunks, ChunkStatus, TransferStatus, KIB, MIB},
};

const GBPS: u64 = 1_000_000_000;

fn node(id: &str, storage_capacity: u64, bandwidth_capacity: u64) -> Node {
    Node::new(id, 4, 16 * 1024 * MIB, storage_capacity, bandwidth_capacity)
}

fn two_node_network() -> Network {
    let mut network = Network::new();
    network.add_node(node("a", 500 * MIB, GBPS));
    network.add_node(node("b", 1000 * MIB, 2 * GBPS));
    network.connect("a", "b", GBPS).unwrap();
    network
}

#[test]
fn reserve_storage_respects_capacity() {
    let values = [0, 1, 1000, 500 * MIB, u64::MAX / 2, u64::MAX - 1, u64::MAX];
    for capacity in values {
        for size in values {
            let mut node = node("a", capacity, GBPS);
            let fits = size <= capacity;
            assert_eq!(node.reserve_storage(size), fits, "capacity {capacity}, size {size}");
            let used = if fits { size } else { 0 };
            assert_eq!(node.used_storage(), used);

            for extra in values {
                let fits_extra = used.checked_add(extra).is_some_and(|total| total <= capacity);
                if fits_extra {
                    continue;
                }
                assert!(!node.reserve_storage(extra));
                assert_eq!(node.used_storage(), used);
            }
            assert!(node.used_storage() <= node.storage_capacity());
        }
    }

    let mut node = node("a", 1000, GBPS);
    assert!(node.reserve_storage(600));
    assert!(!node.reserve_storage(401));
    assert!(node.reserve_storage(400));
    assert_eq!(node.free_storage(), 0);
    assert!(!node.reserve_storage(1));
    assert_eq!(node.used_storage(), 1000);
}

#[test]
fn release_storage_is_floored_at_zero() {
    let mut node = node("a", 1000, GBPS);
    assert!(node.reserve_storage(300));
    node.release_storage(100);
    assert_eq!(node.used_storage(), 200);
    node.release_storage(500);
    assert_eq!(node.used_storage(), 0);
}

#[test]
fn utilization() {
    let mut node = node("a", 400, GBPS);
    assert!(node.reserve_storage(100));
    let utilization = node.utilization();
    assert_eq!(utilization.used, 100);
    assert_eq!(utilization.capacity, 400);
    assert!((utilization.percent - 25.0).abs() < 1e-9);

    let empty = Node::new("empty", 1, 1, 0, 0);
    assert_eq!(empty.utilization().percent, 0.0);
    assert_eq!(empty.network_utilization().percent, 0.0);
}

#[test]
fn node_connect_overwrites() {
    let mut node = node("a", 400, GBPS);
    node.connect("b", 100);
    node.connect("c", 200);
    node.connect("b", 300);
    assert_eq!(node.connection("b"), Some(300));
    assert_eq!(
        node.connections().collect::<Vec<_>>(),
        vec![("b", 300), ("c", 200)]
    );
    assert_eq!(node.connection("d"), None);
}

#[test]
fn chunk_size_thresholds() {
    assert_eq!(chunk_size_for(0), 512 * KIB);
    assert_eq!(chunk_size_for(10 * MIB - 1), 512 * KIB);
    assert_eq!(chunk_size_for(10 * MIB), 2 * MIB);
    assert_eq!(chunk_size_for(100 * MIB - 1), 2 * MIB);
    assert_eq!(chunk_size_for(100 * MIB), 10 * MIB);
    assert_eq!(chunk_size_for(10 * 1024 * MIB), 10 * MIB);
}

#[test]
fn chunks_cover_whole_file() {
    for file_size in [1, 1000, 512 * KIB, 512 * KIB + 1, 10 * MIB - 1, 10 * MIB, 37 * MIB + 5, 100 * MIB, 1234 * MIB + 17] {
        let chunk_size = chunk_size_for(file_size);
        let chunks = split_into_chunks(file_size, chunk_size).collect::<Vec<_>>();
        assert_eq!(chunks.len() as u64, (file_size + chunk_size - 1) / chunk_size);
        assert_eq!(chunks.len() as u64, chunk_count(file_size, chunk_size));
        assert_eq!(chunks.iter().map(|chunk| chunk.size).sum::<u64>(), file_size);
        assert!(chunks.iter().enumerate().all(|(i, chunk)| chunk.index == i as u64));
        assert!(chunks[..chunks.len() - 1].iter().all(|chunk| chunk.size == chunk_size));
        assert_eq!(
            chunks.last().unwrap().size,
            file_size - (chunks.len() as u64 - 1) * chunk_size
        );
        assert!(chunks.iter().all(|chunk| chunk.status == ChunkStatus::Pending));
    }
    assert_eq!(split_into_chunks(0, 512 * KIB).count(), 0);
    assert_eq!(split_into_chunks(100, 0).count(), 1);
}

#[test]
fn connect_unknown_node() {
    let mut network = Network::new();
    network.add_node(node("a", 100, GBPS));
    assert_eq!(
        network.connect("a", "b", GBPS),
        Err(NetworkError::NodeNotFound("b".to_string()))
    );
    assert_eq!(network.node("a").unwrap().connections().count(), 0);
    assert_eq!(
        network.connect("c", "a", GBPS),
        Err(NetworkError::NodeNotFound("c".to_string()))
    );
    assert_eq!(network.node("a").unwrap().connections().count(), 0);
}

#[test]
fn connect_is_bidirectional() {
    let network = two_node_network();
    assert_eq!(network.node("a").unwrap().connection("b"), Some(GBPS));
    assert_eq!(network.node("b").unwrap().connection("a"), Some(GBPS));
}

#[test]
fn add_node_replaces_existing() {
    let mut network = Network::new();
    network.add_node(node("a", 100, GBPS));
    network.add_node(node("a", 200, GBPS));
    assert_eq!(network.stats().total_nodes, 1);
    assert_eq!(network.node("a").unwrap().storage_capacity(), 200);
}

#[test]
fn initiate_transfer_unknown_nodes() {
    let mut network = two_node_network();
    assert_eq!(
        network.initiate_transfer("x", "b", "file", 10).unwrap_err(),
        NetworkError::NodeNotFound("x".to_string())
    );
    assert_eq!(
        network.initiate_transfer("a", "x", "file", 10).unwrap_err(),
        NetworkError::NodeNotFound("x".to_string())
    );
    assert_eq!(network.stats().active_transfer_count, 0);
    assert_eq!(network.node("b").unwrap().used_storage(), 0);
}

#[test]
fn insufficient_storage() {
    let mut network = two_node_network();
    network.initiate_transfer("a", "b", "first", 900 * MIB).unwrap();
    assert_eq!(network.node("b").unwrap().used_storage(), 900 * MIB);

    let result = network.initiate_transfer("a", "b", "second", 200 * MIB);
    assert_eq!(
        result.unwrap_err(),
        NetworkError::InsufficientStorage {
            node: "b".to_string(),
            requested: 200 * MIB,
            available: 100 * MIB,
        }
    );
    assert_eq!(network.node("b").unwrap().used_storage(), 900 * MIB);
    assert_eq!(network.stats().active_transfer_count, 1);
}

#[test]
fn storage_is_reserved_on_initiation() {
    let mut network = two_node_network();
    let transfer = network.initiate_transfer("a", "b", "file", 5 * MIB).unwrap();
    assert_eq!(network.node("b").unwrap().used_storage(), 5 * MIB);
    assert_eq!(network.node("a").unwrap().used_storage(), 0);

    while !network.advance_transfer("a", "b", transfer.id(), 4).1 {}
    assert_eq!(network.node("b").unwrap().used_storage(), 5 * MIB);
}

#[test]
fn transfer_ids_are_unique() {
    let mut network = two_node_network();
    let first = network.initiate_transfer("a", "b", "same.bin", 10).unwrap();
    let second = network.initiate_transfer("a", "b", "same.bin", 10).unwrap();
    let third = network.initiate_transfer("b", "a", "same.bin", 10).unwrap();
    assert_ne!(first.id(), second.id());
    assert_ne!(second.id(), third.id());
    assert_ne!(first.id(), third.id());
    assert_eq!(network.stats().active_transfer_count, 3);
}

#[test]
fn hundred_megabytes_scenario() {
    let mut network = two_node_network();
    let transfer = network
        .initiate_transfer("a", "b", "large_dataset.zip", 100 * MIB)
        .unwrap();
    assert_eq!(transfer.chunk_size(), 10 * MIB);
    assert_eq!(transfer.chunk_count(), 10);
    assert_eq!(transfer.status(), TransferStatus::Pending);
    assert_eq!(transfer.source(), "a");
    assert_eq!(transfer.target(), "b");

    let mut steps = Vec::new();
    loop {
        let step = network.advance_transfer("a", "b", transfer.id(), 3);
        steps.push(step);
        if step.1 {
            break;
        }
        assert_eq!(network.stats().active_transfer_count, 1);
        assert_eq!(
            network.transfer("a", transfer.id()).unwrap().status(),
            TransferStatus::InProgress
        );
    }
    assert_eq!(steps, vec![(3, false), (3, false), (3, false), (1, true)]);

    let stats = network.stats();
    assert_eq!(stats.active_transfer_count, 0);
    assert_eq!(stats.used_storage, 100 * MIB);
    assert_eq!(stats.used_bandwidth, 0);
    assert!(network.transfer("a", transfer.id()).is_none());
}

#[test]
fn advance_is_idempotent_after_completion() {
    let mut network = two_node_network();
    let transfer = network.initiate_transfer("a", "b", "small", 100 * KIB).unwrap();
    assert_eq!(network.advance_transfer("a", "b", transfer.id(), 1), (1, true));
    for _ in 0..3 {
        assert_eq!(network.advance_transfer("a", "b", transfer.id(), 1), (0, true));
    }
    assert_eq!(network.node("b").unwrap().used_storage(), 100 * KIB);
    assert_eq!(network.node_metrics("b").unwrap().completed_transfers, 1);
}

#[test]
fn advance_unknown_transfer() {
    let mut network = two_node_network();
    assert_eq!(network.advance_transfer("a", "b", 42, 5), (0, true));
    assert_eq!(network.advance_transfer("x", "y", 0, 5), (0, true));

    let transfer = network.initiate_transfer("a", "b", "file", 3 * MIB).unwrap();
    // Transfers are scoped to their source and target.
    assert_eq!(network.advance_transfer("b", "a", transfer.id(), 5), (0, true));
    assert_eq!(network.advance_transfer("a", "a", transfer.id(), 5), (0, true));
    assert_eq!(
        network.transfer("a", transfer.id()).unwrap().completed_chunks(),
        0
    );
}

#[test]
fn advance_more_than_remaining() {
    let mut network = two_node_network();
    let transfer = network.initiate_transfer("a", "b", "file", 2 * MIB + 1).unwrap();
    assert_eq!(transfer.chunk_count(), 5);
    assert_eq!(network.advance_transfer("a", "b", transfer.id(), 3), (3, false));
    assert_eq!(network.advance_transfer("a", "b", transfer.id(), 100), (2, true));
}

#[test]
fn advance_zero_chunks() {
    let mut network = two_node_network();
    let transfer = network.initiate_transfer("a", "b", "file", MIB).unwrap();
    assert_eq!(network.advance_transfer("a", "b", transfer.id(), 0), (0, false));
    assert_eq!(
        network.transfer("a", transfer.id()).unwrap().status(),
        TransferStatus::Pending
    );
}

#[test]
fn chunks_complete_in_index_order() {
    let mut network = two_node_network();
    let transfer = network.initiate_transfer("a", "b", "file", 3 * MIB).unwrap();
    network.advance_transfer("a", "b", transfer.id(), 2);
    let transfer = network.transfer("a", transfer.id()).unwrap();
    let statuses = transfer.chunks().map(|chunk| chunk.status).collect::<Vec<_>>();
    assert_eq!(statuses[..2], [ChunkStatus::Completed, ChunkStatus::Completed]);
    assert!(statuses[2..].iter().all(|status| *status == ChunkStatus::Pending));
    assert_eq!(transfer.completed_chunks(), 2);
    assert_eq!(transfer.remaining_chunks(), 4);
    assert!((transfer.progress() - 100.0 / 3.0).abs() < 1e-9);
    assert_eq!(transfer.pending_bytes(3), 3 * 512 * KIB);
}

#[test]
fn empty_file() {
    let mut network = two_node_network();
    let transfer = network.initiate_transfer("a", "b", "empty", 0).unwrap();
    assert_eq!(transfer.chunk_count(), 0);
    assert!(transfer.chunk(0).is_none());
    assert_eq!(transfer.progress(), 0.0);
    assert_eq!(network.stats().active_transfer_count, 1);
    assert_eq!(network.advance_transfer("a", "b", transfer.id(), 1), (0, true));
    assert_eq!(network.stats().active_transfer_count, 0);
    assert!(network.node("b").unwrap().stored_file("empty").is_some());
}

#[test]
fn completed_transfer_is_stored() {
    let mut network = two_node_network();
    let transfer = network.initiate_transfer("a", "b", "data.bin", 3 * MIB).unwrap();
    network.advance_transfer("a", "b", transfer.id(), 10);

    let target = network.node("b").unwrap();
    let stored = target.stored_file("data.bin").unwrap();
    assert_eq!(stored.transfer_id, transfer.id());
    assert_eq!(stored.size, 3 * MIB);
    assert_eq!(stored.source, "a");
    assert!(stored.completed_at >= transfer.created_at());

    let metrics = network.node_metrics("b").unwrap();
    assert_eq!(metrics.completed_transfers, 1);
    assert_eq!(metrics.bytes_received, 3 * MIB);
    assert_eq!(metrics.files_stored, 1);
    assert_eq!(metrics.active_transfers, 0);
    assert!(network.node_metrics("x").is_none());
}

#[test]
fn bandwidth_is_allotted_to_active_transfers() {
    let mut network = two_node_network();
    network.add_node(node("c", 1000 * MIB, GBPS));

    let linked = network.initiate_transfer("a", "b", "linked", MIB).unwrap();
    assert_eq!(linked.allotted_bandwidth(), GBPS);
    let unlinked = network.initiate_transfer("c", "b", "unlinked", MIB).unwrap();
    assert_eq!(unlinked.allotted_bandwidth(), GBPS);
    let starved = network.initiate_transfer("a", "b", "starved", MIB).unwrap();
    assert_eq!(starved.allotted_bandwidth(), 0);

    let stats = network.stats();
    assert_eq!(stats.total_bandwidth, 4 * GBPS);
    assert_eq!(stats.used_bandwidth, 2 * GBPS);
    assert!((stats.bandwidth_utilization_percent - 50.0).abs() < 1e-9);
    assert_eq!(network.node_metrics("b").unwrap().active_transfers, 3);

    network.advance_transfer("a", "b", linked.id(), 10);
    assert_eq!(network.stats().used_bandwidth, GBPS);
    network.cancel_transfer("c", unlinked.id());
    assert_eq!(network.stats().used_bandwidth, 0);
}

#[test]
fn cancel_transfer_releases_storage() {
    let mut network = two_node_network();
    let transfer = network.initiate_transfer("a", "b", "file", 50 * MIB).unwrap();
    network.advance_transfer("a", "b", transfer.id(), 7);

    let cancelled = network.cancel_transfer("a", transfer.id()).unwrap();
    assert_eq!(cancelled.status(), TransferStatus::Failed);
    assert_eq!(cancelled.completed_chunks(), 7);
    assert!(cancelled.completed_at().is_none());
    assert_eq!(network.node("b").unwrap().used_storage(), 0);
    assert_eq!(network.stats().active_transfer_count, 0);
    assert_eq!(network.node_metrics("b").unwrap().failed_transfers, 1);

    assert!(network.cancel_transfer("a", transfer.id()).is_none());
    assert_eq!(network.advance_transfer("a", "b", transfer.id(), 1), (0, true));
    assert_eq!(network.node("b").unwrap().used_storage(), 0);
}

#[test]
fn retrieve_stored_file() {
    let mut network = two_node_network();
    let transfer = network.initiate_transfer("a", "b", "backup.tar", 20 * MIB).unwrap();
    while !network.advance_transfer("a", "b", transfer.id(), 3).1 {}

    assert_eq!(
        network.retrieve_file("b", "missing", "a").unwrap_err(),
        NetworkError::FileNotFound {
            node: "b".to_string(),
            file_name: "missing".to_string(),
        }
    );
    assert_eq!(
        network.retrieve_file("x", "backup.tar", "a").unwrap_err(),
        NetworkError::NodeNotFound("x".to_string())
    );

    let retrieval = network.retrieve_file("b", "backup.tar", "a").unwrap();
    assert_ne!(retrieval.id(), transfer.id());
    assert_eq!(retrieval.source(), "b");
    assert_eq!(retrieval.target(), "a");
    assert_eq!(retrieval.total_size(), 20 * MIB);
    assert_eq!(network.node("a").unwrap().used_storage(), 20 * MIB);
}

#[test]
fn storage_utilization_stats() {
    let empty = Network::new();
    let stats = empty.stats();
    assert_eq!(stats.total_nodes, 0);
    assert_eq!(stats.storage_utilization_percent, 0.0);
    assert_eq!(stats.bandwidth_utilization_percent, 0.0);

    let mut network = Network::new();
    network.add_node(node("zero", 0, 0));
    assert_eq!(network.initiate_transfer("zero", "zero", "f", 0).unwrap().total_size(), 0);
    assert_eq!(network.stats().storage_utilization_percent, 0.0);

    let mut network = two_node_network();
    network.initiate_transfer("a", "b", "x", 300 * MIB).unwrap();
    network.initiate_transfer("b", "a", "y", 7 * MIB + 3).unwrap();
    let stats = network.stats();
    assert_eq!(stats.total_storage, 1500 * MIB);
    assert_eq!(stats.used_storage, 307 * MIB + 3);
    let expected = 100.0 * stats.used_storage as f64 / stats.total_storage as f64;
    assert!((stats.storage_utilization_percent - expected).abs() < 1e-9);
}

#[test]
fn huge_file_chunks_are_not_materialized() {
    let mut network = Network::new();
    network.add_node(node("a", u64::MAX, GBPS));
    let file_size = u64::MAX / 2;
    let transfer = network.initiate_transfer("a", "a", "huge", file_size).unwrap();

    let chunk_size = 10 * MIB;
    let count = file_size.div_ceil(chunk_size);
    assert_eq!(transfer.chunk_size(), chunk_size);
    assert_eq!(transfer.chunk_count(), count);
    assert_eq!(transfer.chunk(count - 1).unwrap().size, file_size - (count - 1) * chunk_size);
    assert!(transfer.chunk(count).is_none());
    assert_eq!(transfer.chunks().take(3).count(), 3);

    assert_eq!(network.advance_transfer("a", "a", transfer.id(), 3), (3, false));
    let current = network.transfer("a", transfer.id()).unwrap();
    assert_eq!(current.chunk(2).unwrap().status, ChunkStatus::Completed);
    assert_eq!(current.chunk(3).unwrap().status, ChunkStatus::Pending);
    assert_eq!(current.remaining_chunks(), count - 3);
    assert_eq!(current.pending_bytes(usize::MAX), file_size - 3 * chunk_size);
    assert!(current.progress() < 1e-6);

    let (advanced, complete) = network.advance_transfer("a", "a", transfer.id(), usize::MAX);
    assert!(complete);
    assert_eq!(advanced as u64, count - 3);
    assert_eq!(network.node("a").unwrap().used_storage(), file_size);
}

#[test]
fn replacing_node_fails_its_transfers() {
    let mut network = two_node_network();
    let inbound = network.initiate_transfer("a", "b", "inbound", 100 * MIB).unwrap();
    let outbound = network.initiate_transfer("b", "a", "outbound", 50 * MIB).unwrap();
    network.advance_transfer("a", "b", inbound.id(), 3);
    assert_eq!(network.node("a").unwrap().used_storage(), 50 * MIB);

    network.add_node(node("b", 1000 * MIB, 2 * GBPS));
    assert_eq!(network.stats().active_transfer_count, 0);
    assert!(network.transfer("a", inbound.id()).is_none());
    assert_eq!(network.advance_transfer("a", "b", inbound.id(), 3), (0, true));
    assert_eq!(network.node("b").unwrap().used_storage(), 0);
    assert_eq!(network.node("a").unwrap().used_storage(), 0);
    assert_eq!(network.node("a").unwrap().used_bandwidth(), 0);
    assert_eq!(network.node_metrics("a").unwrap().failed_transfers, 1);

    let current = network.initiate_transfer("a", "b", "current", 100 * MIB).unwrap();
    assert!(network.cancel_transfer("a", inbound.id()).is_none());
    assert!(network.cancel_transfer("b", outbound.id()).is_none());
    assert_eq!(network.node("b").unwrap().used_storage(), 100 * MIB);

    assert!(matches!(
        network.initiate_transfer("a", "b", "too_big", 1000 * MIB),
        Err(NetworkError::InsufficientStorage { .. })
    ));
    let target = network.node("b").unwrap();
    assert!(target.used_storage() <= target.storage_capacity());

    while !network.advance_transfer("a", "b", current.id(), 4).1 {}
    assert_eq!(network.node("b").unwrap().used_storage(), 100 * MIB);
}
