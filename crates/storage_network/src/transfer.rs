//! File transfers and chunking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::node::NodeId;

pub type TransferId = u64;

pub const KIB: u64 = 1024;
pub const MIB: u64 = 1024 * KIB;

/// Status of a [Transfer].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferStatus {
    /// No chunk was delivered yet.
    Pending,
    InProgress,
    /// All chunks were delivered.
    Completed,
    /// Transfer was cancelled.
    Failed,
}

/// Status of a [Chunk].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChunkStatus {
    Pending,
    Completed,
}

/// Piece of a transferred file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Position of the chunk in the file, starting from 0.
    pub index: u64,
    /// Size in bytes.
    pub size: u64,
    pub status: ChunkStatus,
    pub checksum: Option<String>,
}

/// Chunk size used for a file of a given size.
///
/// Files under 10 MiB are split into 512 KiB chunks, files under 100 MiB into 2 MiB chunks,
/// everything larger into 10 MiB chunks.
pub fn chunk_size_for(file_size: u64) -> u64 {
    if file_size < 10 * MIB {
        512 * KIB
    } else if file_size < 100 * MIB {
        2 * MIB
    } else {
        10 * MIB
    }
}

/// Zero `chunk_size` means a single chunk with the whole file.
fn effective_chunk_size(file_size: u64, chunk_size: u64) -> u64 {
    if chunk_size == 0 {
        file_size
    } else {
        chunk_size
    }
}

/// Number of chunks `file_size` bytes are split into.
pub fn chunk_count(file_size: u64, chunk_size: u64) -> u64 {
    if file_size == 0 {
        return 0;
    }
    file_size.div_ceil(effective_chunk_size(file_size, chunk_size))
}

/// Pending chunk number `index` of a file split into `chunk_size` pieces, `None` past the last chunk.
pub fn chunk_at(file_size: u64, chunk_size: u64, index: u64) -> Option<Chunk> {
    if index >= chunk_count(file_size, chunk_size) {
        return None;
    }
    let chunk_size = effective_chunk_size(file_size, chunk_size);
    Some(Chunk {
        index,
        size: chunk_size.min(file_size - index * chunk_size),
        status: ChunkStatus::Pending,
        checksum: None,
    })
}

/// Lazily splits `file_size` bytes into pending chunks of `chunk_size` bytes, the last one may be smaller.
pub fn split_into_chunks(file_size: u64, chunk_size: u64) -> impl Iterator<Item = Chunk> {
    (0..chunk_count(file_size, chunk_size)).filter_map(move |index| chunk_at(file_size, chunk_size, index))
}

/// Transfer of a single file from a source node to a target node.
///
/// Transfers are created and mutated only by the [Network](crate::network::Network) which owns them,
/// callers get read-only access or cloned snapshots.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Transfer {
    id: TransferId,
    source: NodeId,
    target: NodeId,
    file_name: String,
    total_size: u64,
    chunk_size: u64,
    chunk_count: u64,
    /// Chunks are completed in index order, so every chunk below this index is completed.
    completed_chunks: u64,
    status: TransferStatus,
    allotted_bandwidth: u64,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl Transfer {
    pub(crate) fn new(
        id: TransferId,
        source: NodeId,
        target: NodeId,
        file_name: String,
        total_size: u64,
        allotted_bandwidth: u64,
    ) -> Self {
        let chunk_size = chunk_size_for(total_size);
        Self {
            id,
            source,
            target,
            file_name,
            total_size,
            chunk_size,
            chunk_count: chunk_count(total_size, chunk_size),
            completed_chunks: 0,
            status: TransferStatus::Pending,
            allotted_bandwidth,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn id(&self) -> TransferId {
        self.id
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Size of the file in bytes.
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// Size of every chunk except possibly the last one.
    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    pub fn chunk_count(&self) -> u64 {
        self.chunk_count
    }

    /// Chunk with a given index together with its current status.
    pub fn chunk(&self, index: u64) -> Option<Chunk> {
        let mut chunk = chunk_at(self.total_size, self.chunk_size, index)?;
        if index < self.completed_chunks {
            chunk.status = ChunkStatus::Completed;
        }
        Some(chunk)
    }

    /// All chunks in index order, computed on the fly.
    pub fn chunks(&self) -> impl Iterator<Item = Chunk> + '_ {
        (0..self.chunk_count).filter_map(move |index| self.chunk(index))
    }

    pub fn status(&self) -> TransferStatus {
        self.status
    }

    /// Bandwidth reserved on the target node for this transfer, bits/sec.
    pub fn allotted_bandwidth(&self) -> u64 {
        self.allotted_bandwidth
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn completed_chunks(&self) -> u64 {
        self.completed_chunks
    }

    pub fn remaining_chunks(&self) -> u64 {
        self.chunk_count - self.completed_chunks
    }

    /// Total size of the next `max_chunks` pending chunks, i.e. of what the next advance would deliver.
    pub fn pending_bytes(&self, max_chunks: usize) -> u64 {
        let end = self.completed_chunks + (max_chunks as u64).min(self.remaining_chunks());
        self.offset(end) - self.offset(self.completed_chunks)
    }

    /// Percentage of delivered chunks.
    pub fn progress(&self) -> f64 {
        if self.chunk_count == 0 {
            return if self.status == TransferStatus::Completed { 100.0 } else { 0.0 };
        }
        self.completed_chunks as f64 * 100.0 / self.chunk_count as f64
    }

    /// Whether the transfer is completed or failed.
    pub fn is_finished(&self) -> bool {
        matches!(self.status, TransferStatus::Completed | TransferStatus::Failed)
    }

    /// Position in the file where chunk `index` starts.
    fn offset(&self, index: u64) -> u64 {
        index.saturating_mul(self.chunk_size).min(self.total_size)
    }

    /// Marks up to `max_chunks` pending chunks as completed, lowest index first.
    /// Returns the number of chunks marked.
    pub(crate) fn advance(&mut self, max_chunks: usize) -> usize {
        let advanced = (max_chunks as u64).min(self.remaining_chunks());
        self.completed_chunks += advanced;
        if advanced > 0 && self.status == TransferStatus::Pending {
            self.status = TransferStatus::InProgress;
        }
        advanced as usize
    }

    pub(crate) fn all_chunks_completed(&self) -> bool {
        self.completed_chunks == self.chunk_count
    }

    pub(crate) fn complete(&mut self) {
        self.status = TransferStatus::Completed;
        self.completed_at = Some(Utc::now());
    }

    pub(crate) fn fail(&mut self) {
        self.status = TransferStatus::Failed;
    }
}
