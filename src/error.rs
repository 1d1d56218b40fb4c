use thiserror::Error;

/// Why a sequence operation was rejected
///
/// Every rejection happens before the tree is touched, so a failed call
/// leaves the sequence exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreapError {
    #[error("index {index} is out of bounds for a sequence of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },
    #[error("range {start}..{end} is out of bounds for a sequence of length {len}")]
    RangeOutOfBounds { start: usize, end: usize, len: usize },
    #[error("range {start}..{end} is empty or inverted")]
    InvalidRange { start: usize, end: usize },
    #[error("rank {rank} is out of bounds for a sequence of length {len} (ranks start at 1)")]
    RankOutOfBounds { rank: usize, len: usize },
    #[error("node handle is stale or was not issued by this sequence")]
    UnknownNode,
}
