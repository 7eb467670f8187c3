#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BagError {
    #[error("Occurrence count {count} cannot grow by {delta} without overflowing")]
    Overflow { count: u64, delta: u64 },

    #[error("Total of {total} occurrences cannot grow by {delta} without overflowing")]
    TotalOverflow { total: u64, delta: u64 },

    #[error("Zero is not a valid occurrence count")]
    ZeroCount,
}
