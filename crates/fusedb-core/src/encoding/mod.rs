//! Row encoding: the per-row null bitmap and the fixed-width cell codec.

pub mod bitset;
pub mod cell;

pub use bitset::Bitset;
