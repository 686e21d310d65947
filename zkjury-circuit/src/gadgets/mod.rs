// zkjury/zkjury-circuit/src/gadgets/mod.rs
// Numan Thabit 2025

pub mod membership;
pub mod merkle;
pub mod poseidon;
