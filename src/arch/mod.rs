//! # Architecture Abstraction Layer
//!
//! Provides a hardware abstraction boundary for the kernel.
//! Currently implements the Cortex-M4 port.

pub mod cortex_m4;
