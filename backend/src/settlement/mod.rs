//! Settlement Module
//!
//! Turns the per-node allocation into bilateral contracts:
//! - [`pairing`]: deterministic sweep pairing supply fills against demand fills
//! - [`binder`]: the caller-supplied contract binder interface
//!
//! # Critical Invariants
//!
//! 1. **Conservation**: pair volumes summed per node equal that node's fill
//!    delta, so binding never moves more than was rationed
//! 2. **Determinism**: pairing depends only on collection order and amounts

pub mod binder;
pub mod pairing;

pub use binder::{AcceptAllBinder, BindRejection, BinderFailure, ContractBinder, ContractRecord};
pub use pairing::{sweep_pairs, MatchedPair};
