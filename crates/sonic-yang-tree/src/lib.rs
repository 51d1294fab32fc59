//! The YANG-validated data tree used by the dynamic port breakout engine.
//!
//! [`TreeStore`] owns a `yang3::Context` compiled from the schema modules
//! on disk, and the [`sonic_dpb_common::Node`] tree that is actually read
//! and mutated by the rest of the engine.
//!
//! The context and any data tree built from it are libyang FFI objects with
//! a borrow relationship the Rust type system can only express with a
//! lifetime parameter (`DataTree<'a>` borrows `&'a Context`). Rather than
//! carry that lifetime into `TreeStore` itself — which would force every
//! caller in `sonic-dpb-engine` to thread it through `DpbTransaction` too —
//! this store keeps its own canonical tree as a plain, owned
//! [`sonic_dpb_common::Node`] and only opens a transient `DataTree` for the
//! duration of a single `validate()` call. See `tree_store.rs` for why that
//! trade-off is sound for this workload: a DPB transaction validates a
//! handful of times total, never streams.

pub mod deps;
pub mod tree_store;

pub use tree_store::TreeStore;
