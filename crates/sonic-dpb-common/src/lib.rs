//! Shared types and errors for the SONiC dynamic port breakout engine.
//!
//! One place for the tree representation, the unified error enum, and
//! table/field name constants that every other crate in the `sonic-dpb-*`
//! family depends on.
//!
//! - [`node`]: the tagged `Node` tree (`Map` / `List` / `Scalar`)
//! - [`error`]: [`DpbError`] and [`DpbResult`]
//! - [`tables`]: Config DB table and field name constants

pub mod error;
pub mod node;
pub mod tables;

pub use error::{DpbError, DpbResult};
pub use node::{Node, ScalarValue};
