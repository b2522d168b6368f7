//! Wire messages and the `Thalamus` gRPC service for the dataflow fabric.
//!
//! Message structs live in [`thalamus`] (hand-maintained in the generated
//! style, schema in `proto/thalamus.proto`), [`framing`] implements the
//! length-framed record log encoding, and [`convert`] bridges between the
//! wire types and the observable state tree.

pub mod convert;
pub mod framing;
mod thalamus;

pub use thalamus::*;
