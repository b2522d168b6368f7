//! Observable state tree for the thalamus dataflow fabric.
//!
//! The state tree is the shared configuration document the whole system is
//! driven by: a hierarchy of observable maps and lists holding primitive
//! leaves. Mutations fire per-collection change signals plus recursive
//! notifications up the parent chain, collections can be addressed with a
//! JSONPath subset, and a remote-storage hook lets a bridge defer writes
//! through a round trip to an authoritative peer.
//!
//! Everything in this crate is single-threaded and `Rc`-based; the tree
//! must only be touched from the io executor.

pub mod error;
pub mod jsonpath;
pub mod signal;
pub mod value;

pub use error::{Result, StateError};
pub use signal::{Connection, Signal};
pub use value::{
    Action, ChangeEvent, Collection, DoneCallback, Key, ObservableList, ObservableListHandle,
    ObservableMap, ObservableMapHandle, RecursiveChangeEvent, RemoteStorageHook, Value,
};
