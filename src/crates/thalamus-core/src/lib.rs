//! Core dataflow substrate for thalamus.
//!
//! The graph joins heterogeneous signal producers and consumers on a
//! single-threaded io executor: nodes are created, reconfigured and
//! destroyed by edits to the shared state tree, discover each other
//! lazily by name or type, and announce fresh output through `ready`
//! signals whose borrowed data is valid until the producer's next
//! publish. CPU-heavy work runs banded on a fixed thread pool, and the
//! storage pipeline serializes every subscribed `ready` into a
//! length-framed record log.

pub mod analog;
pub mod clock;
pub mod error;
pub mod executor;
pub mod graph;
pub mod image;
pub mod motion;
pub mod node;
pub mod nodes;
pub mod stim;
pub mod text;
pub mod thread_pool;

pub use analog::{AnalogNode, AnalogOutput, AnalogSpan};
pub use error::{GraphError, Result};
pub use executor::{io_channel, IoExecutor, IoTaskQueue};
pub use graph::{typed_factory, NodeFactory, NodeGraph, NodeGraphWeak, Selector, TypedNode};
pub use image::{ImageNode, ImageOutput, PixelFormat};
pub use motion::{MotionCaptureNode, MotionOutput, MotionSegment};
pub use node::{
    analog_view, image_view, motion_view, stim_view, text_view, Modalities, Node,
};
pub use stim::StimNode;
pub use text::{TextNode, TextOutput};
pub use thread_pool::ThreadPool;
