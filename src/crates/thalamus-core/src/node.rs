//! The node contract: every unit of the dataflow graph has a `ready`
//! signal, a declared modality bitset, and capability accessors for the
//! per-modality views.
//!
//! Consumers check the bitset first and then take the view; the
//! [`analog_view`]-style helpers bundle both steps.

use crate::analog::AnalogNode;
use crate::error::Result;
use crate::image::ImageNode;
use crate::motion::MotionCaptureNode;
use crate::stim::StimNode;
use crate::text::TextNode;
use std::ops::{BitOr, BitOrAssign};
use thalamus_state::Signal;

/// Bitset of the signal modalities a node produces.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modalities(u32);

impl Modalities {
    pub const NONE: Modalities = Modalities(0);
    pub const ANALOG: Modalities = Modalities(1);
    pub const MOTION: Modalities = Modalities(2);
    pub const IMAGE: Modalities = Modalities(4);
    pub const TEXT: Modalities = Modalities(8);
    pub const STIM: Modalities = Modalities(16);

    pub fn contains(self, other: Modalities) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn from_bits(bits: u32) -> Modalities {
        Modalities(bits & 0x1f)
    }
}

impl BitOr for Modalities {
    type Output = Modalities;
    fn bitor(self, rhs: Modalities) -> Modalities {
        Modalities(self.0 | rhs.0)
    }
}

impl BitOrAssign for Modalities {
    fn bitor_assign(&mut self, rhs: Modalities) {
        self.0 |= rhs.0;
    }
}

/// A unit of the dataflow graph.
///
/// `ready` fires after the node's accessors hold fresh, coherent output;
/// handlers run synchronously on the io executor in connection order and
/// must not block. Data borrowed from the node's accessors is valid until
/// the next `ready` of the same node.
pub trait Node {
    /// Fresh-output notification.
    fn ready(&self) -> &Signal<()>;

    /// The modalities this node can produce.
    fn modalities(&self) -> Modalities;

    /// Opaque JSON request/response hook, used by the `node_request` and
    /// `remote_node` RPCs and by nodes that accept commands.
    fn process(&self, _request: &serde_json::Value) -> Result<serde_json::Value> {
        Ok(serde_json::Value::Null)
    }

    fn as_analog(&self) -> Option<&dyn AnalogNode> {
        None
    }

    fn as_motion(&self) -> Option<&dyn MotionCaptureNode> {
        None
    }

    fn as_image(&self) -> Option<&dyn ImageNode> {
        None
    }

    fn as_text(&self) -> Option<&dyn TextNode> {
        None
    }

    fn as_stim(&self) -> Option<&dyn StimNode> {
        None
    }
}

/// Analog view of `node`, gated on the modality bit.
pub fn analog_view(node: &dyn Node) -> Option<&dyn AnalogNode> {
    if node.modalities().contains(Modalities::ANALOG) {
        node.as_analog()
    } else {
        None
    }
}

/// Motion-capture view of `node`, gated on the modality bit.
pub fn motion_view(node: &dyn Node) -> Option<&dyn MotionCaptureNode> {
    if node.modalities().contains(Modalities::MOTION) {
        node.as_motion()
    } else {
        None
    }
}

/// Image view of `node`, gated on the modality bit.
pub fn image_view(node: &dyn Node) -> Option<&dyn ImageNode> {
    if node.modalities().contains(Modalities::IMAGE) {
        node.as_image()
    } else {
        None
    }
}

/// Text view of `node`, gated on the modality bit.
pub fn text_view(node: &dyn Node) -> Option<&dyn TextNode> {
    if node.modalities().contains(Modalities::TEXT) {
        node.as_text()
    } else {
        None
    }
}

/// Stim view of `node`, gated on the modality bit.
pub fn stim_view(node: &dyn Node) -> Option<&dyn StimNode> {
    if node.modalities().contains(Modalities::STIM) {
        node.as_stim()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitset_composition() {
        let m = Modalities::ANALOG | Modalities::TEXT;
        assert!(m.contains(Modalities::ANALOG));
        assert!(m.contains(Modalities::TEXT));
        assert!(!m.contains(Modalities::IMAGE));
        assert_eq!(m.bits(), 9);
        assert_eq!(Modalities::from_bits(9), m);
    }

    #[test]
    fn test_from_bits_masks_unknown_bits() {
        assert_eq!(Modalities::from_bits(0xffff_ffff).bits(), 0x1f);
    }
}
