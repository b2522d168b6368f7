//! Motion-capture signal contract.

use std::cell::{Ref, RefCell};
use std::time::Duration;

use crate::clock;

/// One tracked segment of a motion-capture frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MotionSegment {
    pub frame: u32,
    pub segment_id: u32,
    pub time: u32,
    pub actor: u32,
    pub position: [f32; 3],
    pub rotation: [f32; 4],
}

/// Borrowed view of the most recent frame's segments, valid until the
/// producer's next `ready`.
pub type SegmentSpan<'a> = Ref<'a, [MotionSegment]>;

pub trait MotionCaptureNode {
    fn segments(&self) -> SegmentSpan<'_>;

    fn pose_name(&self) -> String;

    fn time(&self) -> Duration;

    fn has_motion_data(&self) -> bool {
        true
    }

    /// Replaces the exposed frame, for replay and test harnesses.
    fn inject(&self, segments: Vec<MotionSegment>) -> crate::error::Result<()>;
}

struct MotionData {
    segments: Vec<MotionSegment>,
    pose_name: String,
    time: Duration,
}

/// Shared motion output buffer, the motion counterpart of
/// [`crate::analog::AnalogOutput`].
pub struct MotionOutput {
    inner: RefCell<MotionData>,
}

impl Default for MotionOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl MotionOutput {
    pub fn new() -> Self {
        Self {
            inner: RefCell::new(MotionData {
                segments: Vec::new(),
                pose_name: String::new(),
                time: Duration::ZERO,
            }),
        }
    }

    pub fn publish(&self, segments: Vec<MotionSegment>, pose_name: String) {
        let mut inner = self.inner.borrow_mut();
        inner.segments = segments;
        inner.pose_name = pose_name;
        inner.time = clock::steady_now();
    }

    pub fn segments(&self) -> SegmentSpan<'_> {
        Ref::map(self.inner.borrow(), |d| d.segments.as_slice())
    }

    pub fn pose_name(&self) -> String {
        self.inner.borrow().pose_name.clone()
    }

    pub fn time(&self) -> Duration {
        self.inner.borrow().time
    }
}

impl MotionSegment {
    pub fn to_wire(&self) -> thalamus_proto::Segment {
        thalamus_proto::Segment {
            id: self.segment_id,
            frame: self.frame,
            time: self.time,
            actor: self.actor,
            x: self.position[0],
            y: self.position[1],
            z: self.position[2],
            q0: self.rotation[0],
            q1: self.rotation[1],
            q2: self.rotation[2],
            q3: self.rotation[3],
        }
    }

    pub fn from_wire(segment: &thalamus_proto::Segment) -> MotionSegment {
        MotionSegment {
            frame: segment.frame,
            segment_id: segment.id,
            time: segment.time,
            actor: segment.actor,
            position: [segment.x, segment.y, segment.z],
            rotation: [segment.q0, segment.q1, segment.q2, segment.q3],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_round_trip() {
        let segment = MotionSegment {
            frame: 1,
            segment_id: 2,
            time: 3,
            actor: 4,
            position: [0.5, 1.5, 2.5],
            rotation: [1.0, 0.0, 0.0, 0.0],
        };
        assert_eq!(MotionSegment::from_wire(&segment.to_wire()), segment);
    }
}
