//! Image signal contract.

use std::cell::{Ref, RefCell};
use std::time::Duration;

use crate::clock;
use crate::error::Result;

/// Pixel layouts carried by image nodes. Plane count and strides are
/// implied: `Gray`, `Rgb` and `Yuyv422` are single-plane; the 4:2:0
/// formats carry three planes with half-resolution chroma.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    Gray,
    Rgb,
    Yuyv422,
    Yuv420p,
    Yuvj420p,
}

impl PixelFormat {
    pub fn num_planes(self) -> usize {
        match self {
            PixelFormat::Gray | PixelFormat::Rgb | PixelFormat::Yuyv422 => 1,
            PixelFormat::Yuv420p | PixelFormat::Yuvj420p => 3,
        }
    }

    pub fn to_wire(self) -> thalamus_proto::image::Format {
        match self {
            PixelFormat::Gray => thalamus_proto::image::Format::Gray,
            PixelFormat::Rgb => thalamus_proto::image::Format::Rgb,
            PixelFormat::Yuyv422 => thalamus_proto::image::Format::Yuyv422,
            PixelFormat::Yuv420p => thalamus_proto::image::Format::Yuv420p,
            PixelFormat::Yuvj420p => thalamus_proto::image::Format::Yuvj420p,
        }
    }

    pub fn from_wire(format: thalamus_proto::image::Format) -> PixelFormat {
        match format {
            thalamus_proto::image::Format::Gray => PixelFormat::Gray,
            thalamus_proto::image::Format::Rgb => PixelFormat::Rgb,
            thalamus_proto::image::Format::Yuyv422 => PixelFormat::Yuyv422,
            thalamus_proto::image::Format::Yuv420p => PixelFormat::Yuv420p,
            thalamus_proto::image::Format::Yuvj420p => PixelFormat::Yuvj420p,
        }
    }
}

/// Borrowed plane bytes, valid until the producer's next `ready`.
pub type PlaneSpan<'a> = Ref<'a, [u8]>;

pub trait ImageNode {
    fn plane(&self, index: usize) -> PlaneSpan<'_>;

    fn num_planes(&self) -> usize;

    fn format(&self) -> PixelFormat;

    fn width(&self) -> u32;

    fn height(&self) -> u32;

    fn frame_interval(&self) -> Duration;

    fn time(&self) -> Duration;

    fn has_image_data(&self) -> bool {
        true
    }

    /// Replaces the exposed frame from its wire form, for replay.
    fn inject(&self, image: thalamus_proto::Image) -> Result<()>;
}

struct ImageData {
    planes: Vec<Vec<u8>>,
    format: PixelFormat,
    width: u32,
    height: u32,
    frame_interval: Duration,
    time: Duration,
}

/// Shared image output buffer.
pub struct ImageOutput {
    inner: RefCell<ImageData>,
}

impl Default for ImageOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageOutput {
    pub fn new() -> Self {
        Self {
            inner: RefCell::new(ImageData {
                planes: Vec::new(),
                format: PixelFormat::Gray,
                width: 0,
                height: 0,
                frame_interval: Duration::ZERO,
                time: Duration::ZERO,
            }),
        }
    }

    pub fn publish(
        &self,
        planes: Vec<Vec<u8>>,
        format: PixelFormat,
        width: u32,
        height: u32,
        frame_interval: Duration,
    ) {
        let mut inner = self.inner.borrow_mut();
        inner.planes = planes;
        inner.format = format;
        inner.width = width;
        inner.height = height;
        inner.frame_interval = frame_interval;
        inner.time = clock::steady_now();
    }

    pub fn publish_wire(&self, image: thalamus_proto::Image) {
        let format = thalamus_proto::image::Format::try_from(image.format)
            .map(PixelFormat::from_wire)
            .unwrap_or(PixelFormat::Gray);
        self.publish(
            image.data,
            format,
            image.width,
            image.height,
            Duration::from_nanos(image.frame_interval),
        );
    }

    pub fn plane(&self, index: usize) -> PlaneSpan<'_> {
        Ref::map(self.inner.borrow(), |d| d.planes[index].as_slice())
    }

    pub fn num_planes(&self) -> usize {
        self.inner.borrow().planes.len()
    }

    pub fn format(&self) -> PixelFormat {
        self.inner.borrow().format
    }

    pub fn width(&self) -> u32 {
        self.inner.borrow().width
    }

    pub fn height(&self) -> u32 {
        self.inner.borrow().height
    }

    pub fn frame_interval(&self) -> Duration {
        self.inner.borrow().frame_interval
    }

    pub fn time(&self) -> Duration {
        self.inner.borrow().time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plane_counts() {
        assert_eq!(PixelFormat::Gray.num_planes(), 1);
        assert_eq!(PixelFormat::Rgb.num_planes(), 1);
        assert_eq!(PixelFormat::Yuyv422.num_planes(), 1);
        assert_eq!(PixelFormat::Yuv420p.num_planes(), 3);
        assert_eq!(PixelFormat::Yuvj420p.num_planes(), 3);
    }

    #[test]
    fn test_publish_wire() {
        let output = ImageOutput::new();
        output.publish_wire(thalamus_proto::Image {
            width: 4,
            height: 2,
            format: thalamus_proto::image::Format::Yuv420p as i32,
            data: vec![vec![0; 8], vec![0; 2], vec![0; 2]],
            frame_interval: 33_000_000,
            time: 0,
        });
        assert_eq!(output.format(), PixelFormat::Yuv420p);
        assert_eq!(output.num_planes(), 3);
        assert_eq!(output.width(), 4);
        assert_eq!(&*output.plane(1), &[0, 0]);
    }
}
