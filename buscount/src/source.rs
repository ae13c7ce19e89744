//! Frames and frame sources

use image::RgbImage;
use std::sync::Arc;

/// A decoded video frame and its index in the source video
#[derive(Debug, Clone)]
pub struct Frame {
    pub frame_no: u64,
    pub image: Arc<RgbImage>,
}

impl Frame {
    pub fn new(frame_no: u64, image: RgbImage) -> Self {
        Self {
            frame_no,
            image: Arc::new(image),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Supplies frames to the pipeline.
///
/// Returning `None` signals the end of the stream. Frame indices must be
/// increasing but may skip.
pub trait FrameSource {
    fn next_frame(&mut self) -> Option<Frame>;
}

impl<F> FrameSource for F
where
    F: FnMut() -> Option<Frame>,
{
    fn next_frame(&mut self) -> Option<Frame> {
        self()
    }
}

/// Numbers the images of an iterator from zero
pub struct ImageSequence<I> {
    images: I,
    next_no: u64,
}

impl<I: Iterator<Item = RgbImage>> ImageSequence<I> {
    pub fn new<T: IntoIterator<IntoIter = I>>(images: T) -> Self {
        Self {
            images: images.into_iter(),
            next_no: 0,
        }
    }
}

impl<I: Iterator<Item = RgbImage>> FrameSource for ImageSequence<I> {
    fn next_frame(&mut self) -> Option<Frame> {
        let image = self.images.next()?;
        let frame = Frame::new(self.next_no, image);
        self.next_no += 1;
        Some(frame)
    }
}
