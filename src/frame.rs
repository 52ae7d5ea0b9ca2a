//! Decoded frames and the region of interest.
//!
//! - `Frame`: one decoded RGB frame with its source position and timestamp.
//! - `Roi`: the fixed rectangle of the table where cards are detected.
//!
//! Frame indices are 1-based and follow the source order; the pipeline never
//! reorders frames.

use std::fmt;

use anyhow::Result;
use image::{imageops, RgbImage};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Region of interest in full-frame pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roi {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Roi {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// True when the whole rectangle lies inside a `width` × `height` frame.
    pub fn fits(&self, width: u32, height: u32) -> bool {
        let right = self.x.checked_add(self.width);
        let bottom = self.y.checked_add(self.height);
        matches!((right, bottom), (Some(r), Some(b)) if r <= width && b <= height)
    }

    /// Parse `x,y,width,height`.
    pub fn parse_csv(value: &str) -> Option<Self> {
        let parts: Vec<u32> = value
            .split(',')
            .map(|part| part.trim().parse().ok())
            .collect::<Option<Vec<u32>>>()?;
        match parts.as_slice() {
            [x, y, width, height] => Some(Self::new(*x, *y, *width, *height)),
            _ => None,
        }
    }
}

impl fmt::Display for Roi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}x{})",
            self.x, self.y, self.width, self.height
        )
    }
}

/// One decoded frame.
pub struct Frame {
    /// 1-based position in the source.
    pub index: u64,
    /// Presentation time in milliseconds.
    pub timestamp_ms: f64,
    pub image: RgbImage,
}

impl Frame {
    pub fn new(index: u64, timestamp_ms: f64, image: RgbImage) -> Self {
        Self {
            index,
            timestamp_ms,
            image,
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Copy out the region of interest for detection.
    pub fn region(&self, roi: &Roi) -> Result<RgbImage> {
        if roi.is_empty() || !roi.fits(self.width(), self.height()) {
            return Err(PipelineError::RegionOutOfBounds {
                roi: roi.to_string(),
                width: self.width(),
                height: self.height(),
            }
            .into());
        }
        Ok(imageops::crop_imm(&self.image, roi.x, roi.y, roi.width, roi.height).to_image())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn region_copies_pixels_from_offset() {
        let mut image = RgbImage::new(8, 6);
        image.put_pixel(3, 2, Rgb([9, 8, 7]));
        let frame = Frame::new(1, 0.0, image);

        let region = frame.region(&Roi::new(3, 2, 4, 3)).unwrap();
        assert_eq!(region.dimensions(), (4, 3));
        assert_eq!(region.get_pixel(0, 0), &Rgb([9, 8, 7]));
    }

    #[test]
    fn region_outside_frame_is_rejected() {
        let frame = Frame::new(1, 0.0, RgbImage::new(8, 6));
        for roi in [
            Roi::new(5, 0, 4, 2),
            Roi::new(0, 5, 2, 2),
            Roi::new(0, 0, 0, 2),
            Roi::new(u32::MAX, 0, 2, 2),
        ] {
            let err = frame.region(&roi).unwrap_err();
            assert!(matches!(
                err.downcast_ref::<PipelineError>(),
                Some(PipelineError::RegionOutOfBounds { .. })
            ));
        }
    }

    #[test]
    fn parses_roi_csv() {
        assert_eq!(
            Roi::parse_csv("195, 243,825,250"),
            Some(Roi::new(195, 243, 825, 250))
        );
        assert_eq!(Roi::parse_csv("1,2,3"), None);
        assert_eq!(Roi::parse_csv("1,2,3,x"), None);
    }
}
