//! Output-frame overlay: frame counter plus a row of card icons.

mod icons;
mod text;

use std::collections::HashSet;

use anyhow::Result;
use image::{Rgb, RgbImage, RgbaImage};

use crate::filter::Detection;
use crate::session::FrameRecord;

pub use icons::{IconSet, DEFAULT_ICON_DIR};
pub use text::draw_text;

/// Fixed overlay geometry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OverlayLayout {
    /// Left edge and baseline of the frame counter.
    pub text_origin: (i32, i32),
    pub text_scale: u32,
    pub text_color: Rgb<u8>,
    /// Top-left corner of the first icon slot.
    pub icon_origin: (u32, u32),
    /// Horizontal gap between icon slots.
    pub icon_margin: u32,
}

impl Default for OverlayLayout {
    fn default() -> Self {
        Self {
            text_origin: (10, 30),
            text_scale: 3,
            text_color: Rgb([255, 255, 255]),
            icon_origin: (10, 70),
            icon_margin: 10,
        }
    }
}

/// Draws the overlay onto output frames. Holds no per-frame state.
pub struct FrameRenderer {
    icons: IconSet,
    layout: OverlayLayout,
}

impl FrameRenderer {
    pub fn new(icons: IconSet) -> Self {
        Self::with_layout(icons, OverlayLayout::default())
    }

    pub fn with_layout(icons: IconSet, layout: OverlayLayout) -> Self {
        Self { icons, layout }
    }

    /// Draw the overlay for `record` onto `frame` in place.
    ///
    /// Returns the number of icons drawn. Each card is drawn at most once,
    /// left to right by the x of its leftmost detection.
    pub fn render(&self, frame: &mut RgbImage, record: &FrameRecord) -> Result<usize> {
        let (left, baseline) = self.layout.text_origin;
        draw_text(
            frame,
            left,
            baseline,
            &format!("Frame: {}", record.frame_id),
            self.layout.text_scale,
            self.layout.text_color,
        );

        let (origin_x, origin_y) = self.layout.icon_origin;
        let mut drawn = HashSet::new();
        let mut slot = 0u32;
        for detection in sorted_by_x(&record.cards_info) {
            if !drawn.insert(detection.card) {
                continue;
            }
            let icon = self.icons.get(detection.card)?;
            let x = origin_x + slot * (icon.width() + self.layout.icon_margin);
            composite(frame, icon, x, origin_y);
            slot += 1;
        }
        Ok(drawn.len())
    }
}

fn sorted_by_x(detections: &[Detection]) -> Vec<&Detection> {
    let mut sorted: Vec<&Detection> = detections.iter().collect();
    sorted.sort_by(|a, b| a.x.total_cmp(&b.x));
    sorted
}

/// Alpha-blend `icon` onto `frame` with its top-left corner at (`left`, `top`).
///
/// `out = a * icon + (1 - a) * background` per channel, `a = alpha / 255`.
/// The parts of the icon outside the frame are skipped.
pub fn composite(frame: &mut RgbImage, icon: &RgbaImage, left: u32, top: u32) {
    let (frame_w, frame_h) = frame.dimensions();
    for (ix, iy, pixel) in icon.enumerate_pixels() {
        let (Some(x), Some(y)) = (left.checked_add(ix), top.checked_add(iy)) else {
            continue;
        };
        if x >= frame_w || y >= frame_h {
            continue;
        }
        let alpha = f32::from(pixel[3]) / 255.0;
        let background = frame.get_pixel_mut(x, y);
        for c in 0..3 {
            let blended = alpha * f32::from(pixel[c]) + (1.0 - alpha) * f32::from(background[c]);
            background[c] = blended as u8;
        }
    }
}
