use anyhow::Result;
use image::RgbImage;

use crate::detect::result::RawDetection;

/// Card detector backend trait.
///
/// The pipeline hands each backend the region of interest of one frame and
/// expects the raw detections back. Backends do not filter by confidence and
/// do not validate labels; both happen downstream.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on the region of interest of one frame.
    ///
    /// Implementations must treat the image as read-only.
    fn detect(&mut self, region: &RgbImage) -> Result<Vec<RawDetection>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
