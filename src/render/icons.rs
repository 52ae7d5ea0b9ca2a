use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::RgbaImage;

use crate::card::{Card, CardIndex};
use crate::error::PipelineError;

pub const DEFAULT_ICON_DIR: &str = "card_icons";

/// Card icons with alpha, keyed by card.
///
/// `load` insists on an icon for every card in the index, so a run fails
/// before the first frame rather than halfway through the video.
#[derive(Debug)]
pub struct IconSet {
    icons: HashMap<Card, RgbaImage>,
    dir: PathBuf,
}

impl IconSet {
    /// Load `<LABEL>.png` for every card of `index` from `dir`.
    pub fn load<P: AsRef<Path>>(dir: P, index: &CardIndex) -> Result<Self> {
        let dir = dir.as_ref();
        let mut icons = HashMap::with_capacity(index.cards().len());
        for card in index.cards() {
            let path = dir.join(format!("{}.png", card));
            if !path.is_file() {
                return Err(PipelineError::MissingIcon {
                    card: *card,
                    dir: dir.to_path_buf(),
                }
                .into());
            }
            let icon = image::open(&path)
                .with_context(|| format!("failed to decode icon {}", path.display()))?
                .to_rgba8();
            icons.insert(*card, icon);
        }
        log::info!("IconSet: loaded {} icons from {}", icons.len(), dir.display());
        Ok(Self {
            icons,
            dir: dir.to_path_buf(),
        })
    }

    /// Build a set from in-memory icons. Cards without an icon fail at draw time.
    pub fn from_icons(icons: impl IntoIterator<Item = (Card, RgbaImage)>) -> Self {
        Self {
            icons: icons.into_iter().collect(),
            dir: PathBuf::from("<memory>"),
        }
    }

    pub fn get(&self, card: Card) -> Result<&RgbaImage> {
        self.icons.get(&card).ok_or_else(|| {
            PipelineError::MissingIcon {
                card,
                dir: self.dir.clone(),
            }
            .into()
        })
    }

    pub fn len(&self) -> usize {
        self.icons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.icons.is_empty()
    }
}
