use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::aggregate::DEFAULT_MIN_APPEARANCE;
use crate::card::{CardIndex, STANDARD_LABELS};
use crate::filter::DEFAULT_CONFIDENCE_THRESHOLD;
use crate::frame::Roi;
use crate::ingest::file::DEFAULT_FPS;
use crate::render::DEFAULT_ICON_DIR;
use crate::session::{ArtifactNames, DEFAULT_JSON_FILE, DEFAULT_TEXT_FILE};

pub const DEFAULT_ROI: Roi = Roi::new(195, 243, 825, 250);
const DEFAULT_OUTPUT_DIR: &str = "output/table";

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct PipelineConfigFile {
    confidence_threshold: Option<f64>,
    min_appearance: Option<u32>,
    roi: Option<Roi>,
    labels: Option<Vec<String>>,
    icons: Option<IconsConfigFile>,
    output: Option<OutputConfigFile>,
    source: Option<SourceConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct IconsConfigFile {
    dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct OutputConfigFile {
    dir: Option<PathBuf>,
    json_file: Option<String>,
    text_file: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct SourceConfigFile {
    fps: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub confidence_threshold: f64,
    pub min_appearance: u32,
    pub roi: Roi,
    pub labels: Vec<String>,
    pub icon_dir: PathBuf,
    pub output: OutputSettings,
    pub source_fps: f64,
}

#[derive(Debug, Clone)]
pub struct OutputSettings {
    pub dir: PathBuf,
    pub names: ArtifactNames,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_file(PipelineConfigFile::default())
    }
}

impl PipelineConfig {
    /// Load from `CARDS_CONFIG` (if set), then apply env overrides and validate.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("CARDS_CONFIG").ok();
        Self::load_from(config_path.as_deref().map(Path::new))
    }

    /// Load from an explicit file instead of `CARDS_CONFIG`. Env overrides
    /// still apply.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => Some(read_config_file(path)?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: PipelineConfigFile) -> Self {
        let output = file.output.unwrap_or_default();
        Self {
            confidence_threshold: file
                .confidence_threshold
                .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD),
            min_appearance: file.min_appearance.unwrap_or(DEFAULT_MIN_APPEARANCE),
            roi: file.roi.unwrap_or(DEFAULT_ROI),
            labels: file.labels.unwrap_or_else(|| {
                STANDARD_LABELS.iter().map(|label| label.to_string()).collect()
            }),
            icon_dir: file
                .icons
                .and_then(|icons| icons.dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_ICON_DIR)),
            output: OutputSettings {
                dir: output
                    .dir
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
                names: ArtifactNames {
                    json_file: output
                        .json_file
                        .unwrap_or_else(|| DEFAULT_JSON_FILE.to_string()),
                    text_file: output
                        .text_file
                        .unwrap_or_else(|| DEFAULT_TEXT_FILE.to_string()),
                },
            },
            source_fps: file.source.and_then(|source| source.fps).unwrap_or(DEFAULT_FPS),
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(threshold) = std::env::var("CARDS_CONFIDENCE_THRESHOLD") {
            self.confidence_threshold = threshold
                .trim()
                .parse()
                .map_err(|_| anyhow!("CARDS_CONFIDENCE_THRESHOLD must be a number"))?;
        }
        if let Ok(min) = std::env::var("CARDS_MIN_APPEARANCE") {
            self.min_appearance = min
                .trim()
                .parse()
                .map_err(|_| anyhow!("CARDS_MIN_APPEARANCE must be a positive integer"))?;
        }
        if let Ok(roi) = std::env::var("CARDS_ROI") {
            if split_csv(&roi).len() != 4 {
                return Err(anyhow!("CARDS_ROI must be x,y,width,height"));
            }
            self.roi = Roi::parse_csv(&roi)
                .ok_or_else(|| anyhow!("CARDS_ROI must be four non-negative integers"))?;
        }
        if let Ok(dir) = std::env::var("CARDS_ICON_DIR") {
            if !dir.trim().is_empty() {
                self.icon_dir = PathBuf::from(dir);
            }
        }
        if let Ok(dir) = std::env::var("CARDS_OUTPUT_DIR") {
            if !dir.trim().is_empty() {
                self.output.dir = PathBuf::from(dir);
            }
        }
        if let Ok(fps) = std::env::var("CARDS_SOURCE_FPS") {
            self.source_fps = fps
                .trim()
                .parse()
                .map_err(|_| anyhow!("CARDS_SOURCE_FPS must be a number"))?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(anyhow!(
                "confidence threshold must be within [0, 1], got {}",
                self.confidence_threshold
            ));
        }
        if self.min_appearance == 0 {
            return Err(anyhow!("min appearance must be at least 1"));
        }
        if self.roi.is_empty() {
            return Err(anyhow!("region of interest {} is empty", self.roi));
        }
        if !(self.source_fps.is_finite() && self.source_fps > 0.0) {
            return Err(anyhow!("source fps must be greater than zero"));
        }
        for name in [&self.output.names.json_file, &self.output.names.text_file] {
            if name.trim().is_empty() || name.contains(['/', '\\']) {
                return Err(anyhow!("artifact name '{}' must be a plain file name", name));
            }
        }
        self.card_index()?;
        Ok(())
    }

    /// Validated label table.
    pub fn card_index(&self) -> Result<CardIndex> {
        CardIndex::from_labels(&self.labels)
    }
}

fn read_config_file(path: &Path) -> Result<PipelineConfigFile> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let is_toml = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("toml"))
        .unwrap_or(false);
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .map(|entry| entry.to_string())
        .collect()
}
