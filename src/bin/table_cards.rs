//! table_cards - detect the cards lying on a card table in a video
//!
//! Runs one video through the card pipeline:
//! 1. Loads configuration, the label table and card icons (fails fast)
//! 2. Replays the detector output for every frame of the source
//! 3. Renders the overlay into an output frame sequence
//! 4. Writes the framewise JSON log and the final card list

use anyhow::{anyhow, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use table_cards::{
    CardPipeline, FileConfig, FileSource, FrameRenderer, IconSet, ImageSequenceSink,
    PipelineConfig, ReplayBackend, VideoJob,
};

#[path = "../ui.rs"]
mod ui;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Input video: a video file, a directory of frames or stub://<frames>.
    #[arg(long)]
    source: String,
    /// JSON file with the detector output for every frame of the source.
    #[arg(long)]
    detections: PathBuf,
    /// Config file (TOML or JSON). Overrides CARDS_CONFIG.
    #[arg(long, env = "CARDS_CONFIG")]
    config: Option<PathBuf>,
    /// Output directory for the annotated frames and reports.
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// Minimum number of two-corner frames for a card to be reported.
    #[arg(long)]
    min_appearance: Option<u32>,
    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let is_tty = std::io::stderr().is_terminal();
    let ui = ui::Ui::from_args(Some(&args.ui), is_tty);

    let mut config = {
        let _stage = ui.stage("Load configuration");
        PipelineConfig::load_from(args.config.as_deref())?
    };
    if let Some(dir) = args.output_dir {
        config.output.dir = dir;
    }
    if let Some(min) = args.min_appearance {
        if min == 0 {
            return Err(anyhow!("--min-appearance must be at least 1"));
        }
        config.min_appearance = min;
    }

    let mut pipeline = CardPipeline::from_config(&config)?;
    let renderer = {
        let _stage = ui.stage("Load card icons");
        FrameRenderer::new(IconSet::load(&config.icon_dir, pipeline.index())?)
    };
    let mut backend = ReplayBackend::open(&args.detections)?;
    let mut source = FileSource::new(FileConfig {
        path: args.source.clone(),
        fps: config.source_fps,
    })?;
    source.connect()?;
    let video = source.video_name();
    let video_out = config.output.dir.join(&video);
    let sink = ImageSequenceSink::create(&video_out)?;

    let abort = Arc::new(AtomicBool::new(false));
    {
        let abort = Arc::clone(&abort);
        ctrlc::set_handler(move || {
            abort.store(true, Ordering::SeqCst);
        })?;
    }

    println!("Processing video: {}", args.source);
    let outcome = {
        let mut stage = ui.stage("Process frames");
        let mut on_frame = |_: &table_cards::FrameRecord| stage.frame_done();
        pipeline.process_video(VideoJob {
            source: &mut source,
            backend: &mut backend,
            renderer: &renderer,
            sink: Box::new(sink),
            abort: &abort,
            on_frame: Some(&mut on_frame),
        })?
    };
    log::info!(
        "processed {} frames of {}, {} detector frames replayed",
        outcome.frames,
        outcome.video,
        backend.frames_served()
    );
    println!("Processed video saved to {}", outcome.output.display());

    let log = pipeline.into_log();
    let paths = {
        let _stage = ui.stage("Write reports");
        log.write_artifacts(&config.output.dir, &config.output.names, config.min_appearance)?
    };
    println!("Detected cards information saved to {}", paths.json.display());
    println!("List of cards saved to {}", paths.text.display());
    Ok(())
}
