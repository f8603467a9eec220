//! Gaze proctoring application: webcam gaze estimation with gaze-away alerts.

use anyhow::{Context, Result};
use clap::Parser;
use gaze_proctor::app::{AppOptions, GazeApp, GuiMode, RunMode};
use gaze_proctor::capture::VideoSource;
use gaze_proctor::config::{Config, ScreenConfig};
use log::{info, warn};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    author,
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("BUILD_TARGET"), ")"),
    about,
    long_about = None
)]
struct Args {
    /// Camera index to use, overriding `capture.camera_index`
    #[arg(long)]
    cam: Option<i32>,

    /// Video file to process instead of a camera
    #[arg(short, long)]
    video: Option<String>,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<String>,

    /// Screen profile for gaze coordinates (webcam, fullhd)
    #[arg(short, long)]
    profile: Option<String>,

    /// Override the target screen width in pixels
    #[arg(long)]
    screen_width: Option<i32>,

    /// Override the target screen height in pixels
    #[arg(long)]
    screen_height: Option<i32>,

    /// Path to the ONNX gaze model
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// Loop shape (inline, streaming)
    #[arg(long, default_value = "inline")]
    mode: String,

    /// GUI display mode (window, none)
    #[arg(short, long, default_value = "window")]
    gui: String,

    /// Run inference on every Nth frame only
    #[arg(long)]
    skip_frames: Option<u32>,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,

    /// Print the effective configuration as YAML and exit
    #[arg(long)]
    print_config: bool,
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = if let Some(config_path) = &args.config {
        info!("Loading configuration from: {config_path}");
        Config::from_file(config_path).with_context(|| format!("loading configuration {config_path}"))?
    } else {
        Config::default()
    };

    if let Some(cam) = args.cam {
        config.capture.camera_index = cam;
    }
    if let Some(profile) = &args.profile {
        config.screen = ScreenConfig::from_profile(profile)?;
    }
    if let Some(width) = args.screen_width {
        config.screen.width = width;
    }
    if let Some(height) = args.screen_height {
        config.screen.height = height;
    }
    if let Some(model) = &args.model {
        config.model.path.clone_from(model);
    }
    if let Some(skip_frames) = args.skip_frames {
        config.processing.skip_frames = skip_frames;
    }

    config.validate()?;
    Ok(config)
}

fn video_source(args: &Args, config: &Config) -> VideoSource {
    args.video
        .clone()
        .map_or(VideoSource::Camera(config.capture.camera_index), VideoSource::File)
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    info!("Gaze Proctor");

    let config = load_config(&args)?;
    let source = video_source(&args, &config);

    if args.print_config {
        print!("{}", config.to_yaml()?);
        return Ok(());
    }

    let mode = match args.mode.as_str() {
        "streaming" => RunMode::Streaming,
        "inline" => RunMode::Inline,
        other => {
            warn!("Unknown mode '{other}', using inline");
            RunMode::Inline
        }
    };

    let gui = match args.gui.as_str() {
        "none" | "headless" => GuiMode::Headless,
        _ => GuiMode::Window,
    };

    let options = AppOptions {
        source,
        mode,
        gui,
    };

    info!(
        "Mapping gaze to {}x{} screen",
        config.screen.width, config.screen.height
    );

    let app = GazeApp::new(config, options)?;
    let summary = app.run()?;
    info!(
        "Processed {} of {} frames, {} alerts",
        summary.frames_processed,
        summary.frames_read,
        summary.history.len()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("gaze_proctor_{name}_{}.yaml", std::process::id()));
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_camera_index_from_config_file() {
        let path = write_config("camera_index", "capture:\n  camera_index: 2\n");
        let args = Args::try_parse_from(["gaze-proctor", "--config", path.to_str().unwrap()]).unwrap();

        let config = load_config(&args).unwrap();
        assert_eq!(video_source(&args, &config), VideoSource::Camera(2));

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_cam_flag_overrides_config_file() {
        let path = write_config("cam_override", "capture:\n  camera_index: 2\n");
        let args =
            Args::try_parse_from(["gaze-proctor", "--config", path.to_str().unwrap(), "--cam", "1"]).unwrap();

        let config = load_config(&args).unwrap();
        assert_eq!(config.capture.camera_index, 1);
        assert_eq!(video_source(&args, &config), VideoSource::Camera(1));

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_video_file_wins_over_camera() {
        let args = Args::try_parse_from(["gaze-proctor", "--video", "exam.mp4", "--cam", "3"]).unwrap();

        let config = load_config(&args).unwrap();
        assert_eq!(video_source(&args, &config), VideoSource::File("exam.mp4".to_string()));
    }

    #[test]
    fn test_screen_overrides_applied_after_profile() {
        let args = Args::try_parse_from(["gaze-proctor", "--profile", "fullhd", "--screen-height", "1200"]).unwrap();

        let config = load_config(&args).unwrap();
        assert_eq!((config.screen.width, config.screen.height), (1920, 1200));
    }

    #[test]
    fn test_invalid_override_rejected() {
        let args = Args::try_parse_from(["gaze-proctor", "--skip-frames", "0"]).unwrap();
        assert!(load_config(&args).is_err());
    }
}
