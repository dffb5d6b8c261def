use std::{fs, path::Path};

use anyhow::{bail, Context, Result};
use armarker::core::{CameraProjection, Mat34, StereoCalibView};
use armarker::icp::{calib_stereo, StereoCalibOptions};
use armarker::multi::{
    multi_square, multi_square_robust, multi_square_stereo, multi_square_stereo_robust,
    MultiMarkerConfig, MultiSolveOptions, PatternIdTable,
};
use armarker::track::{
    AnyTracker, FilterConfig, Frame, Trackable, Tracker, TrackerCameras, TrackerConfig,
    TrackingWorker,
};
use clap::{Parser, Subcommand};
use log::info;
use serde::{Deserialize, Serialize};

/// Square-marker pose estimation from detector output.
#[derive(Debug, Parser)]
#[command(author, version, about = "Square-marker pose estimation and multi-marker fusion")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fused pose of one multi-marker composite for a single frame.
    Pose {
        /// JSON camera calibration (`{"mono": ...}` or `{"stereo": ...}`).
        #[arg(long)]
        camera: String,
        /// Multi-marker configuration file.
        #[arg(long)]
        config: String,
        /// JSON frame of marker detections.
        #[arg(long)]
        frame: String,
        /// Optional JSON MultiSolveOptions. Defaults are used if omitted.
        #[arg(long)]
        options: Option<String>,
        /// Down-weight outlying corners.
        #[arg(long)]
        robust: bool,
    },
    /// Run trackables over a sequence of frames on the tracking worker.
    Track {
        #[arg(long)]
        camera: String,
        /// Trackable description, e.g. `single_barcode;3;40` or `multi;board.dat`.
        #[arg(long = "trackable", required = true)]
        trackables: Vec<String>,
        /// JSON array of frames.
        #[arg(long)]
        frames: String,
        /// Optional JSON TrackerConfig.
        #[arg(long)]
        tracker_config: Option<String>,
        /// Low-pass filter poses with default settings.
        #[arg(long)]
        filter: bool,
    },
    /// Refine a stereo rig's left-to-right transform.
    CalibStereo {
        /// JSON CalibStereoInput.
        #[arg(long)]
        input: String,
        /// Optional JSON StereoCalibOptions.
        #[arg(long)]
        options: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CalibStereoInput {
    left: CameraProjection,
    right: CameraProjection,
    init_left_to_right: Mat34,
    views: Vec<StereoCalibView>,
}

fn load_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let data =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("parsing {}", path.display()))
}

fn load_or_default<T: serde::de::DeserializeOwned + Default>(path: Option<&str>) -> Result<T> {
    match path {
        Some(p) => load_json_file(Path::new(p)),
        None => Ok(T::default()),
    }
}

fn run_pose_from_files(
    camera_path: &str,
    config_path: &str,
    frame_path: &str,
    options_path: Option<&str>,
    robust: bool,
) -> Result<String> {
    let cameras: TrackerCameras = load_json_file(Path::new(camera_path))?;
    let frame: Frame = load_json_file(Path::new(frame_path))?;
    let opts: MultiSolveOptions = load_or_default(options_path)?;
    let mut config = MultiMarkerConfig::from_file(config_path, &mut PatternIdTable::new())
        .with_context(|| format!("loading {config_path}"))?;

    let est = match cameras {
        TrackerCameras::Mono(camera) => {
            if robust {
                multi_square_robust(&camera, &frame.left, &mut config, &opts)
            } else {
                multi_square(&camera, &frame.left, &mut config, &opts)
            }
        }
        TrackerCameras::Stereo(cams) => {
            let right = frame.right.as_deref().unwrap_or(&[]);
            if robust {
                multi_square_stereo_robust(&cams, &frame.left, right, &mut config, &opts)
            } else {
                multi_square_stereo(&cams, &frame.left, right, &mut config, &opts)
            }
        }
    }
    .context("pose estimation failed")?;
    info!(
        "fused {} markers, rms {:.3} px",
        est.visible.len(),
        est.rms()
    );
    Ok(serde_json::to_string_pretty(&est)?)
}

fn run_track_from_files(
    camera_path: &str,
    descriptions: &[String],
    frames_path: &str,
    tracker_config_path: Option<&str>,
    filter: bool,
) -> Result<String> {
    let cameras: TrackerCameras = load_json_file(Path::new(camera_path))?;
    let frames: Vec<Frame> = load_json_file(Path::new(frames_path))?;
    let config: TrackerConfig = load_or_default(tracker_config_path)?;

    let mut patterns = PatternIdTable::new();
    let mut trackables = Vec::with_capacity(descriptions.len());
    for desc in descriptions {
        let mut t = Trackable::parse(desc, &mut patterns)?;
        if filter {
            t.set_filter(Some(FilterConfig::default()));
        }
        trackables.push(t);
    }

    let mut tracker = AnyTracker::with_config("square", config)?;
    tracker.init()?;
    tracker.start(cameras)?;
    let worker = TrackingWorker::spawn(tracker, trackables, 4)?;

    // Submit from a second thread so a long sequence cannot fill both queues.
    let results = std::thread::scope(|s| -> Result<Vec<_>> {
        let feeder = s.spawn(|| -> Result<()> {
            for frame in frames.iter().cloned() {
                worker.submit(frame)?;
            }
            Ok(())
        });
        let mut results = Vec::with_capacity(frames.len());
        for _ in 0..frames.len() {
            results.push(worker.recv()?);
        }
        match feeder.join() {
            Ok(r) => r?,
            Err(_) => bail!("frame feeder panicked"),
        }
        Ok(results)
    })?;
    Ok(serde_json::to_string_pretty(&results)?)
}

fn run_calib_stereo_from_files(input_path: &str, options_path: Option<&str>) -> Result<String> {
    let input: CalibStereoInput = load_json_file(Path::new(input_path))?;
    let opts: StereoCalibOptions = load_or_default(options_path)?;
    let report = calib_stereo(
        &input.views,
        &input.left,
        &input.right,
        &input.init_left_to_right,
        &opts,
    )
    .context("stereo calibration failed")?;
    Ok(serde_json::to_string_pretty(&report)?)
}

fn main() {
    env_logger::init();
    if let Err(err) = try_main() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<()> {
    let args = Args::parse();
    let json = match args.command {
        Command::Pose {
            camera,
            config,
            frame,
            options,
            robust,
        } => run_pose_from_files(&camera, &config, &frame, options.as_deref(), robust)?,
        Command::Track {
            camera,
            trackables,
            frames,
            tracker_config,
            filter,
        } => run_track_from_files(
            &camera,
            &trackables,
            &frames,
            tracker_config.as_deref(),
            filter,
        )?,
        Command::CalibStereo { input, options } => {
            run_calib_stereo_from_files(&input, options.as_deref())?
        }
    };
    println!("{json}");
    Ok(())
}
