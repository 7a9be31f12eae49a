//! `camcal`: interactive chessboard calibration of a network camera.

use anyhow::{Context, Result};
use camcal_cli::{calibrate_directory, load_config, run_repl, ReplExit, ReplOptions};
use camcal_pipeline::{
    read_camera_info, undistort_image, write_camera_info, CalibTargetsDetector, CalibrationConfig,
    CalibrationSession, CalibrationTarget, HttpSnapshotSource,
};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "camcal", version, about = "Chessboard camera calibration")]
struct Cli {
    /// Optional JSON CalibrationConfig. Defaults are used if omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Capture views from the camera snapshot endpoint, driven by typed commands.
    Interactive {
        #[command(flatten)]
        board: BoardArgs,

        /// Snapshot URL (overrides the config).
        #[arg(long)]
        url: Option<String>,

        /// Directory for camera info and saved photos (overrides the config).
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Save every accepted view as photo{i}.jpg.
        #[arg(long)]
        saving_mode: bool,
    },
    /// Calibrate from the jpg/png images of a directory.
    FromDir {
        #[command(flatten)]
        board: BoardArgs,

        /// Directory with the photos.
        #[arg(long)]
        dir: PathBuf,

        /// Directory for the camera info (overrides the config).
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Undistort one image with a camera-info file.
    Undistort {
        #[arg(long)]
        image: PathBuf,

        #[arg(long)]
        camera_info: PathBuf,

        #[arg(long)]
        out: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, Args)]
struct BoardArgs {
    /// Inner corners along the board width.
    #[arg(long)]
    width: u32,

    /// Inner corners along the board height.
    #[arg(long)]
    height: u32,

    /// Square edge length.
    #[arg(long, default_value_t = 1.0)]
    square: f64,
}

impl BoardArgs {
    fn target(self) -> Result<CalibrationTarget> {
        Ok(CalibrationTarget::new(self.width, self.height, self.square)?)
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(err) = try_main() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Interactive {
            board,
            url,
            output_dir,
            saving_mode,
        } => {
            apply_overrides(&mut config, url, output_dir);
            interactive(&config, board.target()?, saving_mode)
        }
        Commands::FromDir {
            board,
            dir,
            output_dir,
        } => {
            apply_overrides(&mut config, None, output_dir);
            let result = calibrate_directory(
                &dir,
                board.target()?,
                config.session_options(),
                &CalibTargetsDetector::default(),
            )?;
            let path = write_camera_info(
                &result,
                &config.output.dir,
                &config.output.writer_options(),
            )?;
            println!(
                "Calibration successful (reprojection error {:.5}), saved to {}",
                result.reprojection_error,
                path.display()
            );
            Ok(())
        }
        Commands::Undistort {
            image,
            camera_info,
            out,
        } => {
            let info = read_camera_info(&camera_info)?;
            let frame =
                image::open(&image).with_context(|| format!("opening {}", image.display()))?;
            undistort_image(&frame, &info)
                .save(&out)
                .with_context(|| format!("writing {}", out.display()))?;
            Ok(())
        }
    }
}

fn apply_overrides(
    config: &mut CalibrationConfig,
    url: Option<String>,
    output_dir: Option<PathBuf>,
) {
    if let Some(url) = url {
        config.source.url = url;
    }
    if let Some(dir) = output_dir {
        config.output.dir = dir;
    }
}

fn interactive(
    config: &CalibrationConfig,
    target: CalibrationTarget,
    saving_mode: bool,
) -> Result<()> {
    let mut session = CalibrationSession::with_options(target, config.session_options())?;
    let mut source = HttpSnapshotSource::new(config.source.url.clone(), config.source.timeout());
    let options = ReplOptions {
        output_dir: config.output.dir.clone(),
        writer: config.output.writer_options(),
        saving_mode,
    };
    println!("Calibration started!");
    let stdin = std::io::stdin();
    match run_repl(
        &mut session,
        &mut source,
        &CalibTargetsDetector::default(),
        stdin.lock(),
        std::io::stdout(),
        &options,
    )? {
        ReplExit::Finished(_) | ReplExit::Stopped => Ok(()),
    }
}
