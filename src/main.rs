use clap::{Parser, Subcommand};
use image::ImageReader;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use lanesight::{LaneConfig, LaneDetector};

#[derive(Parser)]
#[command(name = "lanesight")]
#[command(about = "Detect and draw road lane lines in video frames")]
struct Cli {
    /// YAML config overriding the default pipeline constants
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the pipeline on one image file
    Detect {
        /// Path to input image file
        #[arg(value_name = "IMAGE")]
        image_path: PathBuf,

        /// Where to write the annotated image (default: <IMAGE stem>_lanes.png)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Save every stage's raster to directory (must be empty)
        #[arg(long, value_name = "DIR")]
        debug_out: Option<PathBuf>,
    },
    /// Accept frames over WebSocket and return annotated frames
    Serve {
        /// Address to listen on, e.g. 0.0.0.0:5001
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,
    },
}

fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "frame".to_string());
    input.with_file_name(format!("{stem}_lanes.png"))
}

fn run_detect(
    config: LaneConfig,
    image_path: PathBuf,
    output: Option<PathBuf>,
    debug_out: Option<PathBuf>,
) -> anyhow::Result<()> {
    info!("Loading image: {:?}", image_path);
    let frame = ImageReader::open(&image_path)?
        .decode()
        .map_err(|e| anyhow::anyhow!("Failed to decode image: {}", e))?
        .to_rgb8();
    info!("Image loaded: {}x{}", frame.width(), frame.height());

    let mut detector = LaneDetector::new(config);
    if let Some(debug_dir) = debug_out {
        detector = detector.with_debug(debug_dir)?;
    }

    let result = detector.analyze(&frame)?;

    println!("\n=== Lane Detection Results ===");
    println!("Segments detected: {}", result.segments.len());
    for (name, lane) in [("Left", result.lanes.left), ("Right", result.lanes.right)] {
        match lane {
            Some(l) => println!("  {name}: ({}, {}) -> ({}, {})", l.x1, l.y1, l.x2, l.y2),
            None => println!("  {name}: not found"),
        }
    }

    let output_path = output.unwrap_or_else(|| default_output_path(&image_path));
    result
        .image
        .to_rgb8()
        .save(&output_path)
        .map_err(|e| anyhow::anyhow!("Failed to save {}: {}", output_path.display(), e))?;
    println!("Annotated frame written to {}", output_path.display());

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let default_filter = if args.verbose { "lanesight=debug" } else { "lanesight=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let config = match &args.config {
        Some(path) => LaneConfig::load(path)?,
        None => LaneConfig::default(),
    };

    match args.command {
        Command::Detect {
            image_path,
            output,
            debug_out,
        } => {
            tokio::task::spawn_blocking(move || run_detect(config, image_path, output, debug_out))
                .await?
        }
        Command::Serve { bind } => {
            let mut config = config;
            if let Some(bind) = bind {
                config.server.bind_addr = bind;
            }
            lanesight::server::serve(config).await
        }
    }
}
