//! Streetbox: capture, crop and annotate street imagery.
//!
//! An operator captures a rendered view, selects a crop region (with
//! optional zoom and rotation), draws labelled boxes over the cropped image
//! and exports the result as a Pascal VOC XML document plus the JPEG it
//! describes.
//!
//! # Modules
//!
//! - [`geometry`]: Display-space and pixel-space coordinates and boxes
//! - [`raster`]: Source rasters, crop regions and the coordinate transformer
//! - [`annotation`]: Bounding boxes and the VOC XML encoder
//! - [`pipeline`]: The capture → crop → annotate state machine
//! - [`export`]: Export guards, naming and artifact sinks
//! - [`session`]: A pipeline wired to its surface, debouncer and exporter
//! - [`keys`]: Single-key operator commands
//! - [`error`]: Error types for streetbox operations

pub mod annotation;
pub mod capture;
pub mod config;
pub mod error;
pub mod export;
pub mod geometry;
pub mod keys;
pub mod location;
pub mod pipeline;
pub mod raster;
pub mod session;

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::{Parser, Subcommand};

pub use error::StreetboxError;

use annotation::BoundingBox;
use capture::ImageFileSurface;
use config::Config;
use export::{DirectorySink, ExportOutcome, NamingStrategy};
use keys::parse_key_script;
use location::{parse_coordinate_list, ViewPosition};
use pipeline::{Completion, Skip, Stage};
use raster::{CoordinateTransformer, CropRegion, Raster};
use session::Session;

/// The streetbox CLI application.
#[derive(Parser)]
#[command(name = "streetbox")]
#[command(version, about)]
#[command(propagate_version = true)]
struct Cli {
    /// Log debug output to stderr (overrides RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Crop an image file and write the result as JPEG.
    Crop(CropArgs),
    /// Crop, annotate and export one image as an XML/JPEG pair.
    Annotate(AnnotateArgs),
    /// Replay operator keys (c, r, d, l, n, p) against an image.
    Session(SessionArgs),
    /// Summarize a VOC XML annotation document.
    Inspect(InspectArgs),
    /// Parse a coordinate list and print one `lat,lng` per entry.
    Coords(CoordsArgs),
}

/// Arguments for the crop subcommand.
#[derive(clap::Args)]
struct CropArgs {
    /// Source image.
    input: PathBuf,

    /// Crop region in displayed coordinates: x,y,width,height.
    #[arg(long, allow_hyphen_values = true)]
    region: CropRegion,

    /// Size the source is displayed at, as WIDTHxHEIGHT (default: natural size).
    #[arg(long)]
    display: Option<DisplaySize>,

    /// Device pixel ratio.
    #[arg(long, default_value_t = 1.0)]
    pixel_ratio: f64,

    /// Zoom about the image center.
    #[arg(long, default_value_t = 1.0)]
    scale: f64,

    /// Rotation about the image center, in degrees.
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    rotate: f64,

    /// Output JPEG path.
    #[arg(short, long)]
    output: PathBuf,
}

/// Arguments for the annotate subcommand.
#[derive(clap::Args)]
struct AnnotateArgs {
    /// Source image.
    input: PathBuf,

    /// Crop region in displayed coordinates: x,y,width,height.
    #[arg(long, allow_hyphen_values = true)]
    region: CropRegion,

    /// A labelled box over the cropped image: label:left,top,width,height.
    #[arg(long = "box", required = true, allow_hyphen_values = true)]
    boxes: Vec<BoundingBox>,

    /// Size the source is displayed at, as WIDTHxHEIGHT (default: natural size).
    #[arg(long)]
    display: Option<DisplaySize>,

    /// JSON config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Export directory (overrides the config).
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Filename strategy ('sequential' or 'coordinates').
    #[arg(long)]
    naming: Option<String>,

    /// View position used for coordinate naming: lat,lng,heading,pitch,zoom.
    #[arg(long, allow_hyphen_values = true)]
    position: Option<ViewPosition>,
}

/// Arguments for the session subcommand.
#[derive(clap::Args)]
struct SessionArgs {
    /// Source image, captured on each `c`.
    input: PathBuf,

    /// Keys to press in order, e.g. "cdrcd". Whitespace is ignored.
    #[arg(long)]
    keys: String,

    /// Crop region applied after each capture: x,y,width,height.
    #[arg(long, allow_hyphen_values = true)]
    region: CropRegion,

    /// A labelled box drawn after each crop: label:left,top,width,height.
    #[arg(long = "box", allow_hyphen_values = true)]
    boxes: Vec<BoundingBox>,

    /// Size the source is displayed at, as WIDTHxHEIGHT (default: natural size).
    #[arg(long)]
    display: Option<DisplaySize>,

    /// Coordinate list stepped through with `n` and `p`.
    #[arg(long)]
    coords: Option<PathBuf>,

    /// JSON config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Export directory (overrides the config).
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Filename strategy ('sequential' or 'coordinates').
    #[arg(long)]
    naming: Option<String>,
}

/// Arguments for the inspect subcommand.
#[derive(clap::Args)]
struct InspectArgs {
    /// VOC XML file to inspect.
    input: PathBuf,

    /// Output format ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,
}

/// Arguments for the coords subcommand.
#[derive(clap::Args)]
struct CoordsArgs {
    /// File with one `lng lat` pair per line.
    input: PathBuf,
}

/// `WIDTHxHEIGHT` in displayed units.
#[derive(Clone, Copy, Debug)]
struct DisplaySize {
    width: f64,
    height: f64,
}

impl FromStr for DisplaySize {
    type Err = StreetboxError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || StreetboxError::InvalidArgument(format!("expected WIDTHxHEIGHT, got '{raw}'"));
        let (width, height) = raw.split_once(['x', 'X']).ok_or_else(invalid)?;
        Ok(Self {
            width: width.trim().parse().map_err(|_| invalid())?,
            height: height.trim().parse().map_err(|_| invalid())?,
        })
    }
}

/// Run the streetbox CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), StreetboxError> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Some(Commands::Crop(args)) => run_crop(args),
        Some(Commands::Annotate(args)) => run_annotate(args),
        Some(Commands::Session(args)) => run_session(args),
        Some(Commands::Inspect(args)) => run_inspect(args),
        Some(Commands::Coords(args)) => run_coords(args),
        None => {
            println!("streetbox {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Capture, crop and annotate street imagery.");
            println!();
            println!("Run 'streetbox --help' for usage information.");
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
    };
    // A subscriber may already be installed when embedded.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn runtime() -> Result<tokio::runtime::Runtime, StreetboxError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(StreetboxError::Io)
}

/// Execute the crop subcommand.
fn run_crop(args: CropArgs) -> Result<(), StreetboxError> {
    let decoded = image::open(&args.input).map_err(|source| StreetboxError::ImageDecode {
        path: args.input.clone(),
        source,
    })?;
    let pixels = decoded.to_rgba8();
    let source = match args.display {
        Some(display) => Raster::with_display_size(pixels, display.width, display.height)?,
        None => Raster::new(pixels),
    };

    let crop = args
        .region
        .with_scale(args.scale)
        .with_rotation(args.rotate)
        .commit();
    let cropped = CoordinateTransformer::new(args.pixel_ratio).transform(&source, &crop)?;
    if cropped.is_empty() {
        return Err(StreetboxError::InvalidArgument(
            "crop region produces an empty image".to_string(),
        ));
    }

    fs::write(&args.output, cropped.jpeg_bytes()).map_err(StreetboxError::Io)?;
    println!(
        "Wrote {}x{} image to {}",
        cropped.buffer_width(),
        cropped.buffer_height(),
        args.output.display()
    );
    Ok(())
}

/// Execute the annotate subcommand.
fn run_annotate(args: AnnotateArgs) -> Result<(), StreetboxError> {
    let config = load_config(args.config.as_deref(), args.out_dir, args.naming.as_deref())?;

    let mut surface = ImageFileSurface::new(&args.input);
    if let Some(display) = args.display {
        surface = surface.with_display_size(display.width, display.height);
    }
    let sink = DirectorySink::new(&config.output_dir);

    runtime()?.block_on(async {
        let mut session = Session::new(surface, sink, &config);
        if let Some(view) = args.position {
            session.set_view(view);
        }

        session.capture().await?;
        session.adjust_crop(args.region).map_err(skipped)?;
        match session.settle().await? {
            Some(Completion::Applied) => {}
            _ => {
                return Err(StreetboxError::InvalidArgument(
                    "crop region produces an empty image".to_string(),
                ))
            }
        }
        session.set_boxes(args.boxes).map_err(skipped)?;

        match session.export().await? {
            ExportOutcome::Emitted(summary) => {
                println!("{}", summary.basename);
                Ok(())
            }
            ExportOutcome::Skipped(skip) => Err(StreetboxError::InvalidArgument(format!(
                "nothing exported: {skip}"
            ))),
            ExportOutcome::Stale => Err(StreetboxError::InvalidArgument(
                "nothing exported: session was reset".to_string(),
            )),
        }
    })
}

/// Execute the session subcommand.
///
/// Each successful capture is followed by the crop and boxes given on the
/// command line. Every emitted basename is printed.
fn run_session(args: SessionArgs) -> Result<(), StreetboxError> {
    let config = load_config(args.config.as_deref(), args.out_dir, args.naming.as_deref())?;
    let coordinates = match &args.coords {
        Some(path) => Some(fs::read_to_string(path).map_err(StreetboxError::Io)?),
        None => None,
    };

    let mut surface = ImageFileSurface::new(&args.input);
    if let Some(display) = args.display {
        surface = surface.with_display_size(display.width, display.height);
    }
    let sink = DirectorySink::new(&config.output_dir);

    runtime()?.block_on(async {
        let mut session = Session::new(surface, sink, &config);
        if let Some(text) = &coordinates {
            let loaded = session.load_coordinates(text);
            tracing::debug!(loaded, "coordinate list loaded");
        }

        for command in parse_key_script(&args.keys) {
            let before = session.stage();
            match session.dispatch(command).await? {
                Some(ExportOutcome::Emitted(summary)) => println!("{}", summary.basename),
                Some(ExportOutcome::Skipped(skip)) => eprintln!("Export skipped: {skip}"),
                Some(ExportOutcome::Stale) => eprintln!("Export skipped: session was reset"),
                None => {}
            }

            if before == Stage::Capture && session.stage() == Stage::Crop {
                session.adjust_crop(args.region).map_err(skipped)?;
                match session.settle().await? {
                    Some(Completion::Applied) => {
                        session.set_boxes(args.boxes.clone()).map_err(skipped)?;
                    }
                    _ => eprintln!("Crop skipped: region produces an empty image"),
                }
            }
        }
        Ok(())
    })
}

fn load_config(
    path: Option<&Path>,
    out_dir: Option<PathBuf>,
    naming: Option<&str>,
) -> Result<Config, StreetboxError> {
    let mut config = match path {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(dir) = out_dir {
        config.output_dir = dir;
    }
    if let Some(naming) = naming {
        config.naming = parse_naming(naming, config.naming)?;
    }
    Ok(config)
}

fn parse_naming(raw: &str, current: NamingStrategy) -> Result<NamingStrategy, StreetboxError> {
    match raw {
        "sequential" => Ok(match current {
            sequential @ NamingStrategy::Sequential { .. } => sequential,
            NamingStrategy::Coordinates => NamingStrategy::default(),
        }),
        "coordinates" => Ok(NamingStrategy::Coordinates),
        other => Err(StreetboxError::InvalidArgument(format!(
            "unknown naming strategy '{other}' (supported: sequential, coordinates)"
        ))),
    }
}

fn skipped(skip: Skip) -> StreetboxError {
    StreetboxError::InvalidArgument(skip.to_string())
}

/// Execute the inspect subcommand.
fn run_inspect(args: InspectArgs) -> Result<(), StreetboxError> {
    let document = annotation::voc::read_voc_xml(&args.input)?;

    match args.output.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&document)?),
        "text" => {
            println!("File: {}", document.filename);
            println!("Size: {}x{}", document.width, document.height);
            println!("Objects: {}", document.objects.len());
            for object in &document.objects {
                let corners = object.corners();
                println!(
                    "  {} [{}, {}, {}, {}]",
                    object.label,
                    corners.xmin(),
                    corners.ymin(),
                    corners.xmax(),
                    corners.ymax()
                );
            }
        }
        other => {
            return Err(StreetboxError::InvalidArgument(format!(
                "unknown output format '{other}' (supported: text, json)"
            )))
        }
    }
    Ok(())
}

/// Execute the coords subcommand.
fn run_coords(args: CoordsArgs) -> Result<(), StreetboxError> {
    let text = fs::read_to_string(&args.input).map_err(StreetboxError::Io)?;
    for position in parse_coordinate_list(&text) {
        println!("{position}");
    }
    Ok(())
}
