use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use geo_sprite_core::fetcher::ReqwestClient;
use geo_sprite_core::sprite::{BuildConfig, ProgressFn, SpriteBuilder};
use tracing::info;

mod report;
mod variants;

#[derive(Parser, Debug)]
#[command(
    name = "geo-sprite",
    about = "Build thumbnail sprite sheets and IIIF tile pyramids from georeference annotations",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Show progress (disable with --progress=false or --quiet)
    #[arg(long, default_value_t = true, action = ArgAction::Set, global = true, help_heading = "Logging/UX")]
    progress: bool,
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true, help_heading = "Logging/UX")]
    verbose: u8,
    /// Quiet mode (overrides verbose)
    #[arg(
        short,
        long,
        default_value_t = false,
        global = true,
        help_heading = "Logging/UX"
    )]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build sprite sheets, tile pyramids, and derived annotations
    Build(BuildArgs),
    /// Generate a static HTML index over an output directory
    Index(IndexArgs),
}

#[derive(Parser, Debug, Clone)]
struct BuildArgs {
    /// Georeference annotation URL
    #[arg(help_heading = "Input/Output")]
    annotation_url: String,
    /// Resolution variants: comma-separated pixel widths or Nx tile-count
    /// multipliers (e.g. "128,256" or "1x,2x")
    #[arg(short, long, default_value = "128", help_heading = "Input/Output")]
    widths: String,
    /// Output directory
    #[arg(short, long, default_value = "output", help_heading = "Input/Output")]
    out_dir: PathBuf,
    /// Download cache directory
    #[arg(long, default_value = "cache", help_heading = "Input/Output")]
    cache_dir: PathBuf,
    /// Public base URL the tile services will be hosted under
    #[arg(
        long,
        default_value = "http://localhost:8000",
        help_heading = "Input/Output"
    )]
    base_url: String,

    // Tiling
    /// Tile size in pixels
    #[arg(long, default_value_t = 1024, help_heading = "Tiling")]
    tile_size: u32,
    /// JPEG quality (0..=100)
    #[arg(long, default_value_t = 90, help_heading = "Tiling")]
    jpeg_quality: u8,

    // Layout
    /// Hard ceiling on sheet side length (px)
    #[arg(long, default_value_t = 65_535, help_heading = "Layout")]
    max_side: u32,

    // Retrieval
    /// Concurrent downloads per variant
    #[arg(long, default_value_t = 8, help_heading = "Retrieval")]
    concurrency: usize,
    /// HTTP timeout in seconds
    #[arg(long, default_value_t = 30, help_heading = "Retrieval")]
    timeout: u64,
}

#[derive(Parser, Debug, Clone)]
struct IndexArgs {
    /// Output directory to scan
    #[arg(default_value = "output")]
    out_dir: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing_with_level(cli.quiet, cli.verbose);
    match &cli.command {
        Commands::Build(args) => run_build(args, cli.progress && !cli.quiet),
        Commands::Index(args) => report::run_index(&args.out_dir),
    }
}

fn run_build(args: &BuildArgs, show_progress: bool) -> anyhow::Result<()> {
    let widths = variants::parse_variants(&args.widths, args.tile_size)?;
    info!(?widths, url = %args.annotation_url, "starting sprite build");

    let client = ReqwestClient::with_timeout(args.timeout)?;
    let cfg = BuildConfig {
        widths,
        output_dir: args.out_dir.clone(),
        cache_dir: args.cache_dir.clone(),
        base_url: args.base_url.trim_end_matches('/').to_string(),
        tile_size: args.tile_size,
        jpeg_quality: args.jpeg_quality,
        concurrency: args.concurrency.max(1),
        max_side: args.max_side,
        ..BuildConfig::new(args.annotation_url.clone())
    };
    let builder = SpriteBuilder::new(&client, cfg);

    let bar = if show_progress {
        use indicatif::{ProgressBar, ProgressStyle};
        let b = ProgressBar::new_spinner();
        b.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} fetched {pos} rasters [{elapsed_precise}]",
            )
            .unwrap(),
        );
        Some(b)
    } else {
        None
    };
    let tick = bar.clone();
    let on_raster = move || {
        if let Some(b) = &tick {
            b.inc(1);
        }
    };
    let progress: Option<&ProgressFn> = if show_progress { Some(&on_raster) } else { None };

    let result = builder.run(progress);
    if let Some(b) = &bar {
        b.finish_and_clear();
    }
    result?;
    info!("sprite build complete");
    Ok(())
}

fn init_tracing_with_level(quiet: bool, verbose: u8) {
    let level = if quiet {
        "error".to_string()
    } else {
        match verbose {
            0 => "info".into(),
            1 => "debug".into(),
            _ => "trace".into(),
        }
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_target(false)
        .try_init();
}
