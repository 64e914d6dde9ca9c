use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use chartpng::chart::{ChartSpec, InputMode, RawIntent, normalize};
use chartpng::input::{Fetch, QueryParams, UreqFetcher};
use chartpng::render::Frame;
use chartpng::{ChartService, ServerConfig};
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Standalone chart renderer (SVG/PNG)
#[derive(Parser, Debug)]
#[command(name = "chartpng-render")]
#[command(version)]
#[command(about = "Render one chart to an SVG or PNG file", long_about = None)]
struct Args {
    /// Query string as it would follow `/chart?`
    #[arg(short, long, conflicts_with = "spec")]
    query: Option<String>,

    /// Chart document as a JSON file (use "-" for stdin)
    #[arg(short, long, value_name = "SPEC")]
    spec: Option<PathBuf>,

    /// Output file path (extension determines format: .svg or .png)
    #[arg(short, long, value_name = "OUTPUT")]
    output: PathBuf,

    /// Server config file (TOML or YAML)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Image width in pixels (spec files only)
    #[arg(long)]
    width: Option<u32>,

    /// Image height in pixels (spec files only)
    #[arg(long)]
    height: Option<u32>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => ServerConfig::load(path).map_err(anyhow::Error::msg)?,
        None => ServerConfig::default(),
    };
    let fetcher: Arc<dyn Fetch> = Arc::new(UreqFetcher::new(config.fetch_timeout_secs));
    let service = ChartService::new(config, fetcher);

    let (spec, frame) = match (&args.query, &args.spec) {
        (Some(query), None) => service.prepare(&QueryParams::parse(query)?)?,
        (None, Some(path)) => {
            let spec = read_spec(path)?;
            let (default_width, default_height) = service.config().default_size();
            let max = service.config().max_dimension;
            let frame = Frame::new(
                args.width.unwrap_or(default_width).clamp(1, max),
                args.height.unwrap_or(default_height).clamp(1, max),
            );
            (spec, frame)
        }
        _ => bail!("pass exactly one of --query or --spec"),
    };

    let svg = service.svg(&spec, &frame)?;

    let output_ext = args
        .output
        .extension()
        .and_then(|e| e.to_str())
        .context("Output file has no extension")?
        .to_ascii_lowercase();

    match output_ext.as_str() {
        "svg" => {
            std::fs::write(&args.output, svg).context("Failed to write SVG")?;
            eprintln!("SVG saved to: {}", args.output.display());
        }
        "png" => {
            let png = service.png(&svg)?;
            std::fs::write(&args.output, png).context("Failed to write PNG")?;
            eprintln!("PNG saved to: {}", args.output.display());
        }
        other => bail!("Unsupported output format: .{} (use .svg or .png)", other),
    }
    Ok(())
}

fn read_spec(path: &Path) -> anyhow::Result<ChartSpec> {
    let content = if path.to_str() == Some("-") {
        let mut buffer = String::new();
        std::io::Read::read_to_string(&mut std::io::stdin(), &mut buffer)
            .context("Failed to read from stdin")?;
        buffer
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read spec file {}", path.display()))?
    };
    let document = serde_json::from_str(&content).context("Spec file is not JSON")?;
    Ok(normalize(RawIntent::Document(document), InputMode::Inline)?)
}
