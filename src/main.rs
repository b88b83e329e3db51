use std::fs;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::{debug, info};

use rasterpath::{
    init_logging, GenerateParams, GenerationResult, ProgressCallback, RasterConfig, RasterMode,
    RasterPath, TerrainParams, ToolSource, EMPTY_CELL, VERSION,
};

struct CliArgs {
    tool_path: String,
    terrain_path: String,
    config: RasterConfig,
    x_step: u32,
    y_step: u32,
}

fn print_usage() {
    eprintln!("rasterpath {}", VERSION);
    eprintln!();
    eprintln!("Usage: rasterpath <tool.stl> <terrain.stl> [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --mode <planar|radial>   Rasterization mode (default: planar)");
    eprintln!("  --resolution <mm>        Grid cell size in millimeters (default: 0.5)");
    eprintln!("  --rotation-step <deg>    Degrees between rays, radial mode only");
    eprintln!("  --x-step <n>             Sample every Nth cell along X (default: 1)");
    eprintln!("  --y-step <n>             Sample every Nth cell along Y (default: 1)");
    eprintln!("  --quiet                  Suppress informational logging");
    eprintln!("  --debug                  Emit verbose backend diagnostics");
}

fn parse_args(args: &[String]) -> Result<CliArgs> {
    let mut positional = Vec::new();
    let mut config = RasterConfig {
        resolution: 0.5,
        ..Default::default()
    };
    let mut x_step = 1u32;
    let mut y_step = 1u32;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--mode" => {
                let value = iter.next().context("--mode requires a value")?;
                config.mode = match value.as_str() {
                    "planar" => RasterMode::Planar,
                    "radial" => RasterMode::Radial,
                    other => bail!("unknown mode '{}', expected planar or radial", other),
                };
            }
            "--resolution" => {
                let value = iter.next().context("--resolution requires a value")?;
                config.resolution = value
                    .parse()
                    .with_context(|| format!("invalid resolution '{}'", value))?;
            }
            "--rotation-step" => {
                let value = iter.next().context("--rotation-step requires a value")?;
                config.rotation_step = Some(
                    value
                        .parse()
                        .with_context(|| format!("invalid rotation step '{}'", value))?,
                );
            }
            "--x-step" => {
                let value = iter.next().context("--x-step requires a value")?;
                x_step = value
                    .parse()
                    .with_context(|| format!("invalid x step '{}'", value))?;
            }
            "--y-step" => {
                let value = iter.next().context("--y-step requires a value")?;
                y_step = value
                    .parse()
                    .with_context(|| format!("invalid y step '{}'", value))?;
            }
            "--quiet" => config.quiet = true,
            "--debug" => config.debug = true,
            other if other.starts_with("--") => bail!("unknown option '{}'", other),
            other => positional.push(other.to_string()),
        }
    }

    if positional.len() != 2 {
        bail!("expected a tool STL and a terrain STL");
    }
    let mut positional = positional.into_iter();
    Ok(CliArgs {
        tool_path: positional.next().context("missing tool path")?,
        terrain_path: positional.next().context("missing terrain path")?,
        config,
        x_step,
        y_step,
    })
}

fn progress_logger(label: &'static str) -> ProgressCallback {
    Arc::new(move |update| {
        debug!(
            "{}: {:.1}% ({}/{})",
            label, update.percent, update.current, update.total
        );
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let raw_args: Vec<String> = std::env::args().skip(1).collect();
    if raw_args.iter().any(|arg| arg == "--help" || arg == "-h") {
        print_usage();
        return Ok(());
    }

    let args = match parse_args(&raw_args) {
        Ok(args) => args,
        Err(err) => {
            eprintln!("Error: {}", err);
            eprintln!();
            print_usage();
            std::process::exit(2);
        }
    };

    init_logging()?;
    info!("rasterpath {} starting", VERSION);

    let tool_bytes = fs::read(&args.tool_path)
        .with_context(|| format!("failed to read tool STL '{}'", args.tool_path))?;
    let terrain_bytes = fs::read(&args.terrain_path)
        .with_context(|| format!("failed to read terrain STL '{}'", args.terrain_path))?;

    let tool_triangles = RasterPath::parse_stl(&tool_bytes)
        .with_context(|| format!("failed to decode tool STL '{}'", args.tool_path))?;
    let terrain_triangles = RasterPath::parse_stl(&terrain_bytes)
        .with_context(|| format!("failed to decode terrain STL '{}'", args.terrain_path))?;

    let mut path = RasterPath::new(args.config)?;
    let capabilities = path.init().await?;
    info!("Backend: {}", capabilities.backend);

    path.load_tool(ToolSource::Triangles(tool_triangles)).await?;
    path.load_terrain(TerrainParams {
        triangles: terrain_triangles,
        on_progress: Some(progress_logger("rasterize")),
        ..Default::default()
    })
    .await?;

    let result = path
        .generate_toolpaths(GenerateParams {
            x_step: args.x_step,
            y_step: args.y_step,
            on_progress: Some(progress_logger("toolpath")),
            ..Default::default()
        })
        .await?;

    match result {
        GenerationResult::Planar {
            path_data,
            width,
            height,
        } => {
            let reachable = path_data.iter().filter(|&&z| z != EMPTY_CELL).count();
            info!(
                "Planar toolpath: {}x{} cells, {} reachable",
                width, height, reachable
            );
        }
        GenerationResult::Radial {
            num_strips,
            total_points,
            ..
        } => {
            info!(
                "Radial toolpaths: {} strips, {} points",
                num_strips, total_points
            );
        }
    }

    path.terminate();
    Ok(())
}
