//! dirkit: resource dumper for Director movies and projectors
//!
//! Opens a .dir/.dxr/.dcr/.cst/.cxt file or a projector .exe, lists the
//! resource table of every movie found, and optionally writes the raw
//! resources, a map.json and PNG versions of the bitmaps.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dirkit_common::ExtractConfig;
use dirkit_shockwave::{open_any, BitmapDecoder, DecodeOutcome, PaletteRegistry, Session};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dirkit", version, about = "Director/Shockwave resource extractor")]
struct Cli {
    /// TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Default log filter when RUST_LOG is unset (e.g. "debug")
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the resource table of every movie in a file.
    List {
        file: PathBuf,
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Write resources, map.json and bitmaps to the output directory.
    Extract {
        file: PathBuf,
        /// Output root; one subdirectory per movie.
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Directory with built-in palette JSON files.
        #[arg(long)]
        palettes: Option<PathBuf>,
        /// Write every resolved resource as <TAG>/<id>.bin.
        #[arg(long)]
        dump: bool,
        /// Convert bitmaps with known cast metadata to PNG.
        #[arg(long)]
        bitmaps: bool,
        /// Skip map.json.
        #[arg(long)]
        no_map: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ExtractConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ExtractConfig::default(),
    };
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(config.log_level.parse()?))
        .init();

    match cli.command {
        Command::List { file, json } => list(&file, json),
        Command::Extract {
            file,
            output,
            palettes,
            dump,
            bitmaps,
            no_map,
        } => {
            if let Some(output) = output {
                config.output_dir = output;
            }
            if palettes.is_some() {
                config.palettes_dir = palettes;
            }
            config.dump_resources |= dump;
            config.export_bitmaps |= bitmaps;
            if no_map {
                config.write_map = false;
            }
            extract(&file, &config)
        }
    }
}

fn read_input(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("Reading {}", path.display()))
}

fn list(path: &Path, json: bool) -> Result<()> {
    let data = read_input(path)?;
    let extraction = open_any(&data).with_context(|| format!("Opening {}", path.display()))?;

    for artifact in &extraction.artifacts {
        tracing::info!("Embedded {} ({:?}, {} bytes)", artifact.name, artifact.kind, artifact.bytes.len());
    }

    for movie in &extraction.movies {
        let label = if movie.name.is_empty() {
            path.display().to_string()
        } else {
            movie.name.clone()
        };
        let session = match &movie.session {
            Ok(session) => session,
            Err(e) => {
                tracing::error!("{}: {}", label, e);
                continue;
            }
        };

        if json {
            let value = serde_json::json!({
                "movie": label,
                "version": session.version().to_string(),
                "afterburner": session.codec().is_afterburner(),
                "resources": serde_json::from_str::<serde_json::Value>(&session.store().to_json()?)?,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
            continue;
        }

        println!(
            "{} ({}, {:?}, codec {})",
            label,
            session.version(),
            session.endian(),
            session.codec().tag
        );
        println!("{:>6}  {:<4}  {:>10}  {:>8}  {:>6}", "id", "tag", "offset", "size", "cast");
        for resource in session.all_resources() {
            let meta = resource.meta();
            let cast = meta
                .cast_id
                .map(|c| c.to_string())
                .unwrap_or_else(|| "-".to_string());
            let size = resource
                .bytes()
                .map(|b| b.len().to_string())
                .unwrap_or_else(|| "pending".to_string());
            println!(
                "{:>6}  {:<4}  {:>10}  {:>8}  {:>6}",
                resource.id(),
                meta.tag,
                meta.offset,
                size,
                cast
            );
        }
        for warning in session.warnings() {
            println!("warning: {}", warning);
        }
    }
    Ok(())
}

fn extract(path: &Path, config: &ExtractConfig) -> Result<()> {
    let data = read_input(path)?;
    let extraction = open_any(&data).with_context(|| format!("Opening {}", path.display()))?;

    let mut palettes = PaletteRegistry::with_builtins();
    if let Some(dir) = &config.palettes_dir {
        palettes
            .load_dir(dir)
            .with_context(|| format!("Loading palettes from {}", dir.display()))?;
    }

    let root = config.movie_dir(path);
    if !extraction.artifacts.is_empty() {
        let dir = root.join("extracted");
        fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;
        for artifact in &extraction.artifacts {
            let target = dir.join(artifact.file_name());
            fs::write(&target, &artifact.bytes)
                .with_context(|| format!("Failed to write {}", target.display()))?;
        }
    }

    let mut failed = 0;
    for (index, movie) in extraction.movies.iter().enumerate() {
        let session = match &movie.session {
            Ok(session) => session,
            Err(e) => {
                tracing::error!("Skipping {}: {}", movie.name, e);
                failed += 1;
                continue;
            }
        };
        let dir = if movie.name.is_empty() {
            root.clone()
        } else {
            root.join(format!("{:02}_{}", index, file_name(&movie.name)))
        };
        write_movie(session, &dir, config, &palettes)?;
    }

    tracing::info!(
        "Extracted {} of {} movies to {}",
        extraction.movies.len() - failed,
        extraction.movies.len(),
        root.display()
    );
    Ok(())
}

fn file_name(name: &str) -> &str {
    name.rsplit(|c: char| c == '\\' || c == '/')
        .next()
        .unwrap_or(name)
}

fn write_movie(
    session: &Session,
    dir: &Path,
    config: &ExtractConfig,
    palettes: &PaletteRegistry,
) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;

    if config.write_map {
        let map = dir.join("map.json");
        fs::write(&map, session.store().to_json()?)
            .with_context(|| format!("Failed to write {}", map.display()))?;
    }

    if config.dump_resources {
        let mut written = 0;
        for resource in session.all_resources() {
            if resource.tag().is_container() {
                continue;
            }
            let Some(bytes) = resource.bytes() else {
                continue;
            };
            // tags like "ILS " end in a space
            let tag_dir = dir.join(resource.tag().to_string().trim_end());
            fs::create_dir_all(&tag_dir)?;
            fs::write(tag_dir.join(format!("{}.bin", resource.id())), bytes)?;
            written += 1;
        }
        tracing::info!("Wrote {} resources to {}", written, dir.display());
    }

    if config.export_bitmaps {
        let bitmap_dir = dir.join("bitmaps");
        fs::create_dir_all(&bitmap_dir)?;
        let mut exported = 0;
        for outcome in session.run_decoder(&BitmapDecoder, palettes) {
            let DecodeOutcome::Complete { id, value } = outcome else {
                continue;
            };
            let target = bitmap_dir.join(format!("{}.png", id));
            fs::write(&target, value.to_png()?)
                .with_context(|| format!("Failed to write {}", target.display()))?;
            exported += 1;
        }
        tracing::info!("Exported {} bitmaps", exported);
    }
    Ok(())
}
