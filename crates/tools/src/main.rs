//! geolayers: inspect and convert geographic data files the way the map
//! viewer imports and exports them.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use catalog::InMemoryRecordStore;
use clap::{Parser, Subcommand};
use formats::{FieldSelection, FileFormat, GeometryKind};
use foundation::time::Timestamp;
use layers::LayerSummary;
use scene::MapCamera;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;
use viewer::{GeoViewer, MapStyle, ViewerSettings};

#[derive(Parser, Debug)]
#[command(name = "geolayers", version, about = "Inspect and convert CSV/JSON/GeoJSON/KML layers")]
struct Cli {
    /// Viewer settings JSON (GEO_* environment variables still apply)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Log level or filter directive (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Summarize the features of one or more files
    Inspect {
        files: Vec<PathBuf>,

        /// Records JSON (`{"license_processes": [...], "companies": [...]}`) to load as system layers
        #[arg(long)]
        records: Option<PathBuf>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Import files and export the visible features in another format
    Convert {
        files: Vec<PathBuf>,

        /// Output format: csv, json, geojson or kml
        #[arg(long)]
        to: FileFormat,

        /// Comma-separated fields: coordinates,name,type,status,details
        #[arg(long)]
        fields: Option<String>,

        /// Keep only features whose name contains this text
        #[arg(long)]
        search: Option<String>,

        /// Output path; defaults to the fixed export name in the current directory
        #[arg(long)]
        out: Option<PathBuf>,

        /// Write to stdout instead of a file
        #[arg(long)]
        stdout: bool,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InspectReport {
    layers: Vec<LayerReport>,
    extent: Option<[f64; 4]>,
    camera: MapCamera,
    basemap: Basemap,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Basemap {
    style: MapStyle,
    tile_url: &'static str,
    attribution: &'static str,
}

impl Basemap {
    fn new(style: MapStyle) -> Self {
        Self {
            style,
            tile_url: style.tile_url(),
            attribution: style.attribution(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LayerReport {
    #[serde(flatten)]
    summary: LayerSummary,
    points: usize,
    polygons: usize,
    multi_polygons: usize,
    bounds: Option<[f64; 4]>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let settings =
        ViewerSettings::resolve(cli.settings.as_deref()).context("failed to load settings")?;

    match cli.command {
        Commands::Inspect {
            files,
            records,
            json,
        } => cmd_inspect(settings, &files, records.as_deref(), json),
        Commands::Convert {
            files,
            to,
            fields,
            search,
            out,
            stdout,
        } => cmd_convert(
            settings,
            &files,
            to,
            fields.as_deref(),
            search.as_deref(),
            out,
            stdout,
        ),
    }
}

fn import_all(viewer: &mut GeoViewer, files: &[PathBuf]) -> Result<()> {
    for path in files {
        let raw = fs::read_to_string(path).with_context(|| format!("read {path:?}"))?;
        let name = file_name(path)?;
        viewer
            .import_file(name, &raw, Timestamp::now())
            .map_err(|e| anyhow::anyhow!(e.user_message()))
            .with_context(|| format!("import {path:?}"))?;
    }
    Ok(())
}

fn file_name(path: &Path) -> Result<&str> {
    path.file_name()
        .and_then(|s| s.to_str())
        .with_context(|| format!("invalid file name: {path:?}"))
}

fn cmd_inspect(
    settings: ViewerSettings,
    files: &[PathBuf],
    records: Option<&Path>,
    json: bool,
) -> Result<()> {
    if files.is_empty() && records.is_none() {
        bail!("inspect requires at least one file or --records");
    }
    let mut viewer = GeoViewer::new(settings);

    if let Some(path) = records {
        let raw = fs::read_to_string(path).with_context(|| format!("read {path:?}"))?;
        let value: serde_json::Value =
            serde_json::from_str(&raw).with_context(|| format!("parse {path:?}"))?;
        let store = InMemoryRecordStore::from_json(&value)?;
        let n = viewer.load_system_layers(&store)?;
        info!(layers = n, "system layers loaded");
    }
    import_all(&mut viewer, files)?;

    let layers = viewer
        .summaries()
        .into_iter()
        .zip(viewer.layers())
        .map(|(summary, layer)| {
            let count = |kind: GeometryKind| layer.features.iter().filter(|f| f.kind() == kind).count();
            LayerReport {
                points: count(GeometryKind::Point),
                polygons: count(GeometryKind::Polygon),
                multi_polygons: count(GeometryKind::MultiPolygon),
                bounds: layer
                    .bounds()
                    .map(|b| [b.min[0], b.min[1], b.max[0], b.max[1]]),
                summary,
            }
        })
        .collect();

    let extent = viewer
        .layers()
        .iter()
        .filter_map(|l| l.bounds())
        .reduce(|a, b| a.union(&b))
        .map(|b| [b.min[0], b.min[1], b.max[0], b.max[1]]);

    let report = InspectReport {
        layers,
        extent,
        camera: viewer.camera(),
        basemap: Basemap::new(viewer.settings().map_style),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for layer in &report.layers {
        let s = &layer.summary;
        println!(
            "[{}] {} ({:?}, {}) features={} points={} polygons={} multipolygons={}",
            s.position,
            s.name,
            s.source,
            s.color,
            s.feature_count,
            layer.points,
            layer.polygons,
            layer.multi_polygons,
        );
        if let Some([w, south, e, north]) = layer.bounds {
            println!("    bounds lon [{w:.5}, {e:.5}] lat [{south:.5}, {north:.5}]");
        }
    }
    if let Some([w, south, e, north]) = report.extent {
        println!("extent lon [{w:.5}, {e:.5}] lat [{south:.5}, {north:.5}]");
    }
    let cam = report.camera;
    println!(
        "camera center=({:.5}, {:.5}) zoom={}",
        cam.center[1], cam.center[0], cam.zoom
    );
    println!(
        "basemap {} {} ({})",
        report.basemap.style, report.basemap.tile_url, report.basemap.attribution
    );
    Ok(())
}

fn cmd_convert(
    settings: ViewerSettings,
    files: &[PathBuf],
    to: FileFormat,
    fields: Option<&str>,
    search: Option<&str>,
    out: Option<PathBuf>,
    stdout: bool,
) -> Result<()> {
    if files.is_empty() {
        bail!("convert requires at least one input file");
    }
    let fields = match fields {
        Some(list) => FieldSelection::from_list(list).map_err(anyhow::Error::msg)?,
        None => FieldSelection::default(),
    };

    let mut viewer = GeoViewer::new(settings);
    import_all(&mut viewer, files)?;
    if let Some(text) = search {
        viewer.set_search(text);
    }

    let file = viewer
        .export(to, &fields)
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;

    if stdout {
        println!("{}", file.contents);
        return Ok(());
    }
    let path = out.unwrap_or_else(|| PathBuf::from(&file.file_name));
    fs::write(&path, &file.contents).with_context(|| format!("write {path:?}"))?;
    info!(path = %path.display(), mime = file.mime_type, "export written");
    eprintln!("wrote {}", path.display());
    Ok(())
}
