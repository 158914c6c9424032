use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Parser;
use image::{GrayImage, Rgb, RgbImage};
use log::info;
use serde::Serialize;
use vessel_metrics::{
    DensityMap, DiameterReport, DiameterSummary, Image, Mask, NetworkMetrics, NodeKind, Pipeline,
    PipelineConfig, PipelineReport, PixelSize, SampleStatus, VesselGraph, Warning,
};

#[derive(Parser, Debug)]
#[command(name = "vessel_metrics")]
#[command(about = "Segment a vessel image and measure its network")]
struct Cli {
    /// Grayscale input image (PNG or TIFF).
    #[arg(long, required = true)]
    input: PathBuf,
    #[arg(long, default_value = "out")]
    out: PathBuf,
    /// JSON pipeline configuration; missing fields take their defaults.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Physical pixel size (isotropic), overrides the config value.
    #[arg(long)]
    pixel_size: Option<f32>,
    /// Also write the normalised vesselness response.
    #[arg(long, default_value_t = false)]
    save_response: bool,
}

#[derive(Serialize)]
struct RunSummary<'a> {
    input: String,
    width: usize,
    height: usize,
    threshold: f32,
    metrics: &'a NetworkMetrics,
    warnings: &'a [Warning],
    config: &'a PipelineConfig,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    ensure_file_exists(&cli.input, "input")?;
    let mut cfg = match &cli.config {
        Some(path) => {
            ensure_file_exists(path, "config")?;
            read_config(path)?
        }
        None => PipelineConfig::default(),
    };
    if let Some(s) = cli.pixel_size {
        cfg.pixel_size = PixelSize { x: s, y: s };
    }

    let img = load_input_f32(&cli.input)?;
    let pipeline = Pipeline::new(cfg).context("invalid pipeline configuration")?;
    let report = pipeline
        .run(&img.as_view())
        .with_context(|| format!("analysing {}", cli.input.display()))?;

    fs::create_dir_all(&cli.out)
        .with_context(|| format!("creating output directory {}", cli.out.display()))?;
    write_outputs(&cli, pipeline.config(), &report)?;

    info!(
        "{}: {} segments, {} branch points, wrote results to {}",
        cli.input.display(),
        report.metrics.segments,
        report.metrics.branchpoints.branch_points,
        cli.out.display()
    );
    Ok(())
}

fn write_outputs(cli: &Cli, cfg: &PipelineConfig, report: &PipelineReport) -> Result<()> {
    let (w, h) = report.mask.dims();

    save_mask(cli.out.join("label.png"), &report.mask)?;
    let overlay = render_overlay(&report.mask, &report.graph);
    let overlay_path = cli.out.join("vessel_labels.png");
    overlay
        .save(&overlay_path)
        .with_context(|| format!("saving image {}", overlay_path.display()))?;

    if cli.save_response {
        let resp = &report.response.response;
        save_luma_raw(
            cli.out.join("response.png"),
            w,
            h,
            f32_to_u8_vis(resp.data()),
        )?;
    }

    write_diameters(cli.out.join("vessel_diameters.txt"), &report.diameters)?;
    write_density(cli.out.join("vessel_density.txt"), &report.density)?;
    write_json(
        cli.out.join("metrics.json"),
        &RunSummary {
            input: cli.input.display().to_string(),
            width: w,
            height: h,
            threshold: report.threshold,
            metrics: &report.metrics,
            warnings: &report.warnings,
            config: cfg,
        },
    )
}

fn load_input_f32(path: &Path) -> Result<Image<f32>> {
    let dyn_img =
        image::open(path).with_context(|| format!("opening input image {}", path.display()))?;
    let luma = dyn_img.to_luma32f();
    let (w, h) = luma.dimensions();
    let data = luma.into_raw();

    Image::from_vec(w as usize, h as usize, data)
        .with_context(|| format!("constructing image from {}", path.display()))
}

fn read_config(path: &Path) -> Result<PipelineConfig> {
    let data = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_slice(&data).with_context(|| format!("parsing json {}", path.display()))
}

fn save_mask(path: PathBuf, mask: &Mask) -> Result<()> {
    let data = mask.data().iter().map(|&v| if v { 255 } else { 0 }).collect();
    save_luma_raw(path, mask.width(), mask.height(), data)
}

fn save_luma_raw(path: PathBuf, width: usize, height: usize, data: Vec<u8>) -> Result<()> {
    let gray = GrayImage::from_raw(width as u32, height as u32, data)
        .context("constructing GrayImage from raw bytes")?;
    gray.save(&path)
        .with_context(|| format!("saving image {}", path.display()))
}

fn f32_to_u8_vis(data: &[f32]) -> Vec<u8> {
    let (min_v, max_v) = data
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });

    if data.is_empty() || (max_v - min_v).abs() < 1e-12 {
        return vec![0u8; data.len()];
    }

    let scale = 255.0 / (max_v - min_v);
    data.iter()
        .map(|&v| ((v - min_v) * scale).round().clamp(0.0, 255.0) as u8)
        .collect()
}

fn write_json(path: PathBuf, value: &impl Serialize) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value).context("serializing json")?;
    fs::write(&path, bytes).with_context(|| format!("writing json {}", path.display()))
}

/// One line per segment: id, summary, then every sample width (`-` where the
/// sample is not valid).
fn write_diameters(path: PathBuf, report: &DiameterReport) -> Result<()> {
    let file = fs::File::create(&path).with_context(|| format!("creating {}", path.display()))?;
    let mut out = BufWriter::new(file);
    writeln!(out, "segment_id\tmean\tmedian\tstd\tvalid\tsamples").context("writing header")?;

    for seg in &report.segments {
        let summary = match seg.summary {
            DiameterSummary::Measured {
                mean,
                median,
                std,
                valid_samples,
            } => format!("{mean:.3}\t{median:.3}\t{std:.3}\t{valid_samples}"),
            DiameterSummary::Unmeasured => "unmeasured".to_string(),
        };
        let samples = seg
            .samples
            .iter()
            .map(|s| match s.status {
                SampleStatus::Valid => format!("{:.3}", s.width),
                _ => "-".to_string(),
            })
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(out, "{}\t{summary}\t{samples}", seg.edge_id).context("writing segment row")?;
    }
    out.flush().context("flushing diameters")
}

fn write_density(path: PathBuf, density: &DensityMap) -> Result<()> {
    let file = fs::File::create(&path).with_context(|| format!("creating {}", path.display()))?;
    let mut out = BufWriter::new(file);
    writeln!(out, "tiles {} {}", density.tiles_x, density.tiles_y).context("writing header")?;
    for row in density.tiles.chunks(density.tiles_x.max(1)) {
        let line = row
            .iter()
            .map(|d| format!("{d:.4}"))
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(out, "{line}").context("writing density row")?;
    }
    writeln!(out, "overall {:.4}", density.overall).context("writing overall density")?;
    out.flush().context("flushing density")
}

fn render_overlay(mask: &Mask, graph: &VesselGraph) -> RgbImage {
    let (w, h) = mask.dims();
    let mut rgb = RgbImage::new(w as u32, h as u32);
    for (x, y) in mask.iter_set() {
        rgb.put_pixel(x as u32, y as u32, Rgb([80, 80, 80]));
    }

    for e in graph.iter_edges() {
        let color = edge_color(e.id);
        for &(x, y) in &e.path {
            rgb.put_pixel(x as u32, y as u32, color);
        }
    }

    for n in &graph.nodes {
        let color = match n.kind {
            NodeKind::Branch => Rgb([255, 64, 64]),
            NodeKind::Endpoint => Rgb([64, 160, 255]),
            NodeKind::Isolated => Rgb([255, 255, 0]),
            NodeKind::LoopAnchor => Rgb([255, 255, 255]),
        };
        draw_dot(&mut rgb, n.idx.0 as f32, n.idx.1 as f32, color);
    }
    rgb
}

fn edge_color(id: usize) -> Rgb<u8> {
    let h = (id as u32).wrapping_mul(2_654_435_761);
    Rgb([
        96 + (h >> 24) as u8 % 160,
        96 + (h >> 16) as u8 % 160,
        96 + (h >> 8) as u8 % 160,
    ])
}

fn draw_dot(img: &mut RgbImage, x: f32, y: f32, color: Rgb<u8>) {
    let xi = x.round() as i32;
    let yi = y.round() as i32;

    for dy in -1..=1 {
        for dx in -1..=1 {
            let nx = xi + dx;
            let ny = yi + dy;
            if nx < 0 || ny < 0 {
                continue;
            }
            let (ux, uy) = (nx as u32, ny as u32);
            if ux >= img.width() || uy >= img.height() {
                continue;
            }
            img.put_pixel(ux, uy, color);
        }
    }
}

fn ensure_file_exists(path: &Path, what: &str) -> Result<()> {
    if !path.exists() {
        bail!("{} file does not exist: {}", what, path.display());
    }
    if !path.is_file() {
        bail!("{} path is not a file: {}", what, path.display());
    }
    Ok(())
}
