//! atomj command-line interface.
//!
//! Renders channel maps with ROI masks to PNG and generates synthetic grids.
#![allow(
    clippy::uninlined_format_args,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::too_many_lines
)]

mod scene;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use atomj_core::{Grid2D, Point, Rgba};
use atomj_render::{
    Axes, Channel2DPlot, ChangeSet, Colormap, GradientRenderer, MapMarker, MaskSelector,
    PlotOrientation, Profile, RangeSelector,
};
use clap::{Parser, Subcommand, ValueEnum};
use log::{debug, info};
use thiserror::Error;

use crate::scene::{GridFile, Scene};

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Core error: {0}")]
    Core(#[from] atomj_core::Error),

    #[error("Render error: {0}")]
    Render(#[from] atomj_render::RenderError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Scene error: {0}")]
    Scene(String),
}

/// Gradient range policy.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Range {
    /// Full data range
    Full,
    /// Range picked by the automatic strategy
    Automatic,
    /// Range of the samples inside the scene ROIs
    RoiFull,
    /// Bounds given by --lower/--upper
    Manual,
}

impl From<Range> for RangeSelector {
    fn from(range: Range) -> Self {
        match range {
            Range::Full => RangeSelector::Full,
            Range::Automatic => RangeSelector::Automatic,
            Range::RoiFull => RangeSelector::RoiFull,
            Range::Manual => RangeSelector::Manual,
        }
    }
}

/// ROI masking mode.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mask {
    /// Paint every sample
    None,
    /// Paint samples inside the ROIs with the mask color
    Inside,
    /// Paint samples outside the ROIs with the mask color
    Outside,
}

impl From<Mask> for MaskSelector {
    fn from(mask: Mask) -> Self {
        match mask {
            Mask::None => MaskSelector::NoMask,
            Mask::Inside => MaskSelector::MaskInside,
            Mask::Outside => MaskSelector::MaskOutside,
        }
    }
}

/// Channel map renderer for scanning-probe data.
#[derive(Parser)]
#[command(name = "atomj")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a grid file to PNG
    Render {
        /// Input grid (JSON)
        #[arg(short, long)]
        grid: PathBuf,

        /// Scene with ROIs, profiles and markers (JSON)
        #[arg(short, long)]
        scene: Option<PathBuf>,

        /// Output PNG path
        #[arg(short, long)]
        output: PathBuf,

        /// Image width in pixels
        #[arg(long, default_value = "512")]
        width: u32,

        /// Image height in pixels
        #[arg(long, default_value = "512")]
        height: u32,

        /// Colormap preset (grayscale, green, hot, viridis, bwr)
        #[arg(short, long, default_value = "viridis")]
        colormap: Colormap,

        /// Gradient range policy
        #[arg(short, long, value_enum, default_value = "full")]
        range: Range,

        /// Manual lower bound
        #[arg(long)]
        lower: Option<f64>,

        /// Manual upper bound
        #[arg(long)]
        upper: Option<f64>,

        /// ROI masking mode
        #[arg(short, long, value_enum, default_value = "none")]
        mask: Mask,

        /// Swap the horizontal and vertical axes
        #[arg(long)]
        horizontal: bool,
    },

    /// Write a synthetic topography grid
    Synth {
        /// Number of rows
        #[arg(long, default_value = "128")]
        rows: usize,

        /// Number of columns
        #[arg(long, default_value = "128")]
        columns: usize,

        /// Sample spacing in both directions
        #[arg(long, default_value = "1.0")]
        increment: f64,

        /// Output grid path (JSON)
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Show grid dimensions and value range
    Info {
        /// Input grid (JSON)
        grid: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            grid,
            scene,
            output,
            width,
            height,
            colormap,
            range,
            lower,
            upper,
            mask,
            horizontal,
        } => {
            let start = Instant::now();
            let grid = Arc::new(GridFile::read(&grid)?.into_grid()?);
            let scene = match scene {
                Some(path) => Scene::read(&path)?,
                None => Scene::default(),
            };
            let orientation = if horizontal {
                PlotOrientation::Horizontal
            } else {
                PlotOrientation::Vertical
            };

            let mut plot = build_plot(&grid, &scene, orientation, colormap, range, mask)?;
            if lower.is_some() || upper.is_some() || matches!(range, Range::Manual) {
                apply_manual_bounds(&mut plot, lower, upper)?;
            }
            if let Some(renderer) = plot.renderer(0) {
                info!(
                    "gradient range [{}, {}]",
                    renderer.lower_bound(),
                    renderer.upper_bound()
                );
            }

            let frame = plot.draw(width as usize, height as usize);
            debug!(
                "{} entities, {} labels",
                frame.entities.len(),
                frame.labels.len()
            );
            let bytes = frame.image.to_rgba_bytes();
            let image = image::RgbaImage::from_raw(width, height, bytes)
                .ok_or_else(|| CliError::Scene("raster size mismatch".to_string()))?;
            image.save(&output)?;

            eprintln!(
                "Rendered {}x{} grid to {} in {:.2?}",
                grid.row_count(),
                grid.column_count(),
                output.display(),
                start.elapsed()
            );
        }

        Commands::Synth {
            rows,
            columns,
            increment,
            output,
        } => {
            let grid = synthetic_topography(rows, columns, increment)?;
            GridFile::from_grid(&grid).write(&output)?;
            println!(
                "Wrote {}x{} grid to {}",
                grid.row_count(),
                grid.column_count(),
                output.display()
            );
        }

        Commands::Info { grid } => {
            let grid = GridFile::read(&grid)?.into_grid()?;
            let domain = grid.domain();
            println!("Grid: {} rows x {} columns", grid.row_count(), grid.column_count());
            println!(
                "  x: [{}, {}] step {}",
                domain.min_x,
                domain.max_x,
                grid.x_increment()
            );
            println!(
                "  y: [{}, {}] step {}",
                domain.min_y,
                domain.max_y,
                grid.y_increment()
            );
            match grid.z_range() {
                Some((lo, hi)) => println!("  z: [{}, {}]", lo, hi),
                None => println!("  z: no finite samples"),
            }
        }
    }

    Ok(())
}

/// Sets up a one-layer plot with the scene's ROIs and overlays.
fn build_plot(
    grid: &Arc<Grid2D>,
    scene: &Scene,
    orientation: PlotOrientation,
    colormap: Colormap,
    range: Range,
    mask: Mask,
) -> Result<Channel2DPlot> {
    let domain = grid.domain();
    let mut plot = Channel2DPlot::new(Axes::fitting(&domain).with_orientation(orientation));

    let mut renderer = GradientRenderer::default();
    renderer.set_gradient(colormap.gradient());
    renderer.set_mask_selector(mask.into());
    let index = plot.add_dataset(Arc::clone(grid), renderer);

    plot.set_rois(scene.build_rois(domain)?);
    plot.set_profiles(scene.profiles.iter().enumerate().map(|(i, points)| Profile {
        key: i + 1,
        points: points.iter().map(|p| Point::new(p[0], p[1])).collect(),
        color: Rgba::rgb(255, 255, 0),
    }));
    plot.set_markers(scene.markers.iter().enumerate().map(|(i, p)| MapMarker {
        key: i + 1,
        position: Point::new(p[0], p[1]),
        color: Rgba::rgb(255, 0, 255),
    }));

    let selector = RangeSelector::from(range);
    plot.update_renderer(index, |r| r.set_range_selector(selector))?;
    Ok(plot)
}

/// Pins the gradient to the given bounds, keeping the current value for a missing one.
fn apply_manual_bounds(
    plot: &mut Channel2DPlot,
    lower: Option<f64>,
    upper: Option<f64>,
) -> Result<()> {
    let mut outcome = Ok(());
    plot.update_renderer(0, |r| {
        let lower = lower.unwrap_or_else(|| r.lower_bound());
        let upper = upper.unwrap_or_else(|| r.upper_bound());
        r.set_gradient_bounds(lower, upper).unwrap_or_else(|e| {
            outcome = Err(e);
            ChangeSet::new()
        })
    })?;
    Ok(outcome?)
}

/// Tilted plane with two bumps and a pit, in arbitrary height units.
fn synthetic_topography(rows: usize, columns: usize, increment: f64) -> Result<Grid2D> {
    let width = columns as f64 * increment;
    let height = rows as f64 * increment;
    let bump = |x: f64, y: f64, cx: f64, cy: f64, sigma: f64| {
        let dx = x - cx;
        let dy = y - cy;
        (-(dx * dx + dy * dy) / (2.0 * sigma * sigma)).exp()
    };
    Ok(Grid2D::from_fn(
        rows,
        columns,
        Point::new(0.5 * increment, 0.5 * increment),
        increment,
        increment,
        |x, y| {
            0.2 * x / width
                + bump(x, y, 0.3 * width, 0.35 * height, 0.08 * width)
                + 0.6 * bump(x, y, 0.7 * width, 0.65 * height, 0.12 * width)
                - 0.4 * bump(x, y, 0.65 * width, 0.25 * height, 0.05 * width)
        },
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene_with_square() -> Scene {
        serde_json::from_str(
            r#"{"rois": [{"shape": "rectangle", "min": [4, 4], "max": [8, 8]}]}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_synthetic_topography_is_finite() {
        let grid = synthetic_topography(16, 24, 0.5).unwrap();
        assert_eq!(grid.row_count(), 16);
        assert_eq!(grid.column_count(), 24);
        assert_eq!(grid.finite_samples().len(), 16 * 24);
    }

    #[test]
    fn test_roi_full_range_follows_scene() {
        let grid = Arc::new(synthetic_topography(16, 16, 1.0).unwrap());
        let plot = build_plot(
            &grid,
            &scene_with_square(),
            PlotOrientation::Vertical,
            Colormap::Grayscale,
            Range::RoiFull,
            Mask::None,
        )
        .unwrap();
        let renderer = plot.renderer(0).unwrap();
        let (full_lo, full_hi) = renderer.full_bounds();
        assert!(renderer.lower_bound() >= full_lo);
        assert!(renderer.upper_bound() <= full_hi);
        assert!(renderer.upper_bound() - renderer.lower_bound() < full_hi - full_lo);
    }

    #[test]
    fn test_manual_bounds() {
        let grid = Arc::new(synthetic_topography(8, 8, 1.0).unwrap());
        let mut plot = build_plot(
            &grid,
            &Scene::default(),
            PlotOrientation::Vertical,
            Colormap::Hot,
            Range::Full,
            Mask::None,
        )
        .unwrap();
        apply_manual_bounds(&mut plot, Some(-1.0), None).unwrap();
        let renderer = plot.renderer(0).unwrap();
        assert_eq!(renderer.range_selector(), RangeSelector::Manual);
        assert!((renderer.lower_bound() + 1.0).abs() < 1e-12);

        assert!(apply_manual_bounds(&mut plot, Some(5.0), Some(1.0)).is_err());
    }

    #[test]
    fn test_render_frame_matches_requested_size() {
        let grid = Arc::new(synthetic_topography(8, 8, 1.0).unwrap());
        let mut plot = build_plot(
            &grid,
            &scene_with_square(),
            PlotOrientation::Horizontal,
            Colormap::Viridis,
            Range::Automatic,
            Mask::Outside,
        )
        .unwrap();
        let frame = plot.draw(40, 30);
        assert_eq!(frame.image.to_rgba_bytes().len(), 40 * 30 * 4);
    }
}
