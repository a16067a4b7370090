//! Integration tests for the gradient engine and the plot raster cache.

use std::sync::Arc;

use atomj_core::util::usize_to_f64;
use atomj_core::{Grid2D, Point, Rect, Rgba, Roi};
use atomj_render::{
    Axes, Channel2DPlot, ColorGradient, Colormap, Frame, GradientRenderer, JsonStyleStore,
    MaskSelector, PlotOrientation, Preferences, RangeSelector, StyleStore,
};

fn wave() -> Arc<Grid2D> {
    Arc::new(
        Grid2D::from_fn(12, 16, Point::new(0.0, 0.0), 0.5, 0.5, |x, y| (x * 1.3).sin() + y * 0.2)
            .unwrap(),
    )
}

fn disk() -> Roi {
    Roi::ellipse(1, Rect::centered_square(Point::new(3.6, 2.4), 1.7))
}

fn renderer_with(mask: MaskSelector) -> GradientRenderer {
    let mut r = GradientRenderer::default();
    r.fit_to_dataset(wave(), true);
    r.set_mask_selector(mask);
    r.set_masked_region(Some(disk()));
    r
}

#[test]
fn mask_selector_decides_paint_per_sample() {
    let grid = wave();
    let roi = disk();
    for mask in [MaskSelector::NoMask, MaskSelector::MaskInside, MaskSelector::MaskOutside] {
        let r = renderer_with(mask);
        for row in 0..grid.row_count() {
            for col in 0..grid.column_count() {
                let p = grid.point(row, col);
                let z = grid.z(row, col);
                let inside = roi.contains(p);
                let masked = match mask {
                    MaskSelector::NoMask => false,
                    MaskSelector::MaskInside => inside,
                    MaskSelector::MaskOutside => !inside,
                };
                let expected = if masked {
                    r.mask_color()
                } else {
                    r.paint_scale().paint(z)
                };
                assert_eq!(r.color_for(p, z), Some(expected), "{mask:?} at {p:?}");
            }
        }
    }
}

fn ramp(rows: usize, columns: usize) -> Arc<Grid2D> {
    Arc::new(
        Grid2D::from_fn(rows, columns, Point::new(0.0, 0.0), 1.0, 1.0, |x, y| {
            if x == 1.0 && y == 1.0 {
                f64::NAN
            } else {
                10.0 * x + 3.0 * y
            }
        })
        .unwrap(),
    )
}

/// Grids, axes and frame sizes where cell edges land on pixel centers.
fn zoomed_cases() -> Vec<(Arc<Grid2D>, Axes, usize, usize)> {
    let mut cases = Vec::new();
    for orientation in [PlotOrientation::Vertical, PlotOrientation::Horizontal] {
        let small = ramp(3, 5);
        let tall = ramp(7, 3);
        cases.push((
            Arc::clone(&small),
            Axes::fitting(&small.domain()).with_orientation(orientation),
            160,
            120,
        ));
        cases.push((
            Arc::clone(&small),
            Axes::new((0.3, 2.7), (0.2, 2.1)).with_orientation(orientation),
            17,
            29,
        ));
        cases.push((
            Arc::clone(&tall),
            Axes::new((-0.2, 1.9), (0.6, 5.3)).with_orientation(orientation),
            100,
            33,
        ));
        cases.push((
            wave(),
            Axes::new((1.1, 5.7), (0.4, 3.9)).with_orientation(orientation),
            63,
            41,
        ));
    }
    cases
}

#[test]
fn fast_path_matches_generic_path_on_every_pixel() {
    for (grid, axes, w, h) in zoomed_cases() {
        for mask in [MaskSelector::NoMask, MaskSelector::MaskInside, MaskSelector::MaskOutside] {
            let mut r = GradientRenderer::default();
            r.fit_to_dataset(Arc::clone(&grid), true);
            r.set_mask_selector(mask);
            let region = Roi::ellipse(1, Rect::centered_square(Point::new(1.4, 1.6), 0.9));
            r.set_masked_region(Some(region));
            assert!(r.can_use_fast_path());
            let mut fast = Frame::blank(w, h, Rgba::WHITE);
            let mut generic = Frame::blank(w, h, Rgba::WHITE);
            r.render_fast(&grid, &axes, 0, &mut fast);
            r.render_items(&grid, &axes, 0, &mut generic);
            let diffs = (0..h)
                .flat_map(|y| (0..w).map(move |x| (x, y)))
                .filter(|&(x, y)| fast.image.get(x, y) != generic.image.get(x, y))
                .count();
            assert_eq!(diffs, 0, "{:?} {mask:?} {w}x{h}", axes);
            assert_eq!(fast.entities.len(), 1);
        }
    }
}

#[test]
fn cell_hit_test_matches_painted_items() {
    for (grid, axes, w, h) in zoomed_cases() {
        let mut r = GradientRenderer::default();
        r.fit_to_dataset(Arc::clone(&grid), true);
        let mut generic = Frame::blank(w, h, Rgba::WHITE);
        r.render_items(&grid, &axes, 0, &mut generic);
        for y in 0..h {
            for x in 0..w {
                let (cx, cy) = (usize_to_f64(x) + 0.5, usize_to_f64(y) + 0.5);
                let expected = generic
                    .entities
                    .iter()
                    .rev()
                    .find(|e| e.area.contains(cx, cy))
                    .and_then(|e| e.cell);
                assert_eq!(
                    r.cell_at_pixel(&grid, &axes, (w, h), (x, y)),
                    expected,
                    "{:?} pixel ({x}, {y})",
                    axes
                );
            }
        }
    }
}

#[test]
fn fast_path_skips_nan_cells() {
    let grid = Arc::new(
        Grid2D::from_row_major(1, 2, vec![f64::NAN, 1.0], Point::new(0.0, 0.0), 1.0, 1.0)
            .unwrap(),
    );
    let mut r = GradientRenderer::default();
    r.fit_to_dataset(Arc::clone(&grid), true);
    let axes = Axes::fitting(&grid.domain());
    let mut frame = Frame::blank(20, 10, Rgba::WHITE);
    r.render_fast(&grid, &axes, 0, &mut frame);
    assert_eq!(frame.image.get(5, 5), Some(Rgba::WHITE));
    assert_ne!(frame.image.get(15, 5), Some(Rgba::WHITE));
}

#[test]
fn underflow_without_outside_colors_is_gradient_start() {
    let mut r = GradientRenderer::default();
    r.set_gradient(Colormap::Grayscale.gradient());
    assert_eq!(r.gradient().color_at(0.0), Rgba::BLACK);
    r.set_gradient_bounds(0.0, 100.0).unwrap();
    assert!(!r.use_outside_range_colors());
    assert_eq!(r.paint_scale().paint(-5.0), Rgba::BLACK);
}

#[test]
fn selector_twice_is_stable() {
    let mut r = GradientRenderer::default();
    r.fit_to_dataset(wave(), true);
    for selector in [
        RangeSelector::Full,
        RangeSelector::Automatic,
        RangeSelector::RoiFull,
        RangeSelector::Manual,
    ] {
        r.set_range_selector(selector);
        let once = (r.lower_bound(), r.upper_bound());
        r.set_range_selector(selector);
        assert_eq!(once, (r.lower_bound(), r.upper_bound()), "{selector:?}");
    }
}

#[test]
fn styles_persist_through_json_store() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn StyleStore> = Arc::new(JsonStyleStore::new(dir.path()));
    {
        let mut r = GradientRenderer::new(Preferences::load("height", Arc::clone(&store)).unwrap());
        r.set_outline_visible(true);
        r.set_gradient(ColorGradient::linear(Rgba::BLACK, Rgba::rgb(255, 0, 0)));
    }
    let r = GradientRenderer::new(Preferences::load("height", store).unwrap());
    assert!(r.style().outline_visible);
    assert!(!r.can_use_fast_path());
    assert_eq!(r.gradient().end_color(), Rgba::rgb(255, 0, 0));
}

#[test]
fn roi_edits_drive_mask_and_cache() {
    let grid = wave();
    let mut plot = Channel2DPlot::new(Axes::fitting(&grid.domain()));
    plot.add_dataset(Arc::clone(&grid), GradientRenderer::default());
    plot.update_renderer(0, |r| {
        let mut changes = r.set_mask_selector(MaskSelector::MaskOutside);
        changes.extend(r.set_mask_color(Rgba::rgb(0, 255, 0)));
        changes
    })
    .unwrap();
    let first = plot.draw(64, 48);
    assert!(!first.from_cache);

    let update = plot.add_or_replace_roi(disk());
    assert!(update.raster_invalidated);
    let masked = plot.draw(64, 48);
    assert!(!masked.from_cache);
    let corner = masked.image.get(0, 0);
    assert_eq!(corner, Some(Rgba::rgb(0, 255, 0)));

    plot.set_roi_under_construction(Some(Roi::polygon_seed(2, Point::new(1.0, 1.0))));
    assert!(plot.draw(64, 48).from_cache);
    plot.set_roi_under_construction(None);
    assert!(plot.roi_under_construction().is_none());
}
