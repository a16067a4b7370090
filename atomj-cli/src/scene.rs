//! JSON grid and scene files.

use std::path::Path;

use atomj_core::{Grid2D, PathKind, Point, Rect, Roi};
use serde::{Deserialize, Serialize};

use crate::{CliError, Result};

/// Grid file: row-major samples, `null` for missing values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridFile {
    pub rows: usize,
    pub columns: usize,
    #[serde(default)]
    pub x_origin: f64,
    #[serde(default)]
    pub y_origin: f64,
    pub x_increment: f64,
    pub y_increment: f64,
    pub values: Vec<Option<f64>>,
}

impl GridFile {
    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_string(self)?)?;
        Ok(())
    }

    pub fn into_grid(self) -> Result<Grid2D> {
        let data = self
            .values
            .into_iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect();
        Ok(Grid2D::from_row_major(
            self.rows,
            self.columns,
            data,
            Point::new(self.x_origin, self.y_origin),
            self.x_increment,
            self.y_increment,
        )?)
    }

    #[must_use]
    pub fn from_grid(grid: &Grid2D) -> Self {
        Self {
            rows: grid.row_count(),
            columns: grid.column_count(),
            x_origin: grid.x_origin(),
            y_origin: grid.y_origin(),
            x_increment: grid.x_increment(),
            y_increment: grid.y_increment(),
            values: grid
                .values()
                .iter()
                .map(|z| (!z.is_nan()).then_some(*z))
                .collect(),
        }
    }
}

/// One ROI of a scene file.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum RoiSpec {
    Rectangle {
        min: [f64; 2],
        max: [f64; 2],
        #[serde(default)]
        hole: bool,
        label: Option<String>,
    },
    Ellipse {
        min: [f64; 2],
        max: [f64; 2],
        #[serde(default)]
        hole: bool,
        label: Option<String>,
    },
    Polygon {
        vertices: Vec<[f64; 2]>,
        #[serde(default)]
        hole: bool,
        label: Option<String>,
    },
}

/// Scene file: ROIs, profiles and markers drawn over the map.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Scene {
    #[serde(default)]
    pub rois: Vec<RoiSpec>,
    #[serde(default)]
    pub profiles: Vec<Vec<[f64; 2]>>,
    #[serde(default)]
    pub markers: Vec<[f64; 2]>,
}

fn point(p: [f64; 2]) -> Point {
    Point::new(p[0], p[1])
}

impl Scene {
    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// ROIs keyed from 1 in file order; holes are bounded by `area`.
    pub fn build_rois(&self, area: Rect) -> Result<Vec<Roi>> {
        self.rois
            .iter()
            .enumerate()
            .map(|(i, spec)| {
                let key = i + 1;
                let (roi, hole, label) = match spec {
                    RoiSpec::Rectangle {
                        min,
                        max,
                        hole,
                        label,
                    } => (
                        Roi::rectangle(key, Rect::from_corners(point(*min), point(*max))),
                        *hole,
                        label,
                    ),
                    RoiSpec::Ellipse {
                        min,
                        max,
                        hole,
                        label,
                    } => (
                        Roi::ellipse(key, Rect::from_corners(point(*min), point(*max))),
                        *hole,
                        label,
                    ),
                    RoiSpec::Polygon {
                        vertices,
                        hole,
                        label,
                    } => {
                        let vertices = vertices.iter().copied().map(point).collect();
                        let roi = Roi::path(key, PathKind::Polygon, vertices)
                            .map_err(|e| CliError::Scene(format!("ROI {key}: {e}")))?;
                        (roi, *hole, label)
                    }
                };
                let roi = if hole { roi.with_hole(area) } else { roi };
                Ok(match label {
                    Some(label) => roi.with_label(label.clone()),
                    None => roi,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_parsing() {
        let scene: Scene = serde_json::from_str(
            r#"{
                "rois": [
                    {"shape": "rectangle", "min": [0, 0], "max": [2, 2]},
                    {
                        "shape": "ellipse", "min": [4, 4], "max": [6, 8],
                        "hole": true, "label": "rim"
                    },
                    {"shape": "polygon", "vertices": [[0, 0], [1, 0], [0, 1]]}
                ],
                "markers": [[1, 1]]
            }"#,
        )
        .unwrap();
        let area = Rect::from_corners(Point::new(0.0, 0.0), Point::new(10.0, 10.0));
        let rois = scene.build_rois(area).unwrap();
        assert_eq!(rois.len(), 3);
        assert_eq!(rois[1].label(), "rim");
        assert!(rois[1].is_hole());
        assert!(rois[1].contains(Point::new(9.0, 9.0)));
        assert_eq!(rois[2].key(), 3);
        assert_eq!(scene.markers.len(), 1);
    }

    #[test]
    fn test_degenerate_polygon_rejected() {
        let json = r#"{"rois": [{"shape": "polygon", "vertices": [[0, 0], [1, 0]]}]}"#;
        let scene: Scene = serde_json::from_str(json).unwrap();
        let area = Rect::from_corners(Point::new(0.0, 0.0), Point::new(1.0, 1.0));
        assert!(matches!(scene.build_rois(area), Err(CliError::Scene(_))));
    }

    #[test]
    fn test_grid_file_roundtrip_keeps_missing_samples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid.json");
        let file = GridFile {
            rows: 1,
            columns: 3,
            x_origin: 0.0,
            y_origin: 0.0,
            x_increment: 1.0,
            y_increment: 1.0,
            values: vec![Some(1.0), None, Some(3.0)],
        };
        file.write(&path).unwrap();
        let grid = GridFile::read(&path).unwrap().into_grid().unwrap();
        assert!(grid.z(0, 1).is_nan());
        assert_eq!(GridFile::from_grid(&grid).values, file.values);
    }
}
