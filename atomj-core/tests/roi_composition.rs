use atomj_core::{
    Anchor, Compass, Grid2D, Modifiers, PathKind, Point, Rect, Roi, RoiCollection, RoiKind,
    WandContourTracer,
};

fn square(key: usize, x0: f64, y0: f64, side: f64) -> Roi {
    Roi::rectangle(
        key,
        Rect::from_corners(Point::new(x0, y0), Point::new(x0 + side, y0 + side)),
    )
}

fn area() -> Rect {
    Rect::from_corners(Point::new(0.0, 0.0), Point::new(100.0, 100.0))
}

#[test]
fn test_union_and_difference_membership() {
    let a = square(1, 10.0, 10.0, 20.0);
    let b = square(2, 25.0, 10.0, 20.0);
    let union = Roi::union(3, "a+b", vec![a.clone(), b.clone()]).unwrap();
    assert_eq!(union.kind(), RoiKind::Composite);
    assert!(union.contains(Point::new(12.0, 15.0)));
    assert!(union.contains(Point::new(40.0, 15.0)));
    assert!(!union.contains(Point::new(50.0, 15.0)));

    let diff = Roi::difference(4, "a-b", a, vec![b]);
    assert!(diff.contains(Point::new(12.0, 15.0)));
    assert!(!diff.contains(Point::new(27.0, 15.0)));
    assert!(!diff.contains(Point::new(40.0, 15.0)));
}

#[test]
fn test_complement_of_hole_is_plain_shape() {
    let plain = square(1, 40.0, 40.0, 10.0);
    let hole = Roi::complement(2, "outside", &plain, area());
    assert!(hole.is_hole());
    assert!(hole.contains(Point::new(5.0, 5.0)));
    assert!(!hole.contains(Point::new(45.0, 45.0)));
    assert!(!hole.contains(Point::new(150.0, 45.0)));

    let back = Roi::complement(3, "inside", &hole, area());
    assert!(!back.is_hole());
    assert!(back.contains(Point::new(45.0, 45.0)));
    assert!(!back.contains(Point::new(5.0, 5.0)));
}

#[test]
fn test_collection_union_follows_members() {
    let mut rois = RoiCollection::new();
    rois.add_or_replace(square(1, 0.0, 0.0, 10.0));
    rois.add_or_replace(square(7, 50.0, 50.0, 10.0));
    assert_eq!(rois.max_key(), Some(7));
    assert!(rois.union_contains(Point::new(55.0, 55.0)));

    rois.remove(7);
    assert!(!rois.union_contains(Point::new(55.0, 55.0)));
    assert_eq!(rois.max_key(), Some(1));
}

#[test]
fn test_corner_handle_drag_grows_rectangle() {
    let mut roi = square(1, 10.0, 10.0, 10.0);
    let corner = roi
        .shape()
        .handles()
        .into_iter()
        .find(|(c, _)| *c == Compass::NorthEast)
        .map(|(_, p)| p)
        .unwrap();
    let target = Point::new(corner.x + 5.0, corner.y + 5.0);
    roi.set_position(
        Anchor::Handle(Compass::NorthEast),
        Modifiers::NONE,
        corner,
        corner,
        target,
    );
    let bounds = roi.bounds().unwrap();
    assert!((bounds.width() - 15.0).abs() < 1e-9);
    assert!((bounds.height() - 15.0).abs() < 1e-9);
    assert!(roi.contains(Point::new(23.0, 23.0)));
}

#[test]
fn test_wand_roi_covers_plateau_only() {
    let grid = Grid2D::from_fn(20, 20, Point::new(0.5, 0.5), 1.0, 1.0, |x, y| {
        if (5.0..10.0).contains(&x) && (5.0..10.0).contains(&y) {
            3.0
        } else {
            0.0
        }
    })
    .unwrap();
    let roi = WandContourTracer::default()
        .trace_roi(1, &grid, Point::new(7.5, 7.5))
        .unwrap();
    assert!(roi.contains(Point::new(6.5, 8.5)));
    assert!(!roi.contains(Point::new(12.5, 12.5)));
    assert!(!roi.contains(Point::new(2.5, 7.5)));
}

#[test]
fn test_convex_hull_closes_concavity() {
    let l_shape = Roi::path(
        1,
        PathKind::Polygon,
        vec![
            Point::new(0.0, 0.0),
            Point::new(20.0, 0.0),
            Point::new(20.0, 10.0),
            Point::new(10.0, 10.0),
            Point::new(10.0, 20.0),
            Point::new(0.0, 20.0),
        ],
    )
    .unwrap();
    let notch = Point::new(14.0, 14.0);
    assert!(!l_shape.contains(notch));
    let hull = l_shape.convex_hull(2, "hull");
    assert!(hull.contains(notch));
    assert_eq!(hull.key(), 2);
}
