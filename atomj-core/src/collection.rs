//! Insertion-ordered collection of ROIs.

use crate::geometry::{Point, Rect};
use crate::roi::{Roi, RoiKey};

/// ROIs keyed by [`RoiKey`], iterated in insertion order.
///
/// Replacing an existing key keeps its position, so the z-order of a ROI
/// does not change while it is being edited. The last ROI is the topmost.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoiCollection {
    rois: Vec<Roi>,
}

impl RoiCollection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `roi`, or replaces the ROI with the same key in place.
    ///
    /// Returns the replaced ROI, if any.
    pub fn add_or_replace(&mut self, roi: Roi) -> Option<Roi> {
        match self.rois.iter_mut().find(|r| r.key() == roi.key()) {
            Some(slot) => Some(std::mem::replace(slot, roi)),
            None => {
                self.rois.push(roi);
                None
            }
        }
    }

    /// Removes the ROI with `key`.
    pub fn remove(&mut self, key: RoiKey) -> Option<Roi> {
        let index = self.rois.iter().position(|r| r.key() == key)?;
        Some(self.rois.remove(index))
    }

    /// Replaces the whole content. Later duplicates of a key win.
    pub fn set_all(&mut self, rois: impl IntoIterator<Item = Roi>) {
        self.rois.clear();
        for roi in rois {
            self.add_or_replace(roi);
        }
    }

    pub fn clear(&mut self) {
        self.rois.clear();
    }

    #[must_use]
    pub fn get(&self, key: RoiKey) -> Option<&Roi> {
        self.rois.iter().find(|r| r.key() == key)
    }

    pub fn get_mut(&mut self, key: RoiKey) -> Option<&mut Roi> {
        self.rois.iter_mut().find(|r| r.key() == key)
    }

    #[must_use]
    pub fn contains_key(&self, key: RoiKey) -> bool {
        self.get(key).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rois.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rois.is_empty()
    }

    /// Bottom-to-top iteration.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Roi> {
        self.rois.iter()
    }

    /// Top-to-bottom iteration, the order used for hit testing.
    pub fn iter_topmost_first(&self) -> impl Iterator<Item = &Roi> {
        self.rois.iter().rev()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Roi> {
        self.rois.iter_mut()
    }

    pub fn keys(&self) -> impl Iterator<Item = RoiKey> + '_ {
        self.rois.iter().map(Roi::key)
    }

    #[must_use]
    pub fn max_key(&self) -> Option<RoiKey> {
        self.keys().max()
    }

    /// True if any ROI contains `p` (union semantics).
    #[must_use]
    pub fn union_contains(&self, p: Point) -> bool {
        self.rois.iter().any(|r| r.contains(p))
    }

    /// Topmost ROI whose boundary touches `hot`.
    #[must_use]
    pub fn boundary_hit(&self, hot: &Rect) -> Option<&Roi> {
        self.iter_topmost_first().find(|r| r.is_boundary_clicked(hot))
    }

    /// Highlighted ROIs in insertion order.
    pub fn highlighted(&self) -> impl Iterator<Item = &Roi> {
        self.rois.iter().filter(|r| r.is_highlighted())
    }
}

impl FromIterator<Roi> for RoiCollection {
    fn from_iter<I: IntoIterator<Item = Roi>>(iter: I) -> Self {
        let mut collection = RoiCollection::new();
        collection.set_all(iter);
        collection
    }
}

impl<'a> IntoIterator for &'a RoiCollection {
    type Item = &'a Roi;
    type IntoIter = std::slice::Iter<'a, Roi>;

    fn into_iter(self) -> Self::IntoIter {
        self.rois.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(key: RoiKey, x: f64) -> Roi {
        Roi::rectangle(
            key,
            Rect::from_corners(Point::new(x, 0.0), Point::new(x + 1.0, 1.0)),
        )
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut rois: RoiCollection = [rect(1, 0.0), rect(2, 5.0), rect(3, 10.0)]
            .into_iter()
            .collect();
        let old = rois.add_or_replace(rect(2, 20.0));
        assert!(old.is_some());
        assert_eq!(rois.keys().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(rois.get(2).unwrap().contains(Point::new(20.5, 0.5)));
    }

    #[test]
    fn test_topmost_first_order() {
        let rois: RoiCollection = [rect(1, 0.0), rect(7, 0.0), rect(3, 0.0)]
            .into_iter()
            .collect();
        let order: Vec<RoiKey> = rois.iter_topmost_first().map(Roi::key).collect();
        assert_eq!(order, vec![3, 7, 1]);
        let hot = Rect::centered_square(Point::new(0.0, 0.5), 0.05);
        assert_eq!(rois.boundary_hit(&hot).map(Roi::key), Some(3));
        assert_eq!(rois.max_key(), Some(7));
    }

    #[test]
    fn test_remove_and_union() {
        let mut rois: RoiCollection = [rect(1, 0.0), rect(2, 5.0)].into_iter().collect();
        assert!(rois.union_contains(Point::new(5.5, 0.5)));
        assert!(rois.remove(2).is_some());
        assert!(rois.remove(2).is_none());
        assert!(!rois.union_contains(Point::new(5.5, 0.5)));
        assert_eq!(rois.len(), 1);
    }
}
