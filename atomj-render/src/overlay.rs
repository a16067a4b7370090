//! Keyed annotation layers drawn over the cached raster.

use atomj_core::{Point, Rgba};

/// Item addressable by an integer key.
pub trait Keyed {
    fn key(&self) -> usize;
}

/// Cross-section line.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub key: usize,
    pub points: Vec<Point>,
    pub color: Rgba,
}

impl Keyed for Profile {
    fn key(&self) -> usize {
        self.key
    }
}

/// Point marker, drawn as a cross.
#[derive(Debug, Clone, PartialEq)]
pub struct MapMarker {
    pub key: usize,
    pub position: Point,
    pub color: Rgba,
}

impl Keyed for MapMarker {
    fn key(&self) -> usize {
        self.key
    }
}

/// Insertion-ordered keyed collection; replacing keeps the original slot.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayCollection<T> {
    items: Vec<T>,
}

impl<T> Default for OverlayCollection<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Keyed> OverlayCollection<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `item`, returning the one it replaced.
    pub fn add_or_replace(&mut self, item: T) -> Option<T> {
        match self.items.iter().position(|i| i.key() == item.key()) {
            Some(idx) => Some(std::mem::replace(&mut self.items[idx], item)),
            None => {
                self.items.push(item);
                None
            }
        }
    }

    pub fn remove(&mut self, key: usize) -> Option<T> {
        let idx = self.items.iter().position(|i| i.key() == key)?;
        Some(self.items.remove(idx))
    }

    pub fn set_all(&mut self, items: impl IntoIterator<Item = T>) {
        self.items.clear();
        for item in items {
            self.add_or_replace(item);
        }
    }

    #[must_use]
    pub fn get(&self, key: usize) -> Option<&T> {
        self.items.iter().find(|i| i.key() == key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker(key: usize, x: f64) -> MapMarker {
        MapMarker {
            key,
            position: Point::new(x, 0.0),
            color: Rgba::BLACK,
        }
    }

    #[test]
    fn test_replace_keeps_order() {
        let mut c = OverlayCollection::new();
        c.add_or_replace(marker(3, 0.0));
        c.add_or_replace(marker(1, 0.0));
        let old = c.add_or_replace(marker(3, 5.0));
        assert_eq!(old.map(|m| m.position.x), Some(0.0));
        let keys: Vec<usize> = c.iter().map(Keyed::key).collect();
        assert_eq!(keys, vec![3, 1]);
        assert_eq!(c.get(3).map(|m| m.position.x), Some(5.0));
    }

    #[test]
    fn test_remove_and_set_all() {
        let mut c = OverlayCollection::new();
        c.set_all([marker(1, 0.0), marker(2, 0.0), marker(1, 1.0)]);
        assert_eq!(c.len(), 2);
        assert!(c.remove(1).is_some());
        assert!(c.remove(1).is_none());
        assert_eq!(c.len(), 1);
    }
}
