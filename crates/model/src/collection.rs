//! Committed annotation collection.
//!
//! Z-order is insertion order: later annotations are drawn on top and win
//! hit-tests.

use crate::annotation::{Annotation, AnnotationId, HitPolicy, LocalKey};
use crate::geometry::Point;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationCollection {
    items: Vec<Annotation>,
}

impl AnnotationCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn push(&mut self, annotation: Annotation) {
        self.items.push(annotation);
    }

    pub fn get(&self, key: LocalKey) -> Option<&Annotation> {
        self.items.iter().find(|a| a.key() == key)
    }

    pub fn get_mut(&mut self, key: LocalKey) -> Option<&mut Annotation> {
        self.items.iter_mut().find(|a| a.key() == key)
    }

    pub fn find_by_id(&self, id: AnnotationId) -> Option<&Annotation> {
        self.items.iter().find(|a| a.id() == Some(id))
    }

    /// Replace the entry with the same local key, keeping its z-order slot.
    ///
    /// Returns the previous value, or `None` if no entry matched.
    pub fn replace(&mut self, annotation: Annotation) -> Option<Annotation> {
        let slot = self.items.iter_mut().find(|a| a.key() == annotation.key())?;
        Some(std::mem::replace(slot, annotation))
    }

    pub fn remove(&mut self, key: LocalKey) -> Option<Annotation> {
        let index = self.items.iter().position(|a| a.key() == key)?;
        Some(self.items.remove(index))
    }

    /// Most recently added annotation.
    pub fn last(&self) -> Option<&Annotation> {
        self.items.last()
    }

    pub fn clear(&mut self) -> Vec<Annotation> {
        std::mem::take(&mut self.items)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.items.iter()
    }

    /// Annotations on `page`, bottom-most first.
    pub fn on_page(&self, page: u32) -> impl Iterator<Item = &Annotation> {
        self.items.iter().filter(move |a| a.page() == page)
    }

    /// Topmost annotation on `page` under `point`.
    pub fn hit_test(
        &self,
        page: u32,
        point: &Point,
        tolerance: f64,
        policy: HitPolicy,
    ) -> Option<&Annotation> {
        self.items
            .iter()
            .rev()
            .filter(|a| a.page() == page)
            .find(|a| a.hit_test(point, tolerance, policy))
    }
}

impl FromIterator<Annotation> for AnnotationCollection {
    fn from_iter<I: IntoIterator<Item = Annotation>>(iter: I) -> Self {
        Self { items: iter.into_iter().collect() }
    }
}

impl Extend<Annotation> for AnnotationCollection {
    fn extend<I: IntoIterator<Item = Annotation>>(&mut self, iter: I) {
        self.items.extend(iter);
    }
}

impl<'a> IntoIterator for &'a AnnotationCollection {
    type Item = &'a Annotation;
    type IntoIter = std::slice::Iter<'a, Annotation>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{Frame, Owner, Shape, Style};

    fn rect_on(page: u32, x: f64) -> Annotation {
        Annotation::new(
            Owner::new(1, 1),
            page,
            Shape::Rectangle(Frame::new(x, 0.0, 100.0, 100.0)),
            Style::default(),
        )
    }

    #[test]
    fn hit_test_prefers_topmost() {
        let bottom = rect_on(1, 0.0);
        let top = rect_on(1, 50.0);
        let top_key = top.key();
        let collection: AnnotationCollection = [bottom, top].into_iter().collect();

        let hit = collection.hit_test(1, &Point::new(75.0, 50.0), 0.0, HitPolicy::Reference);
        assert_eq!(hit.map(Annotation::key), Some(top_key));
    }

    #[test]
    fn hit_test_is_page_scoped() {
        let collection: AnnotationCollection = [rect_on(2, 0.0)].into_iter().collect();
        assert!(collection.hit_test(1, &Point::new(50.0, 50.0), 0.0, HitPolicy::Reference).is_none());
        assert!(collection.hit_test(2, &Point::new(50.0, 50.0), 0.0, HitPolicy::Reference).is_some());
    }

    #[test]
    fn replace_keeps_z_order() {
        let first = rect_on(1, 0.0);
        let second = rect_on(1, 10.0);
        let first_key = first.key();
        let mut collection: AnnotationCollection = [first.clone(), second].into_iter().collect();

        let moved = first.with_shape(Shape::Rectangle(Frame::new(500.0, 0.0, 1.0, 1.0)));
        assert!(collection.replace(moved).is_some());
        assert_eq!(collection.iter().next().map(Annotation::key), Some(first_key));
        assert!(collection.replace(rect_on(1, 0.0)).is_none());
    }

    #[test]
    fn on_page_filters() {
        let collection: AnnotationCollection =
            [rect_on(1, 0.0), rect_on(2, 0.0), rect_on(1, 5.0)].into_iter().collect();
        assert_eq!(collection.on_page(1).count(), 2);
        assert_eq!(collection.on_page(2).count(), 1);
        assert_eq!(collection.on_page(3).count(), 0);
    }
}
