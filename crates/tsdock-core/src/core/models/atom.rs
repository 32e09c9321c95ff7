use super::element::Element;
use nalgebra::Point3;

/// A read-only view of one atom of a molecule in a specific conformer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Atom {
    pub index: usize,
    pub element: Element,
    pub position: Point3<f64>,
}

impl Atom {
    pub fn new(index: usize, element: Element, position: Point3<f64>) -> Self {
        Self {
            index,
            element,
            position,
        }
    }

    pub fn distance_to(&self, other: &Atom) -> f64 {
        (self.position - other.position).norm()
    }
}
