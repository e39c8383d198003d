use smallvec::SmallVec;

/// An axis-aligned bounding box of any dimension.
///
/// `BoundingBox` stores its coordinates as `min, max` pairs per axis, i.e.
/// `[min_0, max_0, min_1, max_1, ...]`, which is also the order in which
/// the node store persists them. A box whose coordinates are all NaN is the
/// empty (unset) box.
///
/// Equality compares coordinates as floats, so a box holding NaN is never
/// equal to itself. `BoundingBox` is therefore `PartialEq` only.
///
/// # Examples
///
/// ```rust
/// use nitrite_rtree_store::BoundingBox;
///
/// let area = BoundingBox::new(&[0.0, 10.0, 0.0, 10.0]);
/// let query = BoundingBox::new(&[4.0, 6.0, 4.0, 6.0]);
/// assert!(area.intersects(&query));
/// assert!(area.contains(&query));
/// ```
#[derive(Clone, PartialEq, Debug)]
pub struct BoundingBox {
    coords: SmallVec<[f64; 4]>,
}

impl std::fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BoundingBox(")?;
        for (i, c) in self.coords.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", c)?;
        }
        write!(f, ")")
    }
}

impl BoundingBox {
    /// Creates a bounding box from interleaved `min, max` pairs per axis.
    ///
    /// # Panics
    ///
    /// Panics if `coords` is empty or has an odd length.
    pub fn new(coords: &[f64]) -> BoundingBox {
        assert!(
            !coords.is_empty() && coords.len() % 2 == 0,
            "a bounding box needs a min/max pair per axis"
        );
        BoundingBox {
            coords: SmallVec::from_slice(coords),
        }
    }

    /// Creates a 2D bounding box.
    pub fn from_2d(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> BoundingBox {
        BoundingBox::new(&[min_x, max_x, min_y, max_y])
    }

    /// Creates the empty (all-NaN) box of the given dimension.
    pub fn empty(dimension: usize) -> BoundingBox {
        BoundingBox {
            coords: SmallVec::from_elem(f64::NAN, dimension * 2),
        }
    }

    /// Returns a box covering a single point.
    pub fn from_point(point: &[f64]) -> BoundingBox {
        let mut coords = SmallVec::with_capacity(point.len() * 2);
        for &p in point {
            coords.push(p);
            coords.push(p);
        }
        BoundingBox { coords }
    }

    pub fn dimension(&self) -> usize {
        self.coords.len() / 2
    }

    pub fn coords(&self) -> &[f64] {
        &self.coords
    }

    pub fn min(&self, axis: usize) -> f64 {
        self.coords[axis * 2]
    }

    pub fn max(&self, axis: usize) -> f64 {
        self.coords[axis * 2 + 1]
    }

    /// Returns the extent of the box along `axis`.
    pub fn span(&self, axis: usize) -> f64 {
        self.max(axis) - self.min(axis)
    }

    /// True if every coordinate is NaN.
    pub fn is_empty(&self) -> bool {
        self.coords.iter().all(|c| c.is_nan())
    }

    /// Returns the product of the spans of all axes.
    pub fn volume(&self) -> f64 {
        (0..self.dimension()).map(|axis| self.span(axis)).product()
    }

    /// Checks if this bounding box intersects another one. Touching boxes
    /// intersect; boxes of different dimensions or with NaN bounds never do.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        if self.dimension() != other.dimension() {
            return false;
        }
        (0..self.dimension())
            .all(|axis| self.min(axis) <= other.max(axis) && self.max(axis) >= other.min(axis))
    }

    /// Checks if this bounding box contains another one.
    pub fn contains(&self, other: &BoundingBox) -> bool {
        if self.dimension() != other.dimension() {
            return false;
        }
        (0..self.dimension())
            .all(|axis| other.min(axis) >= self.min(axis) && other.max(axis) <= self.max(axis))
    }

    /// Returns the union of this bounding box with another. An empty box is
    /// the identity of the union.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        if self.is_empty() {
            return other.clone();
        }
        if other.is_empty() {
            return self.clone();
        }
        let mut coords = SmallVec::with_capacity(self.coords.len());
        for axis in 0..self.dimension() {
            coords.push(self.min(axis).min(other.min(axis)));
            coords.push(self.max(axis).max(other.max(axis)));
        }
        BoundingBox { coords }
    }
}
