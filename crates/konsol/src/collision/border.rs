//! # Border-Point Index
//!
//! Mask-accurate collision maps points of one shape into the other and
//! samples its mask. Mapping every solid pixel would cost the shape's area;
//! mapping only its silhouette costs its perimeter. The border index is that
//! silhouette: a sparse set of boundary pixels, sorted by x so a window of
//! columns can be fetched with two binary searches.
//!
//! ## Extraction
//!
//! ```text
//!   1. separators     rows/columns inside the bounding box with no solid
//!                     pixel split the shape into independent bands
//!   2. band edges     per band, first + last solid pixel of every column
//!                     (horizontal bands) and every row (vertical bands)
//!   3. sweep          row-major then column-major pass adding every solid
//!                     pixel next to an empty one (holes, notches)
//!   4. index          sort by (x, y), dedup
//! ```
//!
//! A filled square of side S yields exactly its 4S − 4 perimeter pixels.

use crate::math::Rect;

use super::mask::CollisionMask;

/// Sorted, deduplicated boundary pixels of a mask.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BorderIndex {
    /// `(x, y)` pixel coordinates, sorted by x then y.
    points: Vec<(i32, i32)>,
}

impl BorderIndex {
    /// Extract the border of `mask`.
    pub fn extract(mask: &CollisionMask) -> Self {
        let Some(bounds) = mask.bounds() else {
            return Self::default();
        };
        let mut points = Vec::new();

        let empty_cols: Vec<bool> = (bounds.left..bounds.right)
            .map(|x| (bounds.top..bounds.bottom).all(|y| !mask.is_solid(x, y)))
            .collect();
        let empty_rows: Vec<bool> = (bounds.top..bounds.bottom)
            .map(|y| (bounds.left..bounds.right).all(|x| !mask.is_solid(x, y)))
            .collect();

        for (y0, y1) in bands(&empty_rows, bounds.top) {
            for x in bounds.left..bounds.right {
                if let Some(first) = (y0..y1).find(|&y| mask.is_solid(x, y)) {
                    let last = (y0..y1).rev().find(|&y| mask.is_solid(x, y)).unwrap_or(first);
                    points.push((x, first));
                    points.push((x, last));
                }
            }
        }
        for (x0, x1) in bands(&empty_cols, bounds.left) {
            for y in bounds.top..bounds.bottom {
                if let Some(first) = (x0..x1).find(|&x| mask.is_solid(x, y)) {
                    let last = (x0..x1).rev().find(|&x| mask.is_solid(x, y)).unwrap_or(first);
                    points.push((first, y));
                    points.push((last, y));
                }
            }
        }

        for y in bounds.top..bounds.bottom {
            for x in bounds.left..bounds.right {
                if mask.is_solid(x, y) && (!mask.is_solid(x - 1, y) || !mask.is_solid(x + 1, y)) {
                    points.push((x, y));
                }
            }
        }
        for x in bounds.left..bounds.right {
            for y in bounds.top..bounds.bottom {
                if mask.is_solid(x, y) && (!mask.is_solid(x, y - 1) || !mask.is_solid(x, y + 1)) {
                    points.push((x, y));
                }
            }
        }

        points.sort_unstable();
        points.dedup();
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[(i32, i32)] {
        &self.points
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        self.points.binary_search(&(x, y)).is_ok()
    }

    /// All points with `x` in `[x0, x1]` (inclusive).
    pub fn range_x(&self, x0: i32, x1: i32) -> &[(i32, i32)] {
        if x1 < x0 {
            return &[];
        }
        let start = self.points.partition_point(|&(x, _)| x < x0);
        let end = self.points.partition_point(|&(x, _)| x <= x1);
        &self.points[start..end]
    }

    /// Points inside `rect` (right/bottom exclusive).
    pub fn within(&self, rect: Rect) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.range_x(rect.left, rect.right - 1)
            .iter()
            .copied()
            .filter(move |&(_, y)| y >= rect.top && y < rect.bottom)
    }
}

/// Maximal runs of non-empty lines, as `[start, end)` in absolute coordinates.
fn bands(empty: &[bool], origin: i32) -> Vec<(i32, i32)> {
    let mut out = Vec::new();
    let mut start = None;
    for (i, &is_empty) in empty.iter().enumerate() {
        let coord = origin + i as i32;
        match (is_empty, start) {
            (false, None) => start = Some(coord),
            (true, Some(s)) => {
                out.push((s, coord));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        out.push((s, origin + empty.len() as i32));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec2;
    use crate::surface::tests::square_rgba;
    use crate::transform::Placement;

    fn square_mask(canvas: u32, size: u32) -> CollisionMask {
        CollisionMask::from_rgba(canvas, canvas, &square_rgba(canvas, size), true).unwrap()
    }

    #[test]
    fn square_border_is_its_perimeter() {
        let mask = CollisionMask::from_fn(10, 10, |_, _| true, true);
        let border = mask.border().unwrap();
        assert_eq!(border.len(), 36);
        for &(x, y) in border.points() {
            assert!(
                x == 0 || y == 0 || x == 9 || y == 9,
                "({x}, {y}) is not on the perimeter"
            );
        }
    }

    #[test]
    fn centered_square_has_no_interior_or_outside_points() {
        let mask = square_mask(16, 10);
        let border = mask.border().unwrap();
        assert_eq!(border.len(), 36);

        let square = Rect::new(3, 3, 10, 10);
        for &(x, y) in border.points() {
            assert!(square.contains(x, y), "({x}, {y}) outside the square");
            let interior = x > 3 && x < 12 && y > 3 && y < 12;
            assert!(!interior, "({x}, {y}) is interior");
        }
    }

    #[test]
    fn border_points_sample_solid_through_transform() {
        let mask = square_mask(16, 10);
        let placement = Placement::new(Vec2::new(50.0, 20.0), Rect::from_size(16, 16))
            .with_rotation(0.6, Vec2::new(1.0, -2.0))
            .with_flip(true, false)
            .with_scale(Vec2::new(1.5, 2.0));
        for &(x, y) in mask.border().unwrap().points() {
            let center = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            let back = placement.to_local(placement.to_screen(center));
            assert!(mask.sample(back), "({x}, {y}) no longer samples solid");
        }
    }

    #[test]
    fn holes_contribute_inner_edges() {
        // 7x7 ring with a 3x3 hole in the middle.
        let mask = CollisionMask::from_fn(7, 7, |x, y| !((2..5).contains(&x) && (2..5).contains(&y)), true);
        let border = mask.border().unwrap();
        assert!(border.contains(1, 2), "inner edge next to the hole");
        assert!(border.contains(3, 1));
        assert!(!border.contains(3, 3), "hole pixel is empty");
        // Outer perimeter 24 + the 12 pixels 4-adjacent to the hole.
        assert_eq!(border.len(), 36);
    }

    #[test]
    fn disjoint_parts_are_all_indexed() {
        let mask = CollisionMask::from_fn(9, 3, |x, _| x < 3 || x >= 6, true);
        let border = mask.border().unwrap();
        assert!(border.contains(2, 1));
        assert!(border.contains(6, 1));
        assert!(!border.contains(4, 1));
    }

    #[test]
    fn range_query_by_x() {
        let mask = square_mask(16, 10);
        let border = mask.border().unwrap();
        let column = border.range_x(3, 3);
        assert_eq!(column.len(), 10);
        assert!(column.iter().all(|&(x, _)| x == 3));
        assert!(border.range_x(0, 2).is_empty());
        assert!(border.range_x(5, 4).is_empty());
        assert_eq!(border.within(Rect::new(0, 0, 8, 8)).count(), 9);
    }

    #[test]
    fn bands_split_on_empty_lines() {
        assert_eq!(bands(&[false, false, true, false], 10), vec![(10, 12), (13, 14)]);
        assert!(bands(&[true, true], 0).is_empty());
    }
}
