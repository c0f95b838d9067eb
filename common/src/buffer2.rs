use std::ops::{Deref, DerefMut, Index, IndexMut};
use std::slice;

/// Row-major 2D buffer addressed as `(x, y)`.
///
/// Used as the intensity grid handed to the tracing pipeline and as scratch
/// storage for the preprocessing filters.
#[derive(Debug, Clone, PartialEq)]
pub struct Buffer2<T> {
    pixels: Vec<T>,
    width: usize,
    height: usize,
}

impl<T> Buffer2<T> {
    pub fn new(width: usize, height: usize, pixels: Vec<T>) -> Self {
        assert_eq!(
            pixels.len(),
            width * height,
            "pixels length must equal width * height"
        );
        Self {
            pixels,
            width,
            height,
        }
    }

    /// Builds a buffer from equally sized rows (top row first).
    pub fn from_rows(rows: Vec<Vec<T>>) -> Self {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        let mut pixels = Vec::with_capacity(width * height);
        for (y, row) in rows.into_iter().enumerate() {
            assert_eq!(row.len(), width, "row {} has a different width", y);
            pixels.extend(row);
        }
        Self {
            pixels,
            width,
            height,
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> &T {
        debug_assert!(x < self.width && y < self.height);
        &self.pixels[y * self.width + x]
    }

    #[inline]
    pub fn get_mut(&mut self, x: usize, y: usize) -> &mut T {
        debug_assert!(x < self.width && y < self.height);
        &mut self.pixels[y * self.width + x]
    }

    /// Bounds-checked access with signed coordinates, `None` outside the buffer.
    #[inline]
    pub fn get_checked(&self, x: i64, y: i64) -> Option<&T> {
        if self.contains(x, y) {
            Some(&self.pixels[y as usize * self.width + x as usize])
        } else {
            None
        }
    }

    #[inline]
    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn pixels(&self) -> &[T] {
        &self.pixels
    }

    #[inline]
    pub fn pixels_mut(&mut self) -> &mut [T] {
        &mut self.pixels
    }

    #[inline]
    pub fn row(&self, y: usize) -> &[T] {
        &self.pixels[y * self.width..(y + 1) * self.width]
    }

    #[inline]
    pub fn row_mut(&mut self, y: usize) -> &mut [T] {
        &mut self.pixels[y * self.width..(y + 1) * self.width]
    }

    #[inline]
    pub fn into_vec(self) -> Vec<T> {
        self.pixels
    }

    #[inline]
    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.pixels.iter()
    }

    #[inline]
    pub fn iter_mut(&mut self) -> slice::IterMut<'_, T> {
        self.pixels.iter_mut()
    }

    /// Iterates `(x, y, value)` in row-major order.
    pub fn enumerate(&self) -> impl Iterator<Item = (usize, usize, &T)> + '_ {
        let width = self.width.max(1);
        self.pixels
            .iter()
            .enumerate()
            .map(move |(idx, value)| (idx % width, idx / width, value))
    }

    pub fn count_where(&self, mut predicate: impl FnMut(&T) -> bool) -> usize {
        self.pixels.iter().filter(|value| predicate(value)).count()
    }
}

impl<T: Default + Clone> Buffer2<T> {
    pub fn new_default(width: usize, height: usize) -> Self {
        Self {
            pixels: vec![T::default(); width * height],
            width,
            height,
        }
    }
}

impl<T: Clone> Buffer2<T> {
    pub fn new_filled(width: usize, height: usize, value: T) -> Self {
        Self {
            pixels: vec![value; width * height],
            width,
            height,
        }
    }

    #[inline]
    pub fn fill(&mut self, value: T) {
        self.pixels.fill(value);
    }
}

impl Buffer2<f32> {
    /// Mean of all values, 0 for an empty buffer.
    pub fn mean(&self) -> f32 {
        if self.pixels.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.pixels.iter().map(|&v| v as f64).sum();
        (sum / self.pixels.len() as f64) as f32
    }
}

impl<T> Index<(usize, usize)> for Buffer2<T> {
    type Output = T;

    #[inline]
    fn index(&self, (x, y): (usize, usize)) -> &Self::Output {
        &self.pixels[y * self.width + x]
    }
}

impl<T> IndexMut<(usize, usize)> for Buffer2<T> {
    #[inline]
    fn index_mut(&mut self, (x, y): (usize, usize)) -> &mut Self::Output {
        &mut self.pixels[y * self.width + x]
    }
}

impl<T> Deref for Buffer2<T> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.pixels
    }
}

impl<T> DerefMut for Buffer2<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.pixels
    }
}

impl<'a, T> IntoIterator for &'a Buffer2<T> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.pixels.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rows_keeps_row_major_layout() {
        let buf = Buffer2::from_rows(vec![vec![1, 2, 3], vec![4, 5, 6]]);
        assert_eq!(buf.width(), 3);
        assert_eq!(buf.height(), 2);
        assert_eq!(buf[(2, 0)], 3);
        assert_eq!(buf[(0, 1)], 4);
        assert_eq!(buf.row(1), &[4, 5, 6]);
    }

    #[test]
    #[should_panic(expected = "different width")]
    fn test_from_rows_rejects_ragged_rows() {
        Buffer2::from_rows(vec![vec![1, 2], vec![3]]);
    }

    #[test]
    fn test_get_checked_outside_is_none() {
        let buf = Buffer2::new_filled(4, 3, 7u8);
        assert_eq!(buf.get_checked(3, 2), Some(&7));
        assert_eq!(buf.get_checked(-1, 0), None);
        assert_eq!(buf.get_checked(0, 3), None);
        assert_eq!(buf.get_checked(4, 0), None);
    }

    #[test]
    fn test_enumerate_reports_coordinates() {
        let buf = Buffer2::new(2, 2, vec![0, 1, 2, 3]);
        let coords: Vec<_> = buf.enumerate().map(|(x, y, &v)| (x, y, v)).collect();
        assert_eq!(coords, vec![(0, 0, 0), (1, 0, 1), (0, 1, 2), (1, 1, 3)]);
    }

    #[test]
    fn test_mean_and_count() {
        let buf = Buffer2::new(2, 2, vec![0.0f32, 2.0, 4.0, 6.0]);
        assert!((buf.mean() - 3.0).abs() < 1e-6);
        assert_eq!(buf.count_where(|&v| v > 1.0), 3);
        assert_eq!(Buffer2::<f32>::new(0, 0, vec![]).mean(), 0.0);
    }

    #[test]
    fn test_row_mut_writes_through() {
        let mut buf = Buffer2::new_default(3, 2);
        buf.row_mut(1).fill(9i32);
        assert_eq!(buf.pixels(), &[0, 0, 0, 9, 9, 9]);
    }
}
