//! Test data generators for creating synthetic grid data.
//!
//! These generators create predictable, verifiable test data patterns
//! that can be used across the test suite.

/// Creates a test grid with predictable values.
///
/// Each cell value is calculated as: `col * 1000 + row`
///
/// This makes it easy to verify that data survives resampling and merging
/// by checking that grid[row][col] == col * 1000 + row.
///
/// # Example
///
/// ```
/// use test_utils::create_test_grid;
///
/// let grid = create_test_grid(10, 5);
/// assert_eq!(grid.len(), 50);  // 10 * 5
/// assert_eq!(grid[0], 0.0);    // col=0, row=0 -> 0*1000 + 0
/// assert_eq!(grid[1], 1000.0); // col=1, row=0 -> 1*1000 + 0
/// assert_eq!(grid[10], 1.0);   // col=0, row=1 -> 0*1000 + 1
/// ```
pub fn create_test_grid(width: usize, height: usize) -> Vec<f64> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push((col * 1000 + row) as f64);
        }
    }
    data
}

/// Creates a grid filled with a single value.
pub fn create_uniform_grid(width: usize, height: usize, value: f64) -> Vec<f64> {
    vec![value; width * height]
}

/// Creates a gradient grid from `min` (top-left) to `max` (bottom-right).
pub fn create_gradient_grid(width: usize, height: usize, min: f64, max: f64) -> Vec<f64> {
    let steps = (width + height).saturating_sub(2).max(1) as f64;
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            let t = (row + col) as f64 / steps;
            data.push(min + (max - min) * t);
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_test_grid_pattern() {
        let grid = create_test_grid(4, 3);
        assert_eq!(grid.len(), 12);
        for row in 0..3 {
            for col in 0..4 {
                assert_eq!(grid[row * 4 + col], (col * 1000 + row) as f64);
            }
        }
    }

    #[test]
    fn test_gradient_grid_range() {
        let grid = create_gradient_grid(5, 5, 250.0, 310.0);
        assert_eq!(grid[0], 250.0);
        assert_eq!(*grid.last().unwrap(), 310.0);
        assert!(grid.iter().all(|&v| (250.0..=310.0).contains(&v)));
    }
}
