//! Arena allocation for per-solve coefficient storage.
//!
//! Every HELM solve grows its coefficient matrices by exactly one row per
//! order, up to a ceiling known before the first order is computed. The
//! matrices are therefore carved out of a bumpalo arena, sized once for
//! `max_coefficients + 1` rows, and released together when the solve ends.
//!
//! # Example
//!
//! ```
//! use gat_helm::arena::ArenaContext;
//! use num_complex::Complex64;
//!
//! let ctx = ArenaContext::new();
//! let mut c = ctx.series_matrix(4, 2);
//! let n = c.push_zero_row();
//! c.set(n, 1, Complex64::new(1.0, 0.0));
//! assert_eq!(c.rows(), 1);
//! assert_eq!(c.get(0, 1), Complex64::new(1.0, 0.0));
//! ```

use bumpalo::Bump;
use num_complex::Complex64;

/// Cells to reserve up front. A table too large to address starts empty and
/// grows row by row instead.
fn reserved_cells(row_capacity: usize, width: usize) -> usize {
    row_capacity
        .checked_mul(width)
        .filter(|cells| {
            cells
                .checked_mul(std::mem::size_of::<Complex64>())
                .is_some_and(|bytes| bytes <= isize::MAX as usize)
        })
        .unwrap_or(0)
}

/// Arena context for phase-scoped allocations.
///
/// Created once per solve. Nothing allocated here outlives the solve that
/// owns the context, so independent solves never share coefficient storage.
pub struct ArenaContext {
    bump: Bump,
}

impl ArenaContext {
    pub fn new() -> Self {
        Self { bump: Bump::new() }
    }

    /// Arena with a pre-sized first chunk.
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            bump: Bump::with_capacity(bytes),
        }
    }

    /// Reset arena for reuse (O(1) operation).
    ///
    /// Arena-allocated types in this crate are plain data without Drop side
    /// effects, so skipping destructors is fine.
    pub fn reset(&mut self) {
        self.bump.reset();
    }

    /// Allocate a Vec in the arena.
    pub fn alloc_vec<T>(&self) -> bumpalo::collections::Vec<'_, T> {
        bumpalo::collections::Vec::new_in(&self.bump)
    }

    /// Zero-filled complex buffer of fixed length.
    pub fn complex_buffer(&self, len: usize) -> bumpalo::collections::Vec<'_, Complex64> {
        let mut buf = bumpalo::collections::Vec::with_capacity_in(len, &self.bump);
        buf.resize(len, Complex64::new(0.0, 0.0));
        buf
    }

    /// Row-appendable coefficient matrix with room for `row_capacity` rows.
    pub fn series_matrix(&self, row_capacity: usize, width: usize) -> SeriesMatrix<'_> {
        SeriesMatrix {
            data: bumpalo::collections::Vec::with_capacity_in(
                reserved_cells(row_capacity, width),
                &self.bump,
            ),
            width,
            rows: 0,
        }
    }

    /// Bytes currently held by the arena.
    pub fn allocated_bytes(&self) -> usize {
        self.bump.allocated_bytes()
    }
}

impl Default for ArenaContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Append-only `orders × width` matrix of series coefficients.
///
/// Row `n` holds the order-`n` coefficient of every column (bus). Rows are
/// appended zero-filled and written once; earlier rows are never revisited.
pub struct SeriesMatrix<'a> {
    data: bumpalo::collections::Vec<'a, Complex64>,
    width: usize,
    rows: usize,
}

impl<'a> SeriesMatrix<'a> {
    /// Append a zero row and return its order index.
    pub fn push_zero_row(&mut self) -> usize {
        let len = self.data.len() + self.width;
        self.data.resize(len, Complex64::new(0.0, 0.0));
        self.rows += 1;
        self.rows - 1
    }

    /// Number of live rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn row(&self, n: usize) -> &[Complex64] {
        &self.data[n * self.width..(n + 1) * self.width]
    }

    pub fn row_mut(&mut self, n: usize) -> &mut [Complex64] {
        &mut self.data[n * self.width..(n + 1) * self.width]
    }

    #[inline]
    pub fn get(&self, n: usize, k: usize) -> Complex64 {
        self.data[n * self.width + k]
    }

    #[inline]
    pub fn set(&mut self, n: usize, k: usize, value: Complex64) {
        self.data[n * self.width + k] = value;
    }

    /// Coefficients of column `k` for orders `0..rows`.
    pub fn column(&self, k: usize) -> impl Iterator<Item = Complex64> + '_ {
        (0..self.rows).map(move |n| self.get(n, k))
    }

    /// True when every entry of row `n` is finite (no NaN, no ±∞).
    pub fn row_is_finite(&self, n: usize) -> bool {
        self.row(n)
            .iter()
            .all(|v| v.re.is_finite() && v.im.is_finite())
    }
}
