//! Fixed-shape dense kernels used by the filters.
//!
//! All operations write into caller-owned buffers so the update loop never
//! allocates. Shapes are const generics: mismatched inner dimensions do not
//! compile.

use nalgebra::{RealField, SMatrix};

use crate::error::FilterError;

/// Smallest pivot magnitude accepted during Gauss-Jordan elimination.
pub const PIVOT_EPSILON: f64 = 1e-12;

/// `c = a * b`
pub fn multiply<T: RealField + Copy, const P: usize, const Q: usize, const R: usize>(
    a: &SMatrix<T, P, Q>,
    b: &SMatrix<T, Q, R>,
    c: &mut SMatrix<T, P, R>,
) {
    a.mul_to(b, c);
}

/// `at = aᵗ`
pub fn transpose<T: RealField + Copy, const P: usize, const Q: usize>(
    a: &SMatrix<T, P, Q>,
    at: &mut SMatrix<T, Q, P>,
) {
    a.transpose_to(at);
}

/// `a += b`, elementwise.
pub fn add_assign<T: RealField + Copy, const P: usize, const Q: usize>(
    a: &mut SMatrix<T, P, Q>,
    b: &SMatrix<T, P, Q>,
) {
    *a += b;
}

/// Inverts `a` into `inv` by Gauss-Jordan elimination with partial pivoting.
///
/// `work` receives the left half of the augmented `[a | I]` system and ends up
/// as the identity on success. A non-finite entry in `a` is reported as
/// `SingularMatrix`. On failure the contents of `work` and `inv` are
/// unspecified, `a` is never touched.
pub fn invert<T: RealField + Copy, const K: usize>(
    a: &SMatrix<T, K, K>,
    work: &mut SMatrix<T, K, K>,
    inv: &mut SMatrix<T, K, K>,
) -> Result<(), FilterError> {
    let epsilon: T = nalgebra::convert(PIVOT_EPSILON);
    work.copy_from(a);
    inv.fill_with_identity();

    for col in 0..K {
        let mut pivot_row = col;
        let mut pivot_mag = work[(col, col)].abs();
        for row in (col + 1)..K {
            let mag = work[(row, col)].abs();
            if mag > pivot_mag {
                pivot_row = row;
                pivot_mag = mag;
            }
        }
        // NaN pivots must fail too
        if !(pivot_mag > epsilon) {
            return Err(FilterError::SingularMatrix { column: col });
        }
        if pivot_row != col {
            work.swap_rows(col, pivot_row);
            inv.swap_rows(col, pivot_row);
        }

        let pivot = work[(col, col)];
        for j in 0..K {
            work[(col, j)] /= pivot;
            inv[(col, j)] /= pivot;
        }

        for row in 0..K {
            if row == col {
                continue;
            }
            let factor = work[(row, col)];
            if factor == T::zero() {
                continue;
            }
            for j in 0..K {
                let w = work[(col, j)];
                let v = inv[(col, j)];
                work[(row, j)] -= factor * w;
                inv[(row, j)] -= factor * v;
            }
        }
    }

    // a NaN or infinity off the pivots still poisons the result
    for col in 0..K {
        if !inv.column(col).iter().all(|v| v.is_finite()) {
            return Err(FilterError::SingularMatrix { column: col });
        }
    }
    Ok(())
}

/// Stack-allocating wrapper around [`invert`].
pub fn try_inverse<T: RealField + Copy, const K: usize>(
    a: &SMatrix<T, K, K>,
) -> Result<SMatrix<T, K, K>, FilterError> {
    let mut work = SMatrix::<T, K, K>::zeros();
    let mut inv = SMatrix::<T, K, K>::zeros();
    invert(a, &mut work, &mut inv)?;
    Ok(inv)
}

/// Largest absolute difference between `a` and its transpose.
pub fn asymmetry<T: RealField + Copy, const K: usize>(a: &SMatrix<T, K, K>) -> T {
    let mut worst = T::zero();
    for i in 0..K {
        for j in (i + 1)..K {
            let d = (a[(i, j)] - a[(j, i)]).abs();
            if d > worst {
                worst = d;
            }
        }
    }
    worst
}
