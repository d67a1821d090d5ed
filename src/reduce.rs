//! Rank-2 truncated SVD over a sparse term matrix.
//!
//! Subspace iteration on the implicit operator `XᵀX` with a small
//! oversampled block, a Rayleigh-Ritz step after every iteration, and a
//! fixed starting block so results are reproducible run to run.

use crate::vectorize::SparseMatrix;

pub const COMPONENTS: usize = 2;
const OVERSAMPLE: usize = 4;
const DEFAULT_MAX_ITERATIONS: usize = 500;
const DEFAULT_SEED: u64 = 0x5EED_2D2D;
const CONVERGENCE_TOLERANCE: f64 = 1e-12;
const RANK_TOLERANCE: f64 = 1e-9;

/// One `[x, y]` row per input document, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    points: Vec<[f64; COMPONENTS]>,
    singular_values: [f64; COMPONENTS],
}

impl Projection {
    pub fn rows(&self) -> usize {
        self.points.len()
    }

    pub fn point(&self, index: usize) -> [f64; COMPONENTS] {
        self.points[index]
    }

    pub fn points(&self) -> &[[f64; COMPONENTS]] {
        &self.points
    }

    /// Zero for components that were padded.
    pub fn singular_values(&self) -> [f64; COMPONENTS] {
        self.singular_values
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TruncatedSvd {
    seed: u64,
    max_iterations: usize,
}

impl Default for TruncatedSvd {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl TruncatedSvd {
    pub fn new(seed: u64, max_iterations: usize) -> Self {
        Self {
            seed,
            max_iterations,
        }
    }

    /// Returns `U·Σ` for the two leading components. Components the matrix
    /// does not have (rank below two, fewer than two terms) are zero columns.
    pub fn fit_transform(&self, matrix: &SparseMatrix) -> Projection {
        let rows = matrix.rows();
        let mut projection = Projection {
            points: vec![[0.0; COMPONENTS]; rows],
            singular_values: [0.0; COMPONENTS],
        };
        let block = (COMPONENTS + OVERSAMPLE).min(matrix.cols());
        if rows == 0 || block == 0 {
            return projection;
        }

        let mut basis = starting_block(self.seed, block, matrix.cols());
        orthonormalize(&mut basis);
        let mut ritz = vec![0.0; block];
        for _ in 0..self.max_iterations {
            let mut next: Vec<Vec<f64>> = basis
                .iter()
                .map(|v| matrix.transpose_mul_vec(&matrix.mul_vec(v)))
                .collect();
            orthonormalize(&mut next);
            let (values, rotated) = rayleigh_ritz(matrix, &next);
            let scale = values[0].max(f64::MIN_POSITIVE);
            let converged = values
                .iter()
                .zip(&ritz)
                .take(COMPONENTS)
                .all(|(new, old)| (new - old).abs() <= CONVERGENCE_TOLERANCE * scale);
            basis = rotated;
            ritz = values;
            if converged {
                break;
            }
        }

        let leading = ritz[0].max(0.0).sqrt();
        for component in 0..COMPONENTS.min(block) {
            let singular = ritz[component].max(0.0).sqrt();
            if singular == 0.0 || singular <= RANK_TOLERANCE * leading {
                continue;
            }
            let mut column = matrix.mul_vec(&basis[component]);
            flip_sign(&mut column);
            for (point, value) in projection.points.iter_mut().zip(column) {
                point[component] = value;
            }
            projection.singular_values[component] = singular;
        }
        projection
    }
}

fn starting_block(seed: u64, block: usize, len: usize) -> Vec<Vec<f64>> {
    let mut state = seed;
    (0..block)
        .map(|_| (0..len).map(|_| splitmix_unit(&mut state)).collect())
        .collect()
}

/// Uniform in `[-1, 1)`.
fn splitmix_unit(state: &mut u64) -> f64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^= z >> 31;
    (z >> 11) as f64 / (1u64 << 53) as f64 * 2.0 - 1.0
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Modified Gram-Schmidt, applied twice. Columns that collapse are zeroed.
fn orthonormalize(columns: &mut [Vec<f64>]) {
    for idx in 0..columns.len() {
        let original = dot(&columns[idx], &columns[idx]).sqrt();
        for _ in 0..2 {
            for prev in 0..idx {
                let (done, rest) = columns.split_at_mut(idx);
                let coeff = dot(&done[prev], &rest[0]);
                for (value, basis) in rest[0].iter_mut().zip(&done[prev]) {
                    *value -= coeff * basis;
                }
            }
        }
        let column = &mut columns[idx];
        let norm = dot(column, column).sqrt();
        if norm == 0.0 || norm <= 1e-12 * original {
            column.iter_mut().for_each(|value| *value = 0.0);
        } else {
            column.iter_mut().for_each(|value| *value /= norm);
        }
    }
}

/// Rotates `basis` onto the eigenvectors of `(XB)ᵀ(XB)`, largest first.
fn rayleigh_ritz(matrix: &SparseMatrix, basis: &[Vec<f64>]) -> (Vec<f64>, Vec<Vec<f64>>) {
    let images: Vec<Vec<f64>> = basis.iter().map(|v| matrix.mul_vec(v)).collect();
    let size = basis.len();
    let mut gram = vec![vec![0.0; size]; size];
    for i in 0..size {
        for j in i..size {
            let value = dot(&images[i], &images[j]);
            gram[i][j] = value;
            gram[j][i] = value;
        }
    }
    let (values, vectors) = symmetric_eigen(gram);

    let mut order: Vec<usize> = (0..size).collect();
    order.sort_by(|&a, &b| values[b].total_cmp(&values[a]));

    let len = basis.first().map(Vec::len).unwrap_or(0);
    let rotated = order
        .iter()
        .map(|&k| {
            let mut column = vec![0.0; len];
            for (j, v) in basis.iter().enumerate() {
                let weight = vectors[j][k];
                for (out, value) in column.iter_mut().zip(v) {
                    *out += weight * value;
                }
            }
            column
        })
        .collect();
    (order.iter().map(|&k| values[k]).collect(), rotated)
}

/// Cyclic Jacobi. Returns eigenvalues and the eigenvector matrix (column `k`
/// belongs to eigenvalue `k`).
fn symmetric_eigen(mut a: Vec<Vec<f64>>) -> (Vec<f64>, Vec<Vec<f64>>) {
    let n = a.len();
    let mut v: Vec<Vec<f64>> = (0..n)
        .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect();
    let total: f64 = a.iter().flatten().map(|value| value * value).sum();

    for _ in 0..100 {
        let mut off = 0.0;
        for p in 0..n {
            for q in (p + 1)..n {
                off += a[p][q] * a[p][q];
            }
        }
        if off <= 1e-30 * total.max(f64::MIN_POSITIVE) {
            break;
        }
        for p in 0..n {
            for q in (p + 1)..n {
                if a[p][q] == 0.0 {
                    continue;
                }
                let theta = (a[q][q] - a[p][p]) / (2.0 * a[p][q]);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;
                for k in 0..n {
                    let (akp, akq) = (a[k][p], a[k][q]);
                    a[k][p] = c * akp - s * akq;
                    a[k][q] = s * akp + c * akq;
                }
                for k in 0..n {
                    let (apk, aqk) = (a[p][k], a[q][k]);
                    a[p][k] = c * apk - s * aqk;
                    a[q][k] = s * apk + c * aqk;
                }
                for row in v.iter_mut() {
                    let (vkp, vkq) = (row[p], row[q]);
                    row[p] = c * vkp - s * vkq;
                    row[q] = s * vkp + c * vkq;
                }
            }
        }
    }
    ((0..n).map(|i| a[i][i]).collect(), v)
}

/// Makes the largest-magnitude entry positive.
fn flip_sign(column: &mut [f64]) {
    let pivot = column
        .iter()
        .copied()
        .max_by(|a, b| a.abs().total_cmp(&b.abs()))
        .unwrap_or(0.0);
    if pivot < 0.0 {
        column.iter_mut().for_each(|value| *value = -*value);
    }
}
