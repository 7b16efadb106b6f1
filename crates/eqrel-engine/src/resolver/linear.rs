//! Gaussian elimination over linear equalities.

use std::collections::BTreeMap;

use eqrel_core::expr::Linear;
use eqrel_core::VarId;

/// Result of eliminating a linear system.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum LinearOutcome {
    /// The equalities contradict each other.
    Inconsistent,
    /// Variables pinned by the system; may be empty when underdetermined.
    Solved(Vec<(VarId, f64)>),
}

/// Reduces `sum(coeffs * v) + constant == 0` rows to reduced row echelon
/// form and reads off every variable that ends up alone in its row.
pub(crate) fn eliminate(equations: &[Linear], tolerance: f64) -> LinearOutcome {
    let (columns, rows) = reduce(equations, tolerance);
    let width = columns.len();

    let mut solved = Vec::new();
    for row in &rows {
        let mut nonzero = row[..width]
            .iter()
            .enumerate()
            .filter(|(_, c)| c.abs() > tolerance);
        match (nonzero.next(), nonzero.next()) {
            (None, _) => {
                if row[width].abs() > tolerance {
                    return LinearOutcome::Inconsistent;
                }
            }
            (Some((col, c)), None) => solved.push((columns[col], row[width] / c)),
            _ => {}
        }
    }
    LinearOutcome::Solved(solved)
}

/// Expresses every pivot variable of the reduced system as an affine form
/// over the free variables. Returns `None` if the system is inconsistent.
///
/// Columns are ordered by id, so lower ids become pivots first.
pub(crate) fn pivot_forms(
    equations: &[Linear],
    tolerance: f64,
) -> Option<BTreeMap<VarId, Linear>> {
    let (columns, rows) = reduce(equations, tolerance);
    let width = columns.len();

    let mut forms = BTreeMap::new();
    for row in &rows {
        let Some(pivot) = row[..width].iter().position(|c| c.abs() > tolerance) else {
            if row[width].abs() > tolerance {
                return None;
            }
            continue;
        };
        let lead = row[pivot];
        let coeffs = row[pivot + 1..width]
            .iter()
            .enumerate()
            .filter(|(_, c)| c.abs() > tolerance)
            .map(|(offset, c)| (columns[pivot + 1 + offset], -c / lead))
            .collect();
        forms.insert(
            columns[pivot],
            Linear {
                coeffs,
                constant: row[width] / lead,
            },
        );
    }
    Some(forms)
}

/// Rewrites `linear` with every pivot variable replaced by its form.
pub(crate) fn substitute(linear: &Linear, forms: &BTreeMap<VarId, Linear>) -> Linear {
    let mut out = Linear {
        coeffs: BTreeMap::new(),
        constant: linear.constant,
    };
    for (var, c) in &linear.coeffs {
        match forms.get(var) {
            Some(form) => {
                out.constant += c * form.constant;
                for (free, fc) in &form.coeffs {
                    *out.coeffs.entry(*free).or_insert(0.0) += c * fc;
                }
            }
            None => *out.coeffs.entry(*var).or_insert(0.0) += c,
        }
    }
    out.coeffs.retain(|_, c| c.abs() > PRUNE_EPSILON);
    out
}

/// Coefficients smaller than this are treated as cancelled after
/// substitution.
const PRUNE_EPSILON: f64 = 1e-12;

/// Reduced row echelon form of the augmented matrix, with its columns.
fn reduce(equations: &[Linear], tolerance: f64) -> (Vec<VarId>, Vec<Vec<f64>>) {
    let columns: Vec<VarId> = {
        let mut seen = BTreeMap::new();
        for eq in equations {
            for var in eq.coeffs.keys() {
                seen.insert(*var, ());
            }
        }
        seen.into_keys().collect()
    };
    let width = columns.len();
    let index: BTreeMap<VarId, usize> = columns.iter().enumerate().map(|(i, v)| (*v, i)).collect();

    // Augmented matrix; the last column holds the right-hand side.
    let mut rows: Vec<Vec<f64>> = equations
        .iter()
        .map(|eq| {
            let mut row = vec![0.0; width + 1];
            for (var, c) in &eq.coeffs {
                row[index[var]] = *c;
            }
            row[width] = -eq.constant;
            row
        })
        .collect();

    let mut pivot_row = 0;
    for col in 0..width {
        if pivot_row == rows.len() {
            break;
        }
        let Some(best) = (pivot_row..rows.len()).max_by(|a, b| {
            rows[*a][col].abs().total_cmp(&rows[*b][col].abs())
        }) else {
            break;
        };
        if rows[best][col].abs() <= tolerance {
            continue;
        }
        rows.swap(pivot_row, best);

        let pivot = rows[pivot_row][col];
        for value in rows[pivot_row].iter_mut() {
            *value /= pivot;
        }
        for r in 0..rows.len() {
            if r == pivot_row {
                continue;
            }
            let factor = rows[r][col];
            if factor.abs() <= tolerance {
                rows[r][col] = 0.0;
                continue;
            }
            let pivot_values = rows[pivot_row].clone();
            for (value, p) in rows[r].iter_mut().zip(pivot_values) {
                *value -= factor * p;
            }
            rows[r][col] = 0.0;
        }
        pivot_row += 1;
    }
    (columns, rows)
}
