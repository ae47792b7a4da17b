//! Strict local-extremum detection over a symmetric window.

use core_types::{Pivot, PivotKind};

/// Returns the ascending indices of local minima (or maxima) in `values`.
///
/// Index `i` qualifies as a low iff `values[i] < values[j]` for every `j` in
/// `[i - order, i + order]`, `j != i` (`>` for a high). The whole window must
/// fit inside the slice, so nothing within `order` of either end is reported.
/// Equal neighbours disqualify a candidate. An `order` of zero reports nothing.
pub fn find_pivots(values: &[f64], order: usize, kind: PivotKind) -> Vec<usize> {
    let n = values.len();
    if order == 0 || n < 2 * order + 1 {
        return Vec::new();
    }

    (order..n - order)
        .filter(|&i| {
            let candidate = values[i];
            (i - order..=i + order).filter(|&j| j != i).all(|j| match kind {
                PivotKind::Low => candidate < values[j],
                PivotKind::High => candidate > values[j],
            })
        })
        .collect()
}

/// Same as [`find_pivots`] but returns full `Pivot` records.
pub fn pivots(values: &[f64], order: usize, kind: PivotKind) -> Vec<Pivot> {
    find_pivots(values, order, kind)
        .into_iter()
        .map(|index| Pivot {
            index,
            value: values[index],
            kind,
        })
        .collect()
}
