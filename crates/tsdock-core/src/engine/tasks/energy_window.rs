/// Energies relative to the lowest one present, in the same units.
pub fn relative_energies(energies: &[Option<f64>]) -> Vec<Option<f64>> {
    let lowest = energies
        .iter()
        .flatten()
        .copied()
        .filter(|e| e.is_finite())
        .min_by(f64::total_cmp);
    energies
        .iter()
        .map(|energy| match (energy, lowest) {
            (Some(e), Some(min)) if e.is_finite() => Some(e - min),
            _ => None,
        })
        .collect()
}

/// Which entries lie within `window_kcal` of the lowest energy.
///
/// Entries without an energy (unrefined structures) are kept; a non-finite
/// energy never qualifies.
pub fn within_window(energies: &[Option<f64>], window_kcal: f64) -> Vec<bool> {
    energies
        .iter()
        .zip(relative_energies(energies))
        .map(|(energy, relative)| match (energy, relative) {
            (None, _) => true,
            (Some(_), Some(relative)) => relative <= window_kcal,
            (Some(_), None) => false,
        })
        .collect()
}
