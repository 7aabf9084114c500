use rand::{Rng, seq::index};

/// Amount of elements kept when taking `fraction` of `total`, never less than one.
fn portion(total: usize, fraction: f64) -> usize {
    let kept = (fraction * total as f64).floor() as usize;
    kept.clamp(1, total.max(1))
}

/// Samples the clients that take part in a round.
///
/// # Arguments
/// * `rng` - The server's random number generator.
/// * `num_clients` - The size of the federation.
/// * `frac` - The fraction of clients to select.
///
/// # Returns
/// `max(1, floor(frac * num_clients))` distinct client ids in ascending order.
pub fn select_clients<R: Rng + ?Sized>(rng: &mut R, num_clients: usize, frac: f64) -> Vec<usize> {
    if num_clients == 0 {
        return Vec::new();
    }

    let amount = portion(num_clients, frac);
    let mut selected = index::sample(rng, num_clients, amount).into_vec();
    selected.sort_unstable();
    selected
}

/// Simulates clients failing to report back, excluding a random part of the selected ones.
///
/// # Arguments
/// * `rng` - The server's random number generator.
/// * `selected` - The client ids selected for the round.
/// * `drop_rate` - The fraction of selected clients to drop.
///
/// # Returns
/// `max(1, floor((1 - drop_rate) * selected))` of the selected ids in ascending order.
pub fn drop_stragglers<R: Rng + ?Sized>(
    rng: &mut R,
    selected: &[usize],
    drop_rate: f64,
) -> Vec<usize> {
    if selected.is_empty() {
        return Vec::new();
    }

    let amount = portion(selected.len(), 1.0 - drop_rate);
    let mut active: Vec<_> = index::sample(rng, selected.len(), amount)
        .into_iter()
        .map(|i| selected[i])
        .collect();

    active.sort_unstable();
    active
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn selection_never_empties_the_round() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(select_clients(&mut rng, 1, 0.01), [0]);
        assert_eq!(select_clients(&mut rng, 50, 0.001).len(), 1);
    }

    #[test]
    fn selection_is_sorted_and_distinct() {
        let mut rng = StdRng::seed_from_u64(5);
        let selected = select_clients(&mut rng, 10, 0.9);

        assert_eq!(selected.len(), 9);
        assert!(selected.windows(2).all(|w| w[0] < w[1]));
        assert!(selected.iter().all(|&id| id < 10));
    }

    #[test]
    fn full_participation_selects_everyone() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(select_clients(&mut rng, 4, 1.0), [0, 1, 2, 3]);
    }

    #[test]
    fn dropout_keeps_at_least_one() {
        let mut rng = StdRng::seed_from_u64(2);
        assert_eq!(drop_stragglers(&mut rng, &[7], 0.9).len(), 1);
        assert_eq!(drop_stragglers(&mut rng, &[1, 4, 6], 1.0).len(), 1);
    }

    #[test]
    fn dropout_returns_a_sorted_subset() {
        let mut rng = StdRng::seed_from_u64(3);
        let selected = [0, 2, 3, 5, 8, 9, 11, 12, 13, 20];
        let active = drop_stragglers(&mut rng, &selected, 0.1);

        assert_eq!(active.len(), 9);
        assert!(active.windows(2).all(|w| w[0] < w[1]));
        assert!(active.iter().all(|id| selected.contains(id)));
    }

    #[test]
    fn no_dropout_keeps_everyone() {
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(drop_stragglers(&mut rng, &[1, 2, 3], 0.0), [1, 2, 3]);
    }

    #[test]
    fn same_seed_same_choice() {
        let pick = || {
            let mut rng = StdRng::seed_from_u64(11);
            let selected = select_clients(&mut rng, 20, 0.5);
            let active = drop_stragglers(&mut rng, &selected, 0.3);
            (selected, active)
        };
        assert_eq!(pick(), pick());
    }
}
