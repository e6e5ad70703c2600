//! Bounded hill-climbing refinement of per-community edge probabilities.

use nanorand::{Rng, WyRand};

use crate::clustering::ClusteringInfo;
use crate::community::Community;

/// Convergence tolerance on the estimated clustering coefficient.
pub const CC_TOLERANCE: f64 = 0.001;

/// Failed-attempt budget before the refiner gives up on a target.
const MAX_TRIES: usize = 5;

/// A community's `p` never drops below this, keeping every intra-core pair
/// at least nominally reachable.
pub const MIN_COMMUNITY_PROB: f64 = 0.05;

/// The step a single refinement move applies to a community's probability.
fn step(core_size: usize) -> f64 {
    3.0 / core_size.max(1) as f64
}

/// Nudges per-community probabilities up or down, one community at a time,
/// until the estimated mean clustering coefficient is within
/// [`CC_TOLERANCE`] of `fake_target` or [`MAX_TRIES`] consecutive moves fail
/// to find an eligible community.
///
/// Returns the final estimated clustering coefficient. Failure to reach the
/// target within the tolerance is not an error: the caller reads the
/// returned value and decides whether to keep iterating.
pub fn refine(
    rng: &mut WyRand,
    cinfo: &mut ClusteringInfo,
    communities: &mut [Community],
    fake_target: f64,
) -> f64 {
    let mut current_cc = cinfo.mean_clustering_coefficient(true);
    let mut tries = 0usize;

    while (current_cc - fake_target).abs() > CC_TOLERANCE && tries <= MAX_TRIES {
        let moved = if current_cc < fake_target {
            raise_random_community(rng, cinfo, communities)
        } else {
            lower_random_community(rng, cinfo, communities)
        };

        match moved {
            Some(()) => {
                current_cc = cinfo.mean_clustering_coefficient(true);
                tries = 0;
            }
            None => tries += 1,
        }
    }

    current_cc
}

fn raise_random_community(
    rng: &mut WyRand,
    cinfo: &mut ClusteringInfo,
    communities: &mut [Community],
) -> Option<()> {
    let candidates: Vec<usize> = communities
        .iter()
        .enumerate()
        .filter(|(_, c)| c.p < 1.0)
        .map(|(i, _)| i)
        .collect();
    if candidates.is_empty() {
        return None;
    }

    let idx = candidates[rng.generate_range(0..candidates.len())];
    let community = &mut communities[idx];
    community.p = (community.p + step(community.core_size())).min(1.0);
    cinfo.estimate_cc_community(community, community.p);
    cinfo.sum_probs += 0.01;
    Some(())
}

fn lower_random_community(
    rng: &mut WyRand,
    cinfo: &mut ClusteringInfo,
    communities: &mut [Community],
) -> Option<()> {
    let candidates: Vec<usize> = communities
        .iter()
        .enumerate()
        .filter(|(_, c)| c.p > MIN_COMMUNITY_PROB)
        .map(|(i, _)| i)
        .collect();
    if candidates.is_empty() {
        return None;
    }

    let idx = candidates[rng.generate_range(0..candidates.len())];
    let community = &mut communities[idx];
    community.p = (community.p - step(community.core_size())).max(MIN_COMMUNITY_PROB);
    cinfo.estimate_cc_community(community, community.p);
    cinfo.sum_probs -= 0.01;
    Some(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::community::partition;
    use crate::person::test_support::population;

    #[test]
    fn raising_target_increases_probabilities() {
        let persons = population(&[4, 4, 4, 4, 4]);
        let mut communities = partition(&persons, 0, &[]);
        let mut cinfo = ClusteringInfo::new(persons.len(), &communities);
        for c in &communities {
            cinfo.compute_community_info(c, 0.5);
        }
        for c in &communities {
            cinfo.estimate_cc_community(c, 0.5);
        }

        let mut rng = WyRand::new_seed(42);
        let final_cc = refine(&mut rng, &mut cinfo, &mut communities, 0.9);

        assert!(communities[0].p > 0.5);
        assert!(final_cc >= 0.0);
    }

    #[test]
    fn lowering_target_to_zero_saturates_at_minimum() {
        let persons = population(&[4, 4, 4, 4, 4]);
        let mut communities = partition(&persons, 0, &[]);
        let mut cinfo = ClusteringInfo::new(persons.len(), &communities);
        for c in &communities {
            cinfo.compute_community_info(c, 0.5);
        }
        for c in &communities {
            cinfo.estimate_cc_community(c, 0.5);
        }

        let mut rng = WyRand::new_seed(7);
        refine(&mut rng, &mut cinfo, &mut communities, 0.0);

        assert!((communities[0].p - MIN_COMMUNITY_PROB).abs() < 1e-9);
    }

    #[test]
    fn single_community_without_eligible_move_stops_without_panicking() {
        // A single person: core of size 1, p already saturated at 1.0, and the
        // only community has no room to rise further towards an unreachable target.
        let persons = population(&[0]);
        let mut communities = partition(&persons, 0, &[]);
        let mut cinfo = ClusteringInfo::new(persons.len(), &communities);
        for c in &communities {
            cinfo.compute_community_info(c, 1.0);
        }
        for c in &communities {
            cinfo.estimate_cc_community(c, 1.0);
        }

        let mut rng = WyRand::new_seed(1);
        let final_cc = refine(&mut rng, &mut cinfo, &mut communities, 5.0);
        assert_eq!(final_cc, 0.0);
    }
}
