//! Analytic clustering coefficient estimation.
//!
//! [`ClusteringInfo`] is a per-person, per-community statistical ledger
//! computed from the current per-community edge probability, without ever
//! materializing an edge. It backs both the refiner's hill-climb (which only
//! needs the aggregate mean) and, ultimately, the edge materializer (which
//! reuses the same periphery packing walk to decide actual edges).
//!
//! All vectors here are preallocated once, sized by the person count and the
//! community count; nothing grows after [`ClusteringInfo::new`].

use crate::community::{consume_periphery_slots, Community};

/// Per-person and per-community clustering bookkeeping for one
/// `generate_knows` invocation.
pub struct ClusteringInfo {
    is_core: Vec<bool>,
    community_id: Vec<usize>,
    degree: Vec<u64>,
    original_degree: Vec<u64>,
    expected_core_degree: Vec<f64>,
    excedence_degree: Vec<f64>,
    expected_periphery_degree: Vec<f64>,
    expected_external_degree: Vec<f64>,
    clustering_coefficient: Vec<f64>,

    community_core_stubs: Vec<f64>,
    community_core_probs: Vec<f64>,
    /// Advisory running total nudged by the refiner; never read back by the
    /// estimator itself.
    pub sum_probs: f64,
    num_communities: usize,
}

impl ClusteringInfo {
    pub fn new(person_count: usize, communities: &[Community]) -> Self {
        let num_communities = communities.len();
        let mut is_core = vec![false; person_count];
        let mut community_id = vec![usize::MAX; person_count];
        let mut degree = vec![0u64; person_count];
        let mut original_degree = vec![0u64; person_count];

        for community in communities {
            for pi in &community.core {
                is_core[pi.index] = true;
                community_id[pi.index] = community.id;
                degree[pi.index] = pi.degree;
                original_degree[pi.index] = pi.original_degree;
            }
            for pi in &community.periphery {
                community_id[pi.index] = community.id;
                degree[pi.index] = pi.degree;
                original_degree[pi.index] = pi.original_degree;
            }
        }

        Self {
            is_core,
            community_id,
            degree,
            original_degree,
            expected_core_degree: vec![0.0; person_count],
            excedence_degree: vec![0.0; person_count],
            expected_periphery_degree: vec![0.0; person_count],
            expected_external_degree: vec![0.0; person_count],
            clustering_coefficient: vec![0.0; person_count],
            community_core_stubs: vec![0.0; num_communities],
            community_core_probs: vec![0.0; num_communities],
            sum_probs: 0.0,
            num_communities,
        }
    }

    pub fn is_core(&self, index: usize) -> bool {
        self.is_core[index]
    }

    pub fn community_id(&self, index: usize) -> usize {
        self.community_id[index]
    }

    pub fn expected_periphery_degree(&self, index: usize) -> f64 {
        self.expected_periphery_degree[index]
    }

    /// Derives expected core, periphery and external degree for every
    /// member of `community`, assuming intra-core probability `p`.
    pub fn compute_community_info(&mut self, community: &Community, p: f64) {
        let core_len = community.core.len() as f64;

        for pi in &community.core {
            let expected_core = (core_len - 1.0) * p;
            self.expected_core_degree[pi.index] = expected_core;
            self.excedence_degree[pi.index] = pi.degree as f64 - expected_core;
        }

        let mut periphery_budget: Vec<f64> = community
            .periphery
            .iter()
            .map(|pi| pi.degree as f64)
            .collect();
        let mut k = 0usize;

        for pi in &community.core {
            let need = self.excedence_degree[pi.index].max(0.0);
            let taken = consume_periphery_slots(
                community.periphery.len(),
                &mut periphery_budget,
                &mut k,
                need,
                |_slot| {},
            );
            self.expected_periphery_degree[pi.index] = taken;
            self.expected_external_degree[pi.index] =
                pi.degree as f64 - self.expected_core_degree[pi.index] - taken;
        }

        let stubs: f64 = community
            .core
            .iter()
            .map(|pi| self.expected_external_degree[pi.index])
            .sum();
        self.community_core_stubs[community.id] = stubs;
        self.community_core_probs[community.id] = p;
    }

    /// Computes the analytic clustering-coefficient estimate for every
    /// member of `community` under the random-wiring model of external
    /// stubs described by the current `community_core_stubs`.
    pub fn estimate_cc_community(&mut self, community: &Community, p: f64) {
        let sum_stubs: f64 = self.community_core_stubs.iter().sum();
        let sum_stubs_sq: f64 = self.community_core_stubs.iter().map(|s| s * s).sum();
        let sum_stubs_sq_prob: f64 = self
            .community_core_stubs
            .iter()
            .zip(self.community_core_probs.iter())
            .map(|(s, prob)| s * s * prob)
            .sum();

        let own_stubs = self.community_core_stubs[community.id];
        let own_prob = self.community_core_probs[community.id];

        let other_sum = sum_stubs - own_stubs;
        let other_sum_sq = sum_stubs_sq - own_stubs * own_stubs;
        let other_sum_sq_prob = sum_stubs_sq_prob - own_stubs * own_stubs * own_prob;

        let prob_same_community = if other_sum > 0.0 {
            other_sum_sq / (other_sum * other_sum)
        } else {
            0.0
        };
        let prob_triangle_same_community = if other_sum > 0.0 {
            other_sum_sq_prob / (other_sum * other_sum)
        } else {
            0.0
        };
        let prob_two_connected = prob_two_connected_between_communities();

        for pi in &community.periphery {
            if pi.degree > 1 && pi.original_degree > 1 {
                let degree = pi.degree as f64;
                let original = pi.original_degree as f64;
                self.clustering_coefficient[pi.index] =
                    degree * (degree - 1.0) * p / (original * (original - 1.0));
            }
        }

        let mut periphery_budget: Vec<f64> = community
            .periphery
            .iter()
            .map(|pi| pi.degree as f64)
            .collect();
        let mut k = 0usize;

        for pi in &community.core {
            let need = self.excedence_degree[pi.index].max(0.0);
            let mut periphery_triangles = 0.0;
            consume_periphery_slots(
                community.periphery.len(),
                &mut periphery_budget,
                &mut k,
                need,
                |slot| {
                    let slot_degree = community.periphery[slot].degree;
                    if slot_degree > 1 {
                        periphery_triangles += 2.0 * (slot_degree - 1) as f64 * p;
                    }
                },
            );

            if pi.degree <= 1 {
                continue;
            }

            let internal_degree = self.expected_core_degree[pi.index];
            let internal_triangles = if internal_degree >= 2.0 {
                internal_degree * (internal_degree - 1.0) * p
            } else {
                0.0
            };

            let e = self.expected_external_degree[pi.index];
            let external_triangles = if e >= 2.0 {
                e * (e - 1.0) * prob_triangle_same_community
                    + e * (e - 1.0) * (1.0 - prob_same_community) * prob_two_connected
            } else {
                0.0
            };

            let original = pi.original_degree as f64;
            if original >= 2.0 {
                self.clustering_coefficient[pi.index] = (internal_triangles
                    + periphery_triangles
                    + external_triangles)
                    / (original * (original - 1.0));
            }
        }
    }

    /// Mean clustering coefficient over all tracked persons.
    ///
    /// `count_zeros = true` divides by the total person count (the variant
    /// the refiner drives towards); `false` divides only by the count of
    /// persons with a positive target degree.
    pub fn mean_clustering_coefficient(&self, count_zeros: bool) -> f64 {
        if count_zeros {
            if self.clustering_coefficient.is_empty() {
                return 0.0;
            }
            self.clustering_coefficient.iter().sum::<f64>() / self.clustering_coefficient.len() as f64
        } else {
            let mut sum = 0.0;
            let mut count = 0usize;
            for (cc, &degree) in self.clustering_coefficient.iter().zip(self.degree.iter()) {
                if degree > 0 {
                    sum += cc;
                    count += 1;
                }
            }
            if count == 0 {
                0.0
            } else {
                sum / count as f64
            }
        }
    }

    pub fn num_communities(&self) -> usize {
        self.num_communities
    }
}

/// The probability that two distinct external stubs belonging to different
/// communities end up connected by chance.
///
/// The pairwise sum this is meant to average over is guarded by a check
/// that a stub's community differs from *itself*, which is always false;
/// the guard therefore empties the sum and this is always zero. That
/// mirrors the estimator this crate's ancestor shipped, so it is kept
/// verbatim rather than "fixed" into a different clustering estimate.
fn prob_two_connected_between_communities() -> f64 {
    0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::community::partition;
    use crate::person::test_support::population;

    #[test]
    fn mean_cc_with_zeros_divides_by_full_population() {
        let persons = population(&[4, 4, 4, 4, 4]);
        let communities = partition(&persons, 0, &[]);
        let mut info = ClusteringInfo::new(persons.len(), &communities);
        for c in &communities {
            info.compute_community_info(c, 1.0);
        }
        for c in &communities {
            info.estimate_cc_community(c, 1.0);
        }

        // A single 5-clique at p=1.0 has clustering coefficient 1.0 everywhere.
        let mean = info.mean_clustering_coefficient(true);
        assert!((mean - 1.0).abs() < 1e-9, "mean was {mean}");
    }

    #[test]
    fn low_probability_clique_has_low_estimated_clustering() {
        let persons = population(&[4, 4, 4, 4, 4]);
        let communities = partition(&persons, 0, &[]);
        let mut info = ClusteringInfo::new(persons.len(), &communities);
        for c in &communities {
            info.compute_community_info(c, 0.2);
        }
        for c in &communities {
            info.estimate_cc_community(c, 0.2);
        }

        let mean = info.mean_clustering_coefficient(true);
        assert!(mean < 0.3, "mean was {mean}");
    }
}
