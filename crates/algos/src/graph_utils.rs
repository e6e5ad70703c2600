//! Helpers that bridge the generator's person array with [`graph_builder`]'s
//! CSR representation, used to measure the realized graph's clustering
//! coefficient once edges have been materialized.

use graph_builder::prelude::*;

/// Builds an undirected CSR graph from each person's realized `knows` set.
///
/// `knows` is expected to already be symmetric (every `DefaultKnowsFactory`
/// edge is inserted on both endpoints), so duplicate `(a, b)`/`(b, a)` pairs
/// are deduplicated by the builder rather than avoided at the call site.
pub fn build_knows_graph<'a>(
    knows: impl Iterator<Item = (usize, &'a std::collections::BTreeSet<usize>)>,
) -> UndirectedCsrGraph<usize> {
    let edges =
        knows.flat_map(|(from, neighbors)| neighbors.iter().map(move |&to| (from, to)));

    GraphBuilder::new()
        .csr_layout(CsrLayout::Deduplicated)
        .edges(edges)
        .build()
}

/// Standard per-node undirected local clustering coefficient: the fraction
/// of a node's neighbor pairs that are themselves connected.
///
/// Single-threaded merge-style triangle counting, mirroring the shape of
/// this crate's global triangle counter but keeping a per-node tally instead
/// of a single running total.
pub fn clustering_coefficient_list(graph: &UndirectedCsrGraph<usize>) -> Vec<f64> {
    let n = graph.node_count();
    let mut result = vec![0.0; n];

    for u in 0..n {
        let neighbors_u: &[usize] = graph.neighbors(u).as_slice();
        let degree = neighbors_u.len();
        if degree < 2 {
            continue;
        }

        let mut triangles = 0u64;
        for (i, &v) in neighbors_u.iter().enumerate() {
            let neighbors_v: &[usize] = graph.neighbors(v).as_slice();
            triangles += count_common(&neighbors_u[i + 1..], neighbors_v);
        }

        result[u] = 2.0 * triangles as f64 / (degree * (degree - 1)) as f64;
    }

    result
}

/// Counts the shared elements of two slices sorted in ascending order,
/// merge-style.
fn count_common(a: &[usize], b: &[usize]) -> u64 {
    let (mut i, mut j) = (0usize, 0usize);
    let mut count = 0u64;
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                count += 1;
                i += 1;
                j += 1;
            }
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn set(values: &[usize]) -> BTreeSet<usize> {
        values.iter().copied().collect()
    }

    #[test]
    fn triangle_has_clustering_coefficient_one() {
        let knows = vec![set(&[1, 2]), set(&[0, 2]), set(&[0, 1])];
        let graph = build_knows_graph(knows.iter().enumerate().map(|(i, s)| (i, s)));
        let cc = clustering_coefficient_list(&graph);
        assert_eq!(cc, vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn path_of_three_has_zero_clustering_at_endpoints() {
        // 0 - 1 - 2, no triangle.
        let knows = vec![set(&[1]), set(&[0, 2]), set(&[1])];
        let graph = build_knows_graph(knows.iter().enumerate().map(|(i, s)| (i, s)));
        let cc = clustering_coefficient_list(&graph);
        assert_eq!(cc, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn isolated_node_has_zero_clustering() {
        let knows = vec![set(&[]), set(&[])];
        let graph = build_knows_graph(knows.iter().enumerate().map(|(i, s)| (i, s)));
        let cc = clustering_coefficient_list(&graph);
        assert_eq!(cc, vec![0.0, 0.0]);
    }
}
