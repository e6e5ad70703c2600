use thiserror::Error;

/// Configuration-time failures. `generate_knows` itself never returns an
/// error: invariant violations are programmer errors surfaced through
/// `debug_assert!`, and non-convergence is surfaced through the returned
/// [`crate::stats::Stats`] instead of a `Result`.
#[derive(Error, Debug)]
pub enum Error {
    #[error("clusteringCoefficient must be within [0.0, 1.0], got {0}")]
    InvalidClusteringCoefficient(f64),
}
