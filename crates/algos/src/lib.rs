//! A clustered "knows" edge generator: synthesizes an undirected
//! social-network graph whose global clustering coefficient approximates an
//! operator-supplied target while each person's realized degree approximates
//! its prescribed target degree.
//!
//! The pipeline, leaves first:
//! - [`community`] — greedy partitioning of the person array into
//!   core/periphery communities.
//! - [`clustering`] — an analytic estimator for the clustering coefficient
//!   a given set of per-community edge probabilities would produce.
//! - [`refiner`] — a bounded hill-climber nudging those probabilities
//!   towards an internal set-point.
//! - [`materializer`] — three sub-passes that turn probabilities into
//!   actual `knows` edges.
//! - [`driver`] — the outer convergence loop tying the above together.

pub mod clustering;
pub mod community;
pub mod driver;
pub mod error;
pub mod graph_utils;
pub mod materializer;
pub mod person;
pub mod prelude;
pub mod refiner;
pub mod stats;

pub use driver::{ClusteredKnowsConfig, ClusteredKnowsGenerator};
pub use error::Error;
pub use person::{DefaultKnowsFactory, KnowsFactory, Person, PersonInfo};
pub use stats::Stats;
