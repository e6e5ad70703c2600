pub use graph_builder::prelude::*;

pub use crate::clustering::ClusteringInfo;
pub use crate::community::{Community, partition};
pub use crate::driver::{ClusteredKnowsConfig, ClusteredKnowsGenerator};
pub use crate::error::Error;
pub use crate::person::{DefaultKnowsFactory, KnowsFactory, Person, PersonInfo};
pub use crate::stats::Stats;
