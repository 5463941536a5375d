pub mod artifacts;
pub mod bundle;
pub mod loader;

#[cfg(test)]
pub(crate) mod fixtures;

pub use artifacts::{ArtifactSource, FileArtifactSource, InMemorySource, RawArtifacts};
pub use bundle::{ArtifactBundle, FeatureStore};
pub use loader::ModelStore;
