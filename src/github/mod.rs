//! GitHub packages API: wire types and the registry capability.

mod packages;
mod types;

pub use packages::{GitHubPackages, PackageRegistry};
pub use types::{ContainerMetadata, PackageMetadata, PackageVersion};

#[cfg(test)]
pub use packages::MockPackageRegistry;
