//! OCI image registry: references, manifest types and the registry capability.

mod client;
mod reference;
mod types;

pub use client::{GhcrImages, ImageRegistry};
pub use reference::ImageReference;
pub use types::{Descriptor, ImageIndex, media_type};

#[cfg(test)]
pub use client::MockImageRegistry;
