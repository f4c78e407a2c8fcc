//! OCI image spec types, limited to what index traversal needs.

use serde::Deserialize;

/// OCI media types relevant to index traversal.
pub mod media_type {
    /// OCI image index (multi-platform "manifest list").
    pub const OCI_IMAGE_INDEX: &str = "application/vnd.oci.image.index.v1+json";

    /// OCI image manifest (single platform).
    pub const OCI_IMAGE_MANIFEST: &str = "application/vnd.oci.image.manifest.v1+json";

    /// Docker v2 manifest list.
    pub const DOCKER_MANIFEST_LIST: &str =
        "application/vnd.docker.distribution.manifest.list.v2+json";

    /// Docker v2 image manifest.
    pub const DOCKER_MANIFEST: &str = "application/vnd.docker.distribution.manifest.v2+json";
}

/// A content descriptor: what a manifest entry points at.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    #[serde(default)]
    pub media_type: String,
    pub digest: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub platform: Option<Platform>,
}

/// Target platform of a child manifest.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Platform {
    pub architecture: String,
    pub os: String,
}

/// An OCI image index: the list of per-platform child manifests
/// published under one multi-arch reference.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImageIndex {
    pub schema_version: u32,
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub manifests: Vec<Descriptor>,
}

#[cfg(test)]
mod tests {
    use super::*;

    // Index body shape as published by buildx, including an attestation
    // manifest with an unknown/unknown platform.
    const INDEX_JSON: &str = r#"{
        "mediaType": "application/vnd.oci.image.index.v1+json",
        "schemaVersion": 2,
        "manifests": [
          {
            "mediaType": "application/vnd.oci.image.manifest.v1+json",
            "digest": "sha256:c131f961d7af9055d4ff68fad06e7e24c3ce0b971a99d700bc6ba4947b12da86",
            "size": 1055,
            "platform": {
              "architecture": "amd64",
              "os": "linux"
            }
          },
          {
            "mediaType": "application/vnd.oci.image.manifest.v1+json",
            "digest": "sha256:b6e64b25771997b04f2cee5ee7a0f44886833a80d6e6e41e0c3f2696d253ee5f",
            "size": 566,
            "annotations": {
              "vnd.docker.reference.digest": "sha256:c131f961d7af9055d4ff68fad06e7e24c3ce0b971a99d700bc6ba4947b12da86",
              "vnd.docker.reference.type": "attestation-manifest"
            },
            "platform": {
              "architecture": "unknown",
              "os": "unknown"
            }
          }
        ]
    }"#;

    #[test]
    fn test_deserialize_image_index() {
        let index: ImageIndex = serde_json::from_str(INDEX_JSON).unwrap();
        assert_eq!(index.schema_version, 2);
        assert_eq!(
            index.media_type.as_deref(),
            Some(media_type::OCI_IMAGE_INDEX)
        );
        assert_eq!(index.manifests.len(), 2);
        assert_eq!(
            index.manifests[0].digest,
            "sha256:c131f961d7af9055d4ff68fad06e7e24c3ce0b971a99d700bc6ba4947b12da86"
        );
        assert_eq!(
            index.manifests[1].platform,
            Some(Platform {
                architecture: "unknown".to_string(),
                os: "unknown".to_string(),
            })
        );
    }

    #[test]
    fn test_deserialize_single_platform_manifest_as_index_fails_gracefully() {
        // A single-platform manifest body has no manifests array; it
        // still parses with an empty list rather than erroring.
        let json = r#"{
            "mediaType": "application/vnd.oci.image.manifest.v1+json",
            "schemaVersion": 2,
            "config": {
                "mediaType": "application/vnd.oci.image.config.v1+json",
                "digest": "sha256:60a4eb0188d8c3859ff2d116bdbcd30af6503afcad8e2e1a16e0c26eed1917a7",
                "size": 3499
            },
            "layers": []
        }"#;

        let index: ImageIndex = serde_json::from_str(json).unwrap();
        assert!(index.manifests.is_empty());
    }
}
