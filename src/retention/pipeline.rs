//! Producer/consumer pipeline: enumerate and filter package versions,
//! stream elected ones over a channel, delete them as they arrive.

use std::collections::HashMap;

use anyhow::{Result, bail};
use chrono::Utc;
use log::{debug, info};
use tokio::sync::mpsc;

use super::filter::{self, AgeVerdict};
use super::policy::RetentionPolicy;
use crate::github::{PackageRegistry, PackageVersion};
use crate::oci::{ImageRegistry, ImageReference, media_type};

/// A version the policy has decided to delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElectedVersion {
    pub package_name: String,
    pub version: String,
    pub id: i64,
}

/// A failed run: the cause plus every version already deleted (or, in
/// dry-run mode, recorded) before the failure. Deletions are not rolled
/// back.
#[derive(Debug)]
pub struct RunError {
    pub deleted: Vec<ElectedVersion>,
    pub source: anyhow::Error,
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "retention run aborted after {} deletions: {:#}",
            self.deleted.len(),
            self.source
        )
    }
}

impl std::error::Error for RunError {}

/// Drives retention across all packages of a policy.
///
/// Two units of work share a capacity-1 channel: a producer that lists,
/// filters and dereferences versions package by package, and a consumer
/// that deletes whatever the producer elects. Either side failing stops
/// the other at its next channel operation.
pub struct RetentionPipeline<P, I> {
    packages: P,
    images: I,
    policy: RetentionPolicy,
}

impl<P: PackageRegistry, I: ImageRegistry> RetentionPipeline<P, I> {
    pub fn new(packages: P, images: I, policy: RetentionPolicy) -> Self {
        Self {
            packages,
            images,
            policy,
        }
    }

    /// Runs the pipeline to completion and returns the deleted versions
    /// in the order the consumer observed them.
    ///
    /// A version reachable both by direct match and through an index
    /// reference is offered twice; deletion is idempotent per id, so no
    /// dedup happens and the version appears twice in the result.
    #[tracing::instrument(skip(self))]
    pub async fn run(&self) -> Result<Vec<ElectedVersion>, RunError> {
        let (tx, rx) = mpsc::channel(1);

        // The producer owns the sender; dropping it on return is the
        // one and only close, on success and on early error alike.
        let producer = async move {
            for package_name in &self.policy.package_names {
                self.sweep_package(package_name, &tx).await?;
            }
            Ok::<(), anyhow::Error>(())
        };

        let consumer = self.drain_deletions(rx);

        let (produced, (deleted, consumed)) = tokio::join!(producer, consumer);

        // When the consumer fails, the producer's send error is only a
        // symptom; the consumer's error is the root cause.
        match consumed.or(produced.err()) {
            None => Ok(deleted),
            Some(source) => Err(RunError { deleted, source }),
        }
    }

    /// Lists one package and streams its elected versions: first every
    /// direct match in listing order, then versions referenced by the
    /// image indexes of matched tags.
    #[tracing::instrument(skip(self, tx))]
    async fn sweep_package(
        &self,
        package_name: &str,
        tx: &mpsc::Sender<ElectedVersion>,
    ) -> Result<()> {
        let policy = &self.policy;
        let versions = self
            .packages
            .list_all_versions(&policy.organization, &policy.package_type, package_name)
            .await?;

        let mut references: Vec<String> = Vec::new();

        for version in &versions {
            info!(
                "checking package version {}:{} (id {})",
                package_name, version.name, version.id
            );

            if !filter::matches_pattern(version, policy) {
                debug!(
                    "skip package version {}:{} as it does not match the version pattern",
                    package_name, version.name
                );
                continue;
            }

            // Matched tags are resolved even when the version itself
            // turns out too new: its index children are candidates of
            // their own.
            if filter::should_walk_index(version, policy) {
                references.extend(self.collect_index_digests(package_name, version).await?);
            }

            match filter::age_verdict(version.updated_at, policy.age, Utc::now()) {
                AgeVerdict::NoTimestamp => {
                    debug!(
                        "skip package version {}:{} as no update timestamp exists",
                        package_name, version.name
                    );
                    continue;
                }
                AgeVerdict::TooNew => {
                    debug!(
                        "skip package version {}:{} as it is too new",
                        package_name, version.name
                    );
                    continue;
                }
                AgeVerdict::Elect => {}
            }

            info!(
                "package version {}:{} (id {}) elected for deletion",
                package_name, version.name, version.id
            );

            self.offer(tx, elected(package_name, version)).await?;
        }

        let by_name: HashMap<&str, &PackageVersion> =
            versions.iter().map(|v| (v.name.as_str(), v)).collect();

        for digest in &references {
            let Some(version) = by_name.get(digest.as_str()).copied() else {
                continue;
            };

            // Index membership already established relevance; only the
            // age check applies to referenced versions.
            if filter::age_verdict(version.updated_at, policy.age, Utc::now()) != AgeVerdict::Elect
            {
                continue;
            }

            info!(
                "package version {}:{} (id {}) elected for deletion as an index reference",
                package_name, version.name, version.id
            );

            self.offer(tx, elected(package_name, version)).await?;
        }

        Ok(())
    }

    /// Offers one elected version to the deletion consumer. A send
    /// failure means the consumer stopped; the producer aborts instead
    /// of enumerating work nobody will take.
    async fn offer(
        &self,
        tx: &mpsc::Sender<ElectedVersion>,
        elected: ElectedVersion,
    ) -> Result<()> {
        if tx.send(elected).await.is_err() {
            bail!("deletion consumer stopped, aborting enumeration");
        }
        Ok(())
    }

    /// Resolves the version's first tag and returns the child manifest
    /// digests of its image index, or nothing for single-platform
    /// images. All tags of a version point at the same manifest, so one
    /// probe suffices.
    async fn collect_index_digests(
        &self,
        package_name: &str,
        version: &PackageVersion,
    ) -> Result<Vec<String>> {
        let Some(tag) = version.tags().first() else {
            return Ok(Vec::new());
        };

        let reference = ImageReference::new(
            &self.policy.registry_host,
            &self.policy.organization,
            package_name,
            tag,
        );

        let descriptor = self.images.head_descriptor(&reference).await?;

        if descriptor.media_type != media_type::OCI_IMAGE_INDEX {
            return Ok(Vec::new());
        }

        let manifests = self.images.fetch_index(&reference).await?;

        Ok(manifests.into_iter().map(|m| m.digest).collect())
    }

    /// Drains the channel until the producer closes it. Returns the
    /// deletions that happened along with the error that stopped them,
    /// if any; dropping the receiver on error is what unblocks the
    /// producer.
    async fn drain_deletions(
        &self,
        mut rx: mpsc::Receiver<ElectedVersion>,
    ) -> (Vec<ElectedVersion>, Option<anyhow::Error>) {
        let mut deleted = Vec::new();

        while let Some(version) = rx.recv().await {
            info!(
                "deleting package version {}:{} (id {}, dry run: {})",
                version.package_name, version.version, version.id, self.policy.dry_run
            );

            if self.policy.dry_run {
                deleted.push(version);
                continue;
            }

            let result = self
                .packages
                .delete_version(
                    &self.policy.organization,
                    &self.policy.package_type,
                    &version.package_name,
                    version.id,
                )
                .await;

            match result {
                Ok(()) => deleted.push(version),
                Err(e) => return (deleted, Some(e)),
            }
        }

        (deleted, None)
    }
}

fn elected(package_name: &str, version: &PackageVersion) -> ElectedVersion {
    ElectedVersion {
        package_name: package_name.to_string(),
        version: version.name.clone(),
        id: version.id,
    }
}
