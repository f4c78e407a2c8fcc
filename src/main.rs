use anyhow::Result;
use clap::Parser;
use ghprune::config::Config;
use ghprune::retention::{RetentionPipeline, RetentionPolicy};
use log::warn;
use std::time::Duration;

/// ghprune - GitHub Package Retention
///
/// Delete organization package versions that exceed an age threshold
/// and/or match a version pattern. For container packages the pattern
/// runs against tags, and versions referenced by a matched multi-arch
/// image index are swept together with their parent.
///
/// If the GITHUB_TOKEN environment variable is set, it will be used for
/// authentication against the packages API and the container registry.
///
/// Examples:
///   ghprune --org-name my-org --package-type container --age 30d my-image
#[derive(Parser, Debug)]
#[command(author, version = env!("GHPRUNE_VERSION"), about)]
struct Cli {
    /// One or more package names (also via a comma-separated PACKAGES)
    #[arg(
        value_name = "PACKAGE",
        env = "PACKAGES",
        value_delimiter = ',',
        required = true
    )]
    package_names: Vec<String>,

    /// GitHub organization name which is the package owner
    #[arg(long = "org-name", env = "GHPRUNE_ORG_NAME", value_name = "NAME")]
    org_name: String,

    /// Type of package (container, maven, ...)
    #[arg(long = "package-type", value_name = "TYPE")]
    package_type: String,

    /// Max age of a package version. Package versions older than the
    /// specified age will be removed (as long as version-match matches
    /// the version).
    #[arg(
        long,
        value_parser = humantime::parse_duration,
        default_value = "0s",
        value_name = "DURATION"
    )]
    age: Duration,

    /// Regular expression a version name (or container tag) must match
    #[arg(long = "version-match", value_name = "REGEX")]
    version_match: Option<String>,

    /// Only report what would be deleted
    #[arg(long = "dry-run")]
    dry_run: bool,

    /// GitHub token (by default GITHUB_TOKEN will be used)
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true, value_name = "TOKEN")]
    token: Option<String>,

    /// GitHub API URL (defaults to https://api.github.com)
    #[arg(long = "api-url", value_name = "URL")]
    api_url: Option<String>,

    /// Container registry URL (defaults to https://ghcr.io)
    #[arg(long = "registry-url", value_name = "URL")]
    registry_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut policy = RetentionPolicy::new(
        &cli.org_name,
        &cli.package_type,
        cli.package_names,
        cli.age,
        cli.version_match.as_deref(),
        cli.dry_run,
    )?;

    if let Some(registry_url) = &cli.registry_url {
        let host = registry_url
            .trim_start_matches("https://")
            .trim_start_matches("http://");
        policy = policy.with_registry_host(host);
    }

    let config = Config::new(cli.token, cli.api_url, cli.registry_url)?;
    let pipeline = RetentionPipeline::new(config.packages, config.images, policy);

    let deleted = match pipeline.run().await {
        Ok(deleted) => deleted,
        Err(err) => {
            for version in &err.deleted {
                warn!(
                    "deleted before the failure: {}:{} (id {})",
                    version.package_name, version.version, version.id
                );
            }
            return Err(err.into());
        }
    };

    // Comma-joined version names, consumable as a pipeline output value.
    let names: Vec<&str> = deleted.iter().map(|v| v.version.as_str()).collect();
    println!("{}", names.join(","));

    Ok(())
}
