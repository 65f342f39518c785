//! Deployment run: archive, authenticate, upload, poll

use std::future::Future;
use std::pin::Pin;

use reqwest::StatusCode;
use tracing::{info, warn};

use crate::app::options::DeployOptions;
use crate::deploy::archive::{build_zip, ArchiveSummary};
use crate::deploy::poller::{poll_deployment, PollSummary};
use crate::errors::DeployError;
use crate::filesys::dir::Dir;
use crate::filesys::file::{File, ScopedFile};
use crate::http::client::KuduClient;
use crate::profile::parse_publish_profile;

/// What a successful run did
#[derive(Debug, Clone)]
pub struct DeployOutcome {
    pub archive: ArchiveSummary,
    pub upload_status: StatusCode,
    pub poll: PollSummary,
}

/// Run one deployment.
///
/// Input problems are reported before anything is written or sent. The
/// archive is removed when this returns, whatever the outcome. A shutdown
/// signal abandons the upload or the polling in flight; one that arrives
/// while archiving takes effect once the archive is written.
pub async fn run(
    options: DeployOptions,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<DeployOutcome, DeployError> {
    let source = Dir::new(&options.source_dir);
    if !source.exists().await {
        return Err(DeployError::SourceDirNotFound(options.source_dir.clone()));
    }

    let profile_xml = options.profile.load().await?;

    let archive = match &options.zip_output {
        Some(path) => File::new(path),
        None => File::create_temp("zipdeploy-", ".zip")?,
    };
    let archive = ScopedFile::new(archive);

    deploy(
        &options,
        &source,
        &profile_xml,
        archive.file(),
        Box::pin(shutdown_signal),
    )
    .await
}

async fn deploy(
    options: &DeployOptions,
    source: &Dir,
    profile_xml: &str,
    archive: &File,
    mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
) -> Result<DeployOutcome, DeployError> {
    info!(
        "Archiving {} into {}",
        source.path().display(),
        archive.path().display()
    );
    let summary = build_zip(source.path(), archive.path()).await?;
    info!(
        "Archive ready: {} files, {} bytes, sha256 {}",
        summary.entries, summary.size_bytes, summary.sha256
    );

    let profile = parse_publish_profile(profile_xml, &options.publish_method)?;
    let client = match &options.base_url {
        Some(base_url) => KuduClient::with_base_url(base_url, profile)?,
        None => KuduClient::new(profile)?,
    };

    let upload_status = tokio::select! {
        biased;
        _ = &mut shutdown_signal => {
            warn!("Shutdown requested, abandoning upload");
            return Err(DeployError::Cancelled);
        }
        result = client.upload_zip(archive) => result?,
    };
    let poll = poll_deployment(&client, &options.poller, shutdown_signal).await?;

    info!(
        "Deployment finished after {} status checks in {:?}",
        poll.polls, poll.elapsed
    );

    Ok(DeployOutcome {
        archive: summary,
        upload_status,
        poll,
    })
}
