use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::archive::ArchiveStore;
use crate::fetcher::{fetch_history, format_count, FetchOutcome};
use crate::gql::ModLogService;
use crate::model::UserRecord;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("integrity check failed while fetching {display_name}; stopping")]
    IntegrityCheckFailed { display_name: String },
    #[error(transparent)]
    Archive(#[from] anyhow::Error),
}

/// Counts for one pass over the user list.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub total: usize,
    pub archived: usize,
    pub skipped: usize,
    pub not_found: usize,
    pub failed: usize,
}

/// Process `users` strictly in order, one at a time. Users that already have an
/// archive are skipped without a request. Only an integrity failure stops the
/// run early; any other failure leaves that user for the next run.
#[instrument(skip_all, fields(total = users.len()))]
pub async fn run(
    api: &dyn ModLogService,
    store: &ArchiveStore,
    users: &[UserRecord],
) -> Result<RunReport, PipelineError> {
    store.ensure_dir().await?;
    let mut report = RunReport {
        total: users.len(),
        ..Default::default()
    };

    for (idx, user) in users.iter().enumerate() {
        if store.exists(&user.display_name).await? {
            info!(user = %user.display_name, "messages already fetched, skipping");
            report.skipped += 1;
        } else {
            match fetch_history(api, user).await {
                FetchOutcome::Complete(archive) => {
                    let count = archive.messages.len();
                    let path = store.write(&archive).await?;
                    if user.user_id.is_none() {
                        report.not_found += 1;
                    } else {
                        report.archived += 1;
                    }
                    if count > 0 {
                        info!(
                            user = %user.display_name,
                            path = %path.display(),
                            "chat archive saved ({} messages)",
                            format_count(count)
                        );
                    }
                }
                FetchOutcome::RemoteFailure { status, .. } => {
                    warn!(
                        user = %user.display_name,
                        status = status.map(|s| s.as_u16()),
                        "fetch failed, user left for the next run"
                    );
                    report.failed += 1;
                }
                FetchOutcome::Malformed { .. } => {
                    warn!(user = %user.display_name, "unexpected payload, user left for the next run");
                    report.failed += 1;
                }
                FetchOutcome::IntegrityFailed => {
                    return Err(PipelineError::IntegrityCheckFailed {
                        display_name: user.display_name.clone(),
                    });
                }
            }
        }

        info!("processed {}/{}", idx + 1, report.total);
    }

    info!(
        archived = report.archived,
        skipped = report.skipped,
        not_found = report.not_found,
        failed = report.failed,
        "all users processed"
    );
    Ok(report)
}
