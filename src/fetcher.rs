//! Per-user pagination loop over the moderation log.
use reqwest::StatusCode;
use tracing::{error, info, instrument, warn};

use crate::gql::model::{extract_page, integrity_failed, MessageEdge};
use crate::gql::{ApiError, ModLogService};
use crate::model::{ChatArchive, UserRecord};

/// How a single user's fetch ended. Only `Complete` is persisted; every other
/// variant leaves the user without an archive so the next run retries it.
#[derive(Debug, PartialEq)]
pub enum FetchOutcome {
    Complete(ChatArchive),
    RemoteFailure {
        status: Option<StatusCode>,
        reason: String,
    },
    Malformed {
        payload: String,
    },
    IntegrityFailed,
}

/// State carried between page requests.
#[derive(Debug, Default)]
struct FetchState {
    cursor: Option<String>,
    accumulated: Vec<MessageEdge>,
}

/// Page through every message `user` has sent. Users without an identifier
/// complete immediately with an empty archive and no request.
#[instrument(skip_all, fields(user = %user.display_name))]
pub async fn fetch_history(api: &dyn ModLogService, user: &UserRecord) -> FetchOutcome {
    let Some(user_id) = user.user_id.as_deref() else {
        info!("could not locate user on the remote side, recording empty archive");
        return FetchOutcome::Complete(ChatArchive::empty(user));
    };

    info!(user_id, "fetching messages");
    let mut state = FetchState::default();

    loop {
        let payload = match api
            .messages_by_sender(user_id, state.cursor.as_deref())
            .await
        {
            Ok(payload) => payload,
            Err(ApiError::Status { status, body }) => {
                warn!(status = status.as_u16(), "failed to fetch messages: HTTP {}", status);
                return FetchOutcome::RemoteFailure {
                    status: Some(status),
                    reason: body,
                };
            }
            Err(ApiError::Transport(err)) => {
                warn!(?err, "failed to fetch messages");
                return FetchOutcome::RemoteFailure {
                    status: None,
                    reason: err.to_string(),
                };
            }
            Err(ApiError::Decode { body, source }) => {
                error!(%source, "response was not JSON, full body:\n{}", body);
                return FetchOutcome::Malformed { payload: body };
            }
        };

        if integrity_failed(&payload) {
            error!("integrity check failed, credentials are no longer usable");
            return FetchOutcome::IntegrityFailed;
        }

        let Some(page) = extract_page(&payload) else {
            let dump = pretty(&payload);
            error!("no valid message data received, full payload:\n{}", dump);
            return FetchOutcome::Malformed { payload: dump };
        };

        if page.edges.is_empty() {
            if state.accumulated.is_empty() {
                info!("no messages found");
            }
            break;
        }

        let next_cursor = page.last_cursor().map(str::to_string);
        let has_next = page.has_next_page();
        state.accumulated.extend(page.edges);
        info!(
            "fetched {} messages so far",
            format_count(state.accumulated.len())
        );

        if !has_next {
            break;
        }
        match next_cursor {
            Some(cursor) => state.cursor = Some(cursor),
            None => {
                // Asking again without a cursor would restart at page one.
                let dump = pretty(&payload);
                error!("next page announced without a cursor, full payload:\n{}", dump);
                return FetchOutcome::Malformed { payload: dump };
            }
        }
    }

    FetchOutcome::Complete(ChatArchive::from_edges(user, &state.accumulated))
}

fn pretty(payload: &serde_json::Value) -> String {
    serde_json::to_string_pretty(payload).unwrap_or_else(|_| payload.to_string())
}

/// Decimal with comma thousands separators, e.g. `12,345`.
pub fn format_count(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
