use super::session::IngestSession;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Elapsed seconds at which the first graduated warning fires (55 minutes).
pub const WARNING_THRESHOLD_SECS: i64 = 55 * 60;

/// Elapsed seconds at which the critical warning fires (58 minutes).
pub const CRITICAL_THRESHOLD_SECS: i64 = 58 * 60;

/// Hard session cap in seconds (60 minutes). Chunks are blocked past this.
pub const SESSION_CAP_SECS: i64 = 60 * 60;

/// Graduated warning kinds, ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningKind {
    Warning,
    Critical,
}

/// A one-shot warning fired by a `warning`/`critical` transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionWarning {
    pub kind: WarningKind,
    pub message: String,
}

/// Result of a time-limit check against the hard session cap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeLimitStatus {
    pub elapsed_secs: i64,
    pub remaining_secs: i64,

    /// Current warning level (independent of whether its message already fired)
    pub warning_level: Option<WarningKind>,

    /// Newly fired warning, at most once per kind per session
    pub warning: Option<SessionWarning>,

    pub is_expired: bool,

    /// Once expired, no further chunks are accepted
    pub blocked: bool,
}

/// Current warning level for a given elapsed time, without side effects.
pub fn current_level(elapsed_secs: i64) -> Option<WarningKind> {
    if elapsed_secs >= CRITICAL_THRESHOLD_SECS {
        Some(WarningKind::Critical)
    } else if elapsed_secs >= WARNING_THRESHOLD_SECS {
        Some(WarningKind::Warning)
    } else {
        None
    }
}

/// Check elapsed time against the session cap and fire graduated warnings.
///
/// State machine over elapsed time: none -> warning (>=55min) -> critical
/// (>=58min) -> expired (>=60min). Each warning fires exactly once per
/// session, tracked in the session's own `warned` set, so repeated chunk
/// submissions do not flood the caller.
pub fn check_time_limit(session: &mut IngestSession, now: DateTime<Utc>) -> TimeLimitStatus {
    let elapsed_secs = now.signed_duration_since(session.session_start).num_seconds();
    let remaining_secs = (SESSION_CAP_SECS - elapsed_secs).max(0);
    let is_expired = elapsed_secs >= SESSION_CAP_SECS;
    let warning_level = current_level(elapsed_secs);

    let warning = match warning_level {
        Some(kind) if !is_expired && session.warned.insert(kind) => Some(SessionWarning {
            kind,
            message: warning_message(kind, remaining_secs),
        }),
        _ => None,
    };

    TimeLimitStatus {
        elapsed_secs,
        remaining_secs,
        warning_level,
        warning,
        is_expired,
        blocked: is_expired,
    }
}

fn warning_message(kind: WarningKind, remaining_secs: i64) -> String {
    let remaining_mins = (remaining_secs + 59) / 60;
    match kind {
        WarningKind::Warning => format!(
            "{} minutes remaining in this interview session",
            remaining_mins
        ),
        WarningKind::Critical => format!(
            "Interview session ends in {} minutes, please wrap up",
            remaining_mins
        ),
    }
}
