//! User-facing notices derived from load and mutation failures.

use crate::error::LoadError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeCategory {
    Auth,
    Transport,
    Validation,
    Unknown,
}

/// A dismissible message for the page, tagged with where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    category: NoticeCategory,
    source: String,
    message: String,
}

impl Notice {
    /// Aborted and unmounted loads never produce a notice.
    pub fn from_error(source: impl Into<String>, err: &LoadError) -> Option<Self> {
        let category = match err {
            LoadError::Aborted { .. } | LoadError::Unmounted => return None,
            LoadError::Validation { .. } => NoticeCategory::Validation,
            LoadError::Network { status, .. } => classify(*status),
            LoadError::DuplicateStage(_) | LoadError::UnknownStage(_) => NoticeCategory::Unknown,
        };
        Some(Self {
            category,
            source: source.into(),
            message: err.to_string(),
        })
    }

    pub fn requires_reauth(&self) -> bool {
        self.category == NoticeCategory::Auth
    }

    pub fn category(&self) -> NoticeCategory {
        self.category
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Failures without an auth or rejected-input status are transport notices.
fn classify(status: Option<u16>) -> NoticeCategory {
    match status {
        Some(401 | 403) => NoticeCategory::Auth,
        Some(400 | 422) => NoticeCategory::Validation,
        _ => NoticeCategory::Transport,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn network(cause: &str, status: Option<u16>) -> LoadError {
        LoadError::Network {
            cause: cause.to_string(),
            status,
        }
    }

    #[test]
    fn aborted_requests_stay_silent() {
        let err = LoadError::Aborted {
            stage: "list".into(),
        };
        assert_eq!(Notice::from_error("list", &err), None);
        assert_eq!(Notice::from_error("list", &LoadError::Unmounted), None);
    }

    #[test]
    fn classifies_by_http_status() {
        let expired = network("401 Unauthorized: token expired", Some(401));
        let auth = Notice::from_error("list", &expired).expect("notice");
        assert_eq!(auth.category(), NoticeCategory::Auth);
        assert!(auth.requires_reauth());

        let bad_input = network("422 Validation: quantity must be positive", Some(422));
        let rejected = Notice::from_error("update", &bad_input).expect("notice");
        assert_eq!(rejected.category(), NoticeCategory::Validation);

        let server = Notice::from_error("list", &network("502 Bad Gateway", Some(502)))
            .expect("notice");
        assert_eq!(server.category(), NoticeCategory::Transport);
    }

    #[test]
    fn status_like_text_in_the_message_is_ignored() {
        let refused = network(
            "error sending request for url (http://127.0.0.1:9/api/decomposition/plans/401): \
             connection refused",
            None,
        );
        let notice = Notice::from_error("modalDetail", &refused).expect("notice");
        assert_eq!(notice.category(), NoticeCategory::Transport);
        assert!(!notice.requires_reauth());

        let timeout = Notice::from_error("enums", &network("operation timed out", None))
            .expect("notice");
        assert_eq!(timeout.category(), NoticeCategory::Transport);
        assert_eq!(timeout.source(), "enums");
    }

    #[test]
    fn validation_errors_keep_field_message() {
        let err = LoadError::validation("operator", "operator is required");
        let notice = Notice::from_error("create", &err).expect("notice");
        assert_eq!(notice.category(), NoticeCategory::Validation);
        assert_eq!(notice.message(), "operator: operator is required");
    }
}
