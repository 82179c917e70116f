/// Errors from the backend REST layer.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend answered with a non-2xx status.
    #[error("Backend error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body, surfaced to the operator verbatim.
        body: String,
    },

    /// A 2xx response that lacks the fields the caller needs.
    #[error("Malformed success response: {0}")]
    MalformedSuccess(String),
}

impl BackendError {
    /// Network-level failure rather than an answer from the backend.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Request(_))
    }

    /// HTTP status for `Api` errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether a mutating call may have taken effect despite this error.
    ///
    /// `false` means nothing happened: the request never left (connect or
    /// build failure) or the backend explicitly rejected it (4xx). Anything
    /// else (timeouts after sending, 5xx, malformed success) is uncertain
    /// and the operator must check before re-submitting.
    pub fn may_have_committed(&self) -> bool {
        match self {
            Self::Request(e) => !(e.is_connect() || e.is_builder()),
            Self::Api { status, .. } => *status >= 500,
            Self::MalformedSuccess(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_rejection_did_not_commit() {
        let err = BackendError::Api {
            status: 409,
            body: "out of stock".into(),
        };
        assert!(!err.may_have_committed());
        assert!(!err.is_transport());
        assert_eq!(err.status(), Some(409));
        assert_eq!(err.to_string(), "Backend error (409): out of stock");
    }

    #[test]
    fn server_error_is_uncertain() {
        let err = BackendError::Api {
            status: 502,
            body: String::new(),
        };
        assert!(err.may_have_committed());
    }

    #[test]
    fn malformed_success_is_uncertain() {
        let err = BackendError::MalformedSuccess("missing booking_id".into());
        assert!(err.may_have_committed());
        assert_eq!(err.status(), None);
    }
}
