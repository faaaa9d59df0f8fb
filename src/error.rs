use std::time::Duration;

use reqwest::StatusCode;

use crate::{api::Problem, dir::Resource};

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors returned by [`Client`](crate::Client) operations.
///
/// The variants fall into three groups:
///
/// - caller misuse, detected before any network call ([`Error::is_client_error()`]);
/// - a non-success answer from the CA, body preserved ([`Error::is_server_error()`]);
/// - protocol conditions that were expected but not satisfied (challenge not offered, timeouts,
///   issuance failure).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("resource `{0}` is not listed in the ACME directory")]
    UnknownResource(Resource),

    #[error("server responded with {status}: {body}")]
    Server {
        status: StatusCode,
        /// The problem document, if the body was one.
        problem: Option<Problem>,
        body: String,
    },

    #[error("the CA does not offer an http-01 challenge for {domain}")]
    HttpChallengeNotSupported { domain: String },

    #[error("challenge for {domain} still pending after {timeout:?}")]
    ChallengeTimedOut { domain: String, timeout: Duration },

    #[error("certificate request failed with {status}: {body}")]
    CertificateRequestFailed { status: StatusCode, body: String },

    #[error("certificate request still pending after {timeout:?}: {body}")]
    CertificateRequestTimedOut { timeout: Duration, body: String },

    #[error("response from {url} is missing the {name} header")]
    MissingHeader { url: String, name: &'static str },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Base64(#[from] base64::DecodeError),

    #[error(transparent)]
    Crypto(#[from] eyre::Report),
}

impl Error {
    /// Returns true if the caller supplied an argument the protocol cannot use.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::InvalidArgument(_) | Error::UnknownResource(_))
    }

    /// Returns true if the CA answered with a non-success status.
    pub fn is_server_error(&self) -> bool {
        matches!(self, Error::Server { .. })
    }

    /// The problem document the CA sent, if any.
    pub fn problem(&self) -> Option<&Problem> {
        match self {
            Error::Server { problem, .. } => problem.as_ref(),
            _ => None,
        }
    }

    /// Returns true if the CA rejected a registration because the account key is already in use.
    pub fn is_already_registered(&self) -> bool {
        match self {
            Error::Server {
                status, problem, ..
            } => {
                *status == StatusCode::CONFLICT
                    || problem.as_ref().is_some_and(Problem::is_key_in_use)
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server_error(status: StatusCode, body: &str) -> Error {
        Error::Server {
            status,
            problem: serde_json::from_str(body).ok(),
            body: body.to_owned(),
        }
    }

    #[test]
    fn test_conflict_is_already_registered() {
        let err = server_error(
            StatusCode::CONFLICT,
            r#"{"type":"urn:acme:error:malformed","detail":"Registration key is already in use"}"#,
        );
        assert!(err.is_server_error());
        assert!(!err.is_client_error());
        assert!(err.is_already_registered());
        assert_eq!(err.problem().unwrap()._type, "urn:acme:error:malformed");
    }

    #[test]
    fn test_rate_limit_is_not_already_registered() {
        let err = server_error(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"type":"urn:acme:error:rateLimited","detail":"Too many registrations"}"#,
        );
        assert!(err.is_server_error());
        assert!(!err.is_already_registered());
    }

    #[test]
    fn test_body_preserved_when_not_a_problem() {
        let err = server_error(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>");
        assert!(err.problem().is_none());
        assert!(err.to_string().contains("<html>bad gateway</html>"));
    }

    #[test]
    fn test_client_errors() {
        assert!(Error::InvalidArgument("domain must not be empty").is_client_error());
        assert!(Error::UnknownResource(Resource::ChallengeResponse).is_client_error());
    }
}
