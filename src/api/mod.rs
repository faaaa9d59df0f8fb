//! JSON API payloads.
//!
//! Not intended to be used directly. Provided to aid debugging.

use std::fmt;

use serde::{
    ser::{SerializeMap as _, Serializer},
    Deserialize, Serialize,
};

mod authorization;
mod certificate;
mod challenge;
mod identifier;
mod registration;

pub use self::{
    authorization::{Authorization, NewAuthorization},
    certificate::NewCertificate,
    challenge::{Challenge, ChallengeKind, ChallengeResponse},
    identifier::Identifier,
    registration::Registration,
};

/// Serializes to `{}`.
pub struct EmptyObject;

impl Serialize for EmptyObject {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_map(Some(0))?.end()
    }
}

/// Problem document ([RFC 7807]) returned by the CA on errors.
///
/// [RFC 7807]: https://datatracker.ietf.org/doc/html/rfc7807
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    #[serde(rename = "type")]
    pub _type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub subproblems: Option<Vec<Subproblem>>,
}

impl Problem {
    /// Returns true if problem type is "badNonce".
    pub fn is_bad_nonce(&self) -> bool {
        self.is_kind("badNonce")
    }

    /// Returns true if problem type is "malformed".
    pub fn is_malformed(&self) -> bool {
        self.is_kind("malformed")
    }

    /// Returns true if problem type is "rateLimited".
    pub fn is_rate_limited(&self) -> bool {
        self.is_kind("rateLimited")
    }

    /// Returns true if the CA complains that the account key is already registered.
    pub fn is_key_in_use(&self) -> bool {
        self.detail
            .as_deref()
            .is_some_and(|detail| detail.contains("already in use"))
    }

    // Both `urn:acme:error:<kind>` and `urn:ietf:params:acme:error:<kind>` are in the wild.
    fn is_kind(&self, kind: &str) -> bool {
        self._type
            .rsplit(':')
            .next()
            .is_some_and(|last| last == kind)
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{}: {detail}", self._type),
            _ => write!(f, "{}", self._type),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subproblem {
    #[serde(rename = "type")]
    pub _type: String,
    pub detail: Option<String>,
    pub identifier: Option<identifier::Identifier>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_empty_object() {
        let x = serde_json::to_string(&EmptyObject).unwrap();
        assert_eq!("{}", x);
    }

    #[test]
    fn test_problem_kinds() {
        let problem: Problem = serde_json::from_str(
            r#"{"type":"urn:acme:error:badNonce","detail":"JWS has invalid anti-replay nonce","status":400}"#,
        )
        .unwrap();
        assert!(problem.is_bad_nonce());
        assert!(!problem.is_malformed());
        assert_eq!(problem.status, Some(400));

        let problem: Problem =
            serde_json::from_str(r#"{"type":"urn:ietf:params:acme:error:rateLimited"}"#).unwrap();
        assert!(problem.is_rate_limited());
        assert_eq!(problem.to_string(), "urn:ietf:params:acme:error:rateLimited");
    }
}
