use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{api, dir::Resource};

/// The kind of proof a challenge asks for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ChallengeKind {
    /// `http-01`: a file served under `/.well-known/acme-challenge/<token>`.
    Http01,

    /// `dns-01`: a `TXT` record under `_acme-challenge.<domain>`.
    Dns01,

    /// `tls-sni-01`: a self-signed certificate presented for a synthetic SNI name.
    TlsSni01,

    /// Anything this client does not recognize.
    Other(String),
}

impl ChallengeKind {
    pub fn as_str(&self) -> &str {
        match self {
            ChallengeKind::Http01 => "http-01",
            ChallengeKind::Dns01 => "dns-01",
            ChallengeKind::TlsSni01 => "tls-sni-01",
            ChallengeKind::Other(kind) => kind,
        }
    }
}

impl From<String> for ChallengeKind {
    fn from(kind: String) -> Self {
        match kind.as_str() {
            "http-01" => ChallengeKind::Http01,
            "dns-01" => ChallengeKind::Dns01,
            "tls-sni-01" => ChallengeKind::TlsSni01,
            _ => ChallengeKind::Other(kind),
        }
    }
}

impl From<ChallengeKind> for String {
    fn from(kind: ChallengeKind) -> Self {
        match kind {
            ChallengeKind::Other(kind) => kind,
            kind => kind.as_str().to_owned(),
        }
    }
}

impl fmt::Display for ChallengeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A challenge object as offered inside an authorization.
///
/// # Example JSON
///
/// ```json
/// {
///   "type": "http-01",
///   "status": "pending",
///   "uri": "https://acme-staging.api.letsencrypt.org/acme/challenge/YTqpYUthlVfwBncUufE8IRA2TkzZkN4eYWWLMSRqcSs/216789597",
///   "token": "MUi-gqeOJdRkSb_YR2eaMxQBqf6al8dgt_dOttSWb0w"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    #[serde(rename = "type")]
    pub kind: ChallengeKind,

    /// URL to which a response can be posted.
    #[serde(alias = "url")]
    pub uri: String,

    pub token: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    /// Error that occurred while the server was validating the challenge, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<api::Problem>,
}

/// The `challenge` request telling the CA the proof is in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeResponse {
    pub resource: Resource,

    #[serde(rename = "type")]
    pub kind: ChallengeKind,

    pub key_authorization: String,

    pub token: String,
}

impl ChallengeResponse {
    pub(crate) fn new(kind: ChallengeKind, key_authorization: &str, token: &str) -> Self {
        ChallengeResponse {
            resource: Resource::ChallengeResponse,
            kind,
            key_authorization: key_authorization.to_owned(),
            token: token.to_owned(),
        }
    }
}
