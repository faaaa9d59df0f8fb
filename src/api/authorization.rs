use serde::{Deserialize, Serialize};

use crate::{api, dir::Resource};

/// A `new-authz` request for a single identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAuthorization {
    pub resource: Resource,
    pub identifier: api::Identifier,
}

impl NewAuthorization {
    pub(crate) fn dns(domain: &str) -> Self {
        NewAuthorization {
            resource: Resource::NewAuthorization,
            identifier: api::Identifier::dns(domain),
        }
    }
}

// {
//   "identifier": {
//     "type": "dns",
//     "value": "acmetest.algesten.se"
//   },
//   "status": "pending",
//   "expires": "2019-01-09T08:26:43Z",
//   "challenges": [
//     {
//       "type": "http-01",
//       "status": "pending",
//       "uri": "https://example.com/acme/challenge/YTqpYUthlVfwBncUufE8IRA2TkzZkN4eYWWLMSRqcSs/216789597",
//       "token": "MUi-gqeOJdRkSb_YR2eaMxQBqf6al8dgt_dOttSWb0w"
//     },
//     {
//       "type": "dns-01",
//       "status": "pending",
//       "uri": "https://example.com/acme/challenge/YTqpYUthlVfwBncUufE8IRA2TkzZkN4eYWWLMSRqcSs/216789599",
//       "token": "RRo2ZcXAEqxKvMH8RGcATjSK1KknLEUmauwfQ5i3gG8"
//     }
//   ],
//   "combinations": [[0], [1]]
// }
/// An authorization object.
///
/// Represents the server's authorization for an account to represent an identifier, and the
/// challenges that can be fulfilled to prove it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authorization {
    pub identifier: Option<api::Identifier>,

    pub status: Option<String>,

    /// Uses RFC 3339 format.
    pub expires: Option<String>,

    #[serde(default)]
    pub challenges: Vec<api::Challenge>,
}

impl Authorization {
    /// Returns the first challenge of the given kind, if one is offered.
    pub fn challenge(&self, kind: &api::ChallengeKind) -> Option<&api::Challenge> {
        self.challenges.iter().find(|c| c.kind == *kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ChallengeKind;

    #[test]
    fn test_new_authorization_payload() {
        let json = serde_json::to_string(&NewAuthorization::dns("example.org")).unwrap();
        assert_eq!(
            json,
            r#"{"resource":"new-authz","identifier":{"type":"dns","value":"example.org"}}"#
        );
    }

    #[test]
    fn test_missing_challenges_is_empty() {
        let auth: Authorization = serde_json::from_str(r#"{"status":"pending"}"#).unwrap();
        assert!(auth.challenges.is_empty());
        assert!(auth.challenge(&ChallengeKind::Http01).is_none());
    }
}
