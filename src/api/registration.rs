use serde::{Deserialize, Serialize};

use crate::dir::Resource;

/// A `new-reg` request.
///
/// # Example JSON
///
/// ```json
/// {
///   "resource": "new-reg",
///   "agreement": "https://letsencrypt.org/documents/LE-SA-v1.2-November-15-2017.pdf",
///   "contact": ["mailto:cert-admin@example.com"]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub resource: Resource,

    /// URL of the subscriber agreement the account holder accepts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agreement: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<Vec<String>>,
}

impl Registration {
    pub(crate) fn new(agreement: Option<&str>, email: Option<&str>) -> Self {
        Registration {
            resource: Resource::NewRegistration,
            agreement: agreement.map(ToOwned::to_owned),
            contact: email.map(|email| vec![format!("mailto:{email}")]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_with_email() {
        let reg = Registration::new(Some("https://ca.test/terms"), Some("foo@bar.com"));
        let json = serde_json::to_string(&reg).unwrap();
        assert_eq!(
            json,
            r#"{"resource":"new-reg","agreement":"https://ca.test/terms","contact":["mailto:foo@bar.com"]}"#
        );
    }

    #[test]
    fn test_registration_omits_missing_fields() {
        let json = serde_json::to_string(&Registration::new(None, None)).unwrap();
        assert_eq!(json, r#"{"resource":"new-reg"}"#);
    }
}
