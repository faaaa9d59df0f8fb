use crate::{
    api::{self, ChallengeKind},
    error::{Error, Result},
    jws::Jwk,
    key::AcmeKey,
};

/// A domain ownership challenge, ready to be published and then checked.
///
/// Obtained from [`Client::request_challenge()`]. For `http-01` the
/// [`key_authorization`](Self::key_authorization) must be served as the body of
///
/// ```text
/// http://<domain>/.well-known/acme-challenge/<token>
/// ```
///
/// before calling [`Client::check_challenge()`].
///
/// [`Client::request_challenge()`]: crate::Client::request_challenge()
/// [`Client::check_challenge()`]: crate::Client::check_challenge()
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    domain: String,
    kind: ChallengeKind,
    url: String,
    token: String,
    key_authorization: String,
    location: String,
}

impl Challenge {
    /// Picks the `http-01` challenge out of an authorization and computes its proof.
    pub(crate) fn http_01(
        domain: &str,
        auth: &api::Authorization,
        key: &AcmeKey,
        location: &str,
    ) -> Result<Challenge> {
        let offered = auth
            .challenge(&ChallengeKind::Http01)
            .ok_or_else(|| Error::HttpChallengeNotSupported {
                domain: domain.to_owned(),
            })?;

        let key_authorization = key_authorization(&offered.token, key)?;

        Ok(Challenge {
            domain: domain.to_owned(),
            kind: offered.kind.clone(),
            url: offered.uri.clone(),
            token: offered.token.clone(),
            key_authorization,
            location: location.to_owned(),
        })
    }

    /// Domain name being proven.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn kind(&self) -> &ChallengeKind {
        &self.kind
    }

    /// CA endpoint notified once the proof is in place.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The CA issued token, also the file name of the `http-01` proof.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// The proof: `<token>.<account key thumbprint>`.
    pub fn key_authorization(&self) -> &str {
        &self.key_authorization
    }

    /// Authorization URL polled for the validation result.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Path the proof is fetched from by the CA.
    pub fn http_path(&self) -> String {
        format!("/.well-known/acme-challenge/{}", self.token)
    }
}

pub(crate) fn key_authorization(token: &str, key: &AcmeKey) -> eyre::Result<String> {
    let thumbprint = Jwk::from(key).thumbprint()?;
    Ok(format!("{token}.{thumbprint}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::test_key;

    const AUTHZ: &str = r#"{
        "identifier": { "type": "dns", "value": "acme-test.example.com" },
        "status": "pending",
        "challenges": [
            {
                "type": "dns-01",
                "status": "pending",
                "uri": "https://ca.test/acme/challenge/abc/0",
                "token": "RRo2ZcXAEqxKvMH8RGcATjSK1KknLEUmauwfQ5i3gG8"
            },
            {
                "type": "http-01",
                "status": "pending",
                "uri": "https://ca.test/acme/challenge/abc/1",
                "token": "MUi-gqeOJdRkSb_YR2eaMxQBqf6al8dgt_dOttSWb0w"
            }
        ]
    }"#;

    #[test]
    fn test_key_authorization_is_deterministic() {
        let key = test_key();
        let first = key_authorization("some-token", &key).unwrap();
        let second = key_authorization("some-token", &test_key()).unwrap();

        assert_eq!(first, second);
        assert_eq!(first, "some-token.qWoA3LeWEbYDrfi1Sc8KPzL6BgnFyMDZPa96oAvx2nk");
    }

    #[test]
    fn test_picks_http_challenge() {
        let auth = serde_json::from_str(AUTHZ).unwrap();
        let challenge = Challenge::http_01(
            "acme-test.example.com",
            &auth,
            &test_key(),
            "https://ca.test/acme/authz/abc",
        )
        .unwrap();

        assert_eq!(challenge.domain(), "acme-test.example.com");
        assert_eq!(challenge.kind(), &ChallengeKind::Http01);
        assert_eq!(challenge.url(), "https://ca.test/acme/challenge/abc/1");
        assert_eq!(challenge.token(), "MUi-gqeOJdRkSb_YR2eaMxQBqf6al8dgt_dOttSWb0w");
        assert_eq!(challenge.location(), "https://ca.test/acme/authz/abc");
        assert_eq!(
            challenge.key_authorization(),
            "MUi-gqeOJdRkSb_YR2eaMxQBqf6al8dgt_dOttSWb0w.qWoA3LeWEbYDrfi1Sc8KPzL6BgnFyMDZPa96oAvx2nk"
        );
        assert_eq!(
            challenge.http_path(),
            "/.well-known/acme-challenge/MUi-gqeOJdRkSb_YR2eaMxQBqf6al8dgt_dOttSWb0w"
        );
    }

    #[test]
    fn test_skips_unknown_kinds() {
        let auth = serde_json::from_str(
            r#"{"challenges":[
                {"type":"tls-alpn-01","url":"https://ca.test/c/0","token":"alpn"},
                {"type":"http-01","url":"https://ca.test/c/1","token":"some-token"}
            ]}"#,
        )
        .unwrap();
        let challenge =
            Challenge::http_01("example.org", &auth, &test_key(), "https://ca.test/a").unwrap();

        assert_eq!(challenge.kind(), &ChallengeKind::Http01);
        assert_eq!(challenge.url(), "https://ca.test/c/1");
        assert_eq!(
            challenge.key_authorization(),
            "some-token.qWoA3LeWEbYDrfi1Sc8KPzL6BgnFyMDZPa96oAvx2nk"
        );
    }

    #[test]
    fn test_no_http_challenge() {
        let auth = serde_json::from_str(
            r#"{"challenges":[{"type":"dns-01","uri":"https://ca.test/c/0","token":"t"}]}"#,
        )
        .unwrap();
        let err = Challenge::http_01("example.org", &auth, &test_key(), "https://ca.test/a")
            .unwrap_err();
        assert!(matches!(err, Error::HttpChallengeNotSupported { domain } if domain == "example.org"));

        let auth = serde_json::from_str(r#"{"challenges":[]}"#).unwrap();
        let err = Challenge::http_01("example.org", &auth, &test_key(), "https://ca.test/a")
            .unwrap_err();
        assert!(matches!(err, Error::HttpChallengeNotSupported { .. }));
    }
}
