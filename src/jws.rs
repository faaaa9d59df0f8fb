//! JSON Web Signature envelope for signed requests, and the JWK thumbprint used by challenges.

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

use crate::{key::AcmeKey, util::base64url};

const ALG: &str = "RS256";

/// Protected header of a signed request.
///
/// The nonce guards against replay; the CA rejects a nonce it did not hand out or that was
/// already used with a `badNonce` problem.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct JwsProtectedHeader {
    alg: String,
    jwk: Jwk,
    nonce: String,
    url: String,
}

impl JwsProtectedHeader {
    pub(crate) fn new(jwk: Jwk, url: &str, nonce: String) -> Self {
        JwsProtectedHeader {
            alg: ALG.to_owned(),
            jwk,
            nonce,
            url: url.to_owned(),
        }
    }
}

/// Unprotected header, repeated for servers that read `alg`/`jwk` from there.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct JwsHeader {
    alg: String,
    jwk: Jwk,
}

/// RSA public key as a JSON Web Key.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
// LEXICAL ORDER OF FIELDS MATTER!
pub(crate) struct Jwk {
    e: String,
    kty: String,
    n: String,
}

impl Jwk {
    /// base64url(SHA-256(compact JSON of the key)).
    ///
    /// See [RFC 7638].
    ///
    /// [RFC 7638]: https://datatracker.ietf.org/doc/html/rfc7638
    pub(crate) fn thumbprint(&self) -> eyre::Result<String> {
        let jwk_json = serde_json::to_string(self)?;
        Ok(base64url(&Sha256::digest(jwk_json)))
    }
}

impl From<&AcmeKey> for Jwk {
    fn from(key: &AcmeKey) -> Self {
        let components = key.public_components();

        Jwk {
            e: base64url(&components.e),
            kty: "RSA".to_owned(),
            n: base64url(&components.n),
        }
    }
}

/// <https://datatracker.ietf.org/doc/html/rfc7515#section-7.2.2>
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct FlattenedJsonJws {
    header: JwsHeader,
    protected: String,
    payload: String,
    signature: String,
}

/// Signs `payload` for `url` and serializes the flattened JWS.
pub(crate) fn jws_with<T: Serialize + ?Sized>(
    key: &AcmeKey,
    url: &str,
    nonce: String,
    payload: &T,
) -> eyre::Result<String> {
    let jwk = Jwk::from(key);

    let protected = {
        let header = JwsProtectedHeader::new(jwk.clone(), url, nonce);
        base64url(&serde_json::to_string(&header)?)
    };

    let payload = base64url(&serde_json::to_string(payload)?);

    let to_sign = format!("{protected}.{payload}");
    let signature = base64url(&key.sign(to_sign.as_bytes())?);

    let jws = FlattenedJsonJws {
        header: JwsHeader {
            alg: ALG.to_owned(),
            jwk,
        },
        protected,
        payload,
        signature,
    };

    Ok(serde_json::to_string(&jws)?)
}
