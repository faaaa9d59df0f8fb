//! Provisioning certificates from ACME (Automatic Certificate Management Environment) providers
//! that speak the resource-name dialect of the protocol (`new-reg`, `new-authz`, `new-cert`), such
//! as the original [Let's Encrypt](https://letsencrypt.org/) v1 API and compatible CAs.
//!
//! # Usage
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use acme::{AcmeKey, CertificateRequest, Client, DirectoryUrl, DistinguishedName};
//!
//! # async fn run() -> acme::Result<()> {
//! let key = AcmeKey::generate()?;
//! let client = Client::new(DirectoryUrl::LetsEncryptStaging, key)?;
//!
//! client
//!     .register_account(Some("https://ca.test/terms"), Some("foo@bar.com"))
//!     .await?;
//!
//! let challenge = client.request_challenge("example.org").await?;
//! // serve challenge.key_authorization() at http://example.org{challenge.http_path()}
//! client.check_challenge(&challenge, acme::DEFAULT_TIMEOUT).await?;
//!
//! let csr = CertificateRequest::generate(DistinguishedName::new("example.org"));
//! let issued = client
//!     .request_certificate("example.org", csr, Duration::from_secs(60))
//!     .await?;
//!
//! println!("{}", issued.certificate.full_chain_pem());
//! # Ok(())
//! # }
//! ```
//!
//! ## Examples
//!
//! A complete `http-01` flow, serving the proof with a temporary web server, is in
//! `demos/http-01.rs`.
//!
//! # Domain Ownership
//!
//! Before issuing, the CA wants proof that you control the domain. This crate uses `http-01`: the
//! [key authorization](Challenge::key_authorization) must be served as a plain file at
//! [`Challenge::http_path()`] on port 80 of the domain before calling
//! [`Client::check_challenge()`].
//!
//! # Rate Limits
//!
//! Let's Encrypt uses [rate limits] to ensure the API is not being abused. Status checks run once
//! a second; keep timeouts reasonable and use [`DirectoryUrl::LetsEncryptStaging`] for
//! development.
//!
//! [rate limits]: https://letsencrypt.org/docs/rate-limits

#![deny(rust_2018_idioms, nonstandard_style, future_incompatible)]

mod cert;
mod challenge;
mod client;
mod dir;
mod error;
mod jws;
mod key;
mod poll;
mod req;
mod trans;
mod util;

pub mod api;


pub use crate::{
    api::ChallengeKind,
    cert::{
        create_p256_key, Certificate, CertificateRequest, CertificateResponse, DistinguishedName,
    },
    challenge::Challenge,
    client::{Client, DEFAULT_TIMEOUT},
    dir::{DirectoryUrl, Resource},
    error::{Error, Result},
    key::AcmeKey,
};
