use std::time::Duration;

use reqwest::{Method, StatusCode};

use crate::{
    api,
    cert::{Certificate, CertificateRequest, CertificateResponse},
    challenge::Challenge,
    dir::{Directory, DirectoryUrl, Resource},
    error::{Error, Result},
    key::AcmeKey,
    poll::{poll_until, Attempt, Polled},
    req::{http_client, Response},
    trans::Transport,
    util::{base64url, pem_decode_body, pem_encode_certificate},
};

/// Default time to wait for a challenge to validate or a certificate to be issued.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(180);

/// Leaf bodies shorter than this mean the certificate is not issued yet.
const MIN_CERTIFICATE_LEN: usize = 10;

/// Issuer bodies of this size or smaller are placeholders, not certificates.
const TRIVIAL_ISSUER_LEN: usize = 10;

/// Entry point for accessing an ACME API with one account key.
///
/// The flow for a certificate is:
///
/// 1. [`register_account`](Self::register_account) (once per account key);
/// 2. [`request_challenge`](Self::request_challenge) for the domain, then publish the
///    key authorization;
/// 3. [`check_challenge`](Self::check_challenge) until the CA has seen the proof;
/// 4. [`request_certificate`](Self::request_certificate).
///
/// The directory is fetched on first use and cached for the lifetime of the client. Operations
/// run one HTTP exchange after another; polling waits one second between status checks.
#[derive(Debug)]
pub struct Client {
    transport: Transport,
    directory: Directory,
}

impl Client {
    /// Create a client for the directory at `url`, signing requests with `acme_key`.
    pub fn new(url: DirectoryUrl<'_>, acme_key: AcmeKey) -> Result<Client> {
        Ok(Self::with_http_client(url, acme_key, http_client()?))
    }

    /// As [`new`](Self::new), reusing an existing HTTP client.
    pub fn with_http_client(
        url: DirectoryUrl<'_>,
        acme_key: AcmeKey,
        http: reqwest::Client,
    ) -> Client {
        let url = url.to_url();

        // the resource-name protocol hands out nonces on every response, including HEAD of the
        // directory itself
        Client {
            transport: Transport::new(http, acme_key, url),
            directory: Directory::new(url),
        }
    }

    pub fn directory_url(&self) -> &str {
        self.directory.url()
    }

    /// The account key requests are signed with.
    pub fn acme_key(&self) -> &AcmeKey {
        self.transport.acme_key()
    }

    /// Returns the URL the directory lists for `resource`.
    pub async fn resolve(&self, resource: Resource) -> Result<String> {
        self.resolve_url(resource).await.map(ToOwned::to_owned)
    }

    async fn resolve_url(&self, resource: Resource) -> Result<&str> {
        self.directory.resolve(&self.transport, resource).await
    }

    /// Registers the account key with the CA.
    ///
    /// `agreement` is the URL of the subscriber agreement being accepted; `email` becomes a
    /// `mailto:` contact. Returns the account object as sent by the CA.
    ///
    /// Registering a key that is already known fails with a server error for which
    /// [`Error::is_already_registered()`] is true.
    pub async fn register_account(
        &self,
        agreement: Option<&str>,
        email: Option<&str>,
    ) -> Result<serde_json::Value> {
        if agreement.is_some_and(str::is_empty) {
            return Err(Error::InvalidArgument("agreement must not be empty"));
        }
        if email.is_some_and(str::is_empty) {
            return Err(Error::InvalidArgument("email must not be empty"));
        }

        let url = self.resolve_url(Resource::NewRegistration).await?;
        let reg = api::Registration::new(agreement, email);

        let res = self
            .transport
            .signed(Method::POST, url, &reg)
            .await?
            .error_for_status()?;

        if let Some(location) = res.location() {
            log::debug!("Registration is at {location}");
        }

        res.json()
    }

    /// Asks the CA to authorize `domain` and derives the `http-01` challenge proving it.
    pub async fn request_challenge(&self, domain: &str) -> Result<Challenge> {
        validate_domain(domain)?;

        let url = self.resolve_url(Resource::NewAuthorization).await?;
        let new_authz = api::NewAuthorization::dns(domain);

        let res = self
            .transport
            .signed(Method::POST, url, &new_authz)
            .await?
            .error_for_status()?;

        let auth = res.json::<api::Authorization>()?;
        let location = res.expect_location()?;

        let challenge = Challenge::http_01(domain, &auth, self.transport.acme_key(), location)?;
        log::debug!(
            "{} challenge for {domain}, token {}",
            challenge.kind(),
            challenge.token()
        );

        Ok(challenge)
    }

    /// Tells the CA the proof is published and waits for it to leave the `pending` status.
    ///
    /// Returns the authorization as last seen; its `status` is `valid` or `invalid` (or any
    /// other non-pending status the CA uses). Fails with [`Error::ChallengeTimedOut`] if the
    /// authorization is still pending after `timeout`.
    pub async fn check_challenge(
        &self,
        challenge: &Challenge,
        timeout: Duration,
    ) -> Result<serde_json::Value> {
        let response = api::ChallengeResponse::new(
            challenge.kind().clone(),
            challenge.key_authorization(),
            challenge.token(),
        );

        self.transport
            .signed(Method::POST, challenge.url(), &response)
            .await?
            .error_for_status()?;

        let client = self;
        let location = challenge.location();
        let polled = poll_until(timeout, move || client.authorization_status(location)).await?;

        match polled {
            Polled::Done(auth) => Ok(auth),
            Polled::TimedOut(_) => Err(Error::ChallengeTimedOut {
                domain: challenge.domain().to_owned(),
                timeout,
            }),
        }
    }

    async fn authorization_status(&self, location: &str) -> Result<Attempt<serde_json::Value>> {
        let auth = self
            .transport
            .signed(Method::GET, location, &api::EmptyObject)
            .await?
            .error_for_status()?
            .json::<serde_json::Value>()?;

        let status = auth["status"].as_str().unwrap_or_default();
        log::debug!("Authorization {location} is {status}");

        if status == "pending" {
            Ok(Attempt::Pending(auth))
        } else {
            Ok(Attempt::Done(auth))
        }
    }

    /// Requests a certificate for `domain` and downloads it with its issuer chain.
    ///
    /// The domain must already be authorized (see [`check_challenge`](Self::check_challenge)).
    /// If the CA is still issuing, its `Location` is polled for up to `timeout`.
    pub async fn request_certificate(
        &self,
        domain: &str,
        csr: CertificateRequest,
        timeout: Duration,
    ) -> Result<CertificateResponse> {
        validate_domain(domain)?;

        // this is not the same as PEM.
        let csr_der = pem_decode_body(&csr.to_csr_pem()?)?;
        let new_cert = api::NewCertificate::new(base64url(&csr_der));

        let url = self.resolve_url(Resource::NewCertificate).await?;
        let res = self.transport.signed(Method::POST, url, &new_cert).await?;

        if !res.status().is_success() {
            return Err(certificate_failed(&res));
        }

        let res = if is_issued(&res) {
            res
        } else {
            log::debug!("Certificate for {domain} not issued yet");
            self.wait_for_certificate(res.expect_location()?, timeout)
                .await?
        };

        let leaf = pem_encode_certificate(res.body());
        let issuers = self.fetch_issuers(&res).await?;
        log::debug!("Certificate for {domain} issued with {} issuers", issuers.len());

        Ok(CertificateResponse {
            request: csr,
            certificate: Certificate::from_chain(leaf, issuers),
        })
    }

    async fn wait_for_certificate(&self, location: &str, timeout: Duration) -> Result<Response> {
        let client = self;
        let polled = poll_until(timeout, move || client.certificate_status(location)).await?;

        match polled {
            Polled::Done(res) => Ok(res),
            Polled::TimedOut(res) => Err(Error::CertificateRequestTimedOut {
                timeout,
                body: res.text(),
            }),
        }
    }

    async fn certificate_status(&self, location: &str) -> Result<Attempt<Response>> {
        let res = self.transport.unsigned(Method::GET, location).await?;

        match res.status() {
            StatusCode::OK => Ok(Attempt::Done(res)),
            StatusCode::ACCEPTED => Ok(Attempt::Pending(res)),
            _ => Err(certificate_failed(&res)),
        }
    }

    /// PEMs of every non-trivial `up` link of `res`, in header order.
    async fn fetch_issuers(&self, res: &Response) -> Result<Vec<String>> {
        let mut issuers = Vec::new();

        for link in res.links().iter().filter(|link| link.has_rel("up")) {
            let issuer = self
                .transport
                .unsigned(Method::GET, &link.url)
                .await?
                .error_for_status()?;

            if issuer.body().len() <= TRIVIAL_ISSUER_LEN {
                log::warn!("Skipping placeholder issuer certificate at {}", link.url);
                continue;
            }

            issuers.push(pem_encode_certificate(issuer.body()));
        }

        Ok(issuers)
    }
}

fn validate_domain(domain: &str) -> Result<()> {
    if domain.trim().is_empty() {
        return Err(Error::InvalidArgument("domain must not be empty"));
    }
    Ok(())
}

/// 202, or a body too short to be a certificate, means the CA is still working.
fn is_issued(res: &Response) -> bool {
    res.status() != StatusCode::ACCEPTED && res.body().len() >= MIN_CERTIFICATE_LEN
}

fn certificate_failed(res: &Response) -> Error {
    Error::CertificateRequestFailed {
        status: res.status(),
        body: res.text(),
    }
}
