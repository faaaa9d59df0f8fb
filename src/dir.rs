use std::{collections::HashMap, fmt};

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use crate::{
    error::{Error, Result},
    trans::Transport,
};

const LETSENCRYPT_URL: &str = "https://acme-v01.api.letsencrypt.org/directory";
const LETSENCRYPT_STAGING_URL: &str = "https://acme-staging.api.letsencrypt.org/directory";

/// Enumeration of known ACME API directories.
#[derive(Debug, Clone)]
pub enum DirectoryUrl<'a> {
    /// The main Let's Encrypt directory.
    ///
    /// Not appropriate for testing / development.
    LetsEncrypt,

    /// The staging Let's Encrypt directory.
    ///
    /// Use for testing and development. Doesn't issue "valid" certificates. The root signing
    /// certificate is not supposed to be in any trust chains.
    LetsEncryptStaging,

    /// Provide an arbitrary director URL to connect to.
    Other(&'a str),
}

impl<'a> DirectoryUrl<'a> {
    pub(crate) fn to_url(&self) -> &str {
        match self {
            DirectoryUrl::LetsEncrypt => LETSENCRYPT_URL,
            DirectoryUrl::LetsEncryptStaging => LETSENCRYPT_STAGING_URL,
            DirectoryUrl::Other(url) => url,
        }
    }
}

/// Protocol resources a client can ask the directory for.
///
/// The serialized form is the wire name, which is also what every request payload carries in
/// its `resource` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resource {
    #[serde(rename = "new-reg")]
    NewRegistration,

    #[serde(rename = "new-authz")]
    NewAuthorization,

    #[serde(rename = "challenge")]
    ChallengeResponse,

    #[serde(rename = "new-cert")]
    NewCertificate,
}

impl Resource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::NewRegistration => "new-reg",
            Resource::NewAuthorization => "new-authz",
            Resource::ChallengeResponse => "challenge",
            Resource::NewCertificate => "new-cert",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resource name to URL mapping, fetched from the directory endpoint on first use.
///
/// The mapping is never refreshed. Concurrent first uses share a single fetch.
#[derive(Debug)]
pub(crate) struct Directory {
    url: String,
    resources: OnceCell<HashMap<String, String>>,
}

impl Directory {
    pub(crate) fn new(url: &str) -> Self {
        Directory {
            url: url.to_owned(),
            resources: OnceCell::new(),
        }
    }

    pub(crate) fn url(&self) -> &str {
        &self.url
    }

    pub(crate) async fn resolve(&self, transport: &Transport, resource: Resource) -> Result<&str> {
        let resources = self
            .resources
            .get_or_try_init(|| self.fetch(transport))
            .await?;

        resources
            .get(resource.as_str())
            .map(String::as_str)
            .ok_or(Error::UnknownResource(resource))
    }

    async fn fetch(&self, transport: &Transport) -> Result<HashMap<String, String>> {
        log::debug!("Fetching directory {}", self.url);

        let res = transport
            .unsigned(Method::GET, &self.url)
            .await?
            .error_for_status()?;

        let resources = parse_directory(&res.json::<HashMap<String, serde_json::Value>>()?);
        log::debug!("Directory lists {} resources", resources.len());

        Ok(resources)
    }
}

/// Keeps the string members; `meta` and anything else non-URL is dropped.
fn parse_directory(doc: &HashMap<String, serde_json::Value>) -> HashMap<String, String> {
    doc.iter()
        .filter_map(|(name, value)| Some((name.clone(), value.as_str()?.to_owned())))
        .collect()
}
