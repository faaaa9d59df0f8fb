use std::time::Duration;

use reqwest::{
    header::{HeaderMap, CONTENT_TYPE, LINK, LOCATION},
    StatusCode, Url,
};
use serde::de::DeserializeOwned;

use crate::{
    api::Problem,
    error::{Error, Result},
};

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

pub(crate) fn http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(HTTP_TIMEOUT)
        .timeout(HTTP_TIMEOUT)
        .build()
}

/// One target of a `Link` header, e.g. `<https://ca.test/issuer>;rel="up"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Link {
    /// Absolute URL, resolved against the URL of the response carrying the header.
    pub url: String,
    pub rel: String,
}

impl Link {
    /// `rel` may hold several space separated relation types.
    pub(crate) fn has_rel(&self, rel: &str) -> bool {
        self.rel
            .split_whitespace()
            .any(|candidate| candidate.eq_ignore_ascii_case(rel))
    }
}

/// Everything the protocol reads off an HTTP exchange, captured when the response arrives.
#[derive(Debug, Clone)]
pub(crate) struct Response {
    url: Url,
    status: StatusCode,
    location: Option<String>,
    links: Vec<Link>,
    nonce: Option<String>,
    is_problem: bool,
    body: Vec<u8>,
}

impl Response {
    pub(crate) async fn read(res: reqwest::Response) -> reqwest::Result<Response> {
        let url = res.url().clone();
        let status = res.status();
        let headers = res.headers();

        let location = header_str(headers, LOCATION.as_str()).map(|location| {
            url.join(location)
                .map(String::from)
                .unwrap_or_else(|_| location.to_owned())
        });
        let links = parse_links(&url, headers);
        let nonce = header_str(headers, "replay-nonce").map(ToOwned::to_owned);
        let is_problem = header_str(headers, CONTENT_TYPE.as_str())
            .is_some_and(|ct| ct.starts_with("application/problem+json"));

        let body = res.bytes().await?.to_vec();

        Ok(Response {
            url,
            status,
            location,
            links,
            nonce,
            is_problem,
            body,
        })
    }

    pub(crate) fn url(&self) -> &str {
        self.url.as_str()
    }

    pub(crate) fn status(&self) -> StatusCode {
        self.status
    }

    pub(crate) fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub(crate) fn expect_location(&self) -> Result<&str> {
        self.location().ok_or_else(|| Error::MissingHeader {
            url: self.url().to_owned(),
            name: "location",
        })
    }

    pub(crate) fn links(&self) -> &[Link] {
        &self.links
    }

    pub(crate) fn nonce(&self) -> Option<&str> {
        self.nonce.as_deref()
    }

    pub(crate) fn body(&self) -> &[u8] {
        &self.body
    }

    pub(crate) fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub(crate) fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// The body as a problem document, if the CA sent one.
    pub(crate) fn problem(&self) -> Option<Problem> {
        if self.status.is_success() {
            return None;
        }

        let problem = serde_json::from_slice::<Problem>(&self.body);
        if self.is_problem && problem.is_err() {
            log::debug!("Unparseable problem document from {}", self.url);
        }
        problem.ok()
    }

    /// Turns a non-2xx answer into [`Error::Server`], keeping the body.
    pub(crate) fn error_for_status(self) -> Result<Response> {
        if self.status.is_success() {
            return Ok(self);
        }

        Err(Error::Server {
            status: self.status,
            problem: self.problem(),
            body: self.text(),
        })
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn parse_links(base: &Url, headers: &HeaderMap) -> Vec<Link> {
    let mut links = Vec::new();

    for value in headers.get_all(LINK) {
        match value.to_str() {
            Ok(value) => parse_link_header(base, value, &mut links),
            Err(_) => log::warn!("Ignoring non-ASCII Link header from {base}"),
        }
    }

    links
}

/// Parses one `Link` header value ([RFC 8288]) into `links`.
///
/// [RFC 8288]: https://datatracker.ietf.org/doc/html/rfc8288#section-3
fn parse_link_header(base: &Url, value: &str, links: &mut Vec<Link>) {
    let mut rest = value;

    while let Some(start) = rest.find('<') {
        let Some(len) = rest[start..].find('>') else {
            log::warn!("Unterminated Link target: {value}");
            break;
        };

        let target = &rest[start + 1..start + len];
        rest = &rest[start + len + 1..];

        // parameters run up to the next comma outside of a quoted string
        let mut quoted = false;
        let params_end = rest
            .char_indices()
            .find(|&(_, c)| {
                if c == '"' {
                    quoted = !quoted;
                }
                c == ',' && !quoted
            })
            .map_or(rest.len(), |(idx, _)| idx);

        let params = &rest[..params_end];
        rest = &rest[params_end..];

        let rel = params
            .split(';')
            .filter_map(|param| param.split_once('='))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case("rel"))
            .map(|(_, rel)| rel.trim().trim_matches('"').to_owned());

        let Some(rel) = rel else {
            continue;
        };

        match base.join(target.trim()) {
            Ok(url) => links.push(Link {
                url: url.into(),
                rel,
            }),
            Err(err) => log::warn!("Ignoring Link with bad target {target:?}: {err}"),
        }
    }
}
