use std::collections::VecDeque;

use parking_lot::Mutex;
use reqwest::Method;
use serde::Serialize;

use crate::{
    error::{Error, Result},
    jws::jws_with,
    key::AcmeKey,
    req::Response,
};

/// How often a request rejected for its nonce is re-signed with a fresh one.
const BAD_NONCE_RETRIES: usize = 3;

/// Plain and JWS-signed HTTP exchanges with the ACME API.
///
/// Every exchange yields a [`Response`] envelope; nothing about the last call is kept around
/// except the replay nonces the server hands out.
#[derive(Debug)]
pub(crate) struct Transport {
    http: reqwest::Client,
    acme_key: AcmeKey,
    nonce_pool: NoncePool,
}

impl Transport {
    pub fn new(http: reqwest::Client, acme_key: AcmeKey, nonce_url: &str) -> Self {
        Transport {
            http,
            acme_key,
            nonce_pool: NoncePool::new(nonce_url),
        }
    }

    /// The key used in the transport
    pub fn acme_key(&self) -> &AcmeKey {
        &self.acme_key
    }

    /// Makes a request without a body or signature.
    pub async fn unsigned(&self, method: Method, url: &str) -> Result<Response> {
        log::debug!("{method} {url}");

        let res = self.http.request(method, url).send().await?;
        let res = Response::read(res).await?;

        self.nonce_pool.extract_nonce(&res);

        Ok(res)
    }

    /// Makes a request whose body is `payload` wrapped in a JWS signed by the account key.
    ///
    /// Non-success statuses are returned as-is; only `badNonce` rejections are retried.
    pub async fn signed<T>(&self, method: Method, url: &str, payload: &T) -> Result<Response>
    where
        T: Serialize + ?Sized,
    {
        let mut attempt = 0;

        loop {
            // Either get a new nonce, or reuse one from a previous request.
            let nonce = self.nonce().await?;

            let body = jws_with(&self.acme_key, url, nonce, payload)?;

            log::debug!("{method} {url} (signed)");

            let res = self
                .http
                .request(method.clone(), url)
                .header("content-type", "application/jose+json")
                .body(body)
                .send()
                .await?;
            let res = Response::read(res).await?;

            // Regardless of the request being a success or not, there might be a nonce in the
            // response.
            self.nonce_pool.extract_nonce(&res);

            let bad_nonce = res.problem().is_some_and(|problem| problem.is_bad_nonce());
            if bad_nonce && attempt < BAD_NONCE_RETRIES {
                attempt += 1;
                log::debug!("Retrying on bad nonce ({attempt}/{BAD_NONCE_RETRIES})");
                continue;
            }

            return Ok(res);
        }
    }

    async fn nonce(&self) -> Result<String> {
        if let Some(nonce) = self.nonce_pool.pop() {
            log::trace!("Use previous nonce");
            return Ok(nonce);
        }

        log::debug!("Request new nonce");
        let url = self.nonce_pool.nonce_url.as_str();
        let res = self.http.head(url).send().await?;
        let res = Response::read(res).await?;

        res.nonce()
            .map(ToOwned::to_owned)
            .ok_or_else(|| Error::MissingHeader {
                url: url.to_owned(),
                name: "replay-nonce",
            })
    }
}

/// Pool of replay nonces collected from responses.
#[derive(Default, Debug)]
pub(crate) struct NoncePool {
    nonce_url: String,
    pool: Mutex<VecDeque<String>>,
}

impl NoncePool {
    pub fn new(nonce_url: &str) -> Self {
        NoncePool {
            nonce_url: nonce_url.to_owned(),
            ..Default::default()
        }
    }

    fn extract_nonce(&self, res: &Response) {
        if let Some(nonce) = res.nonce() {
            log::trace!("Extracting new nonce");
            self.push(nonce);
        }
    }

    fn push(&self, nonce: &str) {
        let mut pool = self.pool.lock();
        pool.push_back(nonce.to_owned());

        if pool.len() > 10 {
            pool.pop_front();
        }
    }

    fn pop(&self) -> Option<String> {
        self.pool.lock().pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{key::test_key, req::http_client};

    #[tokio::test]
    async fn test_nonce_from_head_request() {
        let server = crate::test::with_directory_server();
        let transport = Transport::new(http_client().unwrap(), test_key(), &server.dir_url);

        let nonce = transport.nonce().await.unwrap();
        assert_eq!(nonce, crate::test::NONCE);
        assert!(transport.nonce_pool.pop().is_none());
    }

    #[tokio::test]
    async fn test_signed_request_pools_nonce() {
        let server = crate::test::with_directory_server();
        let transport = Transport::new(http_client().unwrap(), test_key(), &server.dir_url);

        let url = format!("{}/acme/new-reg", server.url);
        let res = transport
            .signed(Method::POST, &url, &serde_json::json!({ "resource": "new-reg" }))
            .await
            .unwrap();
        assert!(res.status().is_success());

        // one nonce from HEAD was spent, the POST answer brought another
        assert_eq!(transport.nonce_pool.pop().as_deref(), Some(crate::test::NONCE));
    }

    #[tokio::test]
    async fn test_bad_nonce_is_retried() {
        let server = crate::test::with_test_server(crate::test::TestConfig {
            bad_nonce_once: true,
            ..Default::default()
        });
        let transport = Transport::new(http_client().unwrap(), test_key(), &server.dir_url);

        let url = format!("{}/acme/new-reg", server.url);
        let res = transport
            .signed(Method::POST, &url, &serde_json::json!({ "resource": "new-reg" }))
            .await
            .unwrap();

        assert_eq!(res.status(), reqwest::StatusCode::CREATED);
        assert_eq!(server.bad_nonces(), 2);
    }

    #[test]
    fn test_pool_is_bounded() {
        let pool = NoncePool::new("https://ca.test/directory");
        for i in 0..15 {
            pool.push(&i.to_string());
        }
        assert_eq!(pool.pool.lock().len(), 10);
        assert_eq!(pool.pop().as_deref(), Some("5"));
    }
}
