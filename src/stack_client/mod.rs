pub mod api;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use hyper::client::HttpConnector;
use hyper::{Body, Client, Method, Request};
use hyper_tls::HttpsConnector;
use url::Url;

const USERS_ENDPOINT: &str = "https://api.stackexchange.com/2.2/users";

/// Seam over the users listing so the store can be driven by a stub in tests.
#[async_trait]
pub trait UsersApi: Send + Sync {
    async fn fetch_users(&self) -> Result<Vec<api::User>>;
}

#[derive(Debug, Clone)]
pub struct StackClient {
    https_client: Client<HttpsConnector<HttpConnector>>,
    api_key: Option<String>,
}

impl StackClient {
    pub fn new(api_key: Option<String>) -> Self {
        let https = HttpsConnector::new();
        let https_client = Client::builder().build::<_, hyper::Body>(https);
        Self {
            https_client,
            api_key,
        }
    }

    fn users_url(&self) -> Result<Url> {
        let mut uri = Url::parse(USERS_ENDPOINT)?;

        // Fixed query: first page of the site-wide reputation leaderboard.
        uri.query_pairs_mut()
            .append_pair("page", "1")
            .append_pair("pagesize", "20")
            .append_pair("order", "desc")
            .append_pair("sort", "reputation")
            .append_pair("site", "stackoverflow");

        // An app key only raises the request quota; anonymous works too.
        if let Some(api_key) = &self.api_key {
            uri.query_pairs_mut().append_pair("key", api_key);
        }

        Ok(uri)
    }
}

#[async_trait]
impl UsersApi for StackClient {
    async fn fetch_users(&self) -> Result<Vec<api::User>> {
        let uri = self.users_url()?;
        let req = Request::builder()
            .method(Method::GET)
            .uri(uri.to_string())
            .header("Accept", "application/json")
            .body(Body::empty())?;

        let resp = self.https_client.request(req).await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!(
                "API call failed with response code: {}",
                status.as_u16()
            ));
        }

        let body = hyper::body::to_bytes(resp.into_body()).await?;
        parse_users(&body)
    }
}

/// Parses the users envelope; any structural mismatch is a parse error, kept
/// distinct in message from the transport cases above.
pub fn parse_users(body: &[u8]) -> Result<Vec<api::User>> {
    let resp: api::Response<Vec<api::User>> =
        serde_json::from_slice(body).context("failed to parse users response")?;
    Ok(resp.items)
}
