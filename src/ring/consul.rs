use crate::ring::{MembershipStore, RingDesc};
use anyhow::{Result, anyhow, bail};
use log::info;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use url::Url;

/// Reads the ring descriptor from Consul's KV HTTP API.
pub struct ConsulClient {
    client: Client,
    base_url: Url,
}

impl ConsulClient {
    /// `base_url` may carry a path prefix (e.g. a proxy mount), the KV path is appended to it.
    pub fn new(base_url: Url, request_timeout: Duration) -> Result<Self> {
        if base_url.cannot_be_a_base() {
            bail!("consul url {base_url} cannot be used as a base");
        }

        let client = Client::builder().timeout(request_timeout).build()?;

        info!("ConsulClient created for {base_url}");

        Ok(Self { client, base_url })
    }

    fn key_url(&self, key: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("consul url {} cannot be used as a base", self.base_url))?
            .pop_if_empty()
            .push("v1")
            .push("kv")
            .extend(key.split('/'));

        Ok(url)
    }
}

impl MembershipStore for ConsulClient {
    type Snapshot = RingDesc;

    async fn get(&self, key: &str) -> Result<RingDesc> {
        let response = self
            .client
            .get(self.key_url(key)?)
            .query(&[("raw", "true")])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            bail!("ring key '{key}' not found");
        }

        let ring = response
            .error_for_status()?
            .json::<RingDesc>()
            .await?
            .with_ids_from_keys();

        Ok(ring)
    }
}
