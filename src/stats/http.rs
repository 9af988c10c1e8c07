use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use url::Url;

use super::{GameStats, GamesResponse, GroupStats, StatsApi};
use crate::config::Config;
use crate::error::{Error, Result};

const REQUEST_TIMEOUT_SECS: u64 = 10;

/// reqwest-backed [`StatsApi`]. Group lookups go through the proxy when one is
/// configured, otherwise straight to the groups endpoint (which browsers may
/// block cross-origin).
#[derive(Debug, Clone)]
pub struct HttpStatsApi {
    client: Client,
    games: Url,
    groups: Url,
    proxy: Option<Url>,
}

impl HttpStatsApi {
    pub fn new(games: Url, groups: Url, proxy: Option<Url>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(concat!("showcase/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, games, groups, proxy })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.games_endpoint()?, config.groups_endpoint()?, config.proxy()?)
    }

    pub fn games_url(&self, universe_ids: &[String]) -> Url {
        let mut url = self.games.clone();
        url.set_query(Some(&format!("universeIds={}", universe_ids.join(","))));
        url
    }

    pub fn group_url(&self, group_id: &str) -> Result<Url> {
        let (mut url, via_proxy) = match &self.proxy {
            Some(proxy) => (proxy.clone(), true),
            None => (self.groups.clone(), false),
        };
        let base = url.to_string();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| Error::config(format!("{base} cannot be used as a base URL")))?;
            segments.pop_if_empty();
            if via_proxy {
                segments.push("groups");
            }
            segments.push(group_id);
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        tracing::trace!(%url, "GET");
        let resp = self.client.get(url.clone()).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Status { url: url.to_string(), status: status.as_u16() });
        }
        let body = resp.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl StatsApi for HttpStatsApi {
    async fn game_stats(&self, universe_ids: &[String]) -> Result<Vec<GameStats>> {
        let resp: GamesResponse = self.get_json(self.games_url(universe_ids)).await?;
        Ok(resp.data)
    }

    async fn group_stats(&self, group_id: &str) -> Result<GroupStats> {
        self.get_json(self.group_url(group_id)?).await
    }
}
