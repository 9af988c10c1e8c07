//! Live statistics for rendered cards.

pub mod games;
pub mod groups;
pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};

use crate::dom::Document;
use crate::error::Result;

pub use games::{Backoff, GamesHandle, GamesPoller};
pub use groups::{GroupsHandle, GroupsPoller};
pub use http::HttpStatsApi;

/// One entry of the batched games response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStats {
    #[serde(default, deserialize_with = "lenient_id")]
    pub universe_id: Option<String>,
    #[serde(default)]
    pub playing: Option<u64>,
    #[serde(default)]
    pub visits: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GamesResponse {
    #[serde(default)]
    pub data: Vec<GameStats>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupStats {
    #[serde(default)]
    pub member_count: Option<u64>,
}

fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<String>, D::Error> {
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// The third-party statistics API.
#[async_trait]
pub trait StatsApi: Send + Sync {
    /// Aggregated counts for up to 50 universes in one request.
    async fn game_stats(&self, universe_ids: &[String]) -> Result<Vec<GameStats>>;
    async fn group_stats(&self, group_id: &str) -> Result<GroupStats>;
}

/// Thousands-separated rendering, e.g. `1234567` -> `1,234,567`.
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Overwrite a stat placeholder and mark it loaded. Returns `false` when the
/// element is not on the page.
pub fn update_stat<D: Document + ?Sized>(doc: &mut D, element_id: &str, value: u64) -> bool {
    let Some(el) = doc.element_by_id(element_id) else { return false };
    doc.set_text(el, &format_count(value));
    doc.add_class(el, "loaded");
    true
}

/// Ids carried by elements named `<prefix><id>`, in document order.
pub(crate) fn placeholder_ids<D: Document + ?Sized>(doc: &D, prefix: &str) -> Vec<String> {
    doc.ids_with_prefix(prefix)
        .into_iter()
        .map(|id| id[prefix.len()..].to_string())
        .filter(|id| !id.is_empty())
        .collect()
}
