use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::Deserialize;
use url::Url;

use crate::error::{Error, Result};
use crate::rotation::default_rotation;

pub const DEFAULT_GAMES_ENDPOINT: &str = "https://games.roproxy.com/v1/games";
pub const DEFAULT_GROUPS_ENDPOINT: &str = "https://groups.roblox.com/v1/groups";
pub const DEFAULT_STORE_ENDPOINT: &str = "https://firestore.googleapis.com/v1";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    /// Base URL of a CORS proxy for group lookups; requests go to `<proxy>/groups/<id>`.
    pub proxy_url: Option<String>,
    /// Document-store connection; absent selects the static fixtures.
    pub store: Option<StoreConfig>,
    pub endpoints: Endpoints,
    pub polling: Polling,
    pub assets: Assets,
    pub navigation: Navigation,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_store_endpoint")]
    pub endpoint: String,
    /// How often subscriptions re-run their query.
    #[serde(default = "default_refresh_secs")]
    pub refresh_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Endpoints {
    pub games: String,
    pub groups: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Polling {
    pub games_interval_ms: u64,
    pub groups_interval_ms: u64,
    pub rotation_interval_ms: u64,
    pub lazy_margin_px: u32,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Assets {
    pub rotation: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Navigation {
    /// Element id of a secondary control mapped to the section it opens.
    pub controls: Vec<Control>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Control {
    pub id: String,
    pub target: String,
}

fn default_store_endpoint() -> String {
    DEFAULT_STORE_ENDPOINT.to_string()
}

fn default_refresh_secs() -> u64 {
    5
}

impl Default for Endpoints {
    fn default() -> Self {
        Self { games: DEFAULT_GAMES_ENDPOINT.to_string(), groups: DEFAULT_GROUPS_ENDPOINT.to_string() }
    }
}

impl Default for Polling {
    fn default() -> Self {
        Self { games_interval_ms: 9_000, groups_interval_ms: 20_000, rotation_interval_ms: 3_500, lazy_margin_px: 200 }
    }
}

impl Default for Assets {
    fn default() -> Self {
        Self { rotation: default_rotation() }
    }
}

impl Default for Navigation {
    fn default() -> Self {
        Self { controls: vec![Control { id: "viewAnimationsBtn".into(), target: "animations".into() }] }
    }
}

impl Polling {
    pub fn games_interval(&self) -> Duration {
        Duration::from_millis(self.games_interval_ms)
    }

    pub fn groups_interval(&self) -> Duration {
        Duration::from_millis(self.groups_interval_ms)
    }

    pub fn rotation_interval(&self) -> Duration {
        Duration::from_millis(self.rotation_interval_ms)
    }
}

impl StoreConfig {
    /// A descriptor is usable once it names a project.
    pub fn is_valid(&self) -> bool {
        !self.project_id.trim().is_empty()
    }

    pub fn refresh(&self) -> Duration {
        Duration::from_secs(self.refresh_secs.max(1))
    }
}

impl Config {
    /// `showcase.toml` in the platform config directory.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "showcase").map(|dirs| dirs.config_dir().join("showcase.toml"))
    }

    /// Load from `path`, or the default location when it exists, then apply
    /// `SHOWCASE_*` environment overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_toml_str(&std::fs::read_to_string(path)?)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => {
                    tracing::debug!(path = %path.display(), "loading config");
                    Self::from_toml_str(&std::fs::read_to_string(path)?)?
                }
                None => Self::default(),
            },
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(proxy) = lookup("SHOWCASE_PROXY_URL") {
            self.proxy_url = Some(proxy).filter(|p| !p.trim().is_empty());
        }
        if let Some(project_id) = lookup("SHOWCASE_STORE_PROJECT") {
            let store = self.store.get_or_insert_with(|| StoreConfig {
                project_id: String::new(),
                api_key: None,
                endpoint: default_store_endpoint(),
                refresh_secs: default_refresh_secs(),
            });
            store.project_id = project_id;
        }
        if let Some(api_key) = lookup("SHOWCASE_STORE_API_KEY") {
            if let Some(store) = self.store.as_mut() {
                store.api_key = Some(api_key);
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.proxy()?;
        self.games_endpoint()?;
        self.groups_endpoint()?;
        if let Some(store) = &self.store {
            Url::parse(&store.endpoint)?;
        }
        let p = &self.polling;
        if p.games_interval_ms == 0 || p.groups_interval_ms == 0 || p.rotation_interval_ms == 0 {
            return Err(Error::config("polling intervals must be greater than zero"));
        }
        Ok(())
    }

    /// The configured store, when its descriptor is usable.
    pub fn live_store(&self) -> Option<&StoreConfig> {
        self.store.as_ref().filter(|s| s.is_valid())
    }

    pub fn proxy(&self) -> Result<Option<Url>> {
        self.proxy_url
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .map(|p| Url::parse(p).map_err(Error::from))
            .transpose()
    }

    pub fn games_endpoint(&self) -> Result<Url> {
        Ok(Url::parse(&self.endpoints.games)?)
    }

    pub fn groups_endpoint(&self) -> Result<Url> {
        Ok(Url::parse(&self.endpoints.groups)?)
    }

    pub fn controls(&self) -> Vec<(String, String)> {
        self.navigation.controls.iter().map(|c| (c.id.clone(), c.target.clone())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_select_static_mode_without_proxy() {
        let config = Config::default();
        assert!(config.live_store().is_none());
        assert!(config.proxy().unwrap().is_none());
        assert_eq!(config.polling.games_interval(), Duration::from_secs(9));
        assert_eq!(config.polling.groups_interval(), Duration::from_secs(20));
        assert_eq!(config.controls(), [("viewAnimationsBtn".to_string(), "animations".to_string())]);
        config.validate().unwrap();
    }

    #[test]
    fn parses_full_file() {
        let raw = r#"
            proxy_url = "https://worker.example.dev/proxy"

            [store]
            project_id = "portfolio-123"
            api_key = "key"
            refresh_secs = 10

            [polling]
            games_interval_ms = 5000

            [assets]
            rotation = ["a.png"]
        "#;
        let config = Config::from_toml_str(raw).unwrap();
        let store = config.live_store().unwrap();
        assert_eq!(store.project_id, "portfolio-123");
        assert_eq!(store.endpoint, DEFAULT_STORE_ENDPOINT);
        assert_eq!(store.refresh(), Duration::from_secs(10));
        assert_eq!(config.polling.games_interval_ms, 5000);
        assert_eq!(config.polling.groups_interval_ms, 20_000);
        assert_eq!(config.assets.rotation, ["a.png"]);
        assert_eq!(config.proxy().unwrap().unwrap().as_str(), "https://worker.example.dev/proxy");
    }

    #[test]
    fn store_without_project_is_not_live() {
        let config = Config::from_toml_str("[store]\napi_key = \"k\"\n").unwrap();
        assert!(config.store.is_some());
        assert!(config.live_store().is_none());
    }

    #[test]
    fn environment_overrides_win() {
        let env: HashMap<&str, &str> = [("SHOWCASE_PROXY_URL", "https://p.example"), ("SHOWCASE_STORE_PROJECT", "from-env")]
            .into_iter()
            .collect();
        let mut config = Config::default();
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.proxy_url.as_deref(), Some("https://p.example"));
        assert_eq!(config.live_store().unwrap().project_id, "from-env");
    }

    #[test]
    fn invalid_urls_fail_validation() {
        let config = Config::from_toml_str("proxy_url = \"not a url\"").unwrap();
        assert!(matches!(config.validate(), Err(Error::Url(_))));
    }

    #[test]
    fn load_reads_explicit_path() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("showcase.toml");
        std::fs::write(&path, "[polling]\ngroups_interval_ms = 1000\n").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.polling.groups_interval(), Duration::from_secs(1));
    }
}
