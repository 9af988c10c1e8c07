use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use showcase::dom::lock;
use showcase::page::skeleton;
use showcase::prelude::*;
use showcase::rotation::default_rotation;
use showcase::source::firestore::decode_run_query;
use showcase::source::LiveSource;
use showcase::stats::{GameStats, GamesResponse, GroupStats};

fn read_fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name);
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("failed to read {}: {e}", path.display()))
}

/// Serves the recorded `runQuery` fixture for `projects` and one group for `worked`.
struct FixtureStore;

#[async_trait]
impl DocumentStore for FixtureStore {
    async fn visible(&self, collection: Collection) -> Result<Vec<Value>> {
        match collection {
            Collection::Projects => decode_run_query(&read_fixture("firestore_run_query.json")),
            Collection::Worked => Ok(vec![json!({ "groupId": 42, "groupTitle": "Studio", "show": true })]),
            Collection::Animations | Collection::MyProjects => Ok(Vec::new()),
        }
    }
}

struct FixtureStats {
    games: Vec<GameStats>,
    group_calls: Mutex<Vec<String>>,
}

#[async_trait]
impl StatsApi for FixtureStats {
    async fn game_stats(&self, universe_ids: &[String]) -> Result<Vec<GameStats>> {
        Ok(self
            .games
            .iter()
            .filter(|g| g.universe_id.as_ref().is_some_and(|id| universe_ids.contains(id)))
            .cloned()
            .collect())
    }

    async fn group_stats(&self, group_id: &str) -> Result<GroupStats> {
        self.group_calls.lock().unwrap().push(group_id.to_string());
        Ok(GroupStats { member_count: Some(2_500) })
    }
}

fn text_of(doc: &SharedDocument<MemoryDocument>, id: &str) -> Option<String> {
    let doc = lock(&**doc);
    doc.element_by_id(id).map(|el| doc.text(el))
}

async fn wait_for(doc: &SharedDocument<MemoryDocument>, id: &str, expected: &str) {
    for _ in 0..200 {
        if text_of(doc, id).as_deref() == Some(expected) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("{id} never became {expected:?}; last seen {:?}", text_of(doc, id));
}

#[test]
fn run_query_fixture_decodes_into_game_entities() {
    let docs = decode_run_query(&read_fixture("firestore_run_query.json")).unwrap();
    let Catalog::Games(games) = Catalog::decode(Collection::Projects, docs) else {
        panic!("projects collection must decode to games");
    };
    assert_eq!(games.len(), 2);
    assert_eq!(games[0].id.as_deref(), Some("abc123"));
    assert_eq!(games[0].universe_id.as_deref(), Some("4821337"));
    assert_eq!(games[1].game_title.as_deref(), Some("Tycoon <Deluxe>"));
    assert!(games.iter().all(|g| g.show));
}

#[test]
fn games_fixture_tolerates_missing_counts() {
    let resp: GamesResponse = serde_json::from_str(&read_fixture("games.json")).unwrap();
    assert_eq!(resp.data.len(), 2);
    assert_eq!(resp.data[0].playing, Some(1234));
    assert_eq!(resp.data[1].universe_id.as_deref(), Some("99"));
    assert_eq!(resp.data[1].playing, None);
}

#[tokio::test]
async fn live_snapshots_render_and_pull_in_stats() {
    let games: GamesResponse = serde_json::from_str(&read_fixture("games.json")).unwrap();
    let stats = Arc::new(FixtureStats { games: games.data, group_calls: Mutex::new(Vec::new()) });
    let source = DataSource::Live(LiveSource::new(Arc::new(FixtureStore), Duration::from_secs(60)));

    let mut app = Portfolio::new(Config::default(), shared(MemoryDocument::new(skeleton(&default_rotation()))))
        .with_stats_api(stats.clone())
        .with_source(source);
    app.initialize(Some("#projects")).unwrap();
    assert!(app.is_live());
    assert_eq!(app.navigator().unwrap().active(), Some("projects"));

    let doc = app.document().clone();
    {
        let doc = lock(&*doc);
        let container = doc.element_by_id(Category::Games.container_id()).unwrap();
        assert!(doc.descendants(container).is_empty(), "live mode renders nothing before the first snapshot");
    }

    let running = app.spawn().unwrap();
    wait_for(&doc, "playing-4821337", "1,234").await;
    wait_for(&doc, "visits-4821337", "9,876,543").await;
    wait_for(&doc, "visits-99", "12").await;
    assert_eq!(text_of(&doc, "playing-99").as_deref(), Some("0"));
    wait_for(&doc, "memberCount-42", "2,500").await;
    assert!(stats.group_calls.lock().unwrap().iter().all(|id| id == "42"));

    {
        let doc = lock(&*doc);
        let html = doc.to_html();
        assert!(html.contains("Tycoon &lt;Deluxe&gt;"));
        assert!(html.contains("No animations available at this time."));
        assert!(html.contains(r#"src="https://cdn.example.test/obby.png""#));
    }
    running.abort();
}

#[tokio::test]
async fn static_mode_serves_fallback_groups() {
    let stats = Arc::new(FixtureStats { games: Vec::new(), group_calls: Mutex::new(Vec::new()) });
    let mut app = Portfolio::new(Config::default(), shared(MemoryDocument::new(skeleton(&default_rotation()))))
        .with_stats_api(stats.clone());
    app.initialize(None).unwrap();
    assert!(!app.is_live());

    let doc = app.document().clone();
    let group_ids = lock(&*doc).ids_with_prefix("memberCount-");
    assert!(!group_ids.is_empty());

    let running = app.spawn().unwrap();
    for id in &group_ids {
        wait_for(&doc, id, "2,500").await;
    }
    running.abort();
}
