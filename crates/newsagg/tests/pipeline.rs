//! Ingestion cycles into an on-disk database, then querying and digesting.

use chrono::Utc;
use newsagg::config::SummarizerBackend;
use newsagg::digest::load_entries;
use newsagg::{compose_digest, Config, IngestionOrchestrator, Storage};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FEED: &str = r#"<?xml version="1.0"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Orbit Weekly</title>
  <id>urn:orbit</id>
  <updated>2024-01-01T00:00:00Z</updated>
  <entry>
    <title>Probe reaches Jupiter</title>
    <id>urn:orbit:1</id>
    <link href="https://orbit.example/jupiter"/>
    <content type="html">&lt;p&gt;The lander arrived. It sent pictures.&lt;/p&gt;</content>
  </entry>
  <entry>
    <title>Telescope upgrade</title>
    <id>urn:orbit:2</id>
    <link href="https://orbit.example/telescope"/>
    <summary>Mirrors were replaced. Results soon.</summary>
  </entry>
</feed>"#;

async fn feed_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/atom.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
        .mount(&server)
        .await;
    server
}

fn config_for(server: &MockServer, dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.storage.database_path = Some(dir.path().join("data").join("news.db"));
    config.sources.web_feeds = vec![format!("{}/atom.xml", server.uri())];
    config.sources.reddit_communities = Vec::new();
    config
}

#[tokio::test]
async fn test_extractive_cycle_then_digest() {
    let server = feed_server().await;
    let dir = TempDir::new().unwrap();
    let mut config = config_for(&server, &dir);
    config.summarizer.backend = SummarizerBackend::Extractive;
    config.summarizer.max_sentences = 1;

    let orchestrator = IngestionOrchestrator::from_config(&config).unwrap();
    let report = orchestrator.run_once().await.unwrap();
    assert_eq!(report.inserted, 2);
    assert_eq!(report.summarized, 2);

    let again = orchestrator.run_once().await.unwrap();
    assert_eq!(again.inserted, 0);
    assert_eq!(again.duplicates, 2);
    assert_eq!(again.summarized, 0);

    // A second connection sees the same data.
    let storage = Storage::open(config.database_path()).unwrap();
    let stats = storage.stats().unwrap();
    assert_eq!(stats.total_articles, 2);
    assert_eq!(stats.total_sources, 1);
    assert_eq!(stats.total_summaries, 2);

    let found = storage.search("jupiter", Some("Orbit Weekly"), 10).unwrap();
    assert_eq!(found.len(), 1);
    let summary = storage.summary_for(found[0].id).unwrap().unwrap();
    assert_eq!(summary.summary, "The lander arrived.");

    let entries = load_entries(&storage, Utc::now() - chrono::Duration::hours(1), 50).unwrap();
    let html = compose_digest(&entries, "Today").unwrap();
    assert!(html.contains("Probe reaches Jupiter"));
    assert!(html.contains("The lander arrived."));
    assert!(html.contains("Mirrors were replaced."));
}

#[tokio::test]
async fn test_ollama_cycle() {
    let server = feed_server().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({"model": "tiny", "stream": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": "Short."})))
        .expect(2)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = config_for(&server, &dir);
    config.summarizer.backend = SummarizerBackend::Ollama;
    config.summarizer.ollama_url = server.uri();
    config.summarizer.model = "tiny".to_string();

    let orchestrator = IngestionOrchestrator::from_config(&config).unwrap();
    let report = orchestrator.run_once().await.unwrap();
    assert_eq!(report.summarized, 2);

    let storage = orchestrator.storage();
    for article in storage.recent(10).unwrap() {
        let summary = storage.summary_for(article.id).unwrap().unwrap();
        assert_eq!(summary.summarizer, "ollama");
        assert_eq!(summary.summary, "Short.");
    }
}

#[tokio::test]
async fn test_retention_applies_each_cycle() {
    let server = feed_server().await;
    let dir = TempDir::new().unwrap();
    let mut config = config_for(&server, &dir);
    config.summarizer.backend = SummarizerBackend::None;
    config.storage.max_articles = 1;

    let orchestrator = IngestionOrchestrator::from_config(&config).unwrap();
    let report = orchestrator.run_once().await.unwrap();
    assert_eq!(report.inserted, 2);
    assert_eq!(report.pruned, 1);
    assert_eq!(orchestrator.storage().count().unwrap(), 1);
}
