//! End-to-end runs against the snapshot backend.

use std::sync::Arc;

use serde_json::json;

use crate::{
    backend::{ContentIndex, MemoryBackend, UserLibrary},
    config::SuggestionConfig,
    suggest::SuggestionService,
    SuggestionSource,
};

fn write_snapshot(dir: &std::path::Path) -> std::path::PathBuf {
    let snapshot = json!({
        "users": [
            {
                "id": "reader@example.com",
                "bookmarks": [
                    {"url": "https://blog.example/async-rust", "title": "Async Rust", "embedding": [0.9, 0.1, 0.0, 0.0]},
                    {"url": "https://blog.example/tokio-tips", "embedding": "[0.8, 0.2, 0.0, 0.0]"}
                ],
                "newsletters": [
                    {"subject": "This Week in Rust 550", "embedding": {"embedding": [1.0, 0.0, 0.0, 0.0]}}
                ]
            },
            {"id": "newcomer", "bookmarks": [], "newsletters": []}
        ],
        "content": [
            {"id": "1", "url": "https://blog.example/async-rust", "title": "Async Rust", "created_at": "2024-05-01T00:00:00Z", "embedding": [0.9, 0.1, 0.0, 0.0]},
            {"id": "2", "url": "https://news.example/executors", "title": "Writing an executor", "created_at": "2024-05-02T00:00:00Z", "embedding": [0.85, 0.15, 0.0, 0.0]},
            {"id": "3", "url": "https://news.example/twir-550", "title": "This Week in Rust 550", "created_at": "2024-05-03T00:00:00Z", "embedding": [0.95, 0.05, 0.0, 0.0]},
            {"id": "4", "url": "https://news.example/gardening", "title": "Spring gardening", "created_at": "2024-05-04T00:00:00Z", "embedding": [0.0, 0.0, 1.0, 0.0]},
            {"id": "5", "url": "https://news.example/draft", "title": "Unfinished draft", "status": "pending", "created_at": "2024-05-05T00:00:00Z", "embedding": [0.9, 0.1, 0.0, 0.0]}
        ]
    });

    let path = dir.join("snapshot.json");
    std::fs::write(&path, serde_json::to_string_pretty(&snapshot).unwrap()).unwrap();
    path
}

fn service(path: &std::path::Path) -> SuggestionService {
    let backend = Arc::new(MemoryBackend::load(path).unwrap());
    let library: Arc<dyn UserLibrary> = backend.clone();
    let index: Arc<dyn ContentIndex> = backend;

    SuggestionService::new(library, index, SuggestionConfig::default()).unwrap()
}

#[test]
fn test_personalized_from_snapshot() {
    let tmp = tempfile::tempdir().unwrap();
    let service = service(&write_snapshot(tmp.path()));

    let result = service.suggest("reader@example.com", 10).unwrap();
    let ids: Vec<&str> = result.items.iter().map(|c| c.id.as_str()).collect();

    // 1 is bookmarked, 3 was already received, 4 is unrelated, 5 is pending
    assert_eq!(result.source, SuggestionSource::Personalized);
    assert_eq!(ids, vec!["2"]);
    assert!(result.items[0].similarity.unwrap() >= 0.7);
}

#[test]
fn test_new_user_gets_recent_content() {
    let tmp = tempfile::tempdir().unwrap();
    let service = service(&write_snapshot(tmp.path()));

    let result = service.suggest("newcomer", 3).unwrap();
    let ids: Vec<&str> = result.items.iter().map(|c| c.id.as_str()).collect();

    assert_eq!(result.source, SuggestionSource::Recent);
    assert_eq!(ids, vec!["4", "3", "2"]);
}

#[test]
fn test_unknown_user_gets_recent_content() {
    let tmp = tempfile::tempdir().unwrap();
    let service = service(&write_snapshot(tmp.path()));

    let result = service.suggest("stranger", 10).unwrap();

    assert_eq!(result.source, SuggestionSource::Recent);
    assert_eq!(result.items.len(), 4);
}

#[test]
fn test_strict_threshold_falls_back() {
    let tmp = tempfile::tempdir().unwrap();
    let backend = Arc::new(MemoryBackend::load(&write_snapshot(tmp.path())).unwrap());
    let config = SuggestionConfig {
        similarity_threshold: 1.0,
        ..Default::default()
    };
    let service = SuggestionService::new(backend.clone(), backend, config).unwrap();

    let result = service.suggest("reader@example.com", 10).unwrap();
    let ids: Vec<&str> = result.items.iter().map(|c| c.id.as_str()).collect();

    assert_eq!(result.source, SuggestionSource::Recent);
    assert_eq!(ids, vec!["4", "2"]);
}
