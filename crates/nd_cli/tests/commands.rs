use std::io::Write;

use clap::Parser;
use nd_cli::{handle_command, Cli};

const FEED: &str = r#"[
    {"title": "Vaccine approved for children", "content": "Regulators approved the vaccine.",
     "publication_date": "2024-05-02T10:00:00Z", "url": "https://news.example.com/vaccine"},
    {"title": "Vaccine trial expands", "content": "A new vaccine trial starts.",
     "publication_date": "2024-05-03T10:00:00Z", "url": "https://news.example.com/trial"},
    {"title": "Local football results", "content": "The home team won.",
     "publication_date": "2024-04-20T10:00:00Z", "url": "https://news.example.com/football"}
]"#;

fn feed_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(FEED.as_bytes()).unwrap();
    file
}

#[tokio::test]
async fn test_filters_command_runs() {
    let feed = feed_file();
    let cli = Cli::try_parse_from([
        "nd",
        "--input",
        feed.path().to_str().unwrap(),
        "filters",
        "--start",
        "2024-05-01",
        "-k",
        "vaccine",
    ])
    .unwrap();
    handle_command(cli).await.unwrap();
}

#[tokio::test]
async fn test_tag_with_dummy_provider_exports_matches() {
    let feed = feed_file();
    let dir = tempfile::tempdir().unwrap();
    let export = dir.path().join("matches.json");

    let cli = Cli::try_parse_from([
        "nd",
        "--input",
        feed.path().to_str().unwrap(),
        "tag",
        "--name",
        "vaccines",
        "--prompt",
        "vaccine",
        "--provider",
        "Dummy",
        "--start",
        "2024-05-01",
        "--export",
        export.to_str().unwrap(),
    ])
    .unwrap();
    handle_command(cli).await.unwrap();

    let records: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&export).unwrap()).unwrap();
    let records = records.as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["title"], "Vaccine approved for children");
    assert_eq!(records[0]["filters"]["date_filter"], true);
    assert_eq!(records[0]["filters"]["vaccines"]["match"], true);
}

#[tokio::test]
async fn test_group_and_similar_use_offline_embeddings() {
    let feed = feed_file();
    let path = feed.path().to_str().unwrap();

    let group = Cli::try_parse_from(["nd", "--input", path, "group", "--threshold", "0.5", "--dendrogram"]).unwrap();
    handle_command(group).await.unwrap();

    let similar = Cli::try_parse_from(["nd", "--input", path, "similar", "--title", "Vaccine trial expands"]).unwrap();
    handle_command(similar).await.unwrap();

    let missing = Cli::try_parse_from(["nd", "--input", path, "similar", "--title", "Nope"]).unwrap();
    assert!(handle_command(missing).await.is_err());
}

#[tokio::test]
async fn test_missing_feed_is_an_error() {
    let cli = Cli::try_parse_from(["nd", "--input", "/no/such/feed.json", "filters"]).unwrap();
    let err = handle_command(cli).await.unwrap_err();
    assert!(err.to_string().contains("Failed to load articles"));
}

#[tokio::test]
async fn test_narrow_feed_embeddings_are_rejected_before_filling() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(
        br#"[
        {"title": "One", "content": "a", "publication_date": "2024-05-02T10:00:00Z", "embedding": [1.0]},
        {"title": "Two", "content": "b", "publication_date": "2024-05-03T10:00:00Z"}
    ]"#,
    )
    .unwrap();
    let path = file.path().to_str().unwrap();

    let group = Cli::try_parse_from(["nd", "--input", path, "group"]).unwrap();
    let err = handle_command(group).await.unwrap_err();
    assert!(err.to_string().contains("offline embedder needs at least 2"), "{}", err);
}

#[tokio::test]
async fn test_mixed_feed_embedding_widths_are_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(
        br#"[
        {"title": "One", "content": "a", "publication_date": "2024-05-02T10:00:00Z", "embedding": [1.0, 0.0]},
        {"title": "Two", "content": "b", "publication_date": "2024-05-03T10:00:00Z", "embedding": [1.0, 0.0, 0.0]},
        {"title": "Three", "content": "c", "publication_date": "2024-05-04T10:00:00Z"}
    ]"#,
    )
    .unwrap();
    let path = file.path().to_str().unwrap();

    let similar = Cli::try_parse_from(["nd", "--input", path, "similar", "--title", "One"]).unwrap();
    let err = handle_command(similar).await.unwrap_err();
    assert!(err.to_string().contains("mixed widths"), "{}", err);
}
