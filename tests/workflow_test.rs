use std::path::Path;

fn workflow() -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join(".github/workflows/update-blocklist.yml");
    std::fs::read_to_string(path).expect("workflow file should exist")
}

#[test]
fn test_workflow_runs_daily_at_three_utc() {
    let content = workflow();
    assert!(content.contains("cron: '0 3 * * *'"));
    assert!(content.contains("workflow_dispatch:"));
}

#[test]
fn test_workflow_runs_the_tool_once() {
    let content = workflow();
    assert_eq!(content.matches("cargo run --release").count(), 1);
}

#[test]
fn test_workflow_passes_secrets() {
    let content = workflow();
    assert!(content.contains("NEXTDNS_API_KEY: ${{ secrets.NEXTDNS_API_KEY }}"));
    assert!(content.contains("NEXTDNS_PROFILE_ID: ${{ secrets.NEXTDNS_PROFILE_ID }}"));
}

#[test]
fn test_bundled_source_list_parses() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("blocklists.txt");
    let content = std::fs::read_to_string(path).expect("blocklists.txt should exist");
    let sources = nextdns_blocklist::domain::services::parse_source_list(&content);
    assert!(!sources.is_empty());
    for source in sources {
        assert!(nextdns_blocklist::utils::validation::validate_url("source", &source.url).is_ok());
    }
}

#[test]
fn test_example_config_parses() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("nextdns-blocklist.example.toml");
    let config = nextdns_blocklist::TomlConfig::from_file(path).expect("example config parses");
    assert_eq!(config.sync.add_batch_size, Some(500));
    assert_eq!(config.sources.file.as_deref(), Some("blocklists.txt"));
}
