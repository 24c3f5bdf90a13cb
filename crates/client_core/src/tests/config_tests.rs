use std::{
    collections::HashMap,
    env,
    time::{SystemTime, UNIX_EPOCH},
};

use super::*;

fn temp_file(name: &str, contents: &str) -> std::path::PathBuf {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let path = env::temp_dir().join(format!("asset_client_{name}_{suffix}.toml"));
    fs::write(&path, contents).expect("write settings");
    path
}

#[test]
fn missing_file_yields_defaults() {
    let settings = load_settings_from(Path::new("/nonexistent/asset_client.toml"));
    assert_eq!(settings, Settings::default());
    assert_eq!(settings.search_debounce(), Duration::from_millis(300));
}

#[test]
fn file_values_override_defaults() {
    let path = temp_file(
        "file",
        "api_base_url = \"https://assets.example.com/api\"\nsearch_debounce_ms = 450\n",
    );
    let settings = load_settings_from(&path);
    assert_eq!(settings.api_base_url, "https://assets.example.com/api");
    assert_eq!(settings.search_debounce_ms, 450);
    assert_eq!(settings.request_timeout_ms, 15_000);
    fs::remove_file(path).expect("cleanup");
}

#[test]
fn unparsable_file_is_ignored() {
    let path = temp_file("broken", "search_debounce_ms = \"soon\"\n");
    assert_eq!(load_settings_from(&path), Settings::default());
    fs::remove_file(path).expect("cleanup");
}

#[test]
fn env_overrides_win_and_bad_numbers_are_skipped() {
    let vars: HashMap<&str, &str> = HashMap::from([
        ("APP__API_BASE_URL", "http://10.0.0.5:9000/api"),
        ("APP__REQUEST_TIMEOUT_MS", "2500"),
        ("APP__SEARCH_DEBOUNCE_MS", "later"),
    ]);
    let mut settings = Settings::default();
    apply_overrides(&mut settings, |key| vars.get(key).map(|v| v.to_string()));

    assert_eq!(settings.api_base_url, "http://10.0.0.5:9000/api");
    assert_eq!(settings.request_timeout_ms, 2500);
    assert_eq!(settings.search_debounce_ms, 300);
}
