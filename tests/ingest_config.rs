// tests/ingest_config.rs
use sixers_news::ingest::config::{
    load_sources_default, load_sources_from, SourcesConfig, ENV_SOURCES_PATH,
};
use std::{env, fs};

#[test]
fn parse_toml_and_json_paths() {
    let dir = tempfile::tempdir().unwrap();

    let p_toml = dir.path().join("sources.toml");
    fs::write(
        &p_toml,
        r#"
feeds = [" https://www.nba.com/sixers/rss ", "", "https://www.nba.com/sixers/rss"]
mirror_handles = ["sixers"]
forum_query = "76ers"
"#,
    )
    .unwrap();
    let v = load_sources_from(&p_toml).unwrap();
    assert_eq!(v.feeds, vec!["https://www.nba.com/sixers/rss".to_string()]);
    assert_eq!(v.mirror_handles, vec!["sixers".to_string()]);
    assert_eq!(v.forum_query, "76ers");
    assert_eq!(v.communities, SourcesConfig::default().communities);

    let p_json = dir.path().join("sources.json");
    fs::write(&p_json, r#"{"communities": ["sixers"], "provider_timeout_secs": 4}"#).unwrap();
    let vj = load_sources_from(&p_json).unwrap();
    assert_eq!(vj.communities, vec!["sixers".to_string()]);
    assert_eq!(vj.provider_timeout().as_secs(), 4);
}

#[serial_test::serial]
#[test]
fn default_uses_env_then_fallbacks() {
    // Isolate CWD so the repo's own config/ is not picked up
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();

    env::remove_var(ENV_SOURCES_PATH);

    // 1) Nothing on disk → built-in defaults
    let v = load_sources_default().unwrap();
    assert_eq!(v, SourcesConfig::default());
    assert_eq!(v.mirror_feeds().len(), 3 * 14);

    // 2) Fallback TOML in ./config/
    let cfg_dir = tmp.path().join("config");
    fs::create_dir_all(&cfg_dir).unwrap();
    fs::write(cfg_dir.join("sources.toml"), r#"communities = ["sixers"]"#).unwrap();
    let vt = load_sources_default().unwrap();
    assert_eq!(vt.communities, vec!["sixers".to_string()]);

    // 3) Env wins over files
    let p_env = tmp.path().join("override.json");
    fs::write(&p_env, r#"{"communities": ["nba"]}"#).unwrap();
    env::set_var(ENV_SOURCES_PATH, p_env.display().to_string());
    let ve = load_sources_default().unwrap();
    assert_eq!(ve.communities, vec!["nba".to_string()]);

    // 4) Env pointing nowhere is an error
    env::set_var(ENV_SOURCES_PATH, tmp.path().join("missing.toml").display().to_string());
    assert!(load_sources_default().is_err());
    env::remove_var(ENV_SOURCES_PATH);

    env::set_current_dir(&old).unwrap();
}
