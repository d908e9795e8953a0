use super::load::{default_config_path, default_state_path, resolve_config_path};
use super::schema::*;
use crate::audio::EqPreset;
use crate::testutil::{EnvGuard, env_lock};

#[test]
fn resolve_config_path_prefers_milonga_config_path() {
    let _lock = env_lock();
    let _g1 = EnvGuard::set("MILONGA_CONFIG_PATH", "/tmp/milonga-test-config.toml");
    assert_eq!(
        resolve_config_path().unwrap(),
        std::path::PathBuf::from("/tmp/milonga-test-config.toml")
    );
}

#[test]
fn default_config_path_prefers_xdg_config_home() {
    let _lock = env_lock();
    let _g1 = EnvGuard::set("XDG_CONFIG_HOME", "/tmp/xdg-config-home");
    let _g2 = EnvGuard::set("HOME", "/tmp/home-should-not-win");

    let p = default_config_path().unwrap();
    assert_eq!(
        p,
        std::path::PathBuf::from("/tmp/xdg-config-home")
            .join("milonga")
            .join("config.toml")
    );
}

#[test]
fn default_state_path_falls_back_to_home_local_share() {
    let _lock = env_lock();
    let _g1 = EnvGuard::remove("XDG_DATA_HOME");
    let _g2 = EnvGuard::set("HOME", "/tmp/home-dir");

    let p = default_state_path().unwrap();
    assert_eq!(
        p,
        std::path::PathBuf::from("/tmp/home-dir")
            .join(".local/share")
            .join("milonga")
            .join("state.toml")
    );
}

#[test]
fn defaults_match_a_ten_band_unity_gain_player() {
    let s = Settings::default();
    assert_eq!(s.audio.equalizer_bands, 10);
    assert_eq!(s.audio.buffer_size, 8192);
    assert_eq!(s.audio.volume, 14);
    assert_eq!(s.playback.wait_seconds, 0);
    assert_eq!(s.playback.block_genres, vec!["Tango", "Vals", "Milonga"]);
    assert_eq!(s.playback.prev_restart_seconds, 4);
    assert_eq!(s.persistence.flush_interval_secs, 600);
    assert!(s.validate().is_ok());
}

#[test]
fn settings_load_from_config_file() {
    let _lock = env_lock();

    let dir = tempfile::tempdir().unwrap();
    let cfg_path = dir.path().join("config.toml");
    std::fs::write(
        &cfg_path,
        r#"
[audio]
equalizer_bands = 31
volume = 12
balance = -3
equalizer_enabled = true
equalizer_preset = "bass-plus"

[playback]
wait_seconds = 3
block_genres = ["Tango", "Vals"]
start_paused = false

[library]
extensions = ["wav", "wave"]
recursive = false

[persistence]
flush_interval_secs = 60
state_path = "/tmp/milonga-state.toml"

[logging]
level = "debug"
"#,
    )
    .unwrap();

    let _g1 = EnvGuard::set("MILONGA_CONFIG_PATH", cfg_path.to_str().unwrap());
    let _g2 = EnvGuard::remove("MILONGA__PLAYBACK__WAIT_SECONDS");
    let _g3 = EnvGuard::remove("MILONGA__PLAYBACK__BLOCK_GENRES");

    let s = Settings::load().unwrap();
    assert_eq!(s.audio.equalizer_bands, 31);
    assert_eq!(s.audio.volume, 12);
    assert_eq!(s.audio.balance, -3);
    assert!(s.audio.equalizer_enabled);
    assert_eq!(s.audio.equalizer_preset, Some(EqPreset::BassPlus));
    assert_eq!(s.playback.wait_seconds, 3);
    assert_eq!(s.playback.block_genres, vec!["Tango", "Vals"]);
    assert!(!s.playback.start_paused);
    assert_eq!(s.library.extensions, vec!["wav", "wave"]);
    assert!(!s.library.recursive);
    assert_eq!(s.persistence.flush_interval_secs, 60);
    assert_eq!(
        s.persistence.resolve_state_path(),
        Some(std::path::PathBuf::from("/tmp/milonga-state.toml"))
    );
    assert_eq!(s.logging.level, "debug");
    assert!(s.validate().is_ok());
}

#[test]
fn settings_env_overrides_config_file() {
    let _lock = env_lock();

    let dir = tempfile::tempdir().unwrap();
    let cfg_path = dir.path().join("config.toml");
    std::fs::write(
        &cfg_path,
        r#"
[playback]
wait_seconds = 2
"#,
    )
    .unwrap();

    let _g1 = EnvGuard::set("MILONGA_CONFIG_PATH", cfg_path.to_str().unwrap());
    let _g2 = EnvGuard::set("MILONGA__PLAYBACK__WAIT_SECONDS", "5");
    let _g3 = EnvGuard::set("MILONGA__PLAYBACK__BLOCK_GENRES", "Tango,Milonga");

    let s = Settings::load().unwrap();
    assert_eq!(s.playback.wait_seconds, 5);
    assert_eq!(s.playback.block_genres, vec!["Tango", "Milonga"]);
}

#[test]
fn validate_rejects_unsupported_band_counts_and_long_waits() {
    let mut s = Settings::default();
    s.audio.equalizer_bands = 12;
    assert!(s.validate().unwrap_err().contains("equalizer_bands"));

    let mut s = Settings::default();
    s.playback.wait_seconds = 11;
    assert!(s.validate().unwrap_err().contains("wait_seconds"));

    let mut s = Settings::default();
    s.audio.volume = 21;
    assert!(s.validate().is_err());
}
