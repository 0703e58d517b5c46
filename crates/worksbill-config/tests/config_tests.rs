use rust_decimal::Decimal;
use tempfile::tempdir;
use worksbill_config::{Config, ConfigError, ConfigManager};

#[test]
fn default_config_keeps_gst_informational() {
    let cfg = Config::default();

    assert!(!cfg.currency.is_empty());
    assert!(!cfg.locale.is_empty());
    assert!(!cfg.gst_withheld);
    assert!(!cfg.payment_requires_approval);
    assert_eq!(cfg.default_gst_percentage, Decimal::from(18));
    assert_eq!(cfg.default_retention_percentage, Decimal::from(5));
}

#[test]
fn config_manager_persists_and_loads_config() {
    let dir = tempdir().expect("tempdir");
    let manager = ConfigManager::new(dir.path().join("config.json"), dir.path().join("backups"));

    let mut cfg = Config::default();
    cfg.set("currency", "inr").expect("set currency");
    cfg.set("gst_withheld", "yes").expect("set gst");

    manager.save(&cfg).expect("save config");
    let loaded = manager.load().expect("load config");

    assert_eq!(loaded.currency, "INR");
    assert!(loaded.gst_withheld);
    assert!(!dir.path().join("config.json.tmp").exists());
}

#[test]
fn missing_file_loads_defaults() {
    let dir = tempdir().expect("tempdir");
    let manager = ConfigManager::with_base_dir(dir.path().to_path_buf()).expect("manager");
    assert_eq!(manager.load().expect("load"), Config::default());
}

#[test]
fn backups_are_listed_and_restored() {
    let dir = tempdir().expect("tempdir");
    let manager = ConfigManager::with_base_dir(dir.path().to_path_buf()).expect("manager");

    let mut cfg = Config::default();
    cfg.set("default_retention_percentage", "2.5").expect("set retention");
    let name = manager
        .backup(&cfg, Some("Before FY close"))
        .expect("backup config");
    assert!(name.ends_with("_before-fy-close.json"));
    assert_eq!(manager.list_backups().expect("list"), vec![name.clone()]);

    manager.save(&Config::default()).expect("save defaults");
    let restored = manager.restore(&name).expect("restore");
    assert_eq!(restored.default_retention_percentage, Decimal::new(25, 1));
    assert_eq!(manager.load().expect("reload"), restored);
}

#[test]
fn setter_rejects_bad_values_and_unknown_keys() {
    let mut cfg = Config::default();
    assert!(matches!(
        cfg.set("default_gst_percentage", "120"),
        Err(ConfigError::InvalidValue { .. })
    ));
    assert!(matches!(
        cfg.set("gst_withheld", "maybe"),
        Err(ConfigError::InvalidValue { .. })
    ));
    assert!(matches!(
        cfg.set("backup_retention", "0"),
        Err(ConfigError::InvalidValue { .. })
    ));
    assert!(matches!(cfg.set("theme", "dark"), Err(ConfigError::UnknownKey(_))));
    assert_eq!(cfg, Config::default());
}

#[test]
fn backups_beyond_the_limit_are_pruned_and_unknown_names_rejected() {
    let dir = tempdir().expect("tempdir");
    let manager = ConfigManager::with_base_dir(dir.path().to_path_buf())
        .expect("manager")
        .with_backup_limit(2);

    let cfg = Config::default();
    for note in ["first", "second", "third"] {
        manager.backup(&cfg, Some(note)).expect("backup config");
    }
    assert_eq!(manager.list_backups().expect("list").len(), 2);

    assert!(matches!(
        manager.restore("config_missing.json"),
        Err(ConfigError::BackupNotFound(_))
    ));
    assert!(matches!(
        manager.restore("../config.json"),
        Err(ConfigError::BackupNotFound(_))
    ));
}
