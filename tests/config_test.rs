// ==========================================
// ConfigManager 集成测试
// ==========================================
// 测试目标: 验证配置读取功能的正确性
// ==========================================


use facility_airflow::config::{config_keys, ConfigManager};
use facility_airflow::engine::ConsistencyConfig;
use test_helpers::{create_test_db, insert_config, open_test_connection};

#[test]
fn test_config_manager_creation() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");

    let config_manager = ConfigManager::new(&db_path);
    assert!(
        config_manager.is_ok(),
        "ConfigManager should be created successfully"
    );
}

#[test]
fn test_consistency_config_默认值() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let config_manager = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");

    let config = config_manager.consistency_config().unwrap();
    assert_eq!(config, ConsistencyConfig::default());
    assert_eq!(config.proportion_low, 0.99);
    assert_eq!(config.proportion_high, 1.0);
    assert_eq!(config.decimals, 2);
}

#[test]
fn test_consistency_config_读取库中配置() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let conn = open_test_connection(&db_path).expect("Failed to open db");
    insert_config(&conn, config_keys::PROPORTION_TOLERANCE_LOW, "0.95").unwrap();
    insert_config(&conn, config_keys::CONSISTENCY_DECIMALS, "1").unwrap();

    let config_manager = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");
    let config = config_manager.consistency_config().unwrap();

    assert_eq!(config.proportion_low, 0.95);
    assert_eq!(config.proportion_high, 1.0);
    assert_eq!(config.decimals, 1);
}

#[test]
fn test_consistency_config_区间无效() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let conn = open_test_connection(&db_path).expect("Failed to open db");
    insert_config(&conn, config_keys::PROPORTION_TOLERANCE_LOW, "1.2").unwrap();

    let config_manager = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");
    assert!(config_manager.consistency_config().is_err());
}

#[test]
fn test_feature_flags_读写() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let config_manager = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");

    assert!(config_manager.is_manual_edit_enabled().unwrap());

    config_manager
        .set_global_config_value(config_keys::XREF_MANUAL_EDIT_ENABLED, "0")
        .unwrap();
    assert!(!config_manager.is_manual_edit_enabled().unwrap());

    config_manager
        .set_global_config_value(config_keys::XREF_MANUAL_EDIT_ENABLED, "maybe")
        .unwrap();
    assert!(config_manager.is_manual_edit_enabled().is_err());

    let snapshot = config_manager.get_config_snapshot().unwrap();
    assert!(snapshot.contains(config_keys::XREF_MANUAL_EDIT_ENABLED));
}
