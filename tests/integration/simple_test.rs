//! Simple integration test to verify basic infrastructure works

#[tokio::test]
async fn test_basic_infrastructure() {
    common::init_test_env();

    // Spawned tasks must be able to report back on the test runtime
    let handle = tokio::spawn(async { 2 + 2 });
    assert_eq!(handle.await.unwrap(), 4);

    println!("✅ Integration test infrastructure is working");
}

#[tokio::test]
async fn test_config_loading() {
    use crate::common::TestConfig;

    let config = TestConfig::from_env();
    assert!(!config.collection_name.is_empty());
    assert!(config.app_config().validate().is_ok());

    println!("✅ Configuration loading works");
}

mod common;
