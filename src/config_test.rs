use std::convert::TryFrom;

use super::*;

#[test]
fn test_config_default() {
    let config = Config::default();
    assert_eq!(config.hash_capacity, hash::DEFAULT_CAPACITY);
    assert_eq!(config.btree_order, bplus::DEFAULT_ORDER);
    assert_eq!(config.cache_limit, DEFAULT_CACHE_LIMIT);
    assert_eq!(config.max_memory, None);
    config.validate().unwrap();
}

#[test]
fn test_config_from_toml() {
    let text = r#"
        hash_capacity = 64
        btree_order = 16
        cache_limit = 0
        max_memory = 1048576
    "#;
    let config = Config::try_from(text).unwrap();
    assert_eq!(config.hash_capacity, 64);
    assert_eq!(config.btree_order, 16);
    assert_eq!(config.cache_limit, 0);
    assert_eq!(config.max_memory, Some(1048576));

    // partial documents fall back to defaults.
    let config = Config::try_from("btree_order = 8").unwrap();
    assert_eq!(config.btree_order, 8);
    assert_eq!(config.hash_capacity, hash::DEFAULT_CAPACITY);

    assert!(Config::try_from("btree_order = 2").is_err());
    assert!(Config::try_from("hash_capacity = 0").is_err());
    assert!(Config::try_from("this is not toml").is_err());
}

#[test]
fn test_config_builder() {
    let mut config = Config::default();
    config
        .set_hash_capacity(32)
        .set_btree_order(8)
        .set_cache_limit(16)
        .set_max_memory(Some(4096));
    assert_eq!(config.hash_capacity, 32);
    assert_eq!(config.btree_order, 8);
    assert_eq!(config.cache_limit, 16);
    assert_eq!(config.max_memory, Some(4096));
}
