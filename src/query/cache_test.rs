use super::*;

#[test]
fn test_cache_hit_miss() {
    let cache = QueryCache::new(8);

    let key = b"c1/filter".to_vec();
    assert_eq!(cache.get(&key, 1), None);

    cache.put(key.clone(), 1, vec![Value::Integer(42)]);
    assert_eq!(cache.get(&key, 1), Some(vec![Value::Integer(42)]));

    // a bumped version invalidates the entry.
    assert_eq!(cache.get(&key, 2), None);
    assert_eq!(cache.get(&key, 1), None);

    let stats = cache.to_stats();
    assert_eq!(stats.n_hits, 1);
    assert_eq!(stats.n_misses, 3);
    assert_eq!(stats.n_entries, 0);
}

#[test]
fn test_cache_lru_eviction() {
    let cache = QueryCache::new(2);

    cache.put(b"a".to_vec(), 1, vec![]);
    cache.put(b"b".to_vec(), 1, vec![]);
    // touch `a`, making `b` the eviction victim.
    assert!(cache.get(b"a", 1).is_some());
    cache.put(b"c".to_vec(), 1, vec![]);

    assert!(cache.get(b"a", 1).is_some());
    assert!(cache.get(b"b", 1).is_none());
    assert!(cache.get(b"c", 1).is_some());
    assert_eq!(cache.to_stats().n_entries, 2);
}

#[test]
fn test_cache_disabled() {
    let cache = QueryCache::new(0);
    assert!(!cache.is_enabled());

    cache.put(b"a".to_vec(), 1, vec![Value::Null]);
    assert_eq!(cache.get(b"a", 1), None);
    assert_eq!(cache.to_stats().n_entries, 0);
}
