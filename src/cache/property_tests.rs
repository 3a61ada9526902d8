//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check provider behavior over generated keys, values and
//! operation sequences, backed by the in-memory store.

use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cache::CacheProvider;
use crate::store::{glob_match, MemoryStore};

// == Test Helpers ==
fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn memory_provider() -> CacheProvider {
    CacheProvider::new(Arc::new(MemoryStore::new()))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Profile {
    id: u32,
    name: String,
    tags: Vec<String>,
    score: Option<i64>,
}

// == Strategies ==
/// Generates valid cache keys without glob metacharacters
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_:]{1,64}"
}

fn profile_strategy() -> impl Strategy<Value = Profile> {
    (
        any::<u32>(),
        "[a-zA-Z0-9 ]{0,32}",
        prop::collection::vec("[a-z]{1,8}", 0..5),
        any::<Option<i64>>(),
    )
        .prop_map(|(id, name, tags, score)| Profile {
            id,
            name,
            tags,
            score,
        })
}

/// Generates a sequence of provider operations
#[derive(Debug, Clone)]
enum CacheOp {
    Add { key: String, value: i64 },
    Get { key: String },
    Remove { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    // Small key space so operations collide
    let key = "k[0-4]";
    prop_oneof![
        (key, any::<i64>()).prop_map(|(key, value)| CacheOp::Add { key, value }),
        key.prop_map(|key| CacheOp::Get { key }),
        key.prop_map(|key| CacheOp::Remove { key }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // Property: Round-trip
    // *For any* structured value, adding it and reading it back before
    // expiration returns an equal value.
    #[test]
    fn prop_roundtrip_storage(key in valid_key_strategy(), value in profile_strategy()) {
        let rt = runtime();
        let provider = memory_provider();

        let retrieved = rt.block_on(async {
            provider.add(&key, &value).await;
            provider.get::<Profile>(&key).await
        }).unwrap();

        prop_assert_eq!(retrieved, Some(value));
    }

    // Property: Last writer wins
    // *For any* key written twice, reads return the second value.
    #[test]
    fn prop_overwrite_semantics(
        key in valid_key_strategy(),
        first in profile_strategy(),
        second in profile_strategy()
    ) {
        let rt = runtime();
        let provider = memory_provider();

        let retrieved = rt.block_on(async {
            provider.add(&key, &first).await;
            provider.add(&key, &second).await;
            provider.get::<Profile>(&key).await
        }).unwrap();

        prop_assert_eq!(retrieved, Some(second));
    }

    // Property: Operation sequences match a map model
    // *For any* sequence of add, get and remove, every get returns what a
    // plain map would hold, and hit/miss counters match the observed reads.
    #[test]
    fn prop_sequence_matches_model(ops in prop::collection::vec(cache_op_strategy(), 1..50)) {
        let rt = runtime();
        let provider = memory_provider();
        let mut model: HashMap<String, i64> = HashMap::new();
        let mut expected_hits = 0u64;
        let mut expected_misses = 0u64;

        for op in ops {
            match op {
                CacheOp::Add { key, value } => {
                    rt.block_on(provider.add(&key, &value));
                    model.insert(key, value);
                }
                CacheOp::Get { key } => {
                    let got = rt.block_on(provider.get::<i64>(&key)).unwrap();
                    prop_assert_eq!(got, model.get(&key).copied());
                    if got.is_some() {
                        expected_hits += 1;
                    } else {
                        expected_misses += 1;
                    }
                }
                CacheOp::Remove { key } => {
                    rt.block_on(provider.remove(&key));
                    model.remove(&key);
                }
            }
        }

        let stats = provider.stats();
        prop_assert_eq!(stats.hits, expected_hits, "Hits mismatch");
        prop_assert_eq!(stats.misses, expected_misses, "Misses mismatch");
        prop_assert_eq!(stats.write_failures, 0);
    }

    // Property: Pattern removal deletes exactly the matching keys
    #[test]
    fn prop_pattern_removal(
        keys in prop::collection::hash_set("(user|order|cart):[0-9]{1,3}", 1..30),
        prefix in prop_oneof![Just("user"), Just("order"), Just("cart")]
    ) {
        let rt = runtime();
        let provider = memory_provider();
        let pattern = format!("{}:*", prefix);
        let expected: Vec<&String> = keys.iter().filter(|k| glob_match(&pattern, k)).collect();

        let removed = rt.block_on(async {
            for key in &keys {
                provider.add(key, &1).await;
            }
            provider.remove_key_with_pattern(&pattern).await
        });

        prop_assert_eq!(removed, expected.len());
        for key in &keys {
            let present = rt.block_on(provider.contains(key)).unwrap();
            prop_assert_eq!(present, !key.starts_with(&format!("{}:", prefix)));
        }
    }

    // Property: Read-through populates once
    // *For any* key, repeated ensure calls run the supplier once and all
    // return the first produced value.
    #[test]
    fn prop_ensure_populates_once(key in valid_key_strategy(), values in prop::collection::vec(any::<i32>(), 1..10)) {
        let rt = runtime();
        let provider = memory_provider();
        let calls = AtomicUsize::new(0);

        for value in &values {
            let got = rt.block_on(provider.ensure(&key, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(*value)
            })).unwrap();
            prop_assert_eq!(got, values[0]);
        }

        prop_assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    // Property: Literal patterns only match themselves
    #[test]
    fn prop_literal_pattern_matches_itself(key in "[a-zA-Z0-9_:]{1,32}", other in "[a-zA-Z0-9_:]{1,32}") {
        prop_assert!(glob_match(&key, &key));
        prop_assert_eq!(glob_match(&key, &other), key == other);
    }
}

// == Property Test for Error Response Format ==
// This tests the CacheError -> HTTP response conversion

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // Property: Error Response Format
    // *For any* error condition, the HTTP response includes a JSON body
    // with an "error" field containing a descriptive message.
    #[test]
    fn prop_error_response_format(
        error_msg in "[a-zA-Z0-9 _-]{1,100}"
    ) {
        use crate::error::{CacheError, StoreError};
        use axum::response::IntoResponse;
        use axum::body::to_bytes;

        let error_variants = vec![
            CacheError::NotFound(error_msg.clone()),
            CacheError::InvalidRequest(error_msg.clone()),
            CacheError::Store(StoreError::new("redis", "GET", "k", error_msg.clone())),
            CacheError::Supplier(anyhow::anyhow!(error_msg.clone())),
        ];

        let rt = runtime();
        for error in error_variants {
            let response = error.into_response();

            let content_type = response.headers()
                .get("content-type")
                .and_then(|v| v.to_str().ok());
            prop_assert!(
                content_type.map(|ct| ct.contains("application/json")).unwrap_or(false),
                "Response should have JSON content-type"
            );

            let bytes = rt.block_on(async {
                to_bytes(response.into_body(), usize::MAX).await.unwrap()
            });
            let json: serde_json::Value = serde_json::from_slice(&bytes)
                .expect("Response body should be valid JSON");

            let error_value = json.get("error").and_then(|v| v.as_str());
            prop_assert!(
                error_value.map(|e| e.contains(&error_msg)).unwrap_or(false),
                "'error' field should carry the message"
            );
        }
    }
}
