use std::hash::Hasher;

use contagion_engine::{DiseaseCatalog, SpreadVector};
use serde_json::{Map, Value};
use twox_hash::XxHash64;

const CATALOG_JSON: &str = include_str!("../assets/catalog.json");
const SNAPSHOT_HASH: u64 = 0xab09_3ee9_c55f_866c;

#[test]
fn bundled_catalog_snapshot_stable() {
    let value: Value = serde_json::from_str(CATALOG_JSON).unwrap();
    let canonical = serde_json::to_string_pretty(&canonicalize_value(value)).unwrap();
    let digest = snapshot_hash(canonical.as_bytes());
    assert_eq!(
        digest, SNAPSHOT_HASH,
        "bundled catalog changed\n{canonical}"
    );
}

#[test]
fn bundled_catalog_validates() {
    let catalog = DiseaseCatalog::from_json(CATALOG_JSON).unwrap();
    assert_eq!(&catalog, DiseaseCatalog::default_catalog());
    for disease in &catalog.diseases {
        assert!(!disease.stages.is_empty(), "{} has no stages", disease.id);
        assert!(
            (0.0..=1.0).contains(&disease.post_cure_immunity),
            "{} immunity out of range",
            disease.id
        );
    }
}

#[test]
fn bundled_catalog_covers_every_vector() {
    let catalog = DiseaseCatalog::default_catalog();
    for vector in [
        SpreadVector::Contact,
        SpreadVector::Airborne,
        SpreadVector::Blood,
        SpreadVector::Special,
    ] {
        assert!(
            catalog.diseases.iter().any(|d| d.spreads_by(vector)),
            "no disease spreads by {vector:?}"
        );
    }
    assert!(catalog.symptoms.iter().any(|s| s.airborne_burst.is_some()));
    assert!(catalog.diseases.iter().any(|d| d.incubation_secs.is_some()));
}

fn canonicalize_value(value: Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(canonicalize_value)
                .collect::<Vec<_>>(),
        ),
        Value::Object(map) => {
            let mut result = Map::with_capacity(map.len());
            let mut entries: Vec<_> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            for (key, value) in entries {
                result.insert(key, canonicalize_value(value));
            }
            Value::Object(result)
        }
        other => other,
    }
}

fn snapshot_hash(bytes: &[u8]) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(bytes);
    hasher.finish()
}
