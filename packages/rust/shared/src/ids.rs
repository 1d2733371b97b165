//! Normalisation and batching of type identifier lists.
//!
//! Identifier lists come from configuration in whatever shape the user wrote
//! them: nested arrays, stray strings, blank entries. [`clean_type_ids`] turns
//! that into a flat, typed sequence before anything touches the network.

use serde_json::Value;

use crate::types::TypeId;

/// Largest number of identifiers the aggregates endpoint accepts per request.
pub const MAX_BATCH_SIZE: usize = 100;

/// Flatten an arbitrarily nested value into type identifiers.
///
/// Order is preserved and duplicates are kept. Anything that is not a
/// positive integer (strings, booleans, nulls, objects, fractional or
/// negative numbers) is dropped.
pub fn clean_type_ids(value: &Value) -> Vec<TypeId> {
    let mut out = Vec::new();
    collect(value, &mut out);
    out
}

fn collect(value: &Value, out: &mut Vec<TypeId>) {
    match value {
        Value::Array(items) => {
            for item in items {
                collect(item, out);
            }
        }
        Value::Number(n) => {
            let raw = n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && *f <= i64::MAX as f64)
                    .map(|f| f as i64)
            });
            if let Some(id) = raw.and_then(|r| TypeId::new(r).ok()) {
                out.push(id);
            }
        }
        _ => {}
    }
}

/// Split identifiers into batches of at most `size`, preserving order.
///
/// `size` is clamped to `1..=MAX_BATCH_SIZE`.
pub fn chunk_type_ids(ids: &[TypeId], size: usize) -> std::slice::Chunks<'_, TypeId> {
    ids.chunks(size.clamp(1, MAX_BATCH_SIZE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(ids: &[TypeId]) -> Vec<u32> {
        ids.iter().map(|id| id.get()).collect()
    }

    #[test]
    fn flattens_nested_lists() {
        let value = json!([[18, 19], [[20]], 21, [], [[[22]]]]);
        assert_eq!(raw(&clean_type_ids(&value)), vec![18, 19, 20, 21, 22]);
    }

    #[test]
    fn drops_non_numeric_entries() {
        let value = json!([30370, "", "gas", null, [true, 30371], {"id": 5}, 30372]);
        assert_eq!(raw(&clean_type_ids(&value)), vec![30370, 30371, 30372]);
    }

    #[test]
    fn drops_fractional_and_non_positive() {
        let value = json!([1.5, 0, -3, 1224.0, 1225]);
        assert_eq!(raw(&clean_type_ids(&value)), vec![1224, 1225]);
    }

    #[test]
    fn keeps_duplicates_in_order() {
        let value = json!([18, 19, 18]);
        assert_eq!(raw(&clean_type_ids(&value)), vec![18, 19, 18]);
    }

    #[test]
    fn scalar_input_is_a_single_id() {
        assert_eq!(raw(&clean_type_ids(&json!(30018))), vec![30018]);
        assert!(clean_type_ids(&json!("30018")).is_empty());
    }

    #[test]
    fn batches_respect_limit_and_order() {
        for n in [1_usize, 99, 100, 101, 250] {
            let ids: Vec<TypeId> = (1..=n as i64).map(|i| TypeId::new(i).unwrap()).collect();
            let batches: Vec<&[TypeId]> = chunk_type_ids(&ids, MAX_BATCH_SIZE).collect();

            assert_eq!(batches.len(), n.div_ceil(MAX_BATCH_SIZE));
            assert!(batches.iter().all(|b| !b.is_empty() && b.len() <= MAX_BATCH_SIZE));
            let rejoined: Vec<TypeId> = batches.concat();
            assert_eq!(rejoined, ids);
        }
    }

    #[test]
    fn batch_size_is_clamped() {
        let ids: Vec<TypeId> = (1..=250).map(|i| TypeId::new(i).unwrap()).collect();
        assert_eq!(chunk_type_ids(&ids, 500).count(), 3);
        assert_eq!(chunk_type_ids(&ids, 0).count(), 250);
    }

    #[test]
    fn empty_input_has_no_batches() {
        assert_eq!(chunk_type_ids(&[], MAX_BATCH_SIZE).count(), 0);
    }
}
