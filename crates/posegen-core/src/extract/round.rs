//! Numeric precision normalization.

use serde_json::{Number, Value};

/// Magnitude beyond which two-decimal rounding cannot change an `f64`.
const ROUNDING_LIMIT: f64 = 1e15;

/// Round `x` to `decimals` places, half away from zero on the stored binary
/// value (`1.005` is stored below the midpoint and becomes `1.0`).
pub fn round_to(x: f64, decimals: u32) -> f64 {
    if !x.is_finite() || x.abs() >= ROUNDING_LIMIT {
        return x;
    }
    let scale = 10f64.powi(decimals as i32);
    let rounded = (x * scale).round() / scale;
    if rounded.is_finite() {
        rounded
    } else {
        x
    }
}

/// Recursively round every floating-point leaf of `value`.
///
/// Object keys, array order, integers, strings, booleans and nulls are kept.
pub fn round_floats(value: &Value, decimals: u32) -> Value {
    match value {
        Value::Number(n) if n.is_f64() => n
            .as_f64()
            .and_then(|x| Number::from_f64(round_to(x, decimals)))
            .map(Value::Number)
            .unwrap_or_else(|| value.clone()),
        Value::Array(items) => Value::Array(items.iter().map(|v| round_floats(v, decimals)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), round_floats(v, decimals)))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(round_to(0.125, 2), 0.13);
        assert_eq!(round_to(-0.125, 2), -0.13);
        assert_eq!(round_to(1.005, 2), 1.0);
        assert_eq!(round_to(0.123456, 2), 0.12);
        assert_eq!(round_to(7.44, 2), 7.44);
    }

    #[test]
    fn leaves_non_finite_and_huge_values() {
        assert!(round_to(f64::NAN, 2).is_nan());
        assert_eq!(round_to(f64::INFINITY, 2), f64::INFINITY);
        assert_eq!(round_to(1e300, 2), 1e300);
    }

    #[test]
    fn walks_nested_values() {
        let value = json!({
            "face": {"お": 0.6049, "あ": 0},
            "rotatableBones": {"首": [0.0312, -0.004, 0, 0.9996]},
            "label": "keep 0.12345",
            "flag": true,
            "none": null
        });
        let rounded = round_floats(&value, 2);
        assert_eq!(
            rounded,
            json!({
                "face": {"お": 0.6, "あ": 0},
                "rotatableBones": {"首": [0.03, -0.0, 0, 1.0]},
                "label": "keep 0.12345",
                "flag": true,
                "none": null
            })
        );
    }

    #[test]
    fn integers_stay_integers() {
        let rounded = round_floats(&json!([1, -2, 3.0]), 2);
        assert!(rounded[0].is_u64());
        assert!(rounded[1].is_i64());
        assert!(rounded[2].is_f64());
    }

    #[test]
    fn preserves_key_order() {
        let value: Value = serde_json::from_str(r#"{"z": 0.111, "a": 0.222, "m": 0.333}"#).unwrap();
        let keys: Vec<_> = round_floats(&value, 2)
            .as_object()
            .unwrap()
            .keys()
            .cloned()
            .collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_leaf() -> impl Strategy<Value = Value> {
        prop_oneof![
            (-1.0e6f64..1.0e6).prop_map(Value::from),
            any::<i32>().prop_map(Value::from),
            "[a-z]{0,6}".prop_map(Value::from),
            any::<bool>().prop_map(Value::from),
            Just(Value::Null),
        ]
    }

    fn arb_value() -> impl Strategy<Value = Value> {
        arb_leaf().prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::btree_map("[a-z]{1,4}", inner, 0..4)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    proptest! {
        /// Rounding an already rounded value is a no-op.
        #[test]
        fn rounding_is_idempotent(value in arb_value(), decimals in 0u32..4) {
            let once = round_floats(&value, decimals);
            prop_assert_eq!(round_floats(&once, decimals), once);
        }

        /// Rounding moves a float by at most half a unit in the last place kept.
        #[test]
        fn rounding_stays_close(x in -1.0e6f64..1.0e6) {
            prop_assert!((round_to(x, 2) - x).abs() <= 0.005 + 1e-9);
        }
    }
}
