/// Payload keys that carry credentials.
pub const SENSITIVE_KEYS: &[&str] = &["secret_access_key", "access_key_id"];

/// Remove [`SENSITIVE_KEYS`] at any depth of `value`.
pub fn strip_sensitive(value: &mut serde_json::Value) {
  match value {
    serde_json::Value::Object(map) => {
      for key in SENSITIVE_KEYS {
        map.remove(*key);
      }
      for nested in map.values_mut() {
        strip_sensitive(nested);
      }
    }
    serde_json::Value::Array(items) => {
      for item in items {
        strip_sensitive(item);
      }
    }
    _ => {}
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_strips_params_credentials() {
    let mut value = serde_json::json!({
      "name": "projects/p/transferConfigs/1",
      "params": {
        "secret_access_key": "AIRFLOW_KEY",
        "access_key_id": "AIRFLOW_KEY_ID",
        "bucket": "b",
      },
    });

    strip_sensitive(&mut value);

    assert_eq!(
      value,
      serde_json::json!({
        "name": "projects/p/transferConfigs/1",
        "params": {"bucket": "b"},
      })
    );
  }

  #[test]
  fn test_strips_at_any_depth() {
    let mut value = serde_json::json!({
      "access_key_id": 1,
      "nested": [{"deeper": {"secret_access_key": null, "keep": true}}],
    });

    strip_sensitive(&mut value);

    assert_eq!(
      value,
      serde_json::json!({"nested": [{"deeper": {"keep": true}}]})
    );
  }

  #[test]
  fn test_scalars_untouched() {
    let mut value = serde_json::json!("access_key_id");
    strip_sensitive(&mut value);
    assert_eq!(value, "access_key_id");
  }
}
