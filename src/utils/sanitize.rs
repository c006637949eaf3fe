use serde_json::Value;

const SENSITIVE_FIELDS: &[&str] = &[
    "authorization",
    "token",
    "secret",
    "api_key",
    "password",
    "email",
];

/// Masks sensitive fields in JSON payloads before they reach the log.
pub fn sanitize_json(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, val)| {
                    let sanitized = if is_sensitive_field(key) {
                        mask_value(val)
                    } else {
                        sanitize_json(val)
                    };
                    (key.clone(), sanitized)
                })
                .collect(),
        ),
        Value::Array(arr) => Value::Array(arr.iter().map(sanitize_json).collect()),
        _ => value.clone(),
    }
}

fn is_sensitive_field(key: &str) -> bool {
    let key = key.to_lowercase();
    SENSITIVE_FIELDS.contains(&key.as_str())
}

fn mask_value(value: &Value) -> Value {
    match value {
        Value::String(s) if s.chars().count() > 8 => {
            let chars: Vec<char> = s.chars().collect();
            let start: String = chars[..4].iter().collect();
            let end: String = chars[chars.len() - 4..].iter().collect();
            Value::String(format!("{}****{}", start, end))
        }
        _ => Value::String("****".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sanitize_secret_keeps_amount() {
        let input = json!({
            "api_key": "sk_live_0123456789abcdef",
            "amount": 100.0,
            "currency": "USD"
        });

        let sanitized = sanitize_json(&input);

        assert_eq!(sanitized["api_key"], "sk_l****cdef");
        assert_eq!(sanitized["amount"], 100.0);
        assert_eq!(sanitized["currency"], "USD");
    }

    #[test]
    fn test_sanitize_nested_and_short_values() {
        let input = json!({
            "user": { "Password": "hunter2", "name": "alice" },
            "items": [{ "token": 42 }]
        });

        let sanitized = sanitize_json(&input);

        assert_eq!(sanitized["user"]["Password"], "****");
        assert_eq!(sanitized["user"]["name"], "alice");
        assert_eq!(sanitized["items"][0]["token"], "****");
    }
}
