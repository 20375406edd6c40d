use serde_json::Value;

/// Selector locating the payload inside a response envelope.
///
/// Accepts dotted keys (`"data.content"`, numeric segments index arrays:
/// `"data.content.0"`) or a JSON pointer (`"/data/content/0"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadPath {
    raw: String,
}

impl PayloadPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self { raw: path.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// `None` when any segment is missing or the target is `null`.
    pub fn select<'a>(&self, envelope: &'a Value) -> Option<&'a Value> {
        let found = if self.raw.starts_with('/') {
            envelope.pointer(&self.raw)
        } else {
            self.raw
                .split('.')
                .filter(|seg| !seg.is_empty())
                .try_fold(envelope, |v, seg| match v {
                    Value::Object(m) => m.get(seg),
                    Value::Array(xs) => seg.parse::<usize>().ok().and_then(|i| xs.get(i)),
                    _ => None,
                })
        };
        found.filter(|v| !v.is_null())
    }
}

impl From<&str> for PayloadPath {
    fn from(s: &str) -> Self {
        PayloadPath::new(s)
    }
}

impl From<String> for PayloadPath {
    fn from(s: String) -> Self {
        PayloadPath::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dotted_and_pointer_paths_agree() {
        let env = json!({"data": {"content": [{"id": "a"}, {"id": "b"}], "totalElements": 2}});
        let dotted = PayloadPath::new("data.content.1.id");
        let pointer = PayloadPath::new("/data/content/1/id");

        assert_eq!(dotted.select(&env), Some(&json!("b")));
        assert_eq!(pointer.select(&env), Some(&json!("b")));
        assert_eq!(PayloadPath::new("data").select(&env), env.get("data"));
    }

    #[test]
    fn missing_or_null_targets_yield_none() {
        let env = json!({"data": null, "meta": {"page": 1}});
        assert_eq!(PayloadPath::new("data").select(&env), None);
        assert_eq!(PayloadPath::new("meta.missing").select(&env), None);
        assert_eq!(PayloadPath::new("meta.page.deeper").select(&env), None);
        assert_eq!(PayloadPath::new("meta.x").select(&json!([1, 2])), None);
    }
}
