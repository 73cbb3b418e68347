//! Canonical metric keys

use std::collections::BTreeMap;
use std::fmt;

/// A metric name plus its tag set.
///
/// Tags are held in a `BTreeMap`, so the canonical string form always lists
/// them sorted by key regardless of the order the caller supplied them in.
/// The string form is not escaped: `a{b:c}` untagged renders the same as `a`
/// tagged `b:c`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetricKey {
    name: String,
    tags: BTreeMap<String, String>,
}

impl MetricKey {
    /// Build a key; a repeated tag key keeps the last value
    pub fn new(name: &str, tags: &[(&str, &str)]) -> Self {
        Self {
            name: name.to_string(),
            tags: tags
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }
}

impl fmt::Display for MetricKey {
    /// `name` without tags, otherwise `name{k:v,k2:v2}`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if self.tags.is_empty() {
            return Ok(());
        }
        f.write_str("{")?;
        for (i, (k, v)) in self.tags.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{k}:{v}")?;
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untagged_key_is_name() {
        assert_eq!(MetricKey::new("requests", &[]).to_string(), "requests");
    }

    #[test]
    fn test_tags_sorted_by_key() {
        let a = MetricKey::new("latency", &[("route", "/a"), ("method", "GET")]);
        let b = MetricKey::new("latency", &[("method", "GET"), ("route", "/a")]);
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "latency{method:GET,route:/a}");
    }

    #[test]
    fn test_string_form_is_unescaped() {
        let untagged = MetricKey::new("a{b:c}", &[]);
        let tagged = MetricKey::new("a", &[("b", "c")]);
        assert_ne!(untagged, tagged);
        assert_eq!(untagged.to_string(), tagged.to_string());
    }

    #[test]
    fn test_duplicate_tag_keeps_last() {
        let key = MetricKey::new("x", &[("env", "dev"), ("env", "prod")]);
        assert_eq!(key.to_string(), "x{env:prod}");
    }
}
