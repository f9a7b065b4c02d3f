use std::collections::BTreeMap;
use url::Url;

/// Query parameters of a logical request. Keys are unique and kept sorted,
/// which gives signers a canonical ordering for free.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryString(BTreeMap<String, String>);

impl QueryString {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a parameter; returns the previous value.
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Form-encoded `k=v&...` in key order.
    pub fn to_encoded(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.iter())
            .finish()
    }

    /// Returns `base` with these parameters merged into any query it already
    /// has. A key present here replaces every pair with that key in `base`.
    pub fn apply_to(&self, base: &Url) -> Url {
        let mut url = base.clone();
        if self.is_empty() {
            return url;
        }
        let kept: Vec<(String, String)> = base
            .query_pairs()
            .into_owned()
            .filter(|(k, _)| !self.0.contains_key(k))
            .collect();
        url.set_query(None);
        url.query_pairs_mut()
            .extend_pairs(kept)
            .extend_pairs(self.iter());
        url
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryString {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
