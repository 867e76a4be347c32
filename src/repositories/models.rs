use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

/// One virtual repository exposed by a server.
///
/// Identity is the `key`: equality, hashing and ordering ignore the
/// description so a synthesized entry matches a fetched one with the same key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VirtualRepository {
    pub(crate) key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) description: Option<String>,
}

impl VirtualRepository {
    pub fn new(key: impl Into<String>, description: Option<String>) -> Self {
        Self {
            key: key.into(),
            description,
        }
    }

    /// Entry carrying only a key, used for references missing from the catalog.
    pub fn from_key(key: impl Into<String>) -> Self {
        Self::new(key, None)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

impl PartialEq for VirtualRepository {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for VirtualRepository {}

impl Hash for VirtualRepository {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl PartialOrd for VirtualRepository {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VirtualRepository {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

/// Item of the server's `/api/repositories` listing.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryListItem {
    key: String,
    #[serde(default, rename = "type")]
    repo_type: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    package_type: Option<String>,
}

#[allow(unused)]
impl RepositoryListItem {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn repo_type(&self) -> Option<&str> {
        self.repo_type.as_deref()
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn package_type(&self) -> Option<&str> {
        self.package_type.as_deref()
    }
}

impl From<RepositoryListItem> for VirtualRepository {
    fn from(item: RepositoryListItem) -> Self {
        // Blank descriptions are common in listings; keep them out of the UI.
        let description = item.description.filter(|d| !d.trim().is_empty());
        VirtualRepository::new(item.key, description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn equality_ignores_description() {
        let fetched = VirtualRepository::new("libs-release", Some("Release libraries".into()));
        let synthesized = VirtualRepository::from_key("libs-release");
        assert_eq!(fetched, synthesized);

        let set: HashSet<_> = [fetched, synthesized].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn ordering_is_case_sensitive_lexical() {
        let mut repos = vec![
            VirtualRepository::from_key("libs-snapshot"),
            VirtualRepository::from_key("Libs-release"),
            VirtualRepository::from_key("libs-release"),
        ];
        repos.sort();
        let keys: Vec<_> = repos.iter().map(|r| r.key()).collect();
        assert_eq!(keys, ["Libs-release", "libs-release", "libs-snapshot"]);
    }

    #[test]
    fn listing_item_converts_and_drops_blank_description() {
        let json = r#"[
            {"key": "maven-virtual", "type": "VIRTUAL", "description": "", "url": "https://repo/maven-virtual", "packageType": "Maven"},
            {"key": "gradle-virtual", "description": "Gradle plugins"}
        ]"#;
        let items: Vec<RepositoryListItem> = serde_json::from_str(json).unwrap();
        assert_eq!(items[0].package_type(), Some("Maven"));
        assert_eq!(items[0].repo_type(), Some("VIRTUAL"));

        let repos: Vec<VirtualRepository> = items.into_iter().map(Into::into).collect();
        assert_eq!(repos[0].description(), None);
        assert_eq!(repos[1].description(), Some("Gradle plugins"));
    }

    #[test]
    fn serializes_without_absent_description() {
        let json = serde_json::to_string(&VirtualRepository::from_key("libs-release")).unwrap();
        assert_eq!(json, r#"{"key":"libs-release"}"#);
    }
}
