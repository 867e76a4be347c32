use super::VirtualRepository;

/// Merge referenced keys into a catalog.
///
/// Each referenced key missing from the accumulating result is prepended as a
/// key-only entry, so when several keys are missing the one processed last
/// ends up first. Existing entries keep their catalog order and nothing is
/// re-sorted. Blank keys are skipped.
pub fn reconcile<S: AsRef<str>>(
    base: &[VirtualRepository],
    referenced_keys: &[S],
) -> Vec<VirtualRepository> {
    referenced_keys
        .iter()
        .fold(base.to_vec(), |repos, key| collect_virtual_repository(repos, key.as_ref()))
}

/// Prepend `key` to `repos` unless it is blank or already present.
pub fn collect_virtual_repository(
    mut repos: Vec<VirtualRepository>,
    key: &str,
) -> Vec<VirtualRepository> {
    if key.trim().is_empty() || repos.iter().any(|r| r.key() == key) {
        return repos;
    }
    repos.insert(0, VirtualRepository::from_key(key));
    repos
}
