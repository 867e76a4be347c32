pub mod fzf_invoker;
pub mod spinner;

use self::fzf_invoker::FzfInvoker;
use anyhow::{Context, Result, bail};

use crate::repositories::VirtualRepository;

/// Label shown in the picker: the key, plus the description when present.
pub fn repository_label(repo: &VirtualRepository) -> String {
    match repo.description() {
        Some(description) => format!("{} | {}", repo.key(), description),
        None => repo.key().to_string(),
    }
}

/// Pick one repository key. The first entry of the picker leaves the current
/// selection unchanged.
pub fn choose_repository_key(title: &str, repos: &[VirtualRepository], current: &str) -> Result<String> {
    let keep = format!("(keep '{current}')");
    let mut labels = vec![keep.clone()];
    labels.extend(repos.iter().map(repository_label));

    let picker = FzfInvoker::new(title.to_string(), labels);
    let Some(choice) = picker.invoke().context("failed to show repository menu")? else {
        bail!("No selection made");
    };

    if choice == keep {
        return Ok(current.to_string());
    }
    let idx = repos
        .iter()
        .position(|r| repository_label(r) == choice)
        .context("selected label does not match any repository")?;
    Ok(repos[idx].key().to_string())
}
