//! Pure parsers for git command output. Commands run with `LC_ALL=C`.

use crate::repo::{Author, UpdateRange};

/// Find `Updating <old>..<new>` in the output of `git pull`.
pub fn pull_range(output: &str) -> Option<UpdateRange> {
    output.lines().find_map(|line| {
        let range = line.trim().strip_prefix("Updating ")?;
        let (from, to) = range.split_once("..")?;
        let (from, to) = (from.trim(), to.trim());
        if is_revision(from) && is_revision(to) {
            Some(UpdateRange {
                from: from.to_string(),
                to: to.to_string(),
            })
        } else {
            None
        }
    })
}

fn is_revision(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_hexdigit())
}

/// Parse `git shortlog -s -n` lines (`<count>\t<name>`), keeping their order.
pub fn shortlog(output: &str) -> Vec<Author> {
    output
        .lines()
        .filter_map(|line| {
            let (count, name) = line.trim_start().split_once('\t')?;
            let count = count.trim().parse().ok()?;
            Some(Author {
                name: name.trim().to_string(),
                count,
            })
        })
        .collect()
}

/// Commits ahead of upstream from `git status --porcelain=v2 --branch`.
///
/// The `# branch.ab +<ahead> -<behind>` header is only present when the branch
/// tracks an upstream; without it there is nothing to push to, so `None`.
pub fn ahead_of_upstream(status: &str) -> Option<u32> {
    status.lines().find_map(|line| {
        let counts = line.strip_prefix("# branch.ab ")?;
        let ahead = counts.split_whitespace().next()?.strip_prefix('+')?;
        ahead.parse().ok()
    })
}

/// Whether `git status --porcelain` output lists a tracked-file change.
pub fn has_tracked_changes(status: &str) -> bool {
    status
        .lines()
        .any(|line| !line.trim().is_empty() && !line.starts_with("??"))
}
