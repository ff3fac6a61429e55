use chrono::{DateTime, Utc};

use crate::error::{Result, SiftError};
use crate::types::Branch;

const BRANCH_FORMAT: &str = "%(refname:short)%00%(subject)%00%(committerdate:iso-strict)%00%(upstream:short)%00%(HEAD)";

async fn git(args: &[&str]) -> Result<String> {
    let output = tokio::process::Command::new("git").args(args).output().await?;
    if !output.status.success() {
        return Err(SiftError::Git(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Local branches of the current checkout, newest commit first. Every
/// whitespace-separated word of `filters` must occur in the branch name.
pub async fn local_branches(filters: &str) -> Result<Vec<Branch>> {
    let format = format!("--format={}", BRANCH_FORMAT);
    let listing = git(&["for-each-ref", "--sort=-committerdate", format.as_str(), "refs/heads"]).await?;
    let repo = match git(&["remote", "get-url", "origin"]).await {
        Ok(url) => repo_from_remote(url.trim()).unwrap_or_default(),
        Err(_) => String::new(),
    };

    let words: Vec<&str> = filters.split_whitespace().collect();
    Ok(parse_branches(&listing, &repo)
        .into_iter()
        .filter(|b| words.iter().all(|w| b.name.contains(w)))
        .collect())
}

fn parse_branches(listing: &str, repo: &str) -> Vec<Branch> {
    listing
        .lines()
        .filter_map(|line| {
            let mut fields = line.split('\0');
            let name = fields.next()?.to_string();
            if name.is_empty() {
                return None;
            }
            let subject = fields.next().unwrap_or_default().to_string();
            let last_commit_at = fields
                .next()
                .and_then(|d| DateTime::parse_from_rfc3339(d).ok())
                .map(|d| d.with_timezone(&Utc))
                .unwrap_or_default();
            let upstream = fields.next().filter(|u| !u.is_empty()).map(str::to_string);
            let is_current = fields.next().is_some_and(|h| h.trim() == "*");
            Some(Branch {
                name,
                subject,
                last_commit_at,
                upstream,
                is_current,
                repo: repo.to_string(),
                pr_number: None,
            })
        })
        .collect()
}

/// `owner/name` from an SSH (`git@host:owner/name.git`), `ssh://` or
/// HTTPS remote url.
pub fn repo_from_remote(url: &str) -> Option<String> {
    let path = if let Some(rest) = url.strip_prefix("git@") {
        rest.split_once(':')?.1
    } else if let Some((_, rest)) = url.split_once("://") {
        // Drop user@host[:port]
        rest.split_once('/')?.1
    } else {
        return None;
    };
    let path = path.trim_end_matches('/').trim_end_matches(".git");
    let mut parts = path.split('/');
    let (owner, name) = (parts.next()?, parts.next()?);
    if owner.is_empty() || name.is_empty() || parts.next().is_some() {
        return None;
    }
    Some(format!("{}/{}", owner, name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_from_ssh() {
        assert_eq!(
            repo_from_remote("git@github.com:owner/repo.git"),
            Some("owner/repo".to_string())
        );
    }

    #[test]
    fn repo_from_https() {
        assert_eq!(
            repo_from_remote("https://github.com/owner/repo.git"),
            Some("owner/repo".to_string())
        );
        assert_eq!(
            repo_from_remote("https://github.com/owner/repo"),
            Some("owner/repo".to_string())
        );
    }

    #[test]
    fn repo_from_ssh_scheme_with_port() {
        assert_eq!(
            repo_from_remote("ssh://git@github.com:2222/owner/repo.git"),
            Some("owner/repo".to_string())
        );
    }

    #[test]
    fn repo_from_invalid() {
        assert_eq!(repo_from_remote("not-a-url"), None);
        assert_eq!(repo_from_remote("https://github.com/owner"), None);
    }

    #[test]
    fn parses_for_each_ref_lines() {
        let listing = "main\0Initial commit\02024-05-01T10:00:00+02:00\0origin/main\0*\n\
                       topic\0wip\02024-04-30T09:00:00Z\0\0 \n";
        let branches = parse_branches(listing, "o/r");
        assert_eq!(branches.len(), 2);
        assert_eq!(branches[0].name, "main");
        assert!(branches[0].is_current);
        assert_eq!(branches[0].upstream.as_deref(), Some("origin/main"));
        assert_eq!(branches[0].last_commit_at.to_rfc3339(), "2024-05-01T08:00:00+00:00");
        assert_eq!(branches[1].upstream, None);
        assert!(!branches[1].is_current);
        assert_eq!(branches[1].repo, "o/r");
    }

    #[test]
    fn blank_lines_are_skipped() {
        assert!(parse_branches("\n\n", "").is_empty());
    }
}
