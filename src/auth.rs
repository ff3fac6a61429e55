use crate::error::{Result, SiftError};

/// Variables checked for a token, in order.
const TOKEN_VARS: [&str; 2] = ["GITHUB_TOKEN", "GH_TOKEN"];

/// Try to run a CLI command and capture stdout as a token
async fn try_cli_token(program: &str, args: &[&str]) -> Option<String> {
    let output = tokio::process::Command::new(program)
        .args(args)
        .output()
        .await
        .ok()?;

    if output.status.success() {
        let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if !token.is_empty() {
            return Some(token);
        }
    }
    None
}

fn token_from_env(lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    TOKEN_VARS
        .iter()
        .filter_map(|var| lookup(var))
        .map(|token| token.trim().to_string())
        .find(|token| !token.is_empty())
}

/// Load a GitHub token, trying:
/// 1. `GITHUB_TOKEN`, then `GH_TOKEN`
/// 2. `gh auth token`
pub async fn load_token() -> Result<String> {
    if let Some(token) = token_from_env(|var| std::env::var(var).ok()) {
        tracing::debug!("using token from environment");
        return Ok(token);
    }

    if let Some(token) = try_cli_token("gh", &["auth", "token"]).await {
        tracing::debug!("using token from gh");
        return Ok(token);
    }

    Err(SiftError::Auth(
        "no GitHub token found; set GITHUB_TOKEN or run `gh auth login`".to_string(),
    ))
}
