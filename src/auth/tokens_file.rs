use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Cached access token stored in ~/.config/notedate/tokens.json. The server
/// rides along so a token is never replayed against a different host.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokensFile {
    pub access_token: Option<String>,
    pub server: Option<String>,
}

fn config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("no config dir available"))?
        .join("notedate"))
}

fn tokens_path() -> Result<PathBuf> {
    let mut p = config_dir()?;
    fs::create_dir_all(&p)?;
    p.push("tokens.json");
    Ok(p)
}

/// Save the access token together with the server it was issued for.
pub fn save_tokens(access_token: Option<&str>, server: Option<&str>) -> Result<()> {
    save_tokens_to(&tokens_path()?, access_token, server)
}

fn save_tokens_to(path: &Path, access_token: Option<&str>, server: Option<&str>) -> Result<()> {
    let tf = TokensFile {
        access_token: access_token.map(|s| s.to_string()),
        server: server.map(|s| s.to_string()),
    };
    let s = serde_json::to_string_pretty(&tf)?;
    fs::write(path, s)?;
    Ok(())
}

/// Load tokens file if present
pub fn load_tokens() -> Result<Option<TokensFile>> {
    load_tokens_from(&tokens_path()?)
}

fn load_tokens_from(path: &Path) -> Result<Option<TokensFile>> {
    if !path.exists() {
        return Ok(None);
    }
    let s = fs::read_to_string(path)?;
    let tf: TokensFile = serde_json::from_str(&s)?;
    Ok(Some(tf))
}

/// Drop the cached token so the next run starts a fresh authorization.
pub fn clear_tokens() -> Result<()> {
    let p = tokens_path()?;
    if p.exists() {
        fs::remove_file(&p)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_token_and_server() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");

        save_tokens_to(&path, Some("access-1"), Some("https://svc.example")).unwrap();
        let loaded = load_tokens_from(&path).unwrap().unwrap();

        assert_eq!(loaded.access_token.as_deref(), Some("access-1"));
        assert_eq!(loaded.server.as_deref(), Some("https://svc.example"));
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_tokens_from(&dir.path().join("tokens.json")).unwrap();
        assert!(loaded.is_none());
    }
}
