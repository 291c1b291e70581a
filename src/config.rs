use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_SERVER: &str = "https://notes.example.com";
pub const DEFAULT_CALLBACK_PORT: u16 = 8080;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub server: Option<String>,
    pub notebook: Option<String>,
    pub callback_port: Option<u16>,
}

fn config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("no config dir available"))?
        .join("notedate"))
}

pub fn config_path() -> Result<PathBuf> {
    let mut p = config_dir()?;
    fs::create_dir_all(&p)?;
    p.push("config.toml");
    Ok(p)
}

pub fn load_config() -> Result<Config> {
    let path = config_path()?;
    load_config_from(&path)
}

fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        // create a template config for users to edit
        let sample = Config {
            consumer_key: "YOUR-CONSUMER-KEY".to_string(),
            consumer_secret: "YOUR-CONSUMER-SECRET".to_string(),
            server: Some(DEFAULT_SERVER.to_string()),
            notebook: Some("YOUR-NOTEBOOK-NAME".to_string()),
            callback_port: Some(DEFAULT_CALLBACK_PORT),
        };
        let tom = toml::to_string_pretty(&sample)?;
        fs::write(path, tom)?;
        return Err(anyhow::anyhow!(
            "Created template config at {} — edit it and run again",
            path.display()
        ));
    }
    let s = fs::read_to_string(path)?;
    let cfg: Config = toml::from_str(&s)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_run_writes_a_template_and_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let err = load_config_from(&path).unwrap_err();
        assert!(err.to_string().contains("edit it and run again"));
        assert!(path.exists());

        // The template itself must be loadable once the user edits it.
        let cfg = load_config_from(&path).unwrap();
        assert_eq!(cfg.consumer_key, "YOUR-CONSUMER-KEY");
        assert_eq!(cfg.server.as_deref(), Some(DEFAULT_SERVER));
        assert_eq!(cfg.callback_port, Some(DEFAULT_CALLBACK_PORT));
    }

    #[test]
    fn optional_keys_may_be_left_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "consumer_key = \"abc\"\nconsumer_secret = \"shh\"\n",
        )
        .unwrap();

        let cfg = load_config_from(&path).unwrap();
        assert_eq!(cfg.consumer_key, "abc");
        assert_eq!(cfg.server, None);
        assert_eq!(cfg.notebook, None);
        assert_eq!(cfg.callback_port, None);
    }
}
