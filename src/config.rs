//! # Server configuration
use crate::session::Sessions;
use color_eyre::eyre::WrapErr;
use color_eyre::{Report, Result};
use serde::{de, Deserialize, Deserializer};
use std::collections::HashMap;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use structopt::StructOpt;
use tokio::fs::read_to_string;
use tracing::instrument;
use tungstenite::http::Uri;

/// The commandline flags for the server
#[derive(Debug, StructOpt)]
pub struct Flags {
    /// Which config file to use
    #[structopt(long = "cfg", short = "c")]
    pub cfg: Option<PathBuf>,
    /// Which port to use (if cfg isn't present)
    #[structopt(long = "port", short = "p")]
    pub port: Option<u16>,
}

/// The setup that we are actually using
pub struct Setup {
    /// The address to bind to
    pub addr: String,
    /// Where notes are persisted, if anywhere
    pub notes_dir: Option<PathBuf>,
    /// The session token table
    pub sessions: Sessions,
}

impl Flags {
    #[instrument]
    /// Load the configuration from a file
    pub async fn load_cfg(&self) -> Result<Setup, Report> {
        if let Some(cfg) = &self.cfg {
            let cfg_string: String = read_to_string(cfg)
                .await
                .wrap_err("Could not read config file")?;
            let config: Config =
                toml::from_str(&cfg_string).wrap_err("Could not parse config file")?;

            Ok(Setup {
                addr: config.addr.to_string(),
                notes_dir: config.notes_dir,
                sessions: Sessions::from_tokens(config.sessions),
            })
        } else if let Some(port) = self.port {
            Ok(Setup {
                addr: format!("0.0.0.0:{}", port),
                notes_dir: None,
                sessions: Sessions::default(),
            })
        } else {
            Ok(Setup {
                addr: String::from("127.0.0.1:9002"),
                notes_dir: None,
                sessions: Sessions::default(),
            })
        }
    }
}

/// A configuration for the system
#[derive(Deserialize)]
pub struct Config {
    /// The address to bind the service to
    #[serde(deserialize_with = "deserialize_from_str")]
    pub addr: Uri,
    /// The directory to save notes to
    #[serde(default)]
    pub notes_dir: Option<PathBuf>,
    /// Session tokens mapped to user ids
    #[serde(default)]
    pub sessions: HashMap<String, String>,
}

// You can use this deserializer for any type that implements FromStr
// and the FromStr::Err implements Display
fn deserialize_from_str<'de, S, D>(deserializer: D) -> Result<S, D::Error>
where
    S: FromStr,      // Required for S::from_str...
    S::Err: Display, // Required for .map_err(de::Error::custom)
    D: Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    S::from_str(&s).map_err(de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::Config;

    #[test]
    fn parses_a_full_config() {
        let config: Config = toml::from_str(
            r#"
            addr = "127.0.0.1:9002"
            notes_dir = "notes"

            [sessions]
            alpha-token = "user-1"
            "#,
        )
        .unwrap();
        assert_eq!(config.addr.to_string(), "127.0.0.1:9002");
        assert_eq!(config.notes_dir.as_deref(), Some("notes".as_ref()));
        assert_eq!(config.sessions.get("alpha-token").map(String::as_str), Some("user-1"));
    }

    #[test]
    fn sessions_and_notes_dir_are_optional() {
        let config: Config = toml::from_str(r#"addr = "127.0.0.1:9002""#).unwrap();
        assert!(config.notes_dir.is_none());
        assert!(config.sessions.is_empty());
    }
}
