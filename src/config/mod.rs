use serde::Deserialize;

mod config_dir;
pub use config_dir::{find_config_file, read_config};

mod error;
pub use error::{ConfigError, ConfigResult};

/// Construction-time configuration. Loaded once by the caller and handed to
/// `build_core` by value; the core never reads process-wide state for it.
#[derive(Debug, Deserialize)]
pub struct Config {
    database: Database,
}

#[derive(Debug, Deserialize)]
pub struct Database {
    uri: String,
}

impl Config {
    pub fn load(use_local: bool) -> ConfigResult<Self> {
        let bytes = read_config(use_local)?;
        let config: Self = toml::from_slice(&bytes)?;
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(raw)?)
    }

    #[inline]
    pub fn database(&self) -> &Database {
        &self.database
    }
}

impl Database {
    #[inline]
    pub fn uri(&self) -> &str {
        &self.uri
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn config_parses_from_toml() {
        let config = Config::from_toml(
            r#"
            [database]
            uri = "sqlite://greenpath.db?mode=rwc"
            "#,
        )
        .unwrap();
        assert_eq!(config.database().uri(), "sqlite://greenpath.db?mode=rwc");
    }

    #[test]
    fn config_rejects_missing_database_section() {
        assert!(matches!(
            Config::from_toml("[host]\nbindto = 'nope'"),
            Err(ConfigError::TomlDeError(_))
        ));
    }
}
