use async_trait::async_trait;
use dotenvy::dotenv;
use regex::{Captures, Regex};
use serde::de::DeserializeOwned;
use std::{env, fs};
use thiserror::Error;

#[allow(clippy::enum_variant_names)]
#[derive(Debug, Error)]
pub enum LoadConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
    #[error("Error loading config: {0}")]
    ConfigError(String),
}

#[async_trait]
pub trait ConfigLoader {
    type SectionType;

    async fn load_from_file(file_name: String) -> Result<Self::SectionType, LoadConfigError>;
}

pub trait ConfigLoaderSync {
    type SectionType;

    fn load_from_file_sync(file_name: String) -> Result<Self::SectionType, LoadConfigError>;
}

pub async fn load_from_file<T: DeserializeOwned>(file_name: String) -> Result<T, LoadConfigError> {
    dotenv().ok();
    let contents = tokio::fs::read_to_string(file_name).await?;
    parse_config(&contents)
}

pub fn load_from_file_sync<T: DeserializeOwned>(file_name: String) -> Result<T, LoadConfigError> {
    dotenv().ok();
    let contents = fs::read_to_string(file_name)?;
    parse_config(&contents)
}

/// Parses a TOML document after substituting `${VAR}` placeholders from the environment.
pub fn parse_config<T: DeserializeOwned>(raw_config: &str) -> Result<T, LoadConfigError> {
    let contents = expand_vars(raw_config)?;
    let config: T = toml::from_str(&contents)?;
    Ok(config)
}

fn expand_vars(raw_config: &str) -> Result<String, LoadConfigError> {
    let re = Regex::new(r"\$\{([a-zA-Z_][0-9a-zA-Z_]*)\}").map_err(|e| LoadConfigError::ConfigError(e.to_string()))?;
    let expanded = re.replace_all(raw_config, |caps: &Captures| match env::var(&caps[1]) {
        Ok(val) => val,
        Err(_) => caps[0].to_string(),
    });
    Ok(expanded.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Section {
        name: String,
        limit: u32,
    }

    #[test]
    fn test_unknown_vars_are_left_untouched() -> eyre::Result<()> {
        let expanded = expand_vars("url = \"${POOL_ARB_SURELY_UNSET_VAR}\"")?;
        assert_eq!(expanded, "url = \"${POOL_ARB_SURELY_UNSET_VAR}\"");
        Ok(())
    }

    #[test]
    fn test_parse_config_expands_environment() -> eyre::Result<()> {
        // SAFETY: the variable name is unique to this test
        unsafe { env::set_var("POOL_ARB_TEST_SECTION_NAME", "observer") };
        let section: Section = parse_config("name = \"${POOL_ARB_TEST_SECTION_NAME}\"\nlimit = 7\n")?;
        assert_eq!(section.name, "observer");
        assert_eq!(section.limit, 7);
        Ok(())
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        let result: Result<Section, _> = parse_config("name = ");
        assert!(matches!(result, Err(LoadConfigError::TomlError(_))));
    }
}
