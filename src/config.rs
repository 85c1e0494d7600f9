//! Settings for the `bbl` binary: where state lives and which external
//! binaries to drive. Loaded with `ortho-config` from defaults, `bbl.toml`,
//! and `BBL_*` environment variables.

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::inventory::{DEFAULT_AWS_BIN, DEFAULT_AZ_BIN, DEFAULT_GCLOUD_BIN};
use crate::terraform::DEFAULT_TERRAFORM_BIN;

/// Settings for the `bbl` binary, merged from defaults, `bbl.toml`, and
/// `BBL_*` environment variables.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "BBL",
    discovery(
        app_name = "bbl",
        env_var = "BBL_CONFIG_PATH",
        config_file_name = "bbl.toml",
        dotfile_name = ".bbl.toml",
        project_file_name = "bbl.toml"
    )
)]
pub struct BblConfig {
    /// Directory holding `bbl-state.json`. Defaults to the working directory.
    #[ortho_config(default = ".".to_owned())]
    pub state_dir: String,
    /// Path to the `terraform` executable.
    #[ortho_config(default = DEFAULT_TERRAFORM_BIN.to_owned())]
    pub terraform_bin: String,
    /// Path to the `gcloud` executable.
    #[ortho_config(default = DEFAULT_GCLOUD_BIN.to_owned())]
    pub gcloud_bin: String,
    /// Path to the `az` executable.
    #[ortho_config(default = DEFAULT_AZ_BIN.to_owned())]
    pub az_bin: String,
    /// Path to the `aws` executable.
    #[ortho_config(default = DEFAULT_AWS_BIN.to_owned())]
    pub aws_bin: String,
}

/// Names a setting the way an operator would fix it.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, toml_key: &'static str) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }
}

impl BblConfig {
    fn require_field(value: &str, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::MissingField(format!(
                "missing {}: set {} or add {} to bbl.toml",
                metadata.description, metadata.env_var, metadata.toml_key
            )));
        }
        Ok(())
    }

    /// Merges defaults, `bbl.toml`, and `BBL_*` variables, leaving the
    /// process arguments to clap.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("bbl")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// State directory as a UTF-8 path.
    #[must_use]
    pub fn state_dir(&self) -> Utf8PathBuf {
        Utf8PathBuf::from(&self.state_dir)
    }

    /// Rejects blank values. Error messages name the environment variable and
    /// TOML key that supply each field.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when a field is blank.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (value, metadata) in [
            (
                &self.state_dir,
                FieldMetadata::new("state directory", "BBL_STATE_DIR", "state_dir"),
            ),
            (
                &self.terraform_bin,
                FieldMetadata::new("terraform binary", "BBL_TERRAFORM_BIN", "terraform_bin"),
            ),
            (
                &self.gcloud_bin,
                FieldMetadata::new("gcloud binary", "BBL_GCLOUD_BIN", "gcloud_bin"),
            ),
            (
                &self.az_bin,
                FieldMetadata::new("az binary", "BBL_AZ_BIN", "az_bin"),
            ),
            (
                &self.aws_bin,
                FieldMetadata::new("aws binary", "BBL_AWS_BIN", "aws_bin"),
            ),
        ] {
            Self::require_field(value, &metadata)?;
        }
        Ok(())
    }
}

/// Configuration failures reported before any command runs.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is blank.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::EnvGuard;
    use rstest::{fixture, rstest};

    const VARS: [&str; 6] = [
        "BBL_CONFIG_PATH",
        "BBL_STATE_DIR",
        "BBL_TERRAFORM_BIN",
        "BBL_GCLOUD_BIN",
        "BBL_AZ_BIN",
        "BBL_AWS_BIN",
    ];

    fn cleared_except<'a>(overrides: &[(&'a str, &'a str)]) -> Vec<(&'a str, Option<&'a str>)> {
        VARS.iter()
            .map(|key| {
                let value = overrides
                    .iter()
                    .find(|(name, _)| name == key)
                    .map(|(_, value)| *value);
                (*key, value)
            })
            .collect()
    }

    #[fixture]
    fn defaults() -> BblConfig {
        BblConfig {
            state_dir: String::from("."),
            terraform_bin: String::from("terraform"),
            gcloud_bin: String::from("gcloud"),
            az_bin: String::from("az"),
            aws_bin: String::from("aws"),
        }
    }

    fn write_config(tmp: &tempfile::TempDir, contents: &str) -> String {
        let path = tmp.path().join("bbl.toml");
        std::fs::write(&path, contents).unwrap_or_else(|err| panic!("write config: {err}"));
        path.to_string_lossy().into_owned()
    }

    #[rstest]
    #[tokio::test]
    async fn loads_defaults_for_unset_fields(defaults: BblConfig) {
        let tmp = tempfile::TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
        let path = write_config(&tmp, "");
        let vars = cleared_except(&[("BBL_CONFIG_PATH", path.as_str())]);
        let _guard = EnvGuard::set_vars(&vars).await;

        let config = BblConfig::load_without_cli_args().expect("load config");

        assert_eq!(config, defaults);
    }

    #[rstest]
    #[tokio::test]
    async fn environment_overrides_config_file() {
        let tmp = tempfile::TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
        let path = write_config(
            &tmp,
            "terraform_bin = \"/usr/local/bin/terraform\"\ngcloud_bin = \"/opt/gcloud\"\n",
        );
        let vars = cleared_except(&[
            ("BBL_CONFIG_PATH", path.as_str()),
            ("BBL_STATE_DIR", "/var/lib/bbl"),
            ("BBL_TERRAFORM_BIN", "/opt/terraform"),
        ]);
        let _guard = EnvGuard::set_vars(&vars).await;

        let config = BblConfig::load_without_cli_args().expect("load config");

        assert_eq!(config.state_dir(), Utf8PathBuf::from("/var/lib/bbl"));
        assert_eq!(config.terraform_bin, "/opt/terraform");
        assert_eq!(config.gcloud_bin, "/opt/gcloud");
        assert_eq!(config.aws_bin, "aws");
    }

    #[rstest]
    fn defaults_validate(defaults: BblConfig) {
        assert_eq!(defaults.validate(), Ok(()));
    }

    #[rstest]
    #[case::state_dir(
        BblConfig { state_dir: String::from(" "), ..defaults() },
        "missing configuration field: missing state directory: set BBL_STATE_DIR or add state_dir to bbl.toml"
    )]
    #[case::terraform(
        BblConfig { terraform_bin: String::new(), ..defaults() },
        "missing configuration field: missing terraform binary: set BBL_TERRAFORM_BIN or add terraform_bin to bbl.toml"
    )]
    #[case::aws(
        BblConfig { aws_bin: String::new(), ..defaults() },
        "missing configuration field: missing aws binary: set BBL_AWS_BIN or add aws_bin to bbl.toml"
    )]
    fn blank_fields_are_actionable(#[case] config: BblConfig, #[case] expected: &str) {
        let err = config.validate().expect_err("blank field");
        assert_eq!(err.to_string(), expected);
    }
}
