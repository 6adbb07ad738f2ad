use anyhow::Context;

use attest_config::AttestConfig;

use crate::cli::GlobalFlags;

/// Load `.env`, layered config, then apply CLI overrides and validate.
pub fn load_config(flags: &GlobalFlags) -> anyhow::Result<AttestConfig> {
    load_dotenv()?;

    let mut config = AttestConfig::load().context("failed to load attest configuration")?;
    apply_overrides(&mut config, flags);
    config.validate().context("invalid attest configuration")?;
    Ok(config)
}

fn apply_overrides(config: &mut AttestConfig, flags: &GlobalFlags) {
    if let Some(path) = &flags.database {
        config.database.path.clone_from(path);
    }
}

fn load_dotenv() -> anyhow::Result<()> {
    let cwd = std::env::current_dir().context("failed to determine current directory")?;
    let env_path = cwd.join(".env");
    if env_path.exists() {
        dotenvy::from_path(&env_path)
            .with_context(|| format!("failed to load dotenv file at {}", env_path.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::apply_overrides;
    use crate::cli::{GlobalFlags, OutputFormat};
    use attest_config::AttestConfig;

    fn flags(database: Option<&str>) -> GlobalFlags {
        GlobalFlags {
            format: OutputFormat::Json,
            limit: None,
            quiet: false,
            verbose: false,
            database: database.map(str::to_string),
        }
    }

    #[test]
    fn database_flag_overrides_config_path() {
        let mut config = AttestConfig::default();
        apply_overrides(&mut config, &flags(Some(":memory:")));
        assert!(config.database.is_in_memory());
    }

    #[test]
    fn no_flag_keeps_config_path() {
        let mut config = AttestConfig::default();
        let before = config.database.path.clone();
        apply_overrides(&mut config, &flags(None));
        assert_eq!(config.database.path, before);
    }
}
