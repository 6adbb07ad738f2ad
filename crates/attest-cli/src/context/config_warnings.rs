use attest_config::AttestConfig;

/// Emit warnings for likely mistyped env var keys that silently fell back to defaults.
pub fn warn_unconfigured(config: &AttestConfig) {
    for warning in collect_unconfigured_warnings(config, std::env::vars()) {
        tracing::warn!("{warning}");
    }
}

fn collect_unconfigured_warnings<I>(config: &AttestConfig, env: I) -> Vec<String>
where
    I: IntoIterator<Item = (String, String)>,
{
    let env_keys = env.into_iter().map(|(key, _)| key).collect::<Vec<_>>();

    let sections = [
        (config.email.is_configured(), "EMAIL", "ATTEST_EMAIL__API_KEY"),
        (config.vector.is_configured(), "VECTOR", "ATTEST_VECTOR__URL"),
        (config.scanner.is_configured(), "SCANNER", "ATTEST_SCANNER__URL"),
        (config.directory.is_configured(), "DIRECTORY", "ATTEST_DIRECTORY__TOKEN"),
    ];

    sections
        .into_iter()
        .filter(|(configured, section, _)| {
            !configured && has_env_prefix(&env_keys, &format!("ATTEST_{section}"))
        })
        .map(|(_, section, example)| {
            format!(
                "{} config appears default while ATTEST_{section}* env vars exist. \
                 Use double underscores (example: {example}).",
                section.to_ascii_lowercase()
            )
        })
        .collect()
}

fn has_env_prefix(keys: &[String], prefix: &str) -> bool {
    keys.iter().any(|key| key.starts_with(prefix))
}
