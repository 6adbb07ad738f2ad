use figment::Jail;
use pretty_assertions::assert_eq;

use attest_config::AttestConfig;

#[test]
fn env_overrides_nested_keys() {
    Jail::expect_with(|jail| {
        jail.set_env("ATTEST_EMAIL__API_KEY", "re_from_env");
        jail.set_env("ATTEST_JOBS__RETRY__MAX_ATTEMPTS", "7");
        jail.set_env("ATTEST_VECTOR__URL", "https://vectors.example.com");
        jail.set_env("ATTEST_VECTOR__TOKEN", "vt_123");

        let config = AttestConfig::load().expect("config loads");
        assert_eq!(config.email.api_key, "re_from_env");
        assert_eq!(config.jobs.retry.max_attempts, 7);
        assert!(config.vector.is_configured());
        Ok(())
    });
}

#[test]
fn env_beats_project_toml() {
    Jail::expect_with(|jail| {
        jail.create_dir(".attest")?;
        jail.create_file(
            ".attest/config.toml",
            "[jobs]\nanswer_batch_size = 10\n\n[scanner]\nurl = \"https://toml.example.com\"",
        )?;
        jail.set_env("ATTEST_JOBS__ANSWER_BATCH_SIZE", "20");

        let config = AttestConfig::load().expect("config loads");
        assert_eq!(config.jobs.answer_batch_size, 20);
        assert_eq!(config.scanner.url, "https://toml.example.com");
        Ok(())
    });
}

#[test]
fn directory_token_from_env() {
    Jail::expect_with(|jail| {
        jail.set_env("ATTEST_DIRECTORY__TOKEN", "dir_token");
        jail.set_env("ATTEST_DIRECTORY__RIPPLING_URL", "http://localhost:9000");

        let config = AttestConfig::load().expect("config loads");
        assert!(config.directory.is_configured());
        assert_eq!(config.directory.rippling_url, "http://localhost:9000");
        assert_eq!(
            config.directory.google_workspace_url,
            "https://admin.googleapis.com"
        );
        Ok(())
    });
}
