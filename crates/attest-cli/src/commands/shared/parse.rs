use serde::de::DeserializeOwned;

/// Parse a snake_case enum value using serde-deserialization.
pub fn parse_enum<T>(raw: &str, field: &str) -> anyhow::Result<T>
where
    T: DeserializeOwned,
{
    let normalized = raw.trim().replace('-', "_");
    serde_json::from_value(serde_json::Value::String(normalized))
        .map_err(|error| anyhow::anyhow!("invalid {field} '{raw}': {error}"))
}

#[cfg(test)]
mod tests {
    use attest_core::enums::RunStatus;

    use super::parse_enum;

    #[test]
    fn parses_run_status() {
        let status: RunStatus = parse_enum("completed", "status").expect("status should parse");
        assert_eq!(status, RunStatus::Completed);
    }

    #[test]
    fn errors_on_invalid_enum() {
        let err = parse_enum::<RunStatus>("done", "status").expect_err("should fail");
        assert!(err.to_string().contains("invalid status 'done'"));
    }
}
