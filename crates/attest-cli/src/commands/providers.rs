use serde::Serialize;

use attest_core::manifest::{self, Capability, ProviderManifest};

use crate::cli::GlobalFlags;
use crate::output::output;

#[derive(Debug, Serialize)]
struct ProviderRow {
    slug: &'static str,
    name: &'static str,
    category: &'static str,
    capabilities: Vec<&'static str>,
}

impl From<&ProviderManifest> for ProviderRow {
    fn from(m: &ProviderManifest) -> Self {
        Self {
            slug: m.slug,
            name: m.name,
            category: m.category,
            capabilities: m.capabilities.iter().map(|c: &Capability| c.as_str()).collect(),
        }
    }
}

/// Handle `attest providers`. Needs no database.
pub fn handle(flags: &GlobalFlags) -> anyhow::Result<()> {
    let rows = manifest::ALL.iter().map(ProviderRow::from).collect::<Vec<_>>();
    output(&rows, flags.format)
}

#[cfg(test)]
mod tests {
    use super::ProviderRow;
    use attest_core::manifest;
    use pretty_assertions::assert_eq;

    #[test]
    fn rows_list_capability_names() {
        let row = ProviderRow::from(&manifest::AWS);
        assert_eq!(row.capabilities, vec!["security_scan"]);
        assert!(ProviderRow::from(&manifest::VERCEL).capabilities.is_empty());
    }
}
