//! Provider manifests.
//!
//! A manifest describes an integration provider and the background workflows
//! it supports. Orchestrators filter connections by capability before fanning
//! out, so a connection whose provider lacks the capability is never touched.

use serde::Serialize;
use std::fmt;

/// A background workflow a provider can take part in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Cloud-security checks run by the scan orchestrator.
    SecurityScan,
    /// Employee directory import run by the sync scheduler.
    EmployeeSync,
}

impl Capability {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SecurityScan => "security_scan",
            Self::EmployeeSync => "employee_sync",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static descriptor for an integration provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProviderManifest {
    pub slug: &'static str,
    pub name: &'static str,
    pub category: &'static str,
    pub capabilities: &'static [Capability],
}

impl ProviderManifest {
    #[must_use]
    pub fn supports(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}

pub const AWS: ProviderManifest = ProviderManifest {
    slug: "aws",
    name: "Amazon Web Services",
    category: "cloud",
    capabilities: &[Capability::SecurityScan],
};

pub const GCP: ProviderManifest = ProviderManifest {
    slug: "gcp",
    name: "Google Cloud Platform",
    category: "cloud",
    capabilities: &[Capability::SecurityScan],
};

pub const AZURE: ProviderManifest = ProviderManifest {
    slug: "azure",
    name: "Microsoft Azure",
    category: "cloud",
    capabilities: &[Capability::SecurityScan],
};

pub const VERCEL: ProviderManifest = ProviderManifest {
    slug: "vercel",
    name: "Vercel",
    category: "hosting",
    capabilities: &[],
};

pub const GOOGLE_WORKSPACE: ProviderManifest = ProviderManifest {
    slug: "google-workspace",
    name: "Google Workspace",
    category: "identity",
    capabilities: &[Capability::EmployeeSync],
};

pub const RIPPLING: ProviderManifest = ProviderManifest {
    slug: "rippling",
    name: "Rippling",
    category: "hr",
    capabilities: &[Capability::EmployeeSync],
};

/// Every known provider, in display order.
pub const ALL: &[ProviderManifest] = &[AWS, GCP, AZURE, VERCEL, GOOGLE_WORKSPACE, RIPPLING];

/// Look up a manifest by slug.
#[must_use]
pub fn find(slug: &str) -> Option<&'static ProviderManifest> {
    ALL.iter().find(|m| m.slug == slug)
}

/// Whether the provider identified by `slug` supports `capability`.
///
/// Unknown slugs support nothing.
#[must_use]
pub fn supports(slug: &str, capability: Capability) -> bool {
    find(slug).is_some_and(|m| m.supports(capability))
}

/// Slugs of every provider with `capability`.
#[must_use]
pub fn providers_with(capability: Capability) -> Vec<&'static str> {
    ALL.iter()
        .filter(|m| m.supports(capability))
        .map(|m| m.slug)
        .collect()
}
