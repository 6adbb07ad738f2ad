/// Upper bound on rows a single `runs list` query returns.
pub const MAX_LIMIT: u32 = 500;

/// Row limit for list commands: the subcommand's `--limit`, then the global
/// one, then `fallback`. Clamped to `1..=MAX_LIMIT`.
#[must_use]
pub fn effective_limit(local: Option<u32>, global: Option<u32>, fallback: u32) -> u32 {
    local.or(global).unwrap_or(fallback).clamp(1, MAX_LIMIT)
}
