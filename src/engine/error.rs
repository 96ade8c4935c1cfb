// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jerry Snitselaar and contributors

// ABOUTME: Error taxonomy for non-fatal domain failures (kinds, not types)
// ABOUTME: Grounded on TerrainOpOutcome's refusal variants and the message-deque pattern in GameState; nothing here crosses the tick boundary

use std::fmt;

/// Kinds of recoverable failure the core can report. None of these cross
/// the tick boundary as a panic or propagated `Result`; each is recovered
/// locally (state left untouched, or clamped) and surfaced only as a
/// message appended to the bounded queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimError {
    /// Operation is logically impossible: dig bedrock with no floor room,
    /// insufficient inventory, pour zero litres, build on an occupied cell.
    DomainRefusal,
    /// Target cell lies outside the grid.
    BoundsViolation,
    /// A wellspring or rain request exceeded the pool's reserve; the
    /// caller scaled its transfer down rather than failing outright.
    PoolDepleted,
    /// The subsurface phase was reached with an invalid connectivity
    /// cache; recovered by rebuilding before any lookup, never propagated.
    CacheStale,
    /// One of the data model's invariants was violated mid-tick. Debug
    /// builds assert; release builds clamp (e.g. `max(0, ..)`) and log.
    InvariantBreach,
}

impl SimError {
    /// Render as the user-visible text appended to the message queue.
    pub fn message(self, detail: &str) -> String {
        match self {
            SimError::DomainRefusal => detail.to_string(),
            SimError::BoundsViolation => "That's outside the map.".to_string(),
            SimError::PoolDepleted => format!("{detail} (reserve depleted, scaled down)"),
            SimError::CacheStale => "Connectivity cache was stale; rebuilt before use.".to_string(),
            SimError::InvariantBreach => format!("Invariant breach clamped: {detail}"),
        }
    }
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message(""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_violation_has_a_fixed_message() {
        assert_eq!(SimError::BoundsViolation.message("ignored"), "That's outside the map.");
    }

    #[test]
    fn domain_refusal_passes_detail_through() {
        assert_eq!(SimError::DomainRefusal.message("no scrap"), "no scrap");
    }
}
