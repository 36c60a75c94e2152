//! Host-facing entry point: one `AbrSession` per client connection, built by
//! a factory over an algorithm-selector string so a host only ever calls
//! `register_metrics` / `register_abort` / `decide`.

use std::str::FromStr;
use std::sync::Arc;

use crate::catalogue::Catalogue;
use crate::cc::CongestionHook;
use crate::error::AbrError;
use crate::pipeline::{Controller, SegmentProgress};
use crate::policy::{BufferBasedPolicy, MinervaController, RandomPolicy};
use crate::telemetry::{Decision, Metrics};

/// Algorithm-selector identifiers. `Target` and `Remote` name two policy
/// variants that are out of this core's scope (no network I/O, no
/// additional CC gap-mode variants); they parse successfully so a host gets
/// a clear configuration error at session-construction time rather than a
/// silent fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
    Random,
    Bb,
    Minerva,
    Target,
    Remote,
}

impl FromStr for PolicyKind {
    type Err = AbrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "random" => Ok(Self::Random),
            "bb" => Ok(Self::Bb),
            "minerva" => Ok(Self::Minerva),
            "target" => Ok(Self::Target),
            "remote" => Ok(Self::Remote),
            other => Err(AbrError::UnsupportedPolicy(other.to_string())),
        }
    }
}

/// Unifies the base `SegmentProgress<P>` pipeline shapes and Minerva's
/// standalone weight-update variant behind one `Controller` surface, so a
/// host doesn't need to know which shape backs a given session.
pub enum AbrSession<H: CongestionHook> {
    Random(SegmentProgress<RandomPolicy>),
    Bb(SegmentProgress<BufferBasedPolicy>),
    Minerva(MinervaController<H>),
}

impl<H: CongestionHook> AbrSession<H> {
    /// Builds a session for `kind`. `hook` is only consumed by the `Minerva`
    /// variant; other variants drop it. `Target`/`Remote` are rejected here
    /// with `AbrError::UnsupportedPolicy`, since only misconfiguration
    /// detected at construction time is fatal and surfaced to the host.
    pub fn new(kind: PolicyKind, catalogue: Arc<Catalogue>, hook: H) -> Result<Self, AbrError> {
        match kind {
            PolicyKind::Random => Ok(Self::Random(SegmentProgress::new(catalogue, RandomPolicy))),
            PolicyKind::Bb => Ok(Self::Bb(SegmentProgress::new(catalogue, BufferBasedPolicy::new()))),
            PolicyKind::Minerva => Ok(Self::Minerva(MinervaController::new(catalogue, hook))),
            PolicyKind::Target => Err(AbrError::UnsupportedPolicy("target".to_string())),
            PolicyKind::Remote => Err(AbrError::UnsupportedPolicy("remote".to_string())),
        }
    }
}

impl<H: CongestionHook> Controller for AbrSession<H> {
    fn register_metrics(&mut self, metrics: &Metrics) {
        match self {
            Self::Random(p) => p.register_metrics(metrics),
            Self::Bb(p) => p.register_metrics(metrics),
            Self::Minerva(p) => p.register_metrics(metrics),
        }
    }

    fn register_abort(&mut self, index: i32) {
        match self {
            Self::Random(p) => p.register_abort(index),
            Self::Bb(p) => p.register_abort(index),
            Self::Minerva(p) => p.register_abort(index),
        }
    }

    fn decide(&mut self) -> Decision {
        match self {
            Self::Random(p) => p.decide(),
            Self::Bb(p) => p.decide(),
            Self::Minerva(p) => p.decide(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::{CatalogueConfig, VideoConfigEntry, VideoInfo};
    use crate::cc::test_support::FakeCongestionHook;

    fn catalogue() -> Arc<Catalogue> {
        let cfg = CatalogueConfig {
            domain: String::new(),
            segments: 5,
            video_configs: vec![VideoConfigEntry {
                resource: "/video0".into(),
                path: String::new(),
                quality: 500,
                video_info: (0..5)
                    .map(|i| VideoInfo { start_time: i as f64 * 4.0, vmaf: 50.0, size: 100_000 })
                    .collect(),
            }],
        };
        Arc::new(Catalogue::from_config(&cfg).unwrap())
    }

    #[test]
    fn test_policy_kind_parses_known_identifiers() {
        assert_eq!("random".parse::<PolicyKind>().unwrap(), PolicyKind::Random);
        assert_eq!("bb".parse::<PolicyKind>().unwrap(), PolicyKind::Bb);
        assert_eq!("minerva".parse::<PolicyKind>().unwrap(), PolicyKind::Minerva);
        assert_eq!("target".parse::<PolicyKind>().unwrap(), PolicyKind::Target);
        assert_eq!("remote".parse::<PolicyKind>().unwrap(), PolicyKind::Remote);
    }

    #[test]
    fn test_policy_kind_rejects_unknown_identifier() {
        assert!("nonexistent".parse::<PolicyKind>().is_err());
    }

    #[test]
    fn test_target_and_remote_are_unsupported_at_construction() {
        let hook = FakeCongestionHook::default();
        assert!(matches!(
            AbrSession::new(PolicyKind::Target, catalogue(), hook),
            Err(AbrError::UnsupportedPolicy(_))
        ));
        let hook = FakeCongestionHook::default();
        assert!(matches!(
            AbrSession::new(PolicyKind::Remote, catalogue(), hook),
            Err(AbrError::UnsupportedPolicy(_))
        ));
    }

    #[test]
    fn test_random_session_drives_decisions_through_the_shared_controller_surface() {
        let hook = FakeCongestionHook::default();
        let mut session = AbrSession::new(PolicyKind::Random, catalogue(), hook).unwrap();
        let decision = session.decide();
        assert_eq!(decision, Decision { index: 1, quality: 0, timestamp: 0 });
    }

    #[test]
    fn test_minerva_session_always_decides_noop() {
        let hook = FakeCongestionHook::default();
        let mut session = AbrSession::new(PolicyKind::Minerva, catalogue(), hook).unwrap();
        assert_eq!(session.decide(), Decision::noop());
    }
}
