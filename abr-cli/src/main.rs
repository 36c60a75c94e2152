use std::fs;
use std::process::exit;
use std::sync::Arc;

use abr_core::{AbrSession, Catalogue, Controller, PolicyKind};
use anyhow::{Context, Result};
use clap::Parser;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

mod cc_hook;
mod cli;
mod config;
mod trace;

use cc_hook::TraceCongestionHook;
use cli::CliArgs;
use trace::TraceEvent;

fn main() {
    let args = CliArgs::parse();

    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
    tracing::subscriber::set_global_default(subscriber).expect("failed to set tracing subscriber");

    if let Err(e) = run(args) {
        error!(error = ?e, "abr-cli run failed");
        exit(1);
    }
}

fn run(args: CliArgs) -> Result<()> {
    let catalogue_config = config::load_catalogue_config(&args.catalogue)?;
    let catalogue = Arc::new(
        Catalogue::from_config(&catalogue_config).context("building catalogue from descriptor")?,
    );
    info!(
        qualities = catalogue.quality_count(),
        segments = catalogue.segment_count(),
        ladder = ?catalogue.bitrate_array(),
        "loaded catalogue"
    );

    let policy_kind: PolicyKind = args
        .policy
        .parse()
        .with_context(|| format!("resolving policy selector {:?}", args.policy))?;

    let hook = TraceCongestionHook::new(Some(args.min_rtt_ms));
    let mut session = AbrSession::new(policy_kind, Arc::clone(&catalogue), hook)
        .with_context(|| format!("constructing session for policy {:?}", args.policy))?;

    let trace_source = fs::read_to_string(&args.trace)
        .with_context(|| format!("reading trace file at {}", args.trace.display()))?;
    let events = trace::parse_trace(&trace_source).context("parsing telemetry trace")?;

    info!(events = events.len(), "replaying telemetry trace");

    for event in events {
        match event {
            TraceEvent::Metrics { metrics } => session.register_metrics(&metrics),
            TraceEvent::Abort { index } => session.register_abort(index),
            // Acked-byte accounting isn't part of the Controller trait (it's
            // a CC-hook concern, not pipeline telemetry), so it's routed
            // straight to the session's hook instead.
            TraceEvent::Acked { bytes } => record_acked_bytes(&mut session, bytes),
            TraceEvent::Tick => {}
        }

        let decision = session.decide();
        if !decision.is_noop() {
            let line = serde_json::to_string(&decision).expect("Decision serializes infallibly");
            println!("{line}");
        }
    }

    Ok(())
}

/// Routes an `acked` trace event to the underlying congestion hook when the
/// session is running Minerva; a no-op for every other policy.
fn record_acked_bytes(session: &mut AbrSession<TraceCongestionHook>, bytes: u64) {
    if let AbrSession::Minerva(minerva) = session {
        minerva.hook_mut().add_acked_bytes(bytes);
    }
}
