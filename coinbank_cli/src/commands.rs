//! Subcommand bodies: run, breakdown, simulate, self-check.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use coinbank_config::Config;
use coinbank_core::anomaly::{AlertPhase, Delivery, Suppression, Verdict};
use coinbank_core::{
    CoinBreakdown, Engine, IngestCfg, IngestOutcome, IngestStats, Ingestor, breakdown,
    decode_weight, goal_progress,
};
use coinbank_io::{LogDispatcher, NullStore};
use coinbank_traits::{AlertDispatcher, LinkRead, SensorLink};
use eyre::eyre;
use serde_json::{Value, json};

use crate::wiring;

const TICK: Duration = Duration::from_millis(100);

fn breakdown_json(b: &CoinBreakdown) -> Value {
    json!({
        "coins": b.count,
        "value": b.value,
        "weight_used_g": b.weight_used_g,
        "weight_remaining_g": b.weight_remaining_g,
        "total_weight_g": b.total_weight_g,
    })
}

fn suppression_name(s: &Suppression) -> &'static str {
    match s {
        Suppression::Increase => "increase",
        Suppression::NearlyEmpty => "nearly_empty",
        Suppression::BelowThreshold { .. } => "below_threshold",
        Suppression::CoolingDown { .. } => "cooling_down",
    }
}

fn outcome_json(outcome: &IngestOutcome) -> Value {
    match outcome {
        IngestOutcome::Rejected(why) => json!({ "outcome": "rejected", "reason": why.to_string() }),
        IngestOutcome::Noise => json!({ "outcome": "noise" }),
        IngestOutcome::Changed { event, verdict } => {
            let mut v = json!({
                "outcome": "changed",
                "previous_g": event.previous_g,
                "next_g": event.next_g,
                "drop_g": event.drop_g(),
            });
            match verdict {
                Verdict::Fired { alert, delivery } => {
                    v["verdict"] = json!("fired");
                    v["coins_removed"] = json!(alert.coins_removed);
                    v["value_lost"] = json!(alert.value_lost);
                    v["delivered"] = json!(matches!(delivery, Delivery::Delivered));
                    if let Delivery::Failed(e) = delivery {
                        v["delivery_error"] = json!(e.to_string());
                    }
                }
                Verdict::Suppressed(s) => {
                    v["verdict"] = json!("suppressed");
                    v["reason"] = json!(suppression_name(s));
                    if let Suppression::CoolingDown { remaining } = s {
                        v["cooldown_remaining_s"] = json!(remaining.as_secs());
                    }
                }
            }
            v
        }
    }
}

fn outcome_text(outcome: &IngestOutcome) -> String {
    match outcome {
        IngestOutcome::Rejected(why) => format!("rejected: {why}"),
        IngestOutcome::Noise => "noise".to_string(),
        IngestOutcome::Changed { event, verdict } => {
            let head = format!("{:.3}g -> {:.3}g", event.previous_g, event.next_g);
            match verdict {
                Verdict::Fired { alert, delivery } => {
                    let sent = match delivery {
                        Delivery::Delivered => "delivered".to_string(),
                        Delivery::Failed(e) => format!("not delivered: {e}"),
                    };
                    format!(
                        "{head}  ALERT {} coins ({}) removed, {sent}",
                        alert.coins_removed, alert.value_lost
                    )
                }
                Verdict::Suppressed(Suppression::CoolingDown { remaining }) => {
                    format!("{head}  suppressed: cooling down, {}s left", remaining.as_secs())
                }
                Verdict::Suppressed(s) => format!("{head}  suppressed: {}", suppression_name(s)),
            }
        }
    }
}

fn status_json(engine: &Engine, kind: &str) -> Value {
    let snap = engine.snapshot();
    let alert = engine.alert_status();
    let (phase, remaining_s) = match alert.phase {
        AlertPhase::Armed => ("armed", None),
        AlertPhase::Cooling { remaining } => ("cooling", Some(remaining.as_secs())),
    };
    json!({
        "type": kind,
        "weight_g": snap.weight_g,
        "connected": snap.connected,
        "coin": engine.coin().label,
        "breakdown": breakdown_json(&engine.breakdown()),
        "alert_phase": phase,
        "cooldown_remaining_s": remaining_s,
        "last_alert_at": alert.last_alert_at.map(|t| t.to_rfc3339()),
    })
}

fn print_status(engine: &Engine, json_out: bool, kind: &str) {
    if json_out {
        println!("{}", status_json(engine, kind));
        return;
    }
    let snap = engine.snapshot();
    let b = engine.breakdown();
    let link = if snap.connected { "connected" } else { "disconnected" };
    let alert = match engine.alert_status().phase {
        AlertPhase::Armed => "armed".to_string(),
        AlertPhase::Cooling { remaining } => format!("cooling ({}s)", remaining.as_secs()),
    };
    println!(
        "{kind}: {:.3}g, {} x {} = {}, sensor {link}, alert {alert}",
        snap.weight_g,
        b.count,
        engine.coin().label,
        b.value
    );
}

fn stats_json(s: &IngestStats) -> Value {
    json!({
        "lines": s.lines,
        "rejected": s.rejected,
        "changes": s.changes,
        "alerts": s.alerts,
        "timeouts": s.timeouts,
        "link_errors": s.link_errors,
        "reconnects": s.reconnects,
    })
}

fn report_event(outcome: &IngestOutcome, json_out: bool) {
    if json_out {
        let mut v = outcome_json(outcome);
        v["type"] = json!("event");
        println!("{v}");
    } else {
        println!("{}", outcome_text(outcome));
    }
}

/// Watch the sensor until Ctrl-C, the optional duration, or the ingestion
/// thread dies.
pub fn run(
    cfg: &Config,
    sim: bool,
    status_every_s: u64,
    duration_s: Option<u64>,
    json_out: bool,
) -> eyre::Result<()> {
    let initial = wiring::initial_weight(cfg);
    let store = wiring::open_store(cfg)?;
    let dispatcher = wiring::open_dispatcher(cfg)?;
    let engine = Arc::new(wiring::build_engine(cfg, store, dispatcher, initial)?);

    let link: Box<dyn SensorLink + Send> = if sim {
        tracing::info!(start_g = initial, "using simulated sensor");
        Box::new(wiring::sim_link(initial))
    } else {
        wiring::open_link_waiting(&cfg.link)?
    };

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let flag = shutdown.clone();
        if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
            tracing::warn!(error = %e, "could not install Ctrl-C handler");
        }
    }

    let mut ingestor = Ingestor::spawn(link, engine.clone(), IngestCfg::from(&cfg.link))?;
    tracing::info!(
        weight_g = engine.current_weight(),
        coin = %engine.coin().label,
        "monitoring started"
    );

    let started = Instant::now();
    let deadline = duration_s.map(|s| started + Duration::from_secs(s));
    let status_every = Duration::from_secs(status_every_s.max(1));
    let mut last_status = started;
    let mut result = Ok(());

    loop {
        for outcome in ingestor.events() {
            report_event(&outcome, json_out);
        }
        if shutdown.load(Ordering::Relaxed) {
            tracing::info!("shutdown requested");
            break;
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            tracing::info!("run duration elapsed");
            break;
        }
        if !ingestor.is_running() {
            result = Err(eyre!("ingestion thread stopped unexpectedly"));
            break;
        }
        if last_status.elapsed() >= status_every {
            print_status(&engine, json_out, "status");
            last_status = Instant::now();
        }
        std::thread::sleep(TICK);
    }

    let stats = ingestor.stop().unwrap_or_default();
    for outcome in ingestor.events() {
        report_event(&outcome, json_out);
    }
    if json_out {
        let mut v = status_json(&engine, "final");
        v["stats"] = stats_json(&stats);
        println!("{v}");
    } else {
        print_status(&engine, false, "final");
        println!(
            "lines {}, rejected {}, changes {}, alerts {}, timeouts {}, link errors {}, reconnects {}",
            stats.lines,
            stats.rejected,
            stats.changes,
            stats.alerts,
            stats.timeouts,
            stats.link_errors,
            stats.reconnects
        );
    }
    result
}

pub fn breakdown_cmd(
    cfg: &Config,
    grams: f64,
    prize: Option<f64>,
    json_out: bool,
) -> eyre::Result<()> {
    if !grams.is_finite() {
        eyre::bail!("weight must be a finite number of grams");
    }
    let coin = &cfg.coin;
    let b = breakdown(grams, coin.mass_g, coin.value);
    let goal = prize.map(|p| (p, goal_progress(&b, p, coin.value)));

    if json_out {
        let mut v = breakdown_json(&b);
        v["coin"] = json!(coin.label);
        if let Some((p, g)) = goal {
            v["goal"] = json!({
                "prize": p,
                "percent": g.percent,
                "remaining_value": g.remaining_value,
                "coins_needed": g.coins_needed,
            });
        }
        println!("{v}");
        return Ok(());
    }

    println!("Total weight: {:.3}g", b.total_weight_g);
    println!("{} coins: {}", coin.label, b.count);
    println!("Value: {}", b.value);
    println!("Weight used: {:.3}g", b.weight_used_g);
    println!("Remaining: {:.3}g", b.weight_remaining_g);
    if let Some((p, g)) = goal {
        println!(
            "Goal {p}: {:.1}% saved, {} to go ({} more coins)",
            g.percent, g.remaining_value, g.coins_needed
        );
    }
    Ok(())
}

/// Push each weight through a throwaway engine that persists nothing.
pub fn simulate(cfg: &Config, weights: &[f64], deliver: bool, json_out: bool) -> eyre::Result<()> {
    let dispatcher: Box<dyn AlertDispatcher + Send> = if deliver {
        wiring::open_dispatcher(cfg)?
    } else {
        Box::new(LogDispatcher)
    };
    let engine = wiring::build_engine(
        cfg,
        Box::new(NullStore),
        dispatcher,
        cfg.tracker.initial_weight_g,
    )?;

    let mut fired = 0usize;
    for &w in weights {
        let outcome = engine.force_weight(w);
        if outcome.alert_fired() {
            fired += 1;
        }
        if json_out {
            let mut v = outcome_json(&outcome);
            v["type"] = json!("step");
            v["input_g"] = json!(w);
            println!("{v}");
        } else {
            println!("{w:>10.3}g  {}", outcome_text(&outcome));
        }
    }

    if json_out {
        let mut v = status_json(&engine, "final");
        v["alerts"] = json!(fired);
        println!("{v}");
    } else {
        print_status(&engine, false, "final");
        println!("alerts fired: {fired}");
    }
    Ok(())
}

/// Validate config, then open the store, the alert channel and the link in
/// that order. The first failure is returned with its own exit code.
pub fn self_check(cfg: &Config, sim: bool, json_out: bool) -> eyre::Result<()> {
    let mut checks: Vec<(&str, String)> = vec![("config", "ok".to_string())];

    drop(wiring::open_store(cfg)?);
    checks.push(("store", format!("{:?} at {}", cfg.store.kind, cfg.store.path.display())));

    drop(wiring::open_dispatcher(cfg)?);
    let channel = if cfg.alert.telegram.is_some() { "telegram" } else { "log" };
    checks.push(("alerts", channel.to_string()));

    let mut link: Box<dyn SensorLink + Send> = if sim {
        Box::new(wiring::sim_link(cfg.tracker.initial_weight_g))
    } else {
        wiring::open_link(&cfg.link, false)?
    };
    let timeout = Duration::from_millis(cfg.link.read_timeout_ms);
    let reading = match link.read_line(timeout) {
        Ok(LinkRead::Line(line)) => match decode_weight(&line, Instant::now()) {
            Ok(s) => format!("reading {:.3}g", s.value_g),
            Err(e) => format!("line received but unusable ({e}): {line:?}"),
        },
        Ok(LinkRead::Timeout) => "open, no line within the read timeout".to_string(),
        Err(e) => {
            return Err(eyre::Report::new(
                coinbank_core::error::CoinbankError::Link(e.to_string()),
            ));
        }
    };
    if let Err(e) = link.close() {
        tracing::debug!(error = %e, "closing self-check link failed");
    }
    checks.push(("link", reading));

    if json_out {
        let map: serde_json::Map<String, Value> = checks
            .into_iter()
            .map(|(k, v)| (k.to_string(), Value::String(v)))
            .collect();
        println!("{}", json!({ "type": "self_check", "ok": true, "checks": map }));
    } else {
        for (k, v) in checks {
            println!("{k:<8} {v}");
        }
        println!("self-check OK");
    }
    Ok(())
}
