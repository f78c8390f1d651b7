//! Timeline simulation.
//!
//! Drives a real [`SessionEngine`] with a [`ManualClock`] so rotation
//! policies can be checked without waiting hours:
//!
//! ```text
//! sessionkeeper simulate --steps "access,advance:3h59m59s,access,advance:2s,access"
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use sk_domain::config::{Config, SessionConfig};
use sk_sessions::{AppLifecycle, ManualClock, SessionEngine, SessionEventsObserver};

/// One scripted event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// A telemetry producer asks for the session id.
    Access,
    Background,
    Foreground,
    Advance(Duration),
}

impl FromStr for Step {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let s = s.trim();
        match s {
            "access" => Ok(Self::Access),
            "background" | "bg" => Ok(Self::Background),
            "foreground" | "fg" => Ok(Self::Foreground),
            _ => match s.strip_prefix("advance:") {
                Some(d) => Ok(Self::Advance(parse_duration(d)?)),
                None => anyhow::bail!("unknown step {s:?}"),
            },
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Access => f.write_str("access"),
            Self::Background => f.write_str("background"),
            Self::Foreground => f.write_str("foreground"),
            Self::Advance(d) => write!(f, "advance:{}", format_duration(*d)),
        }
    }
}

/// Parse a comma-separated step list.
pub fn parse_steps(spec: &str) -> anyhow::Result<Vec<Step>> {
    let steps = spec
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(str::parse)
        .collect::<anyhow::Result<Vec<Step>>>()?;
    if steps.is_empty() {
        anyhow::bail!("no steps given");
    }
    Ok(steps)
}

/// Parse durations like `90s`, `15m`, `4h`, `250ms` or `3h59m59s`.
pub fn parse_duration(s: &str) -> anyhow::Result<Duration> {
    let s = s.trim();
    if s.is_empty() {
        anyhow::bail!("empty duration");
    }

    let mut total = Duration::ZERO;
    let mut rest = s;
    while !rest.is_empty() {
        let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        if digits == 0 {
            anyhow::bail!("invalid duration {s:?}: expected a number");
        }
        let value: u64 = rest[..digits]
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid duration {s:?}: {e}"))?;
        rest = &rest[digits..];

        let unit_len = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
        let part = match &rest[..unit_len] {
            "ms" => Some(Duration::from_millis(value)),
            "s" => Some(Duration::from_secs(value)),
            "m" => value.checked_mul(60).map(Duration::from_secs),
            "h" => value.checked_mul(3600).map(Duration::from_secs),
            unit => anyhow::bail!("invalid duration {s:?}: unknown unit {unit:?}"),
        };
        total = match part.and_then(|p| total.checked_add(p)) {
            Some(t) => t,
            None => anyhow::bail!("invalid duration {s:?}: too large"),
        };
        rest = &rest[unit_len..];
    }
    Ok(total)
}

/// Compact `1h02m03s` rendering; sub-second remainders are shown in ms.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    let ms = d.subsec_millis();
    let mut out = String::new();
    if h > 0 {
        out.push_str(&format!("{h}h{m:02}m{s:02}s"));
    } else if m > 0 {
        out.push_str(&format!("{m}m{s:02}s"));
    } else {
        out.push_str(&format!("{s}s"));
    }
    if ms > 0 {
        out.push_str(&format!("{ms}ms"));
    }
    out
}

/// What the engine reported after one step.
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub step: String,
    pub elapsed: String,
    pub foreground: bool,
    /// Present only for `access` steps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub rotated: bool,
}

/// Replay `steps` against a fresh engine built from `config`.
pub fn run_timeline(config: &SessionConfig, steps: &[Step]) -> Vec<StepOutcome> {
    let clock = Arc::new(ManualClock::new());
    let lifecycle = AppLifecycle::new();
    let engine = SessionEngine::builder(*config)
        .clock(clock.clone())
        .build(&lifecycle);
    engine.add_observer(Arc::new(SessionEventsObserver::new(clock.clone())));

    let mut last_id: Option<String> = None;
    let mut outcomes = Vec::with_capacity(steps.len());

    for step in steps {
        let mut session_id = None;
        let mut rotated = false;
        match *step {
            Step::Access => {
                let id = engine.get_session_id();
                let span = tracing::info_span!("simulated_access", session.id = %id);
                span.in_scope(|| tracing::debug!("telemetry stamped with session id"));
                rotated = last_id.as_deref().is_some_and(|prev| prev != id);
                last_id = Some(id.clone());
                session_id = Some(id);
            }
            Step::Background => lifecycle.backgrounded(),
            Step::Foreground => lifecycle.foregrounded(),
            Step::Advance(d) => clock.advance(d),
        }
        outcomes.push(StepOutcome {
            step: step.to_string(),
            elapsed: format_duration(clock.elapsed()),
            foreground: lifecycle.is_foreground(),
            session_id,
            rotated,
        });
    }

    outcomes
}

pub fn run(config: &Config, steps: &str, json: bool) -> anyhow::Result<()> {
    let steps = parse_steps(steps)?;
    let outcomes = run_timeline(&config.session, &steps);

    for outcome in &outcomes {
        if json {
            println!("{}", serde_json::to_string(outcome)?);
        } else {
            println!(
                "{:>12}  {:<22} {:<4} {}{}",
                outcome.elapsed,
                outcome.step,
                if outcome.foreground { "fg" } else { "bg" },
                outcome.session_id.as_deref().unwrap_or("-"),
                if outcome.rotated { "  (rotated)" } else { "" },
            );
        }
    }
    Ok(())
}
