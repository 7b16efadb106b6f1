//! Colorful console output for engine events.
//!
//! Provides a custom `tracing` layer that formats resolution events with
//! colors.
//!
//! ## Log Levels
//!
//! - **DEBUG**: Domain lifecycle (relations, merges, splits, solves)
//! - **TRACE**: Per-relation arbitration decisions
//! - **WARN**: Handles dropped while their engine was busy

use num_format::{Locale, ToFormattedString};
use owo_colors::OwoColorize;
use std::io::{self, Write};
use std::sync::OnceLock;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

static INIT: OnceLock<()> = OnceLock::new();

/// Filter used when `RUST_LOG` is unset or invalid.
const DEFAULT_FILTER: &str = "eqrel_engine=debug";

/// Initializes console output.
///
/// Safe to call multiple times - only the first call has effect. Honors
/// `RUST_LOG`, defaulting to `eqrel_engine=debug`.
pub fn init() {
    INIT.get_or_init(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(EngineConsoleLayer)
            .try_init();
    });
}

/// A tracing layer that formats engine events with colors.
pub struct EngineConsoleLayer;

impl<S: Subscriber> Layer<S> for EngineConsoleLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if !metadata.target().starts_with("eqrel") {
            return;
        }

        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        let output = format_event(&visitor, *metadata.level());
        if !output.is_empty() {
            let _ = writeln!(io::stdout(), "{}", output);
        }
    }
}

#[derive(Debug, Default)]
struct EventVisitor {
    event: Option<String>,
    domain: Option<String>,
    relation: Option<String>,
    variable: Option<String>,
    survivor: Option<String>,
    absorbed: Option<String>,
    fresh: Option<String>,
    error: Option<String>,
    variable_count: Option<u64>,
    member_count: Option<u64>,
    mandatory_count: Option<u64>,
    conditional_count: Option<u64>,
    dropped_relations: Option<u64>,
    accepted: Option<u64>,
    skipped: Option<u64>,
    duration_us: Option<u64>,
    rank: Option<f64>,
    mandatory: Option<bool>,
    selector: Option<bool>,
}

impl Visit for EventVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let s = format!("{:?}", value).trim_matches('"').to_string();
        match field.name() {
            "event" => self.event = Some(s),
            "domain" => self.domain = Some(s),
            "relation" => self.relation = Some(s),
            "variable" => self.variable = Some(s),
            "survivor" => self.survivor = Some(s),
            "absorbed" => self.absorbed = Some(s),
            "fresh" => self.fresh = Some(s),
            "error" => self.error = Some(s),
            _ => {}
        }
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        match field.name() {
            "variable_count" => self.variable_count = Some(value),
            "member_count" => self.member_count = Some(value),
            "mandatory_count" => self.mandatory_count = Some(value),
            "conditional_count" => self.conditional_count = Some(value),
            "dropped_relations" => self.dropped_relations = Some(value),
            "accepted" => self.accepted = Some(value),
            "skipped" => self.skipped = Some(value),
            "duration_us" => self.duration_us = Some(value),
            _ => {}
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record_u64(field, value as u64);
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        if field.name() == "rank" {
            self.rank = Some(value);
        }
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        match field.name() {
            "mandatory" => self.mandatory = Some(value),
            "selector" => self.selector = Some(value),
            _ => {}
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.record_debug(field, &value);
    }
}

fn format_event(v: &EventVisitor, level: Level) -> String {
    match v.event.as_deref().unwrap_or("") {
        "relation_declared" => format_relation_declared(v),
        "domain_merge" => format_merge(v),
        "domain_split" => format_split(v),
        "solve_start" => format_solve_start(v),
        "solve_end" => format_solve_end(v),
        "relation_accepted" => format_arbitration(v, true, level),
        "relation_skipped" => format_arbitration(v, false, level),
        "drop_failed" => format_drop_failed(v),
        _ => String::new(),
    }
}

fn label(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("?")
}

fn count(value: Option<u64>) -> String {
    value.unwrap_or(0).to_formatted_string(&Locale::en)
}

fn format_relation_declared(v: &EventVisitor) -> String {
    let kind = if v.mandatory.unwrap_or(true) {
        "mandatory".white().to_string()
    } else {
        "conditional".bright_yellow().to_string()
    };
    format!(
        "{} Relation {} │ {} │ {} │ {} variables",
        "+".bright_black(),
        label(&v.relation).white().bold(),
        label(&v.domain).bright_blue(),
        kind,
        count(v.variable_count).bright_yellow()
    )
}

fn format_merge(v: &EventVisitor) -> String {
    format!(
        "{} Merge {} ← {} │ {} members",
        "⊕".bright_blue(),
        label(&v.survivor).bright_blue().bold(),
        label(&v.absorbed).bright_black(),
        count(v.member_count).bright_yellow()
    )
}

fn format_split(v: &EventVisitor) -> String {
    format!(
        "{} Split {} out of {} into {} │ {} relations dropped",
        "⊖".bright_magenta(),
        label(&v.variable).white().bold(),
        label(&v.domain).bright_blue(),
        label(&v.fresh).bright_blue(),
        count(v.dropped_relations).bright_yellow()
    )
}

fn format_solve_start(v: &EventVisitor) -> String {
    format!(
        "{} Solving {} │ {} variables │ {} mandatory │ {} conditional",
        "▶".bright_green().bold(),
        label(&v.domain).bright_blue().bold(),
        count(v.variable_count).bright_yellow(),
        count(v.mandatory_count).bright_yellow(),
        count(v.conditional_count).bright_yellow()
    )
}

fn format_solve_end(v: &EventVisitor) -> String {
    format!(
        "{} Solved {} │ {} │ {} accepted │ {} skipped",
        "■".bright_cyan().bold(),
        label(&v.domain).bright_blue().bold(),
        format_duration_us(v.duration_us.unwrap_or(0)).yellow(),
        count(v.accepted).bright_green(),
        count(v.skipped).bright_red()
    )
}

fn format_arbitration(v: &EventVisitor, accepted: bool, level: Level) -> String {
    if level != Level::TRACE {
        return String::new();
    }
    let icon = if accepted {
        "✓".bright_green().to_string()
    } else {
        "✗".bright_red().to_string()
    };
    let role = if v.selector.unwrap_or(false) {
        "selector"
    } else {
        "guard"
    };
    format!(
        "  {} {} │ rank {} │ {}",
        icon,
        label(&v.relation).bright_black(),
        format_rank(v.rank.unwrap_or(0.0)).bright_black(),
        role.bright_black()
    )
}

fn format_drop_failed(v: &EventVisitor) -> String {
    format!(
        "{} Dropping {} failed │ {}",
        "!".bright_red().bold(),
        label(&v.variable).white().bold(),
        label(&v.error).bright_red()
    )
}

fn format_rank(rank: f64) -> String {
    if rank.fract() == 0.0 {
        format!("{}", rank as i64)
    } else {
        format!("{:.3}", rank)
    }
}

fn format_duration_us(us: u64) -> String {
    if us < 1000 {
        format!("{}µs", us)
    } else if us < 1_000_000 {
        format!("{:.2}ms", us as f64 / 1000.0)
    } else {
        format!("{:.2}s", us as f64 / 1_000_000.0)
    }
}
