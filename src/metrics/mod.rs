//! Prometheus metrics module
//!
//! Recording goes through the global `metrics` facade, so the free functions
//! below are no-ops until [`BotMetrics::install`] runs (as in unit tests).

use crate::error::BotError;
use crate::team::TeamSlot;
use metrics::{counter, describe_counter, describe_gauge, gauge, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;
use twilight_model::gateway::event::Event;

/// Installed Prometheus recorder
#[derive(Clone)]
pub struct BotMetrics {
    handle: Arc<PrometheusHandle>,
}

impl BotMetrics {
    /// Install the global recorder. Call once per process.
    pub fn install() -> Result<Self, BotError> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| BotError::MetricsInstall(e.to_string()))?;

        Self::register_metrics();

        Ok(Self {
            handle: Arc::new(handle),
        })
    }

    fn register_metrics() {
        describe_counter!(
            "teamsplit_events_received_total",
            Unit::Count,
            "Total events received from Discord"
        );
        describe_counter!(
            "teamsplit_assignments_total",
            Unit::Count,
            "Members assigned to a team"
        );
        describe_counter!(
            "teamsplit_notification_failures_total",
            Unit::Count,
            "Team notifications that could not be delivered"
        );
        describe_counter!(
            "teamsplit_resets_total",
            Unit::Count,
            "Members whose team roles were removed"
        );
        describe_counter!(
            "teamsplit_commands_total",
            Unit::Count,
            "Slash commands handled, by outcome"
        );
        describe_counter!(
            "teamsplit_errors_total",
            Unit::Count,
            "Total errors, by type"
        );
        describe_gauge!(
            "teamsplit_shard_ready",
            Unit::Count,
            "Shard readiness (1=ready, 0=not ready)"
        );
    }

    /// Render metrics in Prometheus format
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Record an event received from the gateway
pub fn record_event(event: &Event) {
    let event_type = match event {
        Event::MemberAdd(_) => "member_add",
        Event::InteractionCreate(_) => "interaction_create",
        Event::Ready(_) => "ready",
        Event::Resumed => "resumed",
        Event::GatewayHeartbeatAck => "heartbeat_ack",
        _ => "other",
    };

    counter!("teamsplit_events_received_total", "event_type" => event_type).increment(1);
}

pub fn record_assignment(slot: TeamSlot) {
    counter!("teamsplit_assignments_total", "team" => slot.label()).increment(1);
}

pub fn record_notification_failure() {
    counter!("teamsplit_notification_failures_total").increment(1);
}

pub fn record_reset(members: usize) {
    counter!("teamsplit_resets_total").increment(members as u64);
}

pub fn record_command(command: &'static str, outcome: &'static str) {
    counter!(
        "teamsplit_commands_total",
        "command" => command,
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_error(error: &BotError) {
    counter!("teamsplit_errors_total", "error_type" => error.error_type_label()).increment(1);
}

pub fn set_shard_ready(ready: bool) {
    gauge!("teamsplit_shard_ready").set(if ready { 1.0 } else { 0.0 });
}
