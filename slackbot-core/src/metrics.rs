// ABOUTME: Metric recording helpers for the session and dispatch loop
// ABOUTME: No-ops unless the binary installs a recorder (Prometheus exporter)

use metrics::{counter, gauge};

/// Inbound events accepted by the session filter
pub fn record_event_received() {
    counter!("slackbot_events_received_total").increment(1);
}

/// A command matched and was executed
pub fn record_command(name: &str) {
    counter!("slackbot_commands_total", "command" => name.to_string()).increment(1);
}

/// A command returned an error (converted into a reply)
pub fn record_command_error(name: &str) {
    counter!("slackbot_command_errors_total", "command" => name.to_string()).increment(1);
}

/// A reply could not be delivered
pub fn record_send_failure() {
    counter!("slackbot_send_failures_total").increment(1);
}

/// Size of the participant name cache after a refresh
pub fn set_name_cache_size(size: usize) {
    gauge!("slackbot_name_cache_entries").set(size as f64);
}
