use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("greg.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("greg.client.request_errors");
pub(crate) static CLIENT_TTFB: Moments = Moments::new("greg.client.ttfb_seconds");

pub(crate) static STREAM_CHUNKS: Counter = Counter::new("greg.stream.chunks");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("greg.stream.errors");
pub(crate) static STREAM_BYTES: Counter = Counter::new("greg.stream.bytes");

pub(crate) static SESSION_TURNS: Counter = Counter::new("greg.session.turns");
pub(crate) static SESSION_COMMAND_TURNS: Counter = Counter::new("greg.session.command_turns");
pub(crate) static SESSION_USER_MESSAGES: Counter = Counter::new("greg.session.user_messages");

pub(crate) static MODE_SWITCHES: Counter = Counter::new("greg.modes.switches");
pub(crate) static MODE_INVALID_COMMANDS: Counter = Counter::new("greg.modes.invalid_commands");

pub(crate) static TERMINAL_COMMANDS: Counter = Counter::new("greg.terminal.commands");
pub(crate) static TERMINAL_SPAWN_ERRORS: Counter = Counter::new("greg.terminal.spawn_errors");
pub(crate) static TERMINAL_DURATION: Moments = Moments::new("greg.terminal.duration_seconds");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_TTFB);

    collector.register_counter(&STREAM_CHUNKS);
    collector.register_counter(&STREAM_ERRORS);
    collector.register_counter(&STREAM_BYTES);

    collector.register_counter(&SESSION_TURNS);
    collector.register_counter(&SESSION_COMMAND_TURNS);
    collector.register_counter(&SESSION_USER_MESSAGES);

    collector.register_counter(&MODE_SWITCHES);
    collector.register_counter(&MODE_INVALID_COMMANDS);

    collector.register_counter(&TERMINAL_COMMANDS);
    collector.register_counter(&TERMINAL_SPAWN_ERRORS);
    collector.register_moments(&TERMINAL_DURATION);
}
