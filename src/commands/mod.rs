// ABOUTME: Built-in chat commands and the default command registry
// ABOUTME: hello, echo, time and menu, registered in match-priority order

pub mod menu;

use anyhow::Result;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use slackbot_core::{config::CommandsConfig, factory, Command, FnCommand, Registry};
use std::sync::Arc;

pub use menu::MenuCommand;

pub const HELLO_PATTERN: &str = "^hello$";
pub const ECHO_PATTERN: &str = r"^echo(\s|$)";
pub const TIME_PATTERN: &str = "^time$";
pub const MENU_PATTERN: &str = "^menu";

/// Registry with every built-in command. The dispatcher appends `help`.
pub fn default_registry(config: &CommandsConfig) -> Result<Registry> {
    let tz = config.tz();
    let timeout = config.menu_timeout();

    let registry = Registry::from_factories([
        (HELLO_PATTERN, factory(|| Ok(hello()))),
        (ECHO_PATTERN, factory(|| Ok(echo()))),
        (TIME_PATTERN, factory(move || Ok(time(tz)))),
        (
            MENU_PATTERN,
            factory(move || {
                let menu: Arc<dyn Command> = Arc::new(MenuCommand::new(timeout, tz)?);
                Ok(menu)
            }),
        ),
    ])?;
    Ok(registry)
}

/// Greets back
pub fn hello() -> Arc<dyn Command> {
    Arc::new(FnCommand::new("hello", |_| {
        Ok(b"Hi! What's Up?".to_vec())
    }))
}

/// Repeats the arguments after the command word
pub fn echo() -> Arc<dyn Command> {
    Arc::new(FnCommand::new("echo", |args| {
        if args.len() < 2 {
            return Ok(b"echo what?".to_vec());
        }
        Ok(args[1..].join(" ").into_bytes())
    }))
}

/// Reports the current server time in `tz`
pub fn time(tz: Tz) -> Arc<dyn Command> {
    Arc::new(FnCommand::new("time", move |_| {
        let now = Utc::now().with_timezone(&tz);
        Ok(format!("Server time is: {}", rfc1123(&now)).into_bytes())
    }))
}

/// RFC 1123 rendering with the zone abbreviation, e.g.
/// `Mon, 02 Jan 2006 15:04:05 CET`
pub fn rfc1123(time: &DateTime<Tz>) -> String {
    time.format("%a, %d %b %Y %H:%M:%S %Z").to_string()
}
