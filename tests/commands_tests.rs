// ABOUTME: Tests for the built-in commands routed through the dispatcher
// ABOUTME: Exercises pattern priority, help synthesis and error replies without a live Slack connection

use slackbot::commands::default_registry;
use slackbot::config::CommandsConfig;
use slackbot::{Connector, Dispatcher, Event, SlackTransportFactory};
use slackbot_core::ReplyContext;
use std::sync::Arc;

fn dispatcher() -> Dispatcher {
    let registry = default_registry(&CommandsConfig::default()).unwrap();
    let connector = Connector::new(Arc::new(SlackTransportFactory::new(None)));
    Dispatcher::new(connector, registry).unwrap()
}

async fn reply_to(dispatcher: &Dispatcher, text: &str) -> Option<String> {
    let event =
        Event::text("C1:U1", "slackbot", text).with_reply(ReplyContext::new("C1", "U1"));
    dispatcher
        .dispatch(&event)
        .await
        .map(|reply| reply.body().into_owned())
}

#[tokio::test]
async fn test_hello() {
    let d = dispatcher();
    assert_eq!(reply_to(&d, "hello").await.as_deref(), Some("Hi! What's Up?"));
}

#[tokio::test]
async fn test_echo_with_args() {
    let d = dispatcher();
    assert_eq!(reply_to(&d, "echo foo bar").await.as_deref(), Some("foo bar"));
}

#[tokio::test]
async fn test_echo_without_args() {
    let d = dispatcher();
    assert_eq!(reply_to(&d, "echo").await.as_deref(), Some("echo what?"));
}

#[tokio::test]
async fn test_time_reply() {
    let d = dispatcher();
    let reply = reply_to(&d, "time").await.unwrap();
    assert!(reply.starts_with("Server time is: "));
}

#[tokio::test]
async fn test_menu_without_restaurant_lists_known_ones() {
    let d = dispatcher();
    assert_eq!(
        reply_to(&d, "menu").await.as_deref(),
        Some("angel hisa menza")
    );
}

#[tokio::test]
async fn test_menu_unknown_restaurant() {
    let d = dispatcher();
    assert_eq!(
        reply_to(&d, "menu kebab").await.as_deref(),
        Some("Don't know kebab!")
    );
}

#[tokio::test]
async fn test_help_lists_builtins_once() {
    let d = dispatcher();
    let reply = reply_to(&d, "help").await.unwrap();
    let mut names: Vec<&str> = reply.lines().collect();
    names.sort_unstable();
    assert_eq!(names, vec!["echo", "hello", "menu", "time"]);
}

#[tokio::test]
async fn test_unmatched_text_gets_no_reply() {
    let d = dispatcher();
    assert!(reply_to(&d, "zzz").await.is_none());
    assert!(reply_to(&d, "hello there").await.is_none());
    assert!(reply_to(&d, "helpme").await.is_none());
}

#[tokio::test]
async fn test_reply_goes_back_to_sender() {
    let d = dispatcher();
    let event =
        Event::text("C9:U7", "slackbot", "hello").with_reply(ReplyContext::new("C9", "U7"));
    let reply = d.dispatch(&event).await.unwrap();
    assert_eq!(reply.to, "C9:U7");
    assert_eq!(reply.from, "slackbot");
}
