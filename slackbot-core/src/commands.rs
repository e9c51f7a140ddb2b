// ABOUTME: Command capability and the ordered pattern registry
// ABOUTME: Registration order is the match priority; the first matching entry wins

use crate::error::{BotError, Result};
use async_trait::async_trait;
use regex::Regex;
use std::sync::Arc;

/// A named unit of dispatch logic
#[async_trait]
pub trait Command: Send + Sync {
    fn name(&self) -> &str;

    /// Run the command. `args[0]` is the command word itself.
    async fn exec(&self, args: &[String]) -> anyhow::Result<Vec<u8>>;
}

/// Deferred command construction, run once when the registry is built
pub type CommandFactory = Box<dyn FnOnce() -> anyhow::Result<Arc<dyn Command>>>;

/// Box a closure as a [`CommandFactory`]
pub fn factory<F>(build: F) -> CommandFactory
where
    F: FnOnce() -> anyhow::Result<Arc<dyn Command>> + 'static,
{
    Box::new(build)
}

type ExecFn = dyn Fn(&[String]) -> anyhow::Result<Vec<u8>> + Send + Sync;

/// Command backed by a synchronous closure
pub struct FnCommand {
    name: String,
    exec: Box<ExecFn>,
}

impl FnCommand {
    pub fn new<F>(name: impl Into<String>, exec: F) -> Self
    where
        F: Fn(&[String]) -> anyhow::Result<Vec<u8>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            exec: Box::new(exec),
        }
    }
}

#[async_trait]
impl Command for FnCommand {
    fn name(&self) -> &str {
        &self.name
    }

    async fn exec(&self, args: &[String]) -> anyhow::Result<Vec<u8>> {
        (self.exec)(args)
    }
}

/// Split message text into whitespace separated arguments
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}

/// One (pattern, command) pair
#[derive(Clone)]
pub struct RegistryEntry {
    pattern: Regex,
    command: Arc<dyn Command>,
}

impl RegistryEntry {
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn command(&self) -> &Arc<dyn Command> {
        &self.command
    }

    /// Patterns carry their own anchors (`^echo`, `^time$`); matching is
    /// against the whole untokenized text.
    pub fn matches(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }
}

impl std::fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("pattern", &self.pattern.as_str())
            .field("command", &self.command.name())
            .finish()
    }
}

/// Ordered collection of commands, built once at startup
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: Vec<RegistryEntry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a command. Fails with `BotError::Config` on an invalid pattern.
    pub fn register(&mut self, pattern: &str, command: Arc<dyn Command>) -> Result<()> {
        let pattern = Regex::new(pattern)
            .map_err(|e| BotError::Config(format!("invalid command pattern '{}': {}", pattern, e)))?;
        self.entries.push(RegistryEntry { pattern, command });
        Ok(())
    }

    /// Builder-style variant of [`Registry::register`]
    pub fn with(mut self, pattern: &str, command: Arc<dyn Command>) -> Result<Self> {
        self.register(pattern, command)?;
        Ok(self)
    }

    /// Build from (pattern, factory) pairs, invoking each factory once in
    /// order. A failing factory is a `BotError::Config`.
    pub fn from_factories<'a, I>(factories: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, CommandFactory)>,
    {
        let mut registry = Self::new();
        for (pattern, factory) in factories {
            let command = factory().map_err(|e| {
                BotError::Config(format!("failed to build command for '{}': {:#}", pattern, e))
            })?;
            registry.register(pattern, command)?;
        }
        Ok(registry)
    }

    /// First entry, in registration order, whose pattern matches `text`
    pub fn find(&self, text: &str) -> Option<&RegistryEntry> {
        self.entries.iter().find(|entry| entry.matches(text))
    }

    /// Registered command names, in registration order
    pub fn names(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|entry| entry.command.name().to_string())
            .collect()
    }

    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append the synthesized `help` entry listing every command registered so far
    pub(crate) fn with_help(self) -> Result<Self> {
        let help = HelpCommand::new(self.names());
        self.with(HELP_PATTERN, Arc::new(help))
    }
}

const HELP_PATTERN: &str = "^help$";

/// Lists the names of the other registered commands
struct HelpCommand {
    listing: String,
}

impl HelpCommand {
    fn new(names: Vec<String>) -> Self {
        Self {
            listing: names.join("\n"),
        }
    }
}

#[async_trait]
impl Command for HelpCommand {
    fn name(&self) -> &str {
        "help"
    }

    async fn exec(&self, _args: &[String]) -> anyhow::Result<Vec<u8>> {
        Ok(self.listing.clone().into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &'static str) -> Arc<dyn Command> {
        Arc::new(FnCommand::new(name, move |_| Ok(name.as_bytes().to_vec())))
    }

    #[test]
    fn test_tokenize_collapses_whitespace() {
        assert_eq!(tokenize("echo  foo\tbar "), vec!["echo", "foo", "bar"]);
        assert!(tokenize("   ").is_empty());
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let mut registry = Registry::new();
        let err = registry.register("(unclosed", named("x")).unwrap_err();
        assert!(matches!(err, BotError::Config(_)));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_first_registered_match_wins() {
        let registry = Registry::new()
            .with("^menu", named("menu"))
            .unwrap()
            .with("^menu today$", named("today"))
            .unwrap();
        let entry = registry.find("menu today").unwrap();
        assert_eq!(entry.command().name(), "menu");
    }

    #[test]
    fn test_find_none_when_nothing_matches() {
        let registry = Registry::new().with("^hello$", named("hello")).unwrap();
        assert!(registry.find("zzz").is_none());
        assert!(registry.find("hello there").is_none());
    }

    #[test]
    fn test_from_factories_preserves_order() {
        let registry = Registry::from_factories([
            ("^hello$", factory(|| Ok(named("hello")))),
            ("^time$", factory(|| Ok(named("time")))),
        ])
        .unwrap();
        assert_eq!(registry.names(), vec!["hello", "time"]);
    }

    #[test]
    fn test_from_factories_failing_factory_is_config_error() {
        let err = Registry::from_factories([
            ("^hello$", factory(|| Ok(named("hello")))),
            ("^menu", factory(|| Err(anyhow::anyhow!("no http client")))),
        ])
        .unwrap_err();
        assert!(matches!(err, BotError::Config(ref msg) if msg.contains("no http client")));
    }

    #[tokio::test]
    async fn test_help_lists_other_commands_once() {
        let registry = Registry::new()
            .with("^hello$", named("hello"))
            .unwrap()
            .with("^time$", named("time"))
            .unwrap()
            .with_help()
            .unwrap();

        let entry = registry.find("help").unwrap();
        assert_eq!(entry.command().name(), "help");
        let out = entry.command().exec(&["help".to_string()]).await.unwrap();
        let out = String::from_utf8(out).unwrap();
        let mut names: Vec<&str> = out.lines().collect();
        names.sort_unstable();
        assert_eq!(names, vec!["hello", "time"]);
    }

    #[tokio::test]
    async fn test_fn_command_passes_args() {
        let cmd = FnCommand::new("count", |args| Ok(args.len().to_string().into_bytes()));
        let out = cmd.exec(&tokenize("count a b c")).await.unwrap();
        assert_eq!(out, b"4");
    }
}
