//! Command-line grammar
//!
//! `kubectl <verb> <resourceType> [<name>] [args] [--flag=value ...]`
//!
//! Parsing is purely syntactic; whether a (verb, kind) pair is dispatchable
//! is the interpreter's concern.

use strum::{Display, EnumString};

use crate::error::{EngineError, EngineResult};
use crate::models::ResourceKind;

/// Accepted command prefixes
const PREFIXES: [&str; 2] = ["kubectl", "k"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Verb {
    Create,
    Get,
    Delete,
    Scale,
    /// Accepted but permanently unimplemented
    Apply,
    /// `set image deployment <name> <image>`
    Set,
    /// `rollout undo deployment <name>`
    Rollout,
}

/// A validated command line, ready for dispatch
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCommand {
    pub verb: Verb,
    pub kind: ResourceKind,
    pub name: Option<String>,
    /// Trailing positional arguments (scale count, new image)
    pub args: Vec<String>,
    /// `--key=value` flags in the order given; keys may repeat
    pub flags: Vec<(String, String)>,
}

impl ParsedCommand {
    /// First value of a flag, if present
    pub fn flag(&self, key: &str) -> Option<&str> {
        self.flags
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Every value of a repeatable flag
    pub fn flag_values<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> {
        self.flags
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Fail on flags outside the allowed set for this command
    pub fn reject_unknown_flags(&self, allowed: &[&str]) -> EngineResult<()> {
        for (key, _) in &self.flags {
            if !allowed.contains(&key.as_str()) {
                return Err(EngineError::validation(format!(
                    "unknown flag --{}",
                    key
                )));
            }
        }
        Ok(())
    }
}

/// Parse a command line into its verb/resource/name/flags tuple
pub fn parse(line: &str) -> EngineResult<ParsedCommand> {
    let mut tokens = line.split_whitespace();

    let prefix = tokens
        .next()
        .ok_or_else(|| EngineError::validation("empty command"))?;
    if !PREFIXES.contains(&prefix) {
        return Err(EngineError::validation(format!(
            "commands must start with \"kubectl\", got \"{}\"",
            prefix
        )));
    }

    let verb_token = tokens
        .next()
        .ok_or_else(|| EngineError::validation("missing verb; try: create, get, delete, scale"))?;
    let verb: Verb = verb_token.parse().map_err(|_| {
        EngineError::validation(format!(
            "unknown verb \"{}\"; try: create, get, delete, scale",
            verb_token
        ))
    })?;

    // Two-word verbs carry a fixed subcommand before the resource type
    match verb {
        Verb::Set => expect_subcommand(&mut tokens, "set", "image")?,
        Verb::Rollout => expect_subcommand(&mut tokens, "rollout", "undo")?,
        _ => {}
    }

    let kind_token = tokens.next().ok_or_else(|| {
        EngineError::validation(format!("missing resource type after \"{}\"", verb))
    })?;
    let kind: ResourceKind = kind_token.parse().map_err(|_| {
        EngineError::validation(format!("unknown resource type \"{}\"", kind_token))
    })?;

    let mut name = None;
    let mut args = Vec::new();
    let mut flags = Vec::new();

    for token in tokens {
        if let Some(flag) = token.strip_prefix("--") {
            let (key, value) = flag.split_once('=').ok_or_else(|| {
                EngineError::validation(format!("flag --{} must use --key=value form", flag))
            })?;
            flags.push((key.to_string(), value.to_string()));
        } else if name.is_none() {
            name = Some(token.to_string());
        } else {
            args.push(token.to_string());
        }
    }

    Ok(ParsedCommand {
        verb,
        kind,
        name,
        args,
        flags,
    })
}

fn expect_subcommand<'a>(
    tokens: &mut impl Iterator<Item = &'a str>,
    verb: &str,
    expected: &str,
) -> EngineResult<()> {
    match tokens.next() {
        Some(sub) if sub == expected => Ok(()),
        Some(sub) => Err(EngineError::validation(format!(
            "unknown subcommand \"{} {}\"; only \"{} {}\" is supported",
            verb, sub, verb, expected
        ))),
        None => Err(EngineError::validation(format!(
            "missing subcommand; try \"{} {}\"",
            verb, expected
        ))),
    }
}
