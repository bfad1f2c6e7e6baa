//! The share descriptor, `user@host:port#path`
//!
//! The text form exchanged out-of-band to hand a repository to another
//! machine. Parsing and printing must round-trip this exact grammar.

use anyhow::Context;
use derive_new::new;
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct ShareDescriptor {
    pub user: String,
    pub host: String,
    pub port: u16,
    pub path: String,
}

fn share_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(.+)@([^:]+):(\d+)#(.+)$").unwrap_or_else(|_| {
            unreachable!("share grammar regex is valid")
        })
    })
}

impl ShareDescriptor {
    pub fn parse(descriptor: &str) -> anyhow::Result<Self> {
        let captures = share_regex()
            .captures(descriptor)
            .with_context(|| format!("Unable to parse share descriptor {descriptor}"))?;

        let port = captures[3]
            .parse::<u16>()
            .with_context(|| format!("Invalid port in share descriptor {descriptor}"))?;

        Ok(ShareDescriptor {
            user: captures[1].to_string(),
            host: captures[2].to_string(),
            port,
            path: captures[4].to_string(),
        })
    }
}

impl fmt::Display for ShareDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}#{}", self.user, self.host, self.port, self.path)
    }
}
