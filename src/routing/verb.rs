//! HTTP verbs recognised as action name prefixes.

use std::fmt;

use axum::routing::MethodFilter;
use serde::Serialize;

/// A verb that may prefix an action method name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpVerb {
    Get,
    Post,
    Head,
    Delete,
    Put,
    Connect,
    Trace,
    Patch,
}

impl HttpVerb {
    /// Every verb, in the order prefixes are tried.
    pub const ALL: [HttpVerb; 8] = [
        HttpVerb::Get,
        HttpVerb::Post,
        HttpVerb::Head,
        HttpVerb::Delete,
        HttpVerb::Put,
        HttpVerb::Connect,
        HttpVerb::Trace,
        HttpVerb::Patch,
    ];

    /// Lowercase token as written at the start of a method name.
    pub fn token(self) -> &'static str {
        match self {
            HttpVerb::Get => "get",
            HttpVerb::Post => "post",
            HttpVerb::Head => "head",
            HttpVerb::Delete => "delete",
            HttpVerb::Put => "put",
            HttpVerb::Connect => "connect",
            HttpVerb::Trace => "trace",
            HttpVerb::Patch => "patch",
        }
    }

    /// Method filter used when binding the verb on the transport.
    pub fn method_filter(self) -> MethodFilter {
        match self {
            HttpVerb::Get => MethodFilter::GET,
            HttpVerb::Post => MethodFilter::POST,
            HttpVerb::Head => MethodFilter::HEAD,
            HttpVerb::Delete => MethodFilter::DELETE,
            HttpVerb::Put => MethodFilter::PUT,
            HttpVerb::Connect => MethodFilter::CONNECT,
            HttpVerb::Trace => MethodFilter::TRACE,
            HttpVerb::Patch => MethodFilter::PATCH,
        }
    }

    /// Split a method name into its verb and the remainder.
    ///
    /// The verb must end at a word boundary: end of name, `_`, or an
    /// uppercase letter. `getUser` and `get_user` match, `getaway` does not.
    pub fn split_prefix(name: &str) -> Option<(HttpVerb, &str)> {
        HttpVerb::ALL.into_iter().find_map(|verb| {
            let rest = name.strip_prefix(verb.token())?;
            match rest.chars().next() {
                None => Some((verb, rest)),
                Some('_') => Some((verb, rest.trim_start_matches('_'))),
                Some(c) if c.is_ascii_uppercase() => Some((verb, rest)),
                Some(_) => None,
            }
        })
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token().to_ascii_uppercase())
    }
}
