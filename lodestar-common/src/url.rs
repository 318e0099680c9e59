//! URL helpers for gemini:// addresses
//!
//! Just enough of RFC 3986 for a navigation core:
//! ```text
//! scheme://[userinfo@]host[:port][/path][?query][#fragment]
//! ```
//!
//! - [`authority_prefix`] reduces a URL to `scheme://host[:port]/`, the unit
//!   identities and session choices are keyed by
//! - [`resolve`] resolves a (possibly relative) reference against a base URL
//! - [`with_query`] replaces the query component with percent-encoded input

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::{DEFAULT_PORT, GEMINI_SCHEME};

/// Characters left unencoded in user input placed in a query
///
/// Unreserved characters plus `/`, matching what servers expect from
/// interactive input.
const QUERY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/');

/// Error type for URL handling
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UrlError {
    /// URL has no scheme (and so cannot be a base URL)
    #[error("URL has no scheme")]
    MissingScheme,
    /// URL has no host component
    #[error("URL has no host")]
    MissingHost,
    /// Port is not a number in range
    #[error("invalid port number")]
    InvalidPort,
}

/// Borrowed view of a URL split into its five components
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Parts<'a> {
    scheme: Option<&'a str>,
    authority: Option<&'a str>,
    path: &'a str,
    query: Option<&'a str>,
    fragment: Option<&'a str>,
}

impl<'a> Parts<'a> {
    fn parse(input: &'a str) -> Self {
        let (rest, fragment) = match input.split_once('#') {
            Some((rest, fragment)) => (rest, Some(fragment)),
            None => (input, None),
        };
        let (rest, query) = match rest.split_once('?') {
            Some((rest, query)) => (rest, Some(query)),
            None => (rest, None),
        };

        let (scheme, rest) = match split_scheme(rest) {
            Some((scheme, rest)) => (Some(scheme), rest),
            None => (None, rest),
        };

        let (authority, path) = match rest.strip_prefix("//") {
            Some(after) => {
                let end = after.find('/').unwrap_or(after.len());
                (Some(&after[..end]), &after[end..])
            }
            None => (None, rest),
        };

        Self {
            scheme,
            authority,
            path,
            query,
            fragment,
        }
    }
}

/// Owned URL assembled during reference resolution
struct Target {
    scheme: String,
    authority: Option<String>,
    path: String,
    query: Option<String>,
    fragment: Option<String>,
}

impl Target {
    fn into_string(self) -> String {
        let mut out = String::with_capacity(self.path.len() + 32);
        out.push_str(&self.scheme);
        out.push(':');
        if let Some(authority) = &self.authority {
            out.push_str("//");
            out.push_str(authority);
        }
        out.push_str(&self.path);
        if let Some(query) = &self.query {
            out.push('?');
            out.push_str(query);
        }
        if let Some(fragment) = &self.fragment {
            out.push('#');
            out.push_str(fragment);
        }
        out
    }
}

/// Split `scheme:rest` if the input starts with a syntactically valid scheme
fn split_scheme(input: &str) -> Option<(&str, &str)> {
    let colon = input.find(':')?;
    let scheme = &input[..colon];
    let mut chars = scheme.chars();
    let first = chars.next()?;
    if !first.is_ascii_alphabetic() {
        return None;
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) {
        return None;
    }
    Some((scheme, &input[colon + 1..]))
}

/// Split an authority into `(host, port)`, dropping any userinfo
fn split_host_port(authority: &str) -> Result<(&str, Option<&str>), UrlError> {
    let host_port = authority
        .rsplit_once('@')
        .map_or(authority, |(_, host_port)| host_port);

    if host_port.starts_with('[') {
        // IPv6 literal: [addr] or [addr]:port
        let end = host_port.find(']').ok_or(UrlError::MissingHost)?;
        let host = &host_port[..=end];
        let port = match &host_port[end + 1..] {
            "" => None,
            rest => Some(rest.strip_prefix(':').ok_or(UrlError::InvalidPort)?),
        };
        return Ok((host, port));
    }

    match host_port.rsplit_once(':') {
        Some((host, port)) => Ok((host, Some(port))),
        None => Ok((host_port, None)),
    }
}

/// Authority prefix of an absolute URL: `scheme://host[:port]/`
///
/// Scheme and host are lowercased, userinfo is dropped and the default
/// Gemini port is elided so that `gemini://Example.org:1965/a` and
/// `gemini://example.org/b` share a prefix.
///
/// # Errors
///
/// Returns `MissingScheme`/`MissingHost` for relative or host-less URLs and
/// `InvalidPort` for a non-numeric port.
pub fn authority_prefix(url: &str) -> Result<String, UrlError> {
    let parts = Parts::parse(url.trim());
    let scheme = parts.scheme.ok_or(UrlError::MissingScheme)?;
    let authority = parts.authority.ok_or(UrlError::MissingHost)?;
    let (host, port) = split_host_port(authority)?;
    if host.is_empty() {
        return Err(UrlError::MissingHost);
    }

    let scheme = scheme.to_ascii_lowercase();
    let host = host.to_ascii_lowercase();

    let port = match port {
        None | Some("") => None,
        Some(port) => {
            let port: u16 = port.parse().map_err(|_| UrlError::InvalidPort)?;
            (!(scheme == GEMINI_SCHEME && port == DEFAULT_PORT)).then_some(port)
        }
    };

    Ok(match port {
        Some(port) => format!("{scheme}://{host}:{port}/"),
        None => format!("{scheme}://{host}/"),
    })
}

/// Hostname of an absolute URL, without brackets or port
///
/// Used as the subject when generating a certificate for a site.
///
/// # Errors
///
/// Same as [`authority_prefix`].
pub fn host(url: &str) -> Result<String, UrlError> {
    let parts = Parts::parse(url.trim());
    parts.scheme.ok_or(UrlError::MissingScheme)?;
    let authority = parts.authority.ok_or(UrlError::MissingHost)?;
    let (host, _) = split_host_port(authority)?;
    let host = host.trim_start_matches('[').trim_end_matches(']');
    if host.is_empty() {
        return Err(UrlError::MissingHost);
    }
    Ok(host.to_ascii_lowercase())
}

/// Resolve `reference` against the absolute URL `base` (RFC 3986 §5.2)
///
/// An absolute reference is returned with its dot segments removed.
///
/// # Errors
///
/// Returns `MissingScheme` if `base` is not absolute and `reference` is
/// not absolute either.
pub fn resolve(base: &str, reference: &str) -> Result<String, UrlError> {
    let reference = Parts::parse(reference.trim());

    if let Some(scheme) = reference.scheme {
        return Ok(Target {
            scheme: scheme.to_string(),
            authority: reference.authority.map(str::to_string),
            path: remove_dot_segments(reference.path),
            query: reference.query.map(str::to_string),
            fragment: reference.fragment.map(str::to_string),
        }
        .into_string());
    }

    let base = Parts::parse(base.trim());
    let scheme = base.scheme.ok_or(UrlError::MissingScheme)?.to_string();

    let (authority, path, query) = if let Some(authority) = reference.authority {
        (
            Some(authority),
            remove_dot_segments(reference.path),
            reference.query,
        )
    } else if reference.path.is_empty() {
        (
            base.authority,
            base.path.to_string(),
            reference.query.or(base.query),
        )
    } else if reference.path.starts_with('/') {
        (
            base.authority,
            remove_dot_segments(reference.path),
            reference.query,
        )
    } else {
        let merged = merge_paths(&base, reference.path);
        (base.authority, remove_dot_segments(&merged), reference.query)
    };

    Ok(Target {
        scheme,
        authority: authority.map(str::to_string),
        path,
        query: query.map(str::to_string),
        fragment: reference.fragment.map(str::to_string),
    }
    .into_string())
}

/// Merge a relative path onto the base path (RFC 3986 §5.2.3)
fn merge_paths(base: &Parts<'_>, relative: &str) -> String {
    if base.authority.is_some() && base.path.is_empty() {
        return format!("/{relative}");
    }
    match base.path.rfind('/') {
        Some(idx) => format!("{}{}", &base.path[..=idx], relative),
        None => relative.to_string(),
    }
}

/// Remove `.` and `..` segments (RFC 3986 §5.2.4)
fn remove_dot_segments(path: &str) -> String {
    let mut input = path;
    let mut output: Vec<&str> = Vec::new();

    while !input.is_empty() {
        if let Some(rest) = input.strip_prefix("../") {
            input = rest;
        } else if let Some(rest) = input.strip_prefix("./") {
            input = rest;
        } else if input.starts_with("/./") {
            input = &input[2..];
        } else if input == "/." {
            input = "/";
        } else if input.starts_with("/../") {
            input = &input[3..];
            output.pop();
        } else if input == "/.." {
            input = "/";
            output.pop();
        } else if input == "." || input == ".." {
            input = "";
        } else {
            // Move the first segment (with its leading slash) to the output
            let start = usize::from(input.starts_with('/'));
            let end = input[start..]
                .find('/')
                .map_or(input.len(), |idx| idx + start);
            output.push(&input[..end]);
            input = &input[end..];
        }
    }

    output.concat()
}

/// Replace the query of `url` with the percent-encoded `input`
///
/// Any existing query and fragment are dropped.
pub fn with_query(url: &str, input: &str) -> String {
    let base = url.trim();
    let base = base.split_once('#').map_or(base, |(rest, _)| rest);
    let base = base.split_once('?').map_or(base, |(rest, _)| rest);
    let encoded = utf8_percent_encode(input, QUERY_ENCODE_SET);
    format!("{base}?{encoded}")
}

/// Normalise an address typed by the user
///
/// Trims whitespace and prefixes `gemini://` when no scheme is present.
pub fn normalize_input_url(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("{GEMINI_SCHEME}://{trimmed}")
    }
}
