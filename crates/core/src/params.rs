//! Parsing of filter parameter values.
//!
//! The HTTP layer hands this crate raw string values (product specs, SHAs,
//! versions, counts); these helpers turn them into the typed values the
//! query engine consumes. Parsing failures are input errors and fail fast,
//! before any store I/O.

use crate::error::{Error, Result};
use crate::spec::{ProductSpec, ProductSpecs};
use crate::types::{is_browser_name, is_latest, Product, Version, LATEST_SHA};

/// The maximum allowed value for the max-count param.
pub const MAX_COUNT_MAX_VALUE: usize = 500;

/// The minimum allowed value for the max-count param.
pub const MAX_COUNT_MIN_VALUE: usize = 1;

/// Clamp a requested max-count into the allowed `[1, 500]` range.
pub fn clamp_max_count(count: i64) -> usize {
    if count < MAX_COUNT_MIN_VALUE as i64 {
        MAX_COUNT_MIN_VALUE
    } else if count > MAX_COUNT_MAX_VALUE as i64 {
        MAX_COUNT_MAX_VALUE
    } else {
        count as usize
    }
}

/// Validate a revision param, cropping full hashes to the short form.
///
/// Empty and "latest" both mean the latest-run sentinel. Anything else must
/// be 10 to 40 hex characters, and is cropped to the 10-character short
/// revision used for matching.
pub fn parse_sha(sha: &str) -> Result<String> {
    let full = parse_sha_full(sha)?;
    if is_latest(&full) {
        return Ok(full);
    }
    Ok(full[..10].to_string())
}

/// Validate a revision param, keeping the full length.
pub fn parse_sha_full(sha: &str) -> Result<String> {
    if is_latest(sha) {
        return Ok(LATEST_SHA.to_string());
    }
    let valid = (10..=40).contains(&sha.len()) && sha.chars().all(|c| c.is_ascii_hexdigit());
    if !valid {
        return Err(Error::InvalidSha(sha.to_string()));
    }
    Ok(sha.to_string())
}

/// Parse the given version as a semantically versioned string.
pub fn parse_version(version: &str) -> Result<Version> {
    let invalid = || Error::InvalidVersion(version.to_string());

    let mut channel = String::new();
    let mut numeric = version;
    let space_pieces: Vec<&str> = version.split(' ').collect();
    if space_pieces.len() > 2 {
        return Err(invalid());
    } else if space_pieces.len() == 2 {
        channel = format!(" {}", space_pieces[1]);
        numeric = space_pieces[0];
    }

    // Special case firefox's "a1"/"b2" nightly/beta suffixes.
    if let Some((head, suffix)) = split_channel_suffix(numeric) {
        channel = suffix.to_string();
        numeric = head;
    }

    let pieces: Vec<&str> = numeric.split('.').collect();
    if pieces.len() > 4 {
        return Err(invalid());
    }
    let mut numbers = Vec::with_capacity(pieces.len());
    for piece in &pieces {
        numbers.push(piece.parse::<u32>().map_err(|_| invalid())?);
    }

    Ok(Version {
        major: numbers[0],
        minor: numbers.get(1).copied(),
        build: numbers.get(2).copied(),
        patch: numbers.get(3).copied(),
        channel,
    })
}

// Splits a trailing "[ab]<digits>" channel marker, if present.
fn split_channel_suffix(version: &str) -> Option<(&str, &str)> {
    let digits = version
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit())
        .count();
    if digits == 0 || digits == version.len() {
        return None;
    }
    let marker = version.len() - digits - 1;
    match &version[marker..=marker] {
        "a" | "b" if marker > 0 => Some((&version[..marker], &version[marker..])),
        _ => None,
    }
}

/// Parse a dash-delimited product string, e.g. "chrome-66.0-linux-4.4".
pub fn parse_product(product: &str) -> Result<Product> {
    let pieces: Vec<&str> = product.split('-').collect();
    if pieces.len() > 4 {
        return Err(Error::InvalidProduct(product.to_string()));
    }
    let mut result = Product::browser(pieces[0]);
    if !is_browser_name(&result.browser_name) {
        return Err(Error::InvalidBrowserName(result.browser_name));
    }
    if let Some(&version) = pieces.get(1) {
        parse_version(version).map_err(|_| Error::InvalidVersion(version.to_string()))?;
        result.browser_version = version.to_string();
    }
    if let Some(&os_name) = pieces.get(2) {
        result.os_name = os_name.to_string();
    }
    if let Some(&os_version) = pieces.get(3) {
        parse_version(os_version).map_err(|_| Error::InvalidVersion(os_version.to_string()))?;
        result.os_version = os_version.to_string();
    }
    Ok(result)
}

/// Parse a product spec string into its typed predicate.
///
/// Grammar: `product` with an optional `[label,label]` suffix and an
/// optional `@sha` suffix, e.g. `chrome-66[experimental]@0123456789`.
pub fn parse_product_spec(spec: &str) -> Result<ProductSpec> {
    let invalid = || Error::InvalidProductSpec(spec.to_string());
    let mut result = ProductSpec {
        revision: LATEST_SHA.to_string(),
        ..Default::default()
    };

    // @sha (optional)
    let mut name = spec;
    let at_pieces: Vec<&str> = spec.split('@').collect();
    if at_pieces.len() > 2 {
        return Err(invalid());
    } else if at_pieces.len() == 2 {
        name = at_pieces[0];
        result.revision = parse_sha(at_pieces[1]).map_err(|_| invalid())?;
    }

    // [foo,bar] labels syntax (optional)
    let label_pieces: Vec<&str> = name.split('[').collect();
    if label_pieces.len() > 2 {
        return Err(invalid());
    } else if label_pieces.len() == 2 {
        name = label_pieces[0];
        let labels = label_pieces[1];
        match labels.strip_suffix(']') {
            Some(inner) if !inner.is_empty() && !inner.contains(']') => {
                for label in inner.split(',') {
                    if !label.is_empty() {
                        result.labels.insert(label.to_string());
                    }
                }
            }
            _ => return Err(invalid()),
        }
    }

    // Product (required)
    result.product = parse_product(name)?;
    Ok(result)
}

/// Parse multiple product spec strings, preserving order.
pub fn parse_product_specs<S: AsRef<str>>(specs: &[S]) -> Result<ProductSpecs> {
    specs
        .iter()
        .map(|s| parse_product_spec(s.as_ref()))
        .collect()
}
