//! # Naming Module
//!
//! Bidirectional canonicalization between the delimited lowercase form used by
//! REST parameters and table names (`fct_node_active_last_24h`) and the
//! capitalized form used by protobuf messages (`FctNodeActiveLast24H`).
//!
//! ## Rules
//!
//! - [`to_pascal_case`] splits on `_`, drops empty tokens and capitalizes the
//!   first letter of every token. A token that starts with a digit keeps its
//!   digit run and capitalizes the first letter after it (`24h` → `24H`,
//!   `50ms` → `50Ms`).
//! - [`to_snake_case`] inserts `_` at word boundaries: lowercase→uppercase,
//!   acronym→word (`HTTPServer` → `http_server`) and letter→digit-run
//!   (`Last24H` → `last_24h`). An uppercase letter right after a digit is never
//!   split off, so short acronyms such as `ID` stay a single token.
//!
//! Neither function fails. Inputs outside the canonical shapes still produce a
//! usable identifier, just not necessarily a round-trippable one.

/// Delimiter between words in the snake_case rendering.
pub const DELIMITER: char = '_';

/// Convert a delimited name to its capitalized form.
///
/// ```
/// use querygen::naming::to_pascal_case;
///
/// assert_eq!(to_pascal_case("last_24h"), "Last24H");
/// assert_eq!(to_pascal_case("fct_attestation_first_seen_chunked_50ms"), "FctAttestationFirstSeenChunked50Ms");
/// ```
pub fn to_pascal_case(name: &str) -> String {
    name.split(DELIMITER)
        .filter(|token| !token.is_empty())
        .map(capitalize_token)
        .collect()
}

fn capitalize_token(token: &str) -> String {
    let digits = token.chars().take_while(|c| c.is_ascii_digit()).count();
    let (run, rest) = token.split_at(digits);
    let mut chars = rest.chars();
    match chars.next() {
        Some(first) => format!("{run}{}{}", first.to_uppercase(), chars.as_str()),
        None => run.to_string(),
    }
}

/// Convert a capitalized (or mixed-case) name to its delimited lowercase form.
///
/// ```
/// use querygen::naming::to_snake_case;
///
/// assert_eq!(to_snake_case("FctNodeActiveLast24H"), "fct_node_active_last_24h");
/// assert_eq!(to_snake_case("HTTPServer"), "http_server");
/// assert_eq!(to_snake_case("ID"), "id");
/// ```
pub fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if i > 0 && !out.ends_with(DELIMITER) {
            let prev = chars[i - 1];
            let next = chars.get(i + 1).copied();
            let boundary = if c.is_uppercase() {
                prev.is_lowercase()
                    || (prev.is_uppercase() && next.is_some_and(char::is_lowercase))
            } else if c.is_ascii_digit() {
                prev.is_alphabetic()
            } else {
                false
            };
            if boundary {
                out.push(DELIMITER);
            }
        }
        if c == DELIMITER && out.ends_with(DELIMITER) {
            continue;
        }
        out.extend(c.to_lowercase());
    }

    out.trim_matches(DELIMITER).to_string()
}
