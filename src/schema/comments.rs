//! Field descriptions recovered from `.proto` documentation comments.
//!
//! Request messages document their filter fields with a fixed convention:
//!
//! ```text
//! // Filter by slot - The slot number (primary key)
//! UInt32Filter slot = 1;
//! ```
//!
//! which yields the description `The slot number`.

use prost_reflect::FieldDescriptor;

const PREFIX: &str = "Filter by ";
const SEPARATOR: &str = " - ";

/// Extract the description from one comment, stripping a trailing parenthetical.
///
/// ```
/// use querygen::schema::parse_filter_comment;
///
/// assert_eq!(
///     parse_filter_comment(" Filter by slot - The slot number (primary key)\n").as_deref(),
///     Some("The slot number"),
/// );
/// assert_eq!(parse_filter_comment("The slot number"), None);
/// ```
pub fn parse_filter_comment(comment: &str) -> Option<String> {
    let line = comment
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with(PREFIX))?;
    let rest = line.strip_prefix(PREFIX)?;
    let (_field, description) = rest.split_once(SEPARATOR)?;
    let mut description = description.trim();

    if let Some(open) = trailing_group_start(description) {
        description = description[..open].trim_end();
    }

    (!description.is_empty()).then(|| description.to_string())
}

/// Byte offset of the `(` matching a trailing `)`, nested groups included.
fn trailing_group_start(text: &str) -> Option<usize> {
    if !text.ends_with(')') {
        return None;
    }
    let mut depth = 0usize;
    for (i, c) in text.char_indices().rev() {
        match c {
            ')' => depth += 1,
            '(' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Leading (else trailing) comment attached to a field in its source file.
pub fn field_comment(field: &FieldDescriptor) -> Option<String> {
    let path = field.path();
    let file = field.parent_file();
    let info = file.file_descriptor_proto().source_code_info.as_ref()?;
    let location = info.location.iter().find(|loc| loc.path == path)?;
    location
        .leading_comments
        .clone()
        .filter(|text| !text.trim().is_empty())
        .or_else(|| location.trailing_comments.clone())
}

/// Description of a field following the `Filter by` convention.
pub fn field_description(field: &FieldDescriptor) -> Option<String> {
    field_comment(field).and_then(|comment| parse_filter_comment(&comment))
}
