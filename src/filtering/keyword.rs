use crate::{config::DataTableConfig, models::DataTableRequest};

/// Escape LIKE wildcards so user input only ever matches literally.
/// Escapes: \ (escape char), % (match any) and _ (match single char)
fn escape_like_wildcards(input: &str) -> String {
    input
        .replace('\\', "\\\\") // Escape backslash first
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Put `%` before, between and after every character: `abc` becomes `%a%b%c%`.
fn interleave_wildcards(input: &str) -> String {
    let mut output = String::with_capacity(input.len() * 2 + 1);
    output.push('%');
    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        output.push(c);
        // An escape sequence stays glued to the character it escapes
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                output.push(escaped);
            }
        }
        output.push('%');
    }
    output
}

/// Turn a raw keyword into a LIKE pattern.
///
/// Steps run in a fixed order: lower-case, starts-with, wildcard, smart.
#[must_use]
pub fn prepare(keyword: &str, config: &DataTableConfig) -> String {
    let mut keyword = if config.is_case_insensitive() {
        keyword.to_lowercase()
    } else {
        keyword.to_string()
    };

    if config.is_starts_with_search() {
        return format!("{keyword}%");
    }

    if config.is_wildcard() {
        keyword = interleave_wildcards(&escape_like_wildcards(&keyword));
    }

    if config.is_smart_search() && !config.is_wildcard() {
        keyword = format!("%{keyword}%");
    }

    keyword
}

/// Per-column keyword, normalized unless the column filters it itself.
///
/// `raw` is set for columns with a custom filter. Regex columns are never
/// normalized either, the pattern is bound as sent.
#[must_use]
pub fn column_keyword(
    request: &DataTableRequest,
    index: usize,
    raw: bool,
    config: &DataTableConfig,
) -> String {
    let keyword = request.column_keyword(index);
    if raw || request.is_regex(index) {
        keyword.to_string()
    } else {
        prepare(keyword, config)
    }
}
