//! URI templates with `{name}` placeholders

use crate::error::{SheetError, SheetResult};
use regex::{Captures, Regex};

/// Named arguments for a URI template
pub type UriArgs<'a> = [(&'a str, &'a str)];

/// Substitute `{name}` placeholders with URL-encoded values.
///
/// Placeholders without a matching argument stay literal. Substitution is a
/// single pass, so encoded values are never re-expanded.
pub fn expand_uri(template: &str, args: &UriArgs) -> SheetResult<String> {
    let placeholder = Regex::new(r"\{([A-Za-z0-9_]+)\}")
        .map_err(|e| SheetError::Config(format!("Regex error: {}", e)))?;

    let expanded = placeholder.replace_all(template, |caps: &Captures| {
        args.iter()
            .find(|(name, _)| *name == &caps[1])
            .map_or_else(|| caps[0].to_string(), |(_, value)| urlencoding::encode(value).into_owned())
    });

    Ok(expanded.into_owned())
}

/// Drive-item path segment in the API's addressing format.
///
/// The drive root is `/`; anything else becomes `:/<path>:/`, e.g.
/// `/me/drive/root:/path/to/file.xlsx:/`. Each segment is URL-encoded.
pub fn drive_item_path(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return "/".to_string();
    }

    let encoded: Vec<String> = trimmed
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect();
    format!(":/{}:/", encoded.join("/"))
}
