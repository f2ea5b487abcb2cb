//! Short, quoted renderings of values for log lines

/// Cut `value` to `max_chars` characters, marking the cut with `...`
pub fn truncate(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    let head: String = value.chars().take(max_chars).collect();
    format!("{}...", head)
}

/// `"a", "b", "c"`: at most `max_items` items, each truncated to `max_chars`.
/// No items render as `(empty)`.
pub fn format_iterable<I, S>(values: I, max_items: usize, max_chars: usize) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::new();
    let mut count = 0;

    for value in values {
        if count >= max_items {
            out.push_str(", ...");
            break;
        }
        if count > 0 {
            out.push_str(", ");
        }
        out.push('"');
        out.push_str(&truncate(value.as_ref(), max_chars));
        out.push('"');
        count += 1;
    }

    if count == 0 {
        return "(empty)".to_string();
    }
    out
}

/// [`format_iterable`] with the limits used in log lines
pub fn format_list<I, S>(values: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    format_iterable(values, 20, 30)
}
