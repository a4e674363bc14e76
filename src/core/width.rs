// Per-column display width estimation over rendered values.
use crate::core::value::Value;

pub const MIN_COLUMN_WIDTH: usize = 4;

/// Character count of the value's default textual rendering.
pub fn text_width(value: &Value) -> usize {
    match value {
        Value::Text(text) => text.chars().count(),
        other => other.to_string().chars().count(),
    }
}

/// Widest non-missing rendering per column position, floored at `MIN_COLUMN_WIDTH`.
pub fn column_widths<R: AsRef<[Value]>>(rows: &[R]) -> Vec<usize> {
    let Some(first) = rows.first() else {
        return Vec::new();
    };
    let mut widths = vec![MIN_COLUMN_WIDTH; first.as_ref().len()];
    for row in rows {
        for (width, value) in widths.iter_mut().zip(row.as_ref()) {
            if !value.is_nil() {
                *width = (*width).max(text_width(value));
            }
        }
    }
    widths
}

pub fn single_column_width(values: &[Value]) -> usize {
    values
        .iter()
        .filter(|value| !value.is_nil())
        .map(text_width)
        .fold(MIN_COLUMN_WIDTH, usize::max)
}
