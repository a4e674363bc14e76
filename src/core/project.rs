//! Purpose: Reshape a column subset of row-major data into column-major arrays.
//! Exports: `project`, `limit_from_signed`, `extract_keyed`.
//! Role: Pure transform over already-decoded rows.
//! Invariants: Output axis 0 follows the requested index order (duplicates kept).
//! Invariants: Indices are validated once against the first row's arity.
//! Notes: Every row must share the first row's arity; this is not rechecked per row.
use crate::core::error::{Error, ErrorKind};
use crate::core::value::Value;

/// Projects `column_indices` out of `rows`, reading at most `limit` rows.
pub fn project<T, R>(
    rows: &[R],
    column_indices: &[usize],
    limit: Option<usize>,
) -> Result<Vec<Vec<T>>, Error>
where
    T: Clone,
    R: AsRef<[T]>,
{
    let num_rows = limit.map_or(rows.len(), |limit| limit.min(rows.len()));

    if let Some(first) = rows.first() {
        let arity = first.as_ref().len();
        if let Some(&bad) = column_indices.iter().find(|&&idx| idx >= arity) {
            return Err(Error::new(ErrorKind::IndexOutOfRange)
                .with_message(format!("column index {bad} out of range 0..{arity}"))
                .with_index(bad));
        }
    }

    let mut columns: Vec<Vec<T>> = column_indices
        .iter()
        .map(|_| Vec::with_capacity(num_rows))
        .collect();
    for row in &rows[..num_rows] {
        let row = row.as_ref();
        for (column, &idx) in columns.iter_mut().zip(column_indices) {
            column.push(row[idx].clone());
        }
    }
    Ok(columns)
}

/// Maps a signed row limit onto `project`'s cap; negative means uncapped.
pub fn limit_from_signed(limit: i64) -> Option<usize> {
    usize::try_from(limit).ok()
}

/// Pulls `keys` out of a mapping row in key order; absent keys yield `Nil`.
pub fn extract_keyed(row: &Value, keys: &[Value]) -> Vec<Value> {
    keys.iter()
        .map(|key| row.get_key(key).cloned().unwrap_or(Value::Nil))
        .collect()
}
