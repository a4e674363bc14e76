//! Purpose: Drain a batched columnar table into row values.
//! Exports: `materialize`.
//! Role: Push pipeline: batches are pulled in order, rows are pushed to a caller factory.
//! Invariants: The factory runs exactly once per row, synchronously, in table order.
//! Invariants: Output length equals the table's row count.
use crate::core::error::{Error, ErrorKind};
use crate::core::table::{Batch, Table};
use crate::core::value::Value;

pub fn materialize<T, F, S>(table: &S, mut row_factory: F, batch_size: usize) -> Result<Vec<T>, Error>
where
    S: Table + ?Sized,
    F: FnMut(Vec<Value>) -> T,
{
    if batch_size == 0 {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("batch size must be positive")
            .with_hint("Pass a batch size of at least 1."));
    }

    let mut rows = Vec::with_capacity(table.num_rows());
    for (batch_idx, batch) in table.batches(batch_size).enumerate() {
        let num_rows = batch.num_rows();
        if num_rows == 0 {
            continue;
        }
        let num_columns = batch.num_columns();
        tracing::trace!(batch = batch_idx, rows = num_rows, columns = num_columns, "materializing batch");

        if num_columns == 0 {
            rows.extend((0..num_rows).map(|_| row_factory(Vec::new())));
            continue;
        }

        let mut columns: Vec<_> = (0..num_columns)
            .map(|idx| batch.column(idx).into_iter())
            .collect();
        for _ in 0..num_rows {
            let row = columns
                .iter_mut()
                .map(|column| column.next().unwrap_or(Value::Nil))
                .collect();
            rows.push(row_factory(row));
        }
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::materialize;
    use crate::core::error::ErrorKind;
    use crate::core::table::MemoryTable;
    use crate::core::value::{Record, Value};

    fn two_column_table() -> MemoryTable {
        MemoryTable::from_columns(vec![
            (1..=5).map(Value::Int).collect(),
            ["a", "b", "c", "d", "e"].into_iter().map(Value::from).collect(),
        ])
        .expect("table")
    }

    #[test]
    fn drains_two_batches_in_order() {
        let table = two_column_table().with_chunks(vec![3, 2]).expect("chunks");
        let mut calls = 0;
        let rows = materialize(
            &table,
            |row| {
                calls += 1;
                row
            },
            10,
        )
        .expect("materialize");
        assert_eq!(calls, 5);
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0], vec![Value::Int(1), Value::from("a")]);
        assert_eq!(rows[3], vec![Value::Int(4), Value::from("d")]);
        assert_eq!(rows[4], vec![Value::Int(5), Value::from("e")]);
    }

    #[test]
    fn batch_size_splits_without_reordering() {
        let table = two_column_table();
        let rows = materialize(&table, Record::new, 2).expect("materialize");
        let firsts: Vec<Value> = rows
            .iter()
            .map(|row| row.fields()[0].clone())
            .collect();
        assert_eq!(firsts, (1..=5).map(Value::Int).collect::<Vec<_>>());
    }

    #[test]
    fn zero_column_batches_yield_empty_rows() {
        let table = MemoryTable::without_columns(3);
        let rows = materialize(&table, |row| row.len(), 2).expect("materialize");
        assert_eq!(rows, vec![0, 0, 0]);
    }

    #[test]
    fn empty_batches_are_skipped() {
        let table = two_column_table().with_chunks(vec![0, 5, 0]).expect("chunks");
        let mut calls = 0;
        let rows = materialize(
            &table,
            |_| {
                calls += 1;
            },
            4,
        )
        .expect("materialize");
        assert_eq!(rows.len(), 5);
        assert_eq!(calls, 5);
    }

    #[test]
    fn zero_batch_size_is_a_usage_error() {
        let err = materialize(&two_column_table(), |row| row, 0).expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }
}
