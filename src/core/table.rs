//! Purpose: Batched columnar table seam consumed by the materializer.
//! Exports: `Table`, `Batch`, `MemoryTable`, `MemoryBatch`.
//! Role: Abstracts an external columnar source; `MemoryTable` backs tests and the CLI.
//! Invariants: Batches are yielded in table order and never exceed the requested size.
//! Invariants: Every column of a batch has exactly `num_rows()` values.
use crate::core::error::{Error, ErrorKind};
use crate::core::value::Value;

pub trait Batch {
    fn num_rows(&self) -> usize;
    fn num_columns(&self) -> usize;
    /// Copies column `idx` out to a plain sequence.
    fn column(&self, idx: usize) -> Vec<Value>;
}

pub trait Table {
    type Batch: Batch;

    fn num_rows(&self) -> usize;
    fn batches(&self, batch_size: usize) -> Box<dyn Iterator<Item = Self::Batch> + '_>;
}

/// In-memory columnar table with optional fixed chunk boundaries.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MemoryTable {
    columns: Vec<Vec<Value>>,
    num_rows: usize,
    chunks: Vec<usize>,
}

impl MemoryTable {
    pub fn from_columns(columns: Vec<Vec<Value>>) -> Result<Self, Error> {
        let num_rows = columns.first().map_or(0, Vec::len);
        if let Some((idx, column)) = columns
            .iter()
            .enumerate()
            .find(|(_, column)| column.len() != num_rows)
        {
            return Err(Error::new(ErrorKind::Usage)
                .with_message(format!(
                    "column {idx} has {} values, expected {num_rows}",
                    column.len()
                ))
                .with_index(idx));
        }
        Ok(Self {
            columns,
            num_rows,
            chunks: vec![num_rows],
        })
    }

    pub fn from_rows<R: AsRef<[Value]>>(rows: &[R]) -> Result<Self, Error> {
        let arity = rows.first().map_or(0, |row| row.as_ref().len());
        let mut columns: Vec<Vec<Value>> = (0..arity)
            .map(|_| Vec::with_capacity(rows.len()))
            .collect();
        for (row_idx, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != arity {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message(format!("row {row_idx} has {} fields, expected {arity}", row.len()))
                    .with_index(row_idx));
            }
            for (column, value) in columns.iter_mut().zip(row) {
                column.push(value.clone());
            }
        }
        Ok(Self {
            columns,
            num_rows: rows.len(),
            chunks: vec![rows.len()],
        })
    }

    /// A table with rows but no columns.
    pub fn without_columns(num_rows: usize) -> Self {
        Self {
            columns: Vec::new(),
            num_rows,
            chunks: vec![num_rows],
        }
    }

    /// Splits storage into chunks of the given lengths; batches never straddle a chunk.
    pub fn with_chunks(mut self, chunks: Vec<usize>) -> Result<Self, Error> {
        let total: usize = chunks.iter().sum();
        if total != self.num_rows {
            return Err(Error::new(ErrorKind::Usage).with_message(format!(
                "chunk lengths sum to {total}, table has {} rows",
                self.num_rows
            )));
        }
        self.chunks = chunks;
        Ok(self)
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MemoryBatch {
    columns: Vec<Vec<Value>>,
    num_rows: usize,
}

impl Batch for MemoryBatch {
    fn num_rows(&self) -> usize {
        self.num_rows
    }

    fn num_columns(&self) -> usize {
        self.columns.len()
    }

    fn column(&self, idx: usize) -> Vec<Value> {
        self.columns[idx].clone()
    }
}

impl Table for MemoryTable {
    type Batch = MemoryBatch;

    fn num_rows(&self) -> usize {
        self.num_rows
    }

    fn batches(&self, batch_size: usize) -> Box<dyn Iterator<Item = MemoryBatch> + '_> {
        let batch_size = batch_size.max(1);
        let mut spans = Vec::new();
        let mut start = 0;
        for &len in &self.chunks {
            let end = start + len;
            let mut cursor = start;
            // Empty chunks still surface as empty batches.
            loop {
                let stop = (cursor + batch_size).min(end);
                spans.push((cursor, stop));
                cursor = stop;
                if cursor >= end {
                    break;
                }
            }
            start = end;
        }
        Box::new(spans.into_iter().map(move |(start, stop)| MemoryBatch {
            columns: self
                .columns
                .iter()
                .map(|column| column[start..stop].to_vec())
                .collect(),
            num_rows: stop - start,
        }))
    }
}
