//! Purpose: Plain-text table rendering for decoded rows.
//! Exports: `render_ascii_table`.
//! Role: Human output path for the CLI; widths come from the width estimator.
//! Invariants: Every line of a rendered table has the same character count.
use std::fmt::Write as _;

use crate::core::value::Value;
use crate::core::width::column_widths;

const NULL_TEXT: &str = "null";

pub fn render_ascii_table<R: AsRef<[Value]>>(headers: &[String], rows: &[R]) -> String {
    let mut widths = column_widths(rows);
    if widths.len() < headers.len() {
        widths.resize(headers.len(), NULL_TEXT.len());
    }
    for (width, header) in widths.iter_mut().zip(headers) {
        *width = (*width).max(header.chars().count());
    }

    let rule = rule_line(&widths);
    let mut out = String::new();
    out.push_str(&rule);
    if !headers.is_empty() {
        push_row(&mut out, &widths, headers);
        out.push_str(&rule);
    }
    for row in rows {
        let cells: Vec<String> = row
            .as_ref()
            .iter()
            .map(|value| match value {
                Value::Nil => NULL_TEXT.to_string(),
                other => other.to_string(),
            })
            .collect();
        push_row(&mut out, &widths, &cells);
    }
    if !rows.is_empty() {
        out.push_str(&rule);
    }
    out
}

fn rule_line(widths: &[usize]) -> String {
    let mut line = String::from("+");
    for width in widths {
        line.push_str(&"-".repeat(width + 2));
        line.push('+');
    }
    line.push('\n');
    line
}

fn push_row(out: &mut String, widths: &[usize], cells: &[String]) {
    out.push('|');
    for (idx, width) in widths.iter().enumerate() {
        let cell = cells.get(idx).map(String::as_str).unwrap_or("");
        let pad = width.saturating_sub(cell.chars().count());
        let _ = write!(out, " {cell}{} |", " ".repeat(pad));
    }
    out.push('\n');
}
