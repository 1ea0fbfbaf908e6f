//! Column-set reconciliation across tables headed for one merged sheet.

use crate::model::{NormalizedTable, PROVENANCE_COLUMN};
use indexmap::IndexSet;
use serde::Serialize;
use std::fmt;

/// One source whose columns differ from the baseline (first) table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDifference {
    pub source: String,
    /// Symmetric difference: baseline-only columns first, then source-only ones.
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsistencyReport {
    pub consistent: bool,
    pub checked: usize,
    pub differences: Vec<ColumnDifference>,
}

impl ConsistencyReport {
    pub fn is_consistent(&self) -> bool {
        self.consistent
    }
}

impl fmt::Display for ConsistencyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.checked == 0 {
            return f.write_str("no data to check");
        }
        if self.consistent {
            return f.write_str("all headers consistent");
        }
        let lines: Vec<String> = self
            .differences
            .iter()
            .map(|diff| format!("{} differs: {}", diff.source, diff.columns.join(", ")))
            .collect();
        f.write_str(&lines.join("\n"))
    }
}

fn data_columns(table: &NormalizedTable) -> IndexSet<&str> {
    table
        .columns()
        .iter()
        .map(String::as_str)
        .filter(|name| *name != PROVENANCE_COLUMN)
        .collect()
}

fn source_label(table: &NormalizedTable, position: usize) -> String {
    table
        .source()
        .map(str::to_string)
        .unwrap_or_else(|| format!("table #{}", position + 1))
}

/// Compares every table's column set (provenance excluded) with the first table's.
pub fn check_consistency(tables: &[NormalizedTable]) -> ConsistencyReport {
    let Some((baseline, rest)) = tables.split_first() else {
        return ConsistencyReport {
            consistent: false,
            checked: 0,
            differences: Vec::new(),
        };
    };

    let base_columns = data_columns(baseline);
    let mut differences = Vec::new();
    for (offset, table) in rest.iter().enumerate() {
        let current = data_columns(table);
        let mut diff: Vec<String> = base_columns
            .iter()
            .filter(|name| !current.contains(*name))
            .map(|name| name.to_string())
            .collect();
        diff.extend(
            current
                .iter()
                .filter(|name| !base_columns.contains(*name))
                .map(|name| name.to_string()),
        );
        if !diff.is_empty() {
            differences.push(ColumnDifference {
                source: source_label(table, offset + 1),
                columns: diff,
            });
        }
    }

    ConsistencyReport {
        consistent: differences.is_empty(),
        checked: tables.len(),
        differences,
    }
}

/// Gives every table the union of all data columns, null-filling the missing ones.
///
/// Order: the first table's columns, then columns first seen in later tables,
/// with the provenance column (when a table has it) moved last.
pub fn equalize(tables: Vec<NormalizedTable>) -> Vec<NormalizedTable> {
    let mut union: IndexSet<String> = IndexSet::new();
    for table in &tables {
        for name in data_columns(table) {
            union.insert(name.to_string());
        }
    }

    tables
        .into_iter()
        .map(|table| {
            let mut order: Vec<String> = union.iter().cloned().collect();
            if table.has_column(PROVENANCE_COLUMN) {
                order.push(PROVENANCE_COLUMN.to_string());
            }
            table.select_columns(&order)
        })
        .collect()
}

/// Row-wise concatenation in source order. Tables are aligned by column name
/// against the first one, so they should be [`equalize`]d beforehand.
pub fn concatenate(tables: &[NormalizedTable]) -> NormalizedTable {
    let Some((first, rest)) = tables.split_first() else {
        return NormalizedTable::default();
    };
    let mut merged = NormalizedTable::new(first.columns().to_vec());
    merged.extend_from(first);
    for table in rest {
        merged.extend_from(table);
    }
    merged.move_column_last(PROVENANCE_COLUMN);
    merged
}
