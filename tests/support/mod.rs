#![allow(dead_code)]

pub mod builders;

use std::path::{Path, PathBuf};
use tempfile::TempDir;
use umya_spreadsheet::{Spreadsheet, Worksheet};

/// A scratch directory for fixture and output workbooks.
pub struct TestWorkspace {
    dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("tempdir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Writes `name` with one sheet per `(sheet_name, builder)` entry.
    pub fn create_workbook<F>(&self, name: &str, sheets: &[&str], build: F) -> PathBuf
    where
        F: FnOnce(&mut Spreadsheet),
    {
        let path = self.path(name);
        let mut book = umya_spreadsheet::new_file_empty_worksheet();
        for sheet in sheets {
            book.new_sheet(*sheet).expect("add sheet");
        }
        build(&mut book);
        umya_spreadsheet::writer::xlsx::write(&book, &path).expect("write workbook");
        path
    }

    /// Single-sheet workbook filled through `build`.
    pub fn create_sheet<F>(&self, name: &str, sheet: &str, build: F) -> PathBuf
    where
        F: FnOnce(&mut Worksheet),
    {
        self.create_workbook(name, &[sheet], |book| {
            build(book.get_sheet_by_name_mut(sheet).expect("sheet exists"));
        })
    }
}

pub fn open(path: &Path) -> Spreadsheet {
    umya_spreadsheet::reader::xlsx::read(path).expect("read workbook")
}

pub fn sheet_names(book: &Spreadsheet) -> Vec<String> {
    book.get_sheet_collection()
        .iter()
        .map(|sheet| sheet.get_name().to_string())
        .collect()
}

pub fn cell_text(sheet: &Worksheet, addr: &str) -> String {
    sheet
        .get_cell(addr)
        .map(|cell| cell.get_value().to_string())
        .unwrap_or_default()
}
