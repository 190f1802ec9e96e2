use std::fmt;

use log::trace;

use crate::cursor::Cursor;
use crate::error::{EngineError, PrepareError};
use crate::row::Row;
use crate::table::Table;

pub enum Statement {
    Select,
    Insert(Row),
}

#[derive(Debug)]
pub enum ExecuteError {
    DuplicateKey,
    Engine(EngineError),
}

impl From<EngineError> for ExecuteError {
    fn from(e: EngineError) -> Self {
        ExecuteError::Engine(e)
    }
}

impl fmt::Display for ExecuteError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ExecuteError::DuplicateKey => write!(f, "Error: Duplicate key."),
            ExecuteError::Engine(e) => write!(f, "{e}"),
        }
    }
}

impl Statement {
    pub fn prepare_statement(input_buffer: &str) -> Result<Self, PrepareError> {
        let lower = input_buffer.to_lowercase();
        match lower.as_str() {
            "select" => Ok(Statement::Select),
            _ if lower.starts_with("insert") => {
                if input_buffer.len() < 7 {
                    return Err(PrepareError::SyntaxError);
                }
                let row = input_buffer[7..].parse::<Row>()?;
                Ok(Statement::Insert(row))
            }
            _ => Err(PrepareError::UnrecognizedStatement(
                input_buffer.to_string(),
            )),
        }
    }

    pub fn execute_statement(self, table: &mut Table) -> Result<(), ExecuteError> {
        match self {
            Statement::Select => Self::execute_select(table),
            Statement::Insert(row) => Self::execute_insert(row, table),
        }
    }

    fn execute_select(table: &mut Table) -> Result<(), ExecuteError> {
        let mut cursor = Cursor::table_start(table)?;
        while !cursor.end_of_table {
            let row = cursor.value()?.clone();
            println!("{row}");
            cursor.advance()?;
        }
        Ok(())
    }

    /// Finds the insertion point, then rejects the insert if the key is
    /// already present there. The duplicate check reads `num_cells` off the
    /// cursor's own leaf page, not the root — the root may well be an
    /// internal node once the tree has split.
    fn execute_insert(row: Row, table: &mut Table) -> Result<(), ExecuteError> {
        let key_to_insert = row.id();
        let mut cursor = Cursor::table_find(table, key_to_insert)?;
        let cell_num = cursor.cell_num;

        let page_num = cursor.page_num();
        let num_cells = *cursor.table.pager.get_page(page_num)?.leaf_node_num_cells();

        if cell_num < num_cells {
            let key_at_index = *cursor.table.pager.get_page(page_num)?.leaf_node_key(cell_num);
            if key_at_index == key_to_insert {
                return Err(ExecuteError::DuplicateKey);
            }
        }

        trace!("inserting key {key_to_insert} at page {page_num} cell {cell_num}");
        cursor.leaf_node_insert(key_to_insert, row)?;
        Ok(())
    }
}
