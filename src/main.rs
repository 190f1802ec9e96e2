mod cursor;
mod error;
mod node;
mod pager;
mod row;
mod statement;
mod table;

use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;
use log::warn;

use crate::error::EngineResult;
use crate::node::{
    INTERNAL_NODE_CELL_SIZE, INTERNAL_NODE_HEADER_SIZE, INTERNAL_NODE_MAX_CELLS, LEAF_NODE_CELL_SIZE,
    LEAF_NODE_HEADER_SIZE, LEAF_NODE_MAX_CELLS, Node,
};
use crate::pager::PAGE_SIZE;
use crate::row::ROW_SIZE;
use crate::statement::Statement;
use crate::table::Table;

/// A toy single-file relational store with a B+-tree on disk, driven
/// interactively from a line-oriented shell.
#[derive(Parser)]
#[command(name = "rust-sqlite", about = "A toy SQLite implementation")]
struct Cli {
    /// Path to the database file. Created if it doesn't exist.
    filename: String,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let mut table = match Table::db_open(&cli.filename) {
        Ok(table) => table,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut input_buffer = String::new();
    loop {
        print_prompt();
        if read_input(&mut input_buffer).is_err() {
            warn!("stdin closed unexpectedly; exiting");
            break;
        }

        if input_buffer.is_empty() {
            continue;
        }

        if let Some(command) = input_buffer.strip_prefix('.') {
            match do_meta_command(command, &mut table) {
                MetaCommandResult::Exit => break,
                MetaCommandResult::Continue => continue,
                MetaCommandResult::Unrecognized => {
                    println!("Unrecognized command '.{command}'.");
                    continue;
                }
            }
        }

        let statement = match Statement::prepare_statement(&input_buffer) {
            Ok(statement) => statement,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };

        match statement.execute_statement(&mut table) {
            Ok(()) => println!("Executed."),
            Err(e) => println!("{e}"),
        }
    }

    if let Err(e) = table.db_close() {
        eprintln!("Error: {e}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

enum MetaCommandResult {
    Exit,
    Continue,
    Unrecognized,
}

fn do_meta_command(command: &str, table: &mut Table) -> MetaCommandResult {
    match command {
        "exit" => MetaCommandResult::Exit,
        "btree" => {
            println!("Tree:");
            if let Err(e) = print_tree(table, table.root_page_num, 0) {
                eprintln!("Error: {e}");
            }
            MetaCommandResult::Continue
        }
        "constants" => {
            print_constants();
            MetaCommandResult::Continue
        }
        "help" => {
            print_help();
            MetaCommandResult::Continue
        }
        _ => MetaCommandResult::Unrecognized,
    }
}

fn print_constants() {
    println!("Constants:");
    println!("ROW_SIZE: {ROW_SIZE}");
    println!("COMMON_NODE_HEADER_SIZE: {}", node::COMMON_NODE_HEADER_SIZE);
    println!("LEAF_NODE_HEADER_SIZE: {LEAF_NODE_HEADER_SIZE}");
    println!("LEAF_NODE_CELL_SIZE: {LEAF_NODE_CELL_SIZE}");
    println!("LEAF_NODE_SPACE_FOR_CELLS: {}", node::LEAF_NODE_SPACE_FOR_CELLS);
    println!("LEAF_NODE_MAX_CELLS: {LEAF_NODE_MAX_CELLS}");
    println!("INTERNAL_NODE_HEADER_SIZE: {INTERNAL_NODE_HEADER_SIZE}");
    println!("INTERNAL_NODE_CELL_SIZE: {INTERNAL_NODE_CELL_SIZE}");
    println!("INTERNAL_NODE_MAX_CELLS: {INTERNAL_NODE_MAX_CELLS}");
    println!("PAGE_SIZE: {PAGE_SIZE}");
}

fn print_help() {
    println!("Meta commands:");
    println!("  .exit       close the database and quit");
    println!("  .btree      print the B+-tree structure");
    println!("  .constants  print compile-time layout constants");
    println!("  .help       print this message");
    println!("Statements:");
    println!("  select                      scan every row");
    println!("  insert <id> <user> <email>  insert a row");
}

/// Pre-order walk of the tree, printed the way the reference implementation
/// does: leaves show their keys, internal nodes show `(child) -> key` pairs
/// with children recursed into before their separating key is printed.
fn print_tree(table: &mut Table, page_num: u32, indentation_level: usize) -> EngineResult<()> {
    let mut node = table.pager.get_page(page_num)?.clone();

    if matches!(node, Node::Leaf { .. }) {
        let num_cells = *node.leaf_node_num_cells();
        indent(indentation_level);
        println!("- leaf (size {num_cells})");
        for i in 0..num_cells {
            indent(indentation_level + 1);
            println!("- {}", node.leaf_node_key(i));
        }
    } else {
        let num_keys = *node.internal_node_num_keys();
        indent(indentation_level);
        println!("- internal (size {num_keys})");
        for i in 0..num_keys {
            let child = *node.internal_node_child(i);
            print_tree(table, child, indentation_level + 1)?;
            indent(indentation_level + 1);
            println!("- key {}", node.internal_node_key(i));
        }
        let right_child = *node.internal_node_right_child();
        print_tree(table, right_child, indentation_level + 1)?;
    }

    Ok(())
}

fn indent(level: usize) {
    for _ in 0..level {
        print!("  ");
    }
}

fn print_prompt() {
    print!("db > ");
    let _ = io::stdout().flush();
}

fn read_input(input_buffer: &mut String) -> io::Result<()> {
    input_buffer.clear();
    let bytes_read = io::stdin().read_line(input_buffer)?;
    if bytes_read == 0 {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "stdin closed"));
    }

    *input_buffer = input_buffer.trim_end().to_owned();
    Ok(())
}
