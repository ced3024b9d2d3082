use clap::{Parser, Subcommand};
use prettytable::{Cell, Row, Table};
use std::path::PathBuf;

use rodb::{Engine, ResultSet};

#[derive(Parser)]
#[command(name = "rodb", about = "Read-only queries over paged table files")]
struct Cli {
    /// Directory holding metadata.json and the table files
    #[arg(short, long, default_value = "./data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan a table for tuples whose attribute equals a value
    Select {
        table: String,
        /// Attribute index, 0-based
        idx: usize,
        value: i32,
    },
    /// Equi-join two tables on one attribute each
    Join {
        table1: String,
        idx1: usize,
        table2: String,
        idx2: usize,
    },
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut engine = Engine::open(&cli.data_dir)?;

    let result = match cli.command {
        Command::Select { table, idx, value } => engine.select(idx, value, &table)?,
        Command::Join {
            table1,
            idx1,
            table2,
            idx2,
        } => engine.join(idx1, &table1, idx2, &table2)?,
    };

    print_result(&result);
    engine.release();
    Ok(())
}

fn print_result(result: &ResultSet) {
    let mut table = Table::new();
    table.add_row(Row::new(
        (0..result.nattrs())
            .map(|i| Cell::new(&format!("a{i}")))
            .collect(),
    ));
    for tuple in result.tuples() {
        table.add_row(Row::new(
            tuple.iter().map(|v| Cell::new(&v.to_string())).collect(),
        ));
    }
    table.printstd();
    println!("{} tuple(s)", result.ntuples());
}
