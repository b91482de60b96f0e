use std::io::{BufRead, IsTerminal};
use std::path::PathBuf;
use std::process;

use clap::Parser;
use fusedb_core::Database;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing_subscriber::EnvFilter;

mod display;

/// FuseDB Console — interactive and scriptable SQL shell for FuseDB
/// database directories.
#[derive(Parser, Debug)]
#[command(name = "fusedb", version)]
struct Cli {
    /// Database directory (created if missing).
    db: PathBuf,

    /// Execute a statement non-interactively (can be repeated).
    #[arg(short, long = "exec")]
    exec: Vec<String>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let db = match Database::open(&cli.db) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("cannot open database at {}: {e}", cli.db.display());
            process::exit(1);
        }
    };

    if !cli.exec.is_empty() {
        let mut failed = false;
        for sql in &cli.exec {
            failed |= !run_statement(&db, sql);
        }
        process::exit(if failed { 1 } else { 0 });
    }

    if !std::io::stdin().is_terminal() {
        run_pipe(&db);
        return;
    }
    run_repl(&db);
}

fn run_pipe(db: &Database) {
    let stdin = std::io::stdin();
    let mut failed = false;
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }
        failed |= !run_statement(db, &line);
    }
    if failed {
        process::exit(1);
    }
}

fn run_repl(db: &Database) {
    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(e) => {
            eprintln!("cannot start line editor: {e}");
            process::exit(1);
        }
    };

    println!("FuseDB console. Type a SQL statement, or 'exit' to leave.");
    loop {
        match editor.readline("fusedb> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
                    break;
                }
                let _ = editor.add_history_entry(line);
                run_statement(db, line);
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("input error: {e}");
                break;
            }
        }
    }
}

/// Run one statement, printing its result. Returns `false` on error.
fn run_statement(db: &Database, sql: &str) -> bool {
    let sql = sql.trim().trim_end_matches(';');
    match db.execute(sql) {
        Ok(Some(rows)) => {
            let count = display::print_rows(rows);
            println!("{count} row{}", if count == 1 { "" } else { "s" });
            true
        }
        Ok(None) => {
            println!("OK");
            true
        }
        Err(e) => {
            eprintln!("error: {e}");
            false
        }
    }
}
