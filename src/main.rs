use emberdb::{engine::DatabaseEngine, query::result::QueryResult};
use env_logger::Builder;
use log::LevelFilter;
use rustyline::{error::ReadlineError, DefaultEditor};

fn print_result(result: &QueryResult) {
    match result {
        QueryResult::Select { records } => {
            for record in records {
                let rendered: Vec<String> = record
                    .values
                    .iter()
                    .map(|(column, value)| format!("{}={}", column, value))
                    .collect();
                println!("{}", rendered.join(", "));
            }
            println!("({} rows)", records.len());
        }
        other => match other.message() {
            Some(message) => println!("{}", message),
            None => println!("{} rows affected", other.affected_rows()),
        },
    }
}

fn print_help() {
    println!(
        r#"
Available commands:
  help             - Show this help message
  status           - Show engine status
  tables           - List tables
  desc <table>     - Describe a table's columns
  exit, quit       - Exit the shell

Anything else is executed as a SQL statement.
"#
    );
}

fn print_status(engine: &DatabaseEngine) {
    println!("running: {}", engine.is_running());
    if let Ok(database) = engine.database() {
        let database = database.read().unwrap();
        println!("database: {}", database.name());
        println!("tables: {}", database.table_count());
    }
    if let Ok(manager) = engine.transaction_manager() {
        println!("active transactions: {}", manager.active_count());
    }
}

fn describe_table(engine: &DatabaseEngine, name: &str) {
    let database = match engine.database() {
        Ok(database) => database,
        Err(error) => {
            println!("Error: {}", error);
            return;
        }
    };
    let database = database.read().unwrap();
    match database.table(name) {
        Ok(table) => {
            let table = table.read().unwrap();
            for column in table.columns() {
                println!("{}", column.to_ddl());
            }
            println!("({} records)", table.record_count());
        }
        Err(error) => println!("Error: {}", error),
    }
}

/// `true` keeps the loop running.
fn process_command(engine: &DatabaseEngine, command: &str) -> bool {
    let trimmed = command.trim();
    match trimmed.to_lowercase().as_str() {
        "" => {}
        "exit" | "quit" | "q" => {
            println!("Goodbye!");
            return false;
        }
        "help" | "h" => print_help(),
        "status" => print_status(engine),
        "tables" => match engine.execute_sql("SHOW TABLES") {
            Ok(result) => print_result(&result),
            Err(error) => println!("Error: {}", error),
        },
        _ => {
            if let Some(table) = trimmed.strip_prefix("desc ") {
                describe_table(engine, table.trim());
            } else {
                match engine.execute_sql(trimmed) {
                    Ok(result) => print_result(&result),
                    Err(error) => println!("Error: {}", error),
                }
            }
        }
    }
    true
}

fn main() -> rustyline::Result<()> {
    Builder::new().filter_level(LevelFilter::Info).init();

    let mut engine = DatabaseEngine::new();
    if let Err(start_error) = engine.start_default() {
        eprintln!("Failed to start engine: {}", start_error);
        std::process::exit(1);
    }

    println!("emberdb shell -- type 'help' for commands");

    let mut editor = DefaultEditor::new()?;
    loop {
        match editor.readline("emberdb> ") {
            Ok(line) => {
                let command = line.trim().to_string();
                if !command.is_empty() {
                    editor.add_history_entry(&command)?;
                    if !process_command(&engine, &command) {
                        break;
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("Interrupted");
                break;
            }
            Err(ReadlineError::Eof) => break,
            Err(readline_error) => {
                println!("Error: {:?}", readline_error);
                break;
            }
        }
    }

    engine.stop();
    Ok(())
}
