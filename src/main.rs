use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};

use rox::ast_printer::{AstPrinter, RpnPrinter};
use rox::expr::Expr;
use rox::interpreter::Interpreter;
use rox::parser::Parser;
use rox::scanner::Scanner;

#[derive(ClapParser, Debug)]
#[command(version, about = "Lox language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize {
        filename: Option<PathBuf>,

        /// Print the tokens as a JSON array
        #[arg(long)]
        json: bool,
    },

    /// Parses input from a file as a single expression and prints its AST
    Parse {
        filename: Option<PathBuf>,

        /// Print in reverse Polish notation instead of prefix form
        #[arg(long)]
        rpn: bool,
    },

    /// Evaluates input from a file as a single expression and prints the result
    Evaluate { filename: Option<PathBuf> },

    /// Runs input from a file as a Lox program, or starts a prompt
    Run { filename: Option<PathBuf> },

    /// Starts an interactive prompt
    Repl,
}

const INTERPRETER_STACK_SIZE: usize = 64 * 1024 * 1024;

/// Reads the contents of a file into a String
fn read_file(filename: PathBuf) -> Result<String> {
    info!("Reading file: {:?}", filename);
    let file = File::open(&filename).context(format!("Failed to open file {:?}", filename))?;
    let mut reader = BufReader::new(file);
    let mut buf = String::new();

    let bytes = reader
        .read_to_string(&mut buf)
        .context(format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", bytes, filename);

    Ok(buf)
}

fn init_logger() -> Result<()> {
    // Create or open the log file
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    // Configure env_logger to write to file with module and source line
    Builder::new()
        .format(|buf, record| {
            let path = record.module_path().unwrap_or("<unnamed>");
            let module = path.strip_prefix("rox::").unwrap_or(path);
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug) // Default to Debug, override with RUST_LOG
        .parse_env("RUST_LOG")
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

fn no_input(subcommand: &str) -> ! {
    info!("No filepath provided for {}", subcommand);
    println!("No input filepath was provided. Exiting...");
    std::process::exit(0);
}

/// Parse a whole file as one expression, exiting with 65 on failure.
fn parse_single_expression(source: &str) -> Expr {
    let (tokens, errors) = Scanner::new(source).scan_tokens();
    report_and_exit_on(&errors, 65);

    match Parser::new(&tokens).parse_expression() {
        Ok(expr) => {
            info!("Expression parsed successfully");
            expr
        }
        Err(errors) => {
            report_and_exit_on(&errors, 65);
            std::process::exit(65);
        }
    }
}

fn report_and_exit_on<E: std::fmt::Display>(errors: &[E], code: i32) {
    if errors.is_empty() {
        return;
    }

    for e in errors {
        debug!("Reported error: {}", e);
        eprintln!("{}", e);
    }

    std::process::exit(code);
}

fn tokenize(source: &str, json: bool) -> Result<()> {
    let (tokens, errors) = Scanner::new(source).scan_tokens();

    if json {
        let rendered =
            serde_json::to_string_pretty(&tokens).context("Failed to serialize tokens")?;
        println!("{}", rendered);
    } else {
        for token in &tokens {
            debug!("Scanned token: {}", token);
            println!("{}", token);
        }
    }

    report_and_exit_on(&errors, 65);

    info!("Tokenization completed successfully");
    Ok(())
}

/// Read-eval-print loop over one persistent interpreter.  Errors are
/// reported and the prompt continues; EOF ends it.
fn repl() -> Result<()> {
    info!("Starting prompt");

    let mut interpreter = Interpreter::new();
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("> ");
        io::stdout().flush().context("Failed to flush prompt")?;

        let Some(line) = lines.next() else {
            println!();
            break;
        };
        let line: String = line.context("Failed to read from stdin")?;

        debug!("Prompt input: {}", line);

        if let Err(e) = rox::run(&line, &mut interpreter) {
            debug!("Prompt error: {}", e);
            eprintln!("{}", e);
        }
    }

    info!("Prompt closed");
    Ok(())
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger()?;
    } else {
        // Initialize a minimal logger to avoid "no logger" errors
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    // Sized for MAX_CALL_DEPTH nested Lox calls in a debug build.
    let worker = std::thread::Builder::new()
        .name("rox".to_string())
        .stack_size(INTERPRETER_STACK_SIZE)
        .spawn(move || dispatch(args.commands))
        .context("Failed to spawn interpreter thread")?;

    match worker.join() {
        Ok(result) => result,
        Err(_) => Err(anyhow::anyhow!("Interpreter thread panicked")),
    }
}

fn dispatch(commands: Commands) -> Result<()> {
    match commands {
        Commands::Tokenize { filename, json } => {
            let Some(filename) = filename else {
                no_input("Tokenize");
            };

            info!("Running Tokenize subcommand");
            let source = read_file(filename)?;
            tokenize(&source, json)?;
        }

        Commands::Parse { filename, rpn } => {
            let Some(filename) = filename else {
                no_input("Parse");
            };

            info!("Running Parse subcommand");
            let source = read_file(filename)?;
            let expr = parse_single_expression(&source);

            let rendered: String = if rpn {
                RpnPrinter.print(&expr)
            } else {
                AstPrinter.print(&expr)
            };

            debug!("AST: {}", rendered);
            println!("{}", rendered);

            info!("Parse subcommand completed");
        }

        Commands::Evaluate { filename } => {
            let Some(filename) = filename else {
                no_input("Evaluate");
            };

            info!("Running Evaluate subcommand");
            let source = read_file(filename)?;
            let expr = parse_single_expression(&source);
            let mut interpreter = Interpreter::new();

            match interpreter.evaluate_global(&expr) {
                Ok(value) => {
                    debug!("Evaluated to: {}", value);
                    println!("{}", value);
                }

                Err(e) => {
                    debug!("Evaluation debug: {}", e);
                    eprintln!("{}", e);
                    std::process::exit(70);
                }
            }

            info!("Evaluate subcommand completed");
        }

        Commands::Run { filename } => match filename {
            Some(filename) => {
                info!("Running Run subcommand");
                let source = read_file(filename)?;
                info!("Provided input:\n {}", source);

                let mut interpreter = Interpreter::new();

                match rox::run(&source, &mut interpreter) {
                    Ok(()) => info!("Program executed successfully"),

                    Err(e) => {
                        debug!("Run debug: {}", e);
                        eprintln!("{}", e);
                        std::process::exit(e.exit_code());
                    }
                }
            }

            None => repl()?,
        },

        Commands::Repl => repl()?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rox::error::LoxError;
    use rox::token::Token;

    #[test]
    fn cli_accepts_subcommand_flags() {
        let cli = Cli::try_parse_from(["rox", "--log", "parse", "expr.lox", "--rpn"]);
        let cli = cli.unwrap();

        assert!(cli.log);
        assert!(matches!(cli.commands, Commands::Parse { rpn: true, .. }));
    }

    #[test]
    fn run_without_file_is_accepted() {
        let cli = Cli::try_parse_from(["rox", "run"]).unwrap();
        assert!(matches!(cli.commands, Commands::Run { filename: None }));
    }

    #[test]
    fn exit_codes_follow_error_stage() {
        let mut interpreter = Interpreter::with_output(io::sink());
        let err: LoxError = rox::run("print -\"x\";", &mut interpreter).unwrap_err();
        assert_eq!(err.exit_code(), 70);

        let tokens: Vec<Token> = Scanner::new("1 +").scan_tokens().0;
        assert!(Parser::new(&tokens).parse_expression().is_err());
    }
}
