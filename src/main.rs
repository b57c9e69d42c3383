use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bytes::BytesMut;
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};
use memmap2::Mmap;

use lox_interpreter as lox;

use lox::ast::StmtKind;
use lox::ast_printer::AstPrinter;
use lox::error::line_col;
use lox::scanner::Scanner;
use lox::value::Value;
use lox::{Interpreter, LoxError, ParseMode};

const EXIT_OK: i32 = 0;
const EXIT_COMPILE_ERROR: i32 = 65;
const EXIT_RUNTIME_ERROR: i32 = 70;

#[derive(ClapParser, Debug)]
#[command(version, about = "Lox language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to rlox.log
    #[arg(long, global = true)]
    log: bool,

    /// Show the Lox call trace on internal errors
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize {
        filename: PathBuf,

        /// Print the tokens as JSON
        #[arg(long)]
        json: bool,
    },

    /// Parses input from a file and prints its AST
    Parse {
        filename: PathBuf,

        /// Print the AST as JSON
        #[arg(long)]
        json: bool,
    },

    /// Runs input from a file as a Lox program
    Run {
        filename: PathBuf,

        /// Start a REPL in the same session once the program finishes
        #[arg(short, long)]
        interactive: bool,
    },

    /// Starts an interactive session
    Repl,
}

/// Reads the contents of a file through a memory map.
fn read_file(filename: &Path) -> Result<String> {
    info!("Reading file: {:?}", filename);

    let file = File::open(filename).with_context(|| format!("Failed to open file {:?}", filename))?;
    let len = file
        .metadata()
        .with_context(|| format!("Failed to stat file {:?}", filename))?
        .len();

    // Zero-length maps are rejected on some platforms.
    if len == 0 {
        return Ok(String::new());
    }

    // SAFETY: the map is read once, copied out, and dropped before returning.
    let map = unsafe { Mmap::map(&file) }.with_context(|| format!("Failed to map file {:?}", filename))?;
    let text = std::str::from_utf8(&map).with_context(|| format!("{:?} is not valid UTF-8", filename))?;

    info!("Read {} bytes from {:?}", len, filename);

    Ok(text.to_owned())
}

fn init_logger() -> Result<()> {
    let log_file = File::create("rlox.log").context("Failed to create rlox.log")?;

    Builder::new()
        .format(|buf, record| {
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("lox_interpreter::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));
            writeln!(
                buf,
                "{} [{}:{}] - {}",
                chrono::Local::now().format("%H:%M:%S%.3f"),
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug)
        .parse_default_env()
        .init();

    info!("Logger initialized, writing to rlox.log");
    Ok(())
}

/// Print `error` with the offending source line and a caret under it.
fn report(path: &str, source: &str, error: &LoxError, debug: bool) {
    debug!("Reporting error: {:?}", error);

    if let LoxError::Internal { message, trace } = error {
        eprintln!("Internal Error: {}", message);

        if debug {
            eprintln!("Lox call trace (most recent call last):");
            for frame in trace {
                eprintln!("  in {}", frame);
            }
        }
        return;
    }

    match error.index() {
        Some(index) => {
            let (line, col, text) = line_col(source, index);

            eprintln!("Error in {}:{}:{}", path, line, col + 1);
            eprintln!("    {}", text);
            eprintln!("    {}^", " ".repeat(col));
            eprintln!("{}: {}", error.kind(), error.message());
        }

        None => eprintln!("{}", error),
    }
}

fn exit_code(error: &LoxError) -> i32 {
    match error {
        LoxError::Runtime { .. } | LoxError::Internal { .. } => EXIT_RUNTIME_ERROR,
        _ => EXIT_COMPILE_ERROR,
    }
}

fn tokenize(path: &Path, json: bool, debug: bool) -> Result<i32> {
    info!("Running Tokenize subcommand");

    let source = read_file(path)?;
    let display = path.display().to_string();

    let mut tokens = Vec::new();
    let mut code = EXIT_OK;

    for token in Scanner::new(&source) {
        match token {
            Ok(token) if json => tokens.push(token),
            Ok(token) => println!("{}", token),
            Err(e) => {
                report(&display, &source, &e, debug);
                code = EXIT_COMPILE_ERROR;
            }
        }
    }

    if json {
        let out = serde_json::to_string_pretty(&tokens).context("Failed to serialize tokens")?;
        println!("{}", out);
    }

    Ok(code)
}

fn parse(path: &Path, json: bool, debug: bool) -> Result<i32> {
    info!("Running Parse subcommand");

    let source = read_file(path)?;
    let display = path.display().to_string();

    let tokens = match lox::lex(&source) {
        Ok(tokens) => tokens,
        Err(e) => {
            report(&display, &source, &e, debug);
            return Ok(exit_code(&e));
        }
    };

    let (program, errors) = match lox::parse(tokens, ParseMode::File) {
        Ok(parsed) => parsed,
        Err(e) => {
            report(&display, &source, &e, debug);
            return Ok(exit_code(&e));
        }
    };

    if !errors.is_empty() {
        for e in &errors {
            report(&display, &source, e, debug);
        }
        return Ok(EXIT_COMPILE_ERROR);
    }

    if json {
        let out = serde_json::to_string_pretty(&program).context("Failed to serialize AST")?;
        println!("{}", out);
    } else {
        println!("{}", AstPrinter.print_program(&program));
    }

    info!("Parse subcommand completed");
    Ok(EXIT_OK)
}

/// Lex, parse, resolve and run a whole file, reporting every syntax error.
fn run_file(interpreter: &mut Interpreter, path: &Path, debug: bool) -> Result<i32> {
    info!("Running Run subcommand");

    let source = read_file(path)?;
    let display = path.display().to_string();

    let fail = |e: &LoxError| {
        report(&display, &source, e, debug);
        exit_code(e)
    };

    let tokens = match lox::lex(&source) {
        Ok(tokens) => tokens,
        Err(e) => return Ok(fail(&e)),
    };

    let program = match lox::parse(tokens, ParseMode::File) {
        Ok((program, errors)) if errors.is_empty() => program,
        Ok((_, errors)) => {
            for e in &errors {
                fail(e);
            }
            return Ok(EXIT_COMPILE_ERROR);
        }
        Err(e) => return Ok(fail(&e)),
    };

    if let Err(e) = lox::resolve(interpreter, &program) {
        return Ok(fail(&e));
    }

    match lox::evaluate(interpreter, &program) {
        Ok(()) => {
            info!("Program executed successfully");
            Ok(EXIT_OK)
        }
        Err(e) => Ok(fail(&e)),
    }
}

/// Run one complete REPL chunk.  A lone expression statement echoes its value
/// unless it is `nil`.
fn run_chunk(interpreter: &mut Interpreter, source: &str) -> lox::Result<()> {
    let tokens = lox::lex_interactive(source)?;
    let (program, _) = lox::parse(tokens, ParseMode::Repl)?;

    lox::resolve(interpreter, &program)?;

    if let [stmt] = program.as_slice() {
        if let StmtKind::ExprStmt(expr) = &stmt.kind {
            let value = interpreter.evaluate(expr)?;
            if value != Value::Nil {
                println!("{}", value);
            }
            return Ok(());
        }
    }

    lox::evaluate(interpreter, &program)
}

fn repl(interpreter: &mut Interpreter, debug: bool) -> Result<()> {
    info!("Starting REPL");

    let stdin = io::stdin();
    let mut buffer = BytesMut::new();
    let mut line = String::new();

    loop {
        print!("{}", if buffer.is_empty() { "> " } else { "... " });
        io::stdout().flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            println!();
            break;
        }
        buffer.extend_from_slice(line.as_bytes());

        let source = String::from_utf8_lossy(&buffer).into_owned();

        match run_chunk(interpreter, &source) {
            Err(e) if e.is_incomplete() => {
                debug!("Incomplete input, reading another line");
                continue;
            }
            Err(e) => report("<stdin>", &source, &e, debug),
            Ok(()) => {}
        }

        buffer.clear();
    }

    info!("REPL finished");
    Ok(())
}

fn dispatch(args: Cli) -> Result<i32> {
    match args.commands {
        Commands::Tokenize { filename, json } => tokenize(&filename, json, args.debug),

        Commands::Parse { filename, json } => parse(&filename, json, args.debug),

        Commands::Run {
            filename,
            interactive,
        } => {
            let mut interpreter = Interpreter::new();
            let code = run_file(&mut interpreter, &filename, args.debug)?;

            if interactive {
                repl(&mut interpreter, args.debug)?;
                return Ok(EXIT_OK);
            }

            Ok(code)
        }

        Commands::Repl => {
            let mut interpreter = Interpreter::new();
            repl(&mut interpreter, args.debug)?;
            Ok(EXIT_OK)
        }
    }
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    if args.log {
        init_logger()?;
    } else {
        // Initialize a minimal logger to avoid "no logger" errors
        Builder::new().filter_level(log::LevelFilter::Off).init();
    }

    info!("CLI arguments: {:?}", args);

    let code = dispatch(args)?;

    if code != EXIT_OK {
        debug!("Exiting with code {}", code);
        std::process::exit(code);
    }

    Ok(())
}
