use clap::Parser as _;
use std::io::Read;
use shlang::parser::{Lexer, ParseLimits, Parser};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(clap::Parser)]
#[command(name = "shlang")]
#[command(about = "Parse shlang scripts and print the syntax tree")]
#[command(version)]
struct Cli {
    /// Parse the script from command line argument
    #[arg(short = 'c')]
    script: Option<String>,

    /// Print the token stream instead of the tree
    #[arg(long = "tokens")]
    tokens: bool,

    /// Output the tree (or error) as JSON
    #[arg(long = "json")]
    json: bool,

    /// Only report whether the script parses
    #[arg(long = "check")]
    check: bool,

    /// Maximum nesting depth of blocks and lists
    #[arg(long = "max-depth")]
    max_depth: Option<usize>,

    /// Maximum input size in bytes
    #[arg(long = "max-input")]
    max_input: Option<usize>,

    /// Script file to parse
    #[arg()]
    script_file: Option<String>,
}

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    let cli = Cli::parse();
    setup_logging();

    // Determine script source: -c, file, or stdin
    let (name, script) = if let Some(s) = cli.script {
        ("<command-line>".to_string(), s)
    } else if let Some(ref file) = cli.script_file {
        match std::fs::read_to_string(file) {
            Ok(content) => (file.clone(), content),
            Err(e) => {
                eprintln!("Error: Cannot read script file: {}: {}", file, e);
                std::process::exit(1);
            }
        }
    } else {
        use std::io::IsTerminal;
        if std::io::stdin().is_terminal() {
            eprintln!("Error: No script provided. Use -c 'script', provide a script file, or pipe via stdin.");
            std::process::exit(1);
        }
        let mut buf = String::new();
        if let Err(e) = std::io::stdin().read_to_string(&mut buf) {
            eprintln!("Error: Cannot read stdin: {}", e);
            std::process::exit(1);
        }
        ("<stdin>".to_string(), buf)
    };

    if cli.tokens {
        let tokens = Lexer::new(&script).tokenize();
        if cli.json {
            println!("{}", serde_json::json!(tokens));
        } else {
            for token in &tokens {
                println!("{}\t{:?}\t{:?}", token.pos, token.token_type, token.value);
            }
        }
        return;
    }

    let defaults = ParseLimits::default();
    let limits = ParseLimits {
        max_input_size: cli.max_input.unwrap_or(defaults.max_input_size),
        max_depth: cli.max_depth.unwrap_or(defaults.max_depth),
    };

    match Parser::with_limits(limits).parse(&name, &script) {
        Ok(tree) => {
            if cli.check {
                return;
            }
            if cli.json {
                match serde_json::to_string_pretty(&tree) {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        eprintln!("Error: Cannot serialize tree: {}", e);
                        std::process::exit(1);
                    }
                }
            } else {
                print!("{}", tree);
            }
        }
        Err(err) => {
            if cli.json {
                println!("{}", serde_json::json!({ "error": err }));
            } else {
                eprintln!("{}", err);
            }
            std::process::exit(1);
        }
    }
}
