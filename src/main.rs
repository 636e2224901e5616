use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use anyhow::Context;
use clap::Parser as ClapParser;

use lox::driver::Lox;

#[derive(ClapParser, Debug)]
#[command(name = "lox", version, about, long_about = None)]
struct Cli {
    /// Script to run; omit it for the interactive prompt
    script: Vec<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args: Cli = Cli::parse();

    match args.script.as_slice() {
        [] => run_prompt(),

        [script] => run_file(script),

        _ => {
            println!("Usage: lox [script]");

            process::exit(69)
        }
    }
}

fn run_file(path: &Path) -> anyhow::Result<()> {
    let source: Vec<u8> =
        fs::read(path).with_context(|| format!("cannot read {}", path.display()))?;

    let mut lox: Lox<io::Stdout> = Lox::new(io::stdout());

    lox.run(source, false);

    if lox.had_error() {
        process::exit(65);
    }

    if lox.had_runtime_error() {
        process::exit(70);
    }

    Ok(())
}

fn run_prompt() -> anyhow::Result<()> {
    let mut lox: Lox<io::Stdout> = Lox::new(io::stdout());
    let stdin = io::stdin();

    loop {
        print!("[lox]> ");
        io::stdout().flush()?;

        let mut line: String = String::new();

        if stdin.read_line(&mut line)? == 0 {
            // End of input closes the session.
            break;
        }

        let input: &str = line.trim();

        if input.is_empty() {
            continue;
        }

        if input.starts_with('.') {
            meta_command(&mut lox, input);

            continue;
        }

        lox.run(input.as_bytes().to_vec(), true);
        lox.reset_error();
    }

    Ok(())
}

fn meta_command(lox: &mut Lox<io::Stdout>, input: &str) {
    match input {
        ".exit" => process::exit(0),

        ".ast" => {
            lox.show_ast = !lox.show_ast;

            println!("ast dump {}", toggle_label(lox.show_ast));
        }

        ".expr" => {
            lox.show_sexpr = !lox.show_sexpr;

            println!("expression dump {}", toggle_label(lox.show_sexpr));
        }

        ".env" => lox.dump_environment(),

        _ if input.starts_with(".load ") => {
            let path: &str = input[".load ".len()..].trim();

            // Run the file as if its contents had been typed at the prompt.
            match fs::read(path) {
                Ok(source) => {
                    lox.run(source, true);
                    lox.reset_error();
                }

                Err(error) => eprintln!("cannot read {}: {}", path, error),
            }
        }

        _ => println!("Unknown command '{}'", input),
    }
}

fn toggle_label(on: bool) -> &'static str {
    if on {
        "on"
    } else {
        "off"
    }
}
