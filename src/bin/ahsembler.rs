// ahsembler - Aheui assembler listing
// Compiles a program in any source format and prints its assembly to stdout

use std::collections::HashMap;
use std::io::{self, Write};
use std::process;

use aheui::compiler::Compiler;
use aheui::config::{detect_source, Cli, Options, Target};
use clap::Parser;
use log::info;

fn main() {
    // Initialize logging
    env_logger::init();

    let mut cli = Cli::parse();
    cli.target = Some(Target::Asm);
    cli.output = Some("-".to_string());
    cli.no_c = true;

    let env: HashMap<String, String> = std::env::vars().collect();
    let options = match Options::resolve(cli, &env) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("ahsembler: error: {}", e);
            process::exit(1);
        }
    };

    let contents = match options.input.read() {
        Ok(contents) => contents,
        Err(e) => {
            eprintln!("ahsembler: error: {}", e);
            process::exit(1);
        }
    };
    let format = detect_source(options.source, options.input.name(), &contents);
    let mut compiler = match Compiler::load(&contents, format, false) {
        Ok(compiler) => compiler,
        Err(e) => {
            eprintln!("ahsembler: error: {}", e);
            process::exit(1);
        }
    };
    compiler.optimize(options.opt);
    info!(
        "{}: {} instructions",
        options.input.name(),
        compiler.program().len()
    );

    let mut stdout = io::stdout().lock();
    if let Err(e) = stdout
        .write_all(compiler.write_asm(false).as_bytes())
        .and_then(|_| stdout.flush())
    {
        eprintln!("ahsembler: error: {}", e);
        process::exit(1);
    }
}
