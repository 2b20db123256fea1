use aheui::compiler::Compiler;
use aheui::config::{detect_source, Cli, IntBackend, Options, Target};
use aheui::io::Console;
use aheui::number::Number;
use aheui::program::Program;
use aheui::vm::{exit_code, Machine};
use aheui::warning::Warnings;
use clap::Parser;
use log::{debug, info};
use num_bigint::BigInt;
use std::collections::HashMap;
use std::fmt::Display;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::process;

/// Exit status for option, input and compile errors
const EXIT_ERROR: i32 = 1;
/// Exit status for runtime faults
const EXIT_FAULT: i32 = 2;

fn main() {
    // Initialize logging
    env_logger::init();

    let cli = Cli::parse();
    let env: HashMap<String, String> = std::env::vars().collect();
    let options = match Options::resolve(cli, &env) {
        Ok(options) => options,
        Err(e) => process::exit(report(&e)),
    };
    process::exit(run(&options));
}

fn report(error: &dyn Display) -> i32 {
    eprintln!("aheui: error: {}", error);
    EXIT_ERROR
}

fn run(options: &Options) -> i32 {
    let contents = match options.input.read() {
        Ok(contents) => contents,
        Err(e) => return report(&e),
    };
    let format = detect_source(options.source, options.input.name(), &contents);
    info!(
        "Loading {} as {} at -O{}",
        options.input.name(),
        format,
        options.opt
    );

    let mut compiler = match Compiler::load(&contents, format, options.with_comments()) {
        Ok(compiler) => compiler,
        Err(e) => return report(&e),
    };
    compiler.optimize(options.opt);

    if let Some(path) = &options.companion {
        write_companion(&compiler, path);
    }

    match options.target {
        Target::Run => match options.int {
            IntBackend::BigInt => execute::<BigInt>(compiler.program(), options.warning_limit),
            IntBackend::SmallInt => execute::<i64>(compiler.program(), options.warning_limit),
        },
        Target::Asm | Target::AsmComment => {
            let asm = compiler.write_asm(options.target == Target::AsmComment);
            emit(&options.output, asm.as_bytes())
        }
        Target::Bytecode => match compiler.write_bytecode() {
            Ok(bytes) => emit(&options.output, &bytes),
            Err(e) => report(&e),
        },
    }
}

/// Cache the compiled program next to its source: bytecode, a blank line,
/// then the assembly listing. Failures are not fatal.
fn write_companion(compiler: &Compiler, path: &str) {
    let mut contents = match compiler.write_bytecode() {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!("companion {} not written: {}", path, e);
            return;
        }
    };
    contents.extend_from_slice(b"\n\n");
    contents.extend_from_slice(compiler.write_asm(true).as_bytes());
    match fs::write(path, contents) {
        Ok(()) => debug!("companion {} written", path),
        Err(e) => debug!("companion {} not written: {}", path, e),
    }
}

fn emit(output: &str, bytes: &[u8]) -> i32 {
    let result = if output == "-" {
        let mut stdout = io::stdout().lock();
        stdout.write_all(bytes).and_then(|_| stdout.flush())
    } else {
        fs::write(output, bytes)
    };
    match result {
        Ok(()) => {
            info!("Wrote {} bytes to {}", bytes.len(), output);
            0
        }
        Err(e) => report(&format!("cannot write {}: {}", output, e)),
    }
}

fn execute<N: Number>(program: &Program, warning_limit: i64) -> i32 {
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut console = Console::new(
        stdin.lock(),
        BufWriter::new(stdout.lock()),
        Warnings::new(warning_limit),
    );
    let mut machine = Machine::<N>::new(program);
    match machine.run(&mut console) {
        Ok(value) => exit_code(&value),
        Err(e) => {
            eprintln!("aheui: error: {}", e);
            EXIT_FAULT
        }
    }
}
