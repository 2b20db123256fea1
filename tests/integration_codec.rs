//! Integration tests for the bytecode and assembly representations
//!
//! A program written out and read back must keep its opcode sequence and
//! jump destinations, and must behave the same when run.

use aheui::compiler::{Compiler, OptLevel, SourceFormat};
use aheui::config::{detect_source, SourceChoice};
use aheui::io::Console;
use aheui::program::Program;
use aheui::vm::Machine;
use aheui::warning::Warnings;
use num_bigint::BigInt;

const HELLO: &str = "밤밣따빠밣밟따뿌
빠맣파빨받밤뚜뭏
돋밬탕빠맣붏두붇
볻뫃박발뚷투뭏붖
뫃도뫃희멓뭏뭏붘
뫃봌토범더벌뿌뚜
뽑뽀멓멓더벓뻐뚠
뽀덩벐멓뻐덕더벅
";

fn output_of(program: &Program) -> String {
    let warnings = Warnings::with_sink(0, Box::new(std::io::sink()));
    let mut console = Console::new(&b""[..], Vec::new(), warnings);
    Machine::<BigInt>::new(program)
        .run(&mut console)
        .expect("program runs");
    String::from_utf8_lossy(&console.output).into_owned()
}

fn assert_same_shape(a: &Program, b: &Program) {
    assert_eq!(a.len(), b.len());
    for i in 0..a.len() {
        assert_eq!(a.instructions[i].opcode(), b.instructions[i].opcode(), "at {}", i);
        assert_eq!(a.instructions[i].value(), b.instructions[i].value(), "at {}", i);
        assert_eq!(a.jump_target(i), b.jump_target(i), "at {}", i);
    }
}

#[test]
fn test_bytecode_round_trip() {
    for level in [OptLevel::O0, OptLevel::O1, OptLevel::O2] {
        let mut compiler = Compiler::compile(HELLO, false);
        compiler.optimize(level);
        let bytes = compiler.write_bytecode().unwrap();
        let reloaded = Compiler::read_bytecode(&bytes).unwrap();
        assert_same_shape(reloaded.program(), compiler.program());
        assert_eq!(reloaded.write_bytecode().unwrap(), bytes);
        assert_eq!(output_of(reloaded.program()), "Hello, world!\n");
    }
}

#[test]
fn test_assembly_round_trip() {
    for commented in [false, true] {
        let mut compiler = Compiler::compile(HELLO, commented);
        compiler.optimize(OptLevel::O2);
        let text = compiler.write_asm(commented);
        let reloaded = Compiler::read_asm(&text).unwrap();
        assert_same_shape(reloaded.program(), compiler.program());
        assert_eq!(reloaded.write_asm(commented), text);
        assert_eq!(output_of(reloaded.program()), "Hello, world!\n");
    }
}

#[test]
fn test_companion_file_reads_as_bytecode() {
    let mut compiler = Compiler::compile(HELLO, false);
    compiler.optimize(OptLevel::O1);
    let mut contents = compiler.write_bytecode().unwrap();
    contents.extend_from_slice(b"\n\n");
    contents.extend_from_slice(compiler.write_asm(true).as_bytes());

    let format = detect_source(SourceChoice::Auto, "hello.aheuic", &contents);
    assert_eq!(format, SourceFormat::Bytecode);
    assert_eq!(
        detect_source(SourceChoice::Auto, "-", &contents),
        SourceFormat::Bytecode
    );
    let reloaded = Compiler::load(&contents, format, false).unwrap();
    assert_eq!(output_of(reloaded.program()), "Hello, world!\n");
}
