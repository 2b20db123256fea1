#![crate_name = "aheui"]

#[macro_use]
extern crate lazy_static;

pub mod compiler;
pub mod config;
pub mod grid;
pub mod io;
pub mod number;
pub mod opcode;
pub mod program;
pub mod storage;
pub mod vm;
pub mod warning;
