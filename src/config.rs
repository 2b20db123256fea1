/// Command-line options, environment variables and the optional TOML
/// config file, resolved into one immutable `Options` value
use crate::compiler::{OptLevel, SourceFormat};
use crate::compiler::bytecode::has_sentinel;
use crate::warning::DEFAULT_WARNING_LIMIT;
use clap::{Parser, ValueEnum};
use log::debug;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::io::Read;
use std::path::PathBuf;

pub const ENV_WARNING_LIMIT: &str = "RPAHEUI_WARNING_LIMIT";
pub const ENV_INT: &str = "RPAHEUI_INT";

/// Aheui - compile and run two-dimensional Hangul programs
#[derive(Parser, Debug, Default)]
#[command(name = "aheui")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Aheui compiler and virtual machine")]
pub struct Cli {
    /// Program file, or - for standard input
    #[arg(value_name = "FILE")]
    pub file: Option<String>,

    /// Program passed in as a string
    #[arg(short = 'c', long = "cmd", value_name = "PROGRAM")]
    pub cmd: Option<String>,

    /// Optimization level: 0 none, 1 coarse dead code and folding,
    /// 2 precise dead code, block reordering and folding
    #[arg(short = 'O', long = "opt", value_parser = clap::value_parser!(u8).range(0..=2))]
    pub opt: Option<u8>,

    /// Source format
    #[arg(short = 'S', long = "source", value_enum)]
    pub source: Option<SourceChoice>,

    /// What to do with the compiled program
    #[arg(short = 'T', long = "target", value_enum)]
    pub target: Option<Target>,

    /// Output file, - for standard output
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<String>,

    /// Do not write a companion .aheuic file when running
    #[arg(long = "no-c")]
    pub no_c: bool,

    /// Repeated warning limit: 0 silences warnings, -1 removes the limit
    #[arg(long = "warning-limit", value_name = "N", allow_hyphen_values = true)]
    pub warning_limit: Option<String>,

    /// Integer representation used by the virtual machine
    #[arg(long = "int", value_enum)]
    pub int: Option<IntBackend>,

    /// TOML file with default options
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceChoice {
    Auto,
    Bytecode,
    Asm,
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    Run,
    Bytecode,
    Asm,
    #[value(name = "asm+comment")]
    #[serde(rename = "asm+comment")]
    AsmComment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntBackend {
    #[value(name = "bigint")]
    BigInt,
    #[value(name = "smallint")]
    SmallInt,
}

impl IntBackend {
    fn parse(text: &str) -> Option<Self> {
        match text {
            "bigint" => Some(IntBackend::BigInt),
            "smallint" => Some(IntBackend::SmallInt),
            _ => None,
        }
    }
}

/// Keys accepted in a `--config` file
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub opt: Option<u8>,
    pub source: Option<SourceChoice>,
    pub target: Option<Target>,
    pub warning_limit: Option<i64>,
    pub int: Option<IntBackend>,
}

impl ConfigFile {
    pub fn parse(text: &str) -> Result<Self, String> {
        toml::from_str(text).map_err(|e| e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OptionError {
    MissingInput,
    ConflictingInput,
    /// Integer option given on the command line
    InvalidFlagInteger { flag: String, value: String },
    /// Integer option taken from the environment
    InvalidEnvInteger { variable: String, value: String },
    InvalidChoice { name: String, value: String },
    Config { path: String, message: String },
    Io { path: String, message: String },
}

impl fmt::Display for OptionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OptionError::MissingInput => write!(f, "no input files"),
            OptionError::ConflictingInput => write!(f, "--cmd,-c but input file found"),
            OptionError::InvalidFlagInteger { flag, value } => {
                write!(f, "The value of --{}=\"{}\" is not a valid integer", flag, value)
            }
            OptionError::InvalidEnvInteger { variable, value } => {
                write!(f, "The value {}=\"{}\" is not a valid integer", variable, value)
            }
            OptionError::InvalidChoice { name, value } => {
                write!(f, "invalid value \"{}\" for {}", value, name)
            }
            OptionError::Config { path, message } => {
                write!(f, "cannot load config file {}: {}", path, message)
            }
            OptionError::Io { path, message } => write!(f, "cannot read {}: {}", path, message),
        }
    }
}

impl std::error::Error for OptionError {}

/// Where the program text comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    File(String),
    Stdin,
    Inline(String),
}

impl Input {
    /// File name used for format detection and output naming
    pub fn name(&self) -> &str {
        match self {
            Input::File(name) => name,
            Input::Stdin | Input::Inline(_) => "-",
        }
    }

    pub fn read(&self) -> Result<Vec<u8>, OptionError> {
        let io_error = |e: std::io::Error| OptionError::Io {
            path: self.name().to_string(),
            message: e.to_string(),
        };
        match self {
            Input::File(name) => std::fs::read(name).map_err(io_error),
            Input::Stdin => {
                let mut contents = Vec::new();
                std::io::stdin()
                    .lock()
                    .read_to_end(&mut contents)
                    .map_err(io_error)?;
                Ok(contents)
            }
            Input::Inline(text) => Ok(text.as_bytes().to_vec()),
        }
    }
}

/// Fully resolved options
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    pub input: Input,
    pub opt: OptLevel,
    pub source: SourceChoice,
    pub target: Target,
    /// Destination of compiled output, `-` for standard output
    pub output: String,
    /// Companion bytecode file written before running
    pub companion: Option<String>,
    pub warning_limit: i64,
    pub int: IntBackend,
}

impl Options {
    /// Merge the command line with the config file and the environment.
    /// Explicit flags win over the config file, which wins over the
    /// environment.
    pub fn resolve(cli: Cli, env: &HashMap<String, String>) -> Result<Self, OptionError> {
        let file = match &cli.config {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| OptionError::Config {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })?;
                ConfigFile::parse(&text).map_err(|message| OptionError::Config {
                    path: path.display().to_string(),
                    message,
                })?
            }
            None => ConfigFile::default(),
        };
        Options::merge(cli, file, env)
    }

    pub fn merge(cli: Cli, file: ConfigFile, env: &HashMap<String, String>) -> Result<Self, OptionError> {
        let input = match (cli.cmd, cli.file) {
            (Some(_), Some(_)) => return Err(OptionError::ConflictingInput),
            (Some(cmd), None) => Input::Inline(cmd),
            (None, Some(file)) if file == "-" => Input::Stdin,
            (None, Some(file)) => Input::File(file),
            (None, None) => return Err(OptionError::MissingInput),
        };

        let level = cli.opt.or(file.opt).unwrap_or(1);
        let opt = OptLevel::from_level(level).ok_or_else(|| OptionError::InvalidChoice {
            name: "opt".to_string(),
            value: level.to_string(),
        })?;
        let source = cli.source.or(file.source).unwrap_or(SourceChoice::Auto);
        let target = cli.target.or(file.target).unwrap_or(Target::Run);

        let name = input.name();
        let companion = if target == Target::Run
            && !cli.no_c
            && name != "-"
            && !name.ends_with(".aheuic")
        {
            Some(bytecode_name(name))
        } else {
            None
        };

        let output = match cli.output {
            Some(output) if !output.is_empty() => output,
            _ => match target {
                Target::Run => "-".to_string(),
                _ if name == "-" => "-".to_string(),
                Target::Bytecode => bytecode_name(name),
                Target::Asm | Target::AsmComment => asm_name(name),
            },
        };

        let warning_limit = match cli.warning_limit {
            Some(value) => match value.trim().parse::<i64>() {
                Ok(limit) => limit,
                Err(_) => {
                    return Err(OptionError::InvalidFlagInteger {
                        flag: "warning-limit".to_string(),
                        value,
                    })
                }
            },
            None => match file.warning_limit {
                Some(limit) => limit,
                None => match env.get(ENV_WARNING_LIMIT) {
                    Some(value) => {
                        value
                            .trim()
                            .parse::<i64>()
                            .map_err(|_| OptionError::InvalidEnvInteger {
                                variable: ENV_WARNING_LIMIT.to_string(),
                                value: value.clone(),
                            })?
                    }
                    None => DEFAULT_WARNING_LIMIT,
                },
            },
        };

        let int = match cli.int.or(file.int) {
            Some(int) => int,
            None => match env.get(ENV_INT) {
                Some(value) => IntBackend::parse(value).ok_or_else(|| OptionError::InvalidChoice {
                    name: ENV_INT.to_string(),
                    value: value.clone(),
                })?,
                None => IntBackend::BigInt,
            },
        };

        let options = Options {
            input,
            opt,
            source,
            target,
            output,
            companion,
            warning_limit,
            int,
        };
        debug!("options: {:?}", options);
        Ok(options)
    }

    /// Whether compiled code should carry provenance comments
    pub fn with_comments(&self) -> bool {
        self.target != Target::Run
    }
}

/// Concrete format of the program contents
pub fn detect_source(choice: SourceChoice, name: &str, contents: &[u8]) -> SourceFormat {
    match choice {
        SourceChoice::Text => SourceFormat::Text,
        SourceChoice::Bytecode => SourceFormat::Bytecode,
        SourceChoice::Asm => SourceFormat::Asm,
        SourceChoice::Auto if name.ends_with(".aheui") => SourceFormat::Text,
        SourceChoice::Auto if name.ends_with(".aheuic") => SourceFormat::Bytecode,
        SourceChoice::Auto if name.ends_with(".aheuis") => SourceFormat::Asm,
        SourceChoice::Auto if has_sentinel(contents) => SourceFormat::Bytecode,
        SourceChoice::Auto => SourceFormat::Text,
    }
}

fn bytecode_name(name: &str) -> String {
    if name.ends_with(".aheui") {
        format!("{}c", name)
    } else {
        format!("{}.aheuic", name)
    }
}

fn asm_name(name: &str) -> String {
    if name.ends_with(".aheui") {
        format!("{}s", name)
    } else {
        format!("{}.aheuis", name)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
