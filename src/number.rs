/// Numeric back ends for storage values
///
/// Values are arbitrary-precision by default. The machine-integer back end
/// uses checked `i64` arithmetic and faults on overflow instead of wrapping.
/// Division and modulo round toward negative infinity, so the remainder
/// takes the sign of the divisor.
use crate::opcode::Opcode;
use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{ToPrimitive, Zero};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticError {
    DivisionByZero,
    ModuloByZero,
    Overflow,
}

impl fmt::Display for ArithmeticError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ArithmeticError::DivisionByZero => write!(f, "division by zero"),
            ArithmeticError::ModuloByZero => write!(f, "modulo by zero"),
            ArithmeticError::Overflow => write!(f, "integer overflow"),
        }
    }
}

impl std::error::Error for ArithmeticError {}

pub trait Number: Clone + fmt::Debug + fmt::Display + PartialEq {
    /// Name used by `--int` and `RPAHEUI_INT`
    const NAME: &'static str;

    fn from_i64(value: i64) -> Self;

    /// Parse an optionally signed run of ASCII digits
    fn parse_decimal(text: &str) -> Option<Self>;

    fn add(&self, other: &Self) -> Result<Self, ArithmeticError>;
    fn sub(&self, other: &Self) -> Result<Self, ArithmeticError>;
    fn mul(&self, other: &Self) -> Result<Self, ArithmeticError>;
    fn div(&self, other: &Self) -> Result<Self, ArithmeticError>;
    fn rem(&self, other: &Self) -> Result<Self, ArithmeticError>;

    fn ge(&self, other: &Self) -> bool;
    fn is_zero(&self) -> bool;

    /// Unicode scalar value, if the value is one
    fn to_codepoint(&self) -> Option<char>;

    /// Lowercase hexadecimal text, with a leading '-' for negative values
    fn to_hex(&self) -> String;

    /// Process exit status: the value reduced modulo 2^32 into `i32`, and
    /// whether that reduction changed it
    fn to_exit_code(&self) -> (i32, bool);
}

/// Evaluate a binary opcode as `left op right`, where `right` is the value
/// popped first. Other opcodes yield `right` unchanged.
pub fn binary_op<N: Number>(op: Opcode, left: &N, right: &N) -> Result<N, ArithmeticError> {
    match op {
        Opcode::Add => left.add(right),
        Opcode::Sub => left.sub(right),
        Opcode::Mul => left.mul(right),
        Opcode::Div => left.div(right),
        Opcode::Mod => left.rem(right),
        Opcode::Cmp => Ok(N::from_i64(left.ge(right) as i64)),
        _ => Ok(right.clone()),
    }
}

impl Number for BigInt {
    const NAME: &'static str = "bigint";

    fn from_i64(value: i64) -> Self {
        BigInt::from(value)
    }

    fn parse_decimal(text: &str) -> Option<Self> {
        BigInt::from_str(text).ok()
    }

    fn add(&self, other: &Self) -> Result<Self, ArithmeticError> {
        Ok(self + other)
    }

    fn sub(&self, other: &Self) -> Result<Self, ArithmeticError> {
        Ok(self - other)
    }

    fn mul(&self, other: &Self) -> Result<Self, ArithmeticError> {
        Ok(self * other)
    }

    fn div(&self, other: &Self) -> Result<Self, ArithmeticError> {
        if Zero::is_zero(other) {
            return Err(ArithmeticError::DivisionByZero);
        }
        Ok(Integer::div_floor(self, other))
    }

    fn rem(&self, other: &Self) -> Result<Self, ArithmeticError> {
        if Zero::is_zero(other) {
            return Err(ArithmeticError::ModuloByZero);
        }
        Ok(Integer::mod_floor(self, other))
    }

    fn ge(&self, other: &Self) -> bool {
        self >= other
    }

    fn is_zero(&self) -> bool {
        Zero::is_zero(self)
    }

    fn to_codepoint(&self) -> Option<char> {
        self.to_u32().and_then(char::from_u32)
    }

    fn to_hex(&self) -> String {
        self.to_str_radix(16)
    }

    fn to_exit_code(&self) -> (i32, bool) {
        if let Some(code) = self.to_i32() {
            return (code, false);
        }
        let modulus = BigInt::from(1u64 << 32);
        let reduced = Integer::mod_floor(self, &modulus).to_u32().unwrap_or(0);
        (reduced as i32, true)
    }
}

impl Number for i64 {
    const NAME: &'static str = "smallint";

    fn from_i64(value: i64) -> Self {
        value
    }

    fn parse_decimal(text: &str) -> Option<Self> {
        i64::from_str(text).ok()
    }

    fn add(&self, other: &Self) -> Result<Self, ArithmeticError> {
        self.checked_add(*other).ok_or(ArithmeticError::Overflow)
    }

    fn sub(&self, other: &Self) -> Result<Self, ArithmeticError> {
        self.checked_sub(*other).ok_or(ArithmeticError::Overflow)
    }

    fn mul(&self, other: &Self) -> Result<Self, ArithmeticError> {
        self.checked_mul(*other).ok_or(ArithmeticError::Overflow)
    }

    fn div(&self, other: &Self) -> Result<Self, ArithmeticError> {
        match *other {
            0 => Err(ArithmeticError::DivisionByZero),
            -1 => self.checked_neg().ok_or(ArithmeticError::Overflow),
            _ => Ok(Integer::div_floor(self, other)),
        }
    }

    fn rem(&self, other: &Self) -> Result<Self, ArithmeticError> {
        match *other {
            0 => Err(ArithmeticError::ModuloByZero),
            -1 => Ok(0),
            _ => Ok(Integer::mod_floor(self, other)),
        }
    }

    fn ge(&self, other: &Self) -> bool {
        self >= other
    }

    fn is_zero(&self) -> bool {
        *self == 0
    }

    fn to_codepoint(&self) -> Option<char> {
        u32::try_from(*self).ok().and_then(char::from_u32)
    }

    fn to_hex(&self) -> String {
        if *self < 0 {
            format!("-{:x}", self.unsigned_abs())
        } else {
            format!("{:x}", self)
        }
    }

    fn to_exit_code(&self) -> (i32, bool) {
        let code = *self as i32;
        (code, code as i64 != *self)
    }
}
