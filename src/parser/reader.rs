//! Sequential big-endian primitive readers. Every class file structure is decoded from these.
//!
//! The input slice is the cursor: each reader returns the unconsumed rest of the input together
//! with the decoded value. Running out of bytes surfaces as
//! `ClassFormatError::UnexpectedEndOfInput`.
//!
//! Errors that must not be backtracked over are returned as `nom::Err::Failure`; see `fail`.

use nom::bytes::complete::take;
use nom::number::complete::{be_u16, be_u32, be_u64, be_u8};
use nom::IResult;

use crate::error::ClassFormatError;

pub type Input<'a> = &'a [u8];
pub type ParseResult<'a, O> = IResult<Input<'a>, O, ClassFormatError>;

pub fn read_u1(input: Input) -> ParseResult<u8> {
    be_u8(input)
}

pub fn read_u2(input: Input) -> ParseResult<u16> {
    be_u16(input)
}

pub fn read_u4(input: Input) -> ParseResult<u32> {
    be_u32(input)
}

pub fn read_u8(input: Input) -> ParseResult<u64> {
    be_u64(input)
}

/// Reads exactly `n` bytes.
pub fn read_bytes(input: Input, n: usize) -> ParseResult<&[u8]> {
    take(n)(input)
}

/// Reads a 2-byte length followed by that many bytes, as in a `CONSTANT_Utf8` entry.
pub fn read_utf8_bytes(input: Input) -> ParseResult<&[u8]> {
    let (input, length) = read_u2(input)?;
    take(length)(input)
}

/// Reads a 4-byte length followed by that many bytes, as in an attribute body or a code array.
pub fn read_u4_prefixed(input: Input) -> ParseResult<&[u8]> {
    // not `length_data`: that reports a short body as `Incomplete` rather than end of input
    let (input, length) = read_u4(input)?;
    take(length)(input)
}

/// Aborts parsing with `err`. The error is a `Failure`, so no enclosing combinator backtracks.
pub fn fail<'a, O>(err: ClassFormatError) -> ParseResult<'a, O> {
    Err(nom::Err::Failure(err))
}

/// Converts the result of a top-level parser into a plain `Result`.
pub fn finish<O>(result: ParseResult<O>) -> Result<(Input, O), ClassFormatError> {
    match result {
        Ok(done) => Ok(done),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(e),
        Err(nom::Err::Incomplete(_)) => Err(ClassFormatError::UnexpectedEndOfInput { remaining: 0 }),
    }
}
