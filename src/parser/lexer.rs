// Lexical helpers shared by the command parsers

use nom::{
    branch::alt,
    bytes::complete::{escaped_transform, is_not, tag, tag_no_case},
    character::complete::{char, multispace0, multispace1},
    combinator::{eof, map, opt, peek, rest, value, verify},
    sequence::{delimited, terminated},
    IResult,
};

/// Wrap a parser so it skips surrounding whitespace
pub fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

/// Match a keyword (case-insensitive) that ends at whitespace or end of input
pub fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    terminated(tag_no_case(word), peek(alt((multispace1, eof))))
}

/// Parse a double-quoted string with `\"` and `\\` escapes
pub fn string_literal(input: &str) -> IResult<&str, String> {
    delimited(
        char('"'),
        map(
            opt(escaped_transform(
                is_not("\\\""),
                '\\',
                alt((value("\\", tag("\\")), value("\"", tag("\"")))),
            )),
            Option::unwrap_or_default,
        ),
        char('"'),
    )(input)
}

/// Parse a quoted string, or take the rest of the line as a bare argument
pub fn argument(input: &str) -> IResult<&str, String> {
    alt((
        string_literal,
        map(verify(rest, |s: &str| !s.trim().is_empty()), |s: &str| {
            s.trim().to_string()
        }),
    ))(input)
}
