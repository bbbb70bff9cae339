// Command parser for interactive sessions

use super::ast::SessionCommand;
use super::lexer::{argument, keyword, ws};
use nom::{
    branch::alt,
    character::complete::multispace1,
    combinator::{all_consuming, map, opt, value},
    sequence::preceded,
    IResult,
};

/// Parse an upload command
/// Format: upload data.csv or upload "my data.xlsx"
pub fn parse_upload(input: &str) -> IResult<&str, SessionCommand> {
    map(
        preceded(keyword("upload"), preceded(multispace1, argument)),
        SessionCommand::Upload,
    )(input)
}

/// Parse an axis selection
/// Format: x column or y "column with spaces"
pub fn parse_axis(input: &str) -> IResult<&str, SessionCommand> {
    alt((
        map(
            preceded(keyword("x"), preceded(multispace1, argument)),
            SessionCommand::SelectX,
        ),
        map(
            preceded(keyword("y"), preceded(multispace1, argument)),
            SessionCommand::SelectY,
        ),
    ))(input)
}

/// Parse a chart kind selection
/// Format: kind bar
pub fn parse_kind(input: &str) -> IResult<&str, SessionCommand> {
    map(
        preceded(keyword("kind"), preceded(multispace1, argument)),
        SessionCommand::Kind,
    )(input)
}

/// Parse a save command
/// Format: save or save out/chart.html
pub fn parse_save(input: &str) -> IResult<&str, SessionCommand> {
    map(
        preceded(keyword("save"), opt(preceded(multispace1, argument))),
        SessionCommand::Save,
    )(input)
}

fn parse_simple(input: &str) -> IResult<&str, SessionCommand> {
    alt((
        value(SessionCommand::Columns, keyword("columns")),
        value(SessionCommand::Show, keyword("show")),
        value(SessionCommand::Help, keyword("help")),
        value(SessionCommand::Quit, alt((keyword("quit"), keyword("exit")))),
    ))(input)
}

/// Parse any command
pub fn parse_command(input: &str) -> IResult<&str, SessionCommand> {
    ws(alt((parse_upload, parse_axis, parse_kind, parse_save, parse_simple)))(input)
}

/// Parse one full input line, rejecting trailing garbage
pub fn parse_line(line: &str) -> Result<SessionCommand, String> {
    all_consuming(parse_command)(line)
        .map(|(_, cmd)| cmd)
        .map_err(|_| format!("could not understand '{}' (try 'help')", line.trim()))
}
