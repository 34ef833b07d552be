//! This module provides parsing of the text configuration formats: bin layouts (`.layout`) and
//! steering rules (`.rules`).
//!
//! Both formats are line based. `#` starts a comment, blank lines are ignored, numbers are decimal
//! or `0x` hexadecimal.
mod layout;
mod rules;

use nom::{
    error::{Error as NomError, ErrorKind, ParseError},
    Finish, IResult, Offset,
};
use thiserror::Error;

pub use layout::{Layout, LayoutLoader};
pub use rules::{Rule, RuleSet, RulesLoader};

/// Reports where a configuration text stopped making sense.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("line {line}: {} at {snippet:?}", .kind.description())]
    Syntax {
        line: usize,
        snippet: String,
        kind: ErrorKind,
    },
}

impl LoadError {
    /// Locates `err` inside `content`.
    pub fn locate(content: &str, err: NomError<&str>) -> Self {
        let offset = content.offset(err.input).min(content.len());
        let line = content[..offset].matches('\n').count() + 1;
        let snippet = err.input.lines().next().unwrap_or_default().trim().to_owned();
        LoadError::Syntax {
            line,
            snippet,
            kind: err.code,
        }
    }

    pub fn line(&self) -> usize {
        match self {
            LoadError::Syntax { line, .. } => *line,
        }
    }
}

/// A [ConfigLoader] parses one configuration format into its in-memory form.
///
/// ***The trait and the format are manufacture-specific.***
pub trait ConfigLoader {
    type Output;

    // Required method
    fn _load<'x, Err: ParseError<&'x str>>(
        &self,
        content: &'x str,
    ) -> IResult<(), Self::Output, Err>;

    // Provided method
    fn load(&self, content: &str) -> Result<Self::Output, LoadError> {
        match self._load(content).finish() {
            Ok((_, out)) => Ok(out),
            Err(e) => Err(LoadError::locate(content, e)),
        }
    }
}

/// Basics for io
pub mod basic {
    /// Basic helper functions for parsing
    pub mod parser {
        use nom::branch::alt;
        use nom::bytes::complete::{tag, tag_no_case, take_while1};
        use nom::character::complete::{
            char, digit1, hex_digit1, line_ending, multispace1, not_line_ending, space0, space1,
        };
        use nom::combinator::{eof, opt, recognize, value};
        use nom::error::{ErrorKind, ParseError};
        use nom::multi::many0_count;
        use nom::sequence::{pair, preceded, tuple};
        use nom::Err::Error;
        use nom::IResult;

        fn is_ident(chr: char) -> bool {
            chr.is_ascii_alphanumeric() || chr == '_' || chr == '-' || chr == '.'
        }

        /// r"[a-zA-Z0-9_\-\.]+"
        pub fn parse_ident<'a, E: ParseError<&'a str>>(
            input: &'a str,
        ) -> IResult<&'a str, &'a str, E> {
            take_while1(is_ident)(input)
        }

        /// r"0x[0-9a-fA-F]+|[0-9]+", at most u32::MAX
        pub fn parse_u32<'a, E: ParseError<&'a str>>(input: &'a str) -> IResult<&'a str, u32, E> {
            if let Ok((rest, digits)) = preceded(tag_no_case::<_, _, E>("0x"), hex_digit1)(input) {
                return match u32::from_str_radix(digits, 16) {
                    Ok(num) => Ok((rest, num)),
                    Err(_) => Err(Error(E::from_error_kind(input, ErrorKind::HexDigit))),
                };
            }
            let (rest, digits) = digit1(input)?;
            match digits.parse::<u32>() {
                Ok(num) => Ok((rest, num)),
                Err(_) => Err(Error(E::from_error_kind(input, ErrorKind::Digit))),
            }
        }

        /// r"#[^\n]*"
        pub fn parse_comment<'a, E: ParseError<&'a str>>(
            input: &'a str,
        ) -> IResult<&'a str, &'a str, E> {
            recognize(pair(char('#'), not_line_ending))(input)
        }

        /// Skips whitespace, blank lines and comments.
        pub fn skip_blank<'a, E: ParseError<&'a str>>(input: &'a str) -> IResult<&'a str, (), E> {
            value((), many0_count(alt((multispace1, parse_comment))))(input)
        }

        /// Trailing spaces, an optional comment, then a line ending or the end of input.
        pub fn end_of_line<'a, E: ParseError<&'a str>>(input: &'a str) -> IResult<&'a str, (), E> {
            value(
                (),
                tuple((space0, opt(parse_comment), alt((line_ending, eof)))),
            )(input)
        }

        /// `<keyword> <arg>`, the keyword followed by at least one space.
        pub fn keyword<'a, E: ParseError<&'a str>>(
            word: &'static str,
        ) -> impl FnMut(&'a str) -> IResult<&'a str, (), E> {
            value((), pair(tag(word), space1))
        }
    }
}

#[allow(missing_docs)]
pub mod prelude {
    #[doc(hidden)]
    pub use crate::{ConfigLoader, Layout, LayoutLoader, LoadError, Rule, RuleSet, RulesLoader};
}

#[cfg(test)]
mod tests {
    use super::basic::parser::*;
    use super::*;

    type E<'a> = NomError<&'a str>;

    #[test]
    fn test_parse_u32() {
        assert_eq!(parse_u32::<E>("42 rest"), Ok((" rest", 42)));
        assert_eq!(parse_u32::<E>("0x20A3"), Ok(("", 0x20A3)));
        assert_eq!(parse_u32::<E>("0X1f"), Ok(("", 0x1F)));
        assert!(parse_u32::<E>("4294967296").is_err());
        assert!(parse_u32::<E>("x1").is_err());
    }

    #[test]
    fn test_skip_blank() {
        let input = "  # heading\n\n\t# more\n  table 1";
        assert_eq!(skip_blank::<E>(input), Ok(("table 1", ())));
        assert_eq!(skip_blank::<E>("table"), Ok(("table", ())));
    }

    #[test]
    fn test_end_of_line() {
        assert_eq!(end_of_line::<E>("  # note\nnext"), Ok(("next", ())));
        assert_eq!(end_of_line::<E>(""), Ok(("", ())));
        assert!(end_of_line::<E>(" junk\n").is_err());
    }

    #[test]
    fn test_locate() {
        let content = "table 1\nbin a 0 10\nbin b x 20\n";
        let at = content.find('x').unwrap();
        let err = LoadError::locate(content, NomError::new(&content[at..], ErrorKind::Digit));
        assert_eq!(err.line(), 3);
        assert_eq!(
            err,
            LoadError::Syntax {
                line: 3,
                snippet: "x 20".to_owned(),
                kind: ErrorKind::Digit,
            }
        );
    }
}
