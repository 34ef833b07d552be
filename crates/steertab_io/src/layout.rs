use fxhash::FxBuildHasher;
use indexmap::IndexMap;
use nom::{
    character::complete::space1,
    combinator::{all_consuming, opt},
    error::{ErrorKind, ParseError},
    multi::many0,
    sequence::{delimited, preceded, terminated, tuple},
    Err::Failure,
    IResult,
};
use tracing::debug;

use steertab_bank::TableId;
use steertab_core::table::{BinRange, EncodingMode};

use crate::{
    basic::parser::{end_of_line, keyword, parse_ident, parse_u32, skip_blank},
    ConfigLoader,
};

/// Named bins of one table, in declaration order. A bin's index is its position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub table: TableId,
    pub mode: EncodingMode,
    bins: IndexMap<String, BinRange, FxBuildHasher>,
}

impl Layout {
    pub fn new(table: TableId, mode: EncodingMode) -> Self {
        Layout {
            table,
            mode,
            bins: IndexMap::default(),
        }
    }

    /// Adds a bin. Returns its index, or `None` if the name is taken.
    pub fn push(&mut self, name: &str, range: BinRange) -> Option<usize> {
        if self.bins.contains_key(name) {
            return None;
        }
        let (idx, _) = self.bins.insert_full(name.to_owned(), range);
        Some(idx)
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn bin_index(&self, name: &str) -> Option<usize> {
        self.bins.get_index_of(name)
    }

    pub fn bin_name(&self, idx: usize) -> Option<&str> {
        self.bins.get_index(idx).map(|(name, _)| name.as_str())
    }

    /// Ranges indexed by bin, ready for the table constructor.
    pub fn ranges(&self) -> Vec<BinRange> {
        self.bins.values().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BinRange)> {
        self.bins.iter().map(|(name, range)| (name.as_str(), range))
    }
}

/// Loads `.layout` files:
///
/// ```text
/// table <id>
/// mode exclusive|bitmask        # optional, exclusive by default
/// bin <name> <min> <max>        # one per bin, permille
/// ```
#[derive(Default)]
pub struct LayoutLoader {}

impl ConfigLoader for LayoutLoader {
    type Output = Layout;

    fn _load<'x, E: ParseError<&'x str>>(&self, content: &'x str) -> IResult<(), Layout, E> {
        let (rest, table) = delimited(skip_blank, parse_table, end_of_line)(content)?;
        let (rest, mode) = opt(delimited(skip_blank, parse_mode, end_of_line))(rest)?;
        let (rest, bins) = many0(preceded(skip_blank, terminated(parse_bin, end_of_line)))(rest)?;
        let (_, _) = all_consuming(skip_blank)(rest)?;

        let mut layout = Layout::new(table, mode.unwrap_or_default());
        for (name, range) in bins {
            if layout.push(name, range).is_none() {
                return Err(Failure(E::from_error_kind(name, ErrorKind::Verify)));
            }
        }
        debug!(table, mode = %layout.mode, bins = layout.len(), "layout loaded");
        Ok(((), layout))
    }
}

pub(crate) fn parse_table<'a, E: ParseError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, TableId, E> {
    preceded(keyword("table"), parse_u32)(input)
}

fn parse_mode<'a, E: ParseError<&'a str>>(input: &'a str) -> IResult<&'a str, EncodingMode, E> {
    let (rest, name) = preceded(keyword("mode"), parse_ident)(input)?;
    match [EncodingMode::Exclusive, EncodingMode::Bitmask]
        .into_iter()
        .find(|mode| mode.name() == name)
    {
        Some(mode) => Ok((rest, mode)),
        None => Err(Failure(E::from_error_kind(name, ErrorKind::Tag))),
    }
}

fn parse_bin<'a, E: ParseError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, (&'a str, BinRange), E> {
    let (rest, (name, _, min, _, max)) = preceded(
        keyword("bin"),
        tuple((parse_ident, space1, parse_u32, space1, parse_u32)),
    )(input)?;
    Ok((rest, (name, BinRange::new(min, max))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LoadError;

    #[test]
    fn test_load_layout() {
        let content = r#"
        # two streams
        table 3
        mode bitmask
        bin web 0 250      # interactive
        bin bulk 250 1000
        bin spare 0 0
        "#;
        let layout = LayoutLoader::default().load(content).unwrap();
        assert_eq!(layout.table, 3);
        assert_eq!(layout.mode, EncodingMode::Bitmask);
        assert_eq!(layout.len(), 3);
        assert_eq!(layout.bin_index("bulk"), Some(1));
        assert_eq!(layout.bin_name(2), Some("spare"));
        assert_eq!(
            layout.ranges(),
            vec![
                BinRange::new(0, 250),
                BinRange::new(250, 1000),
                BinRange::UNUSED
            ]
        );
    }

    #[test]
    fn test_default_mode() {
        let layout = LayoutLoader::default()
            .load("table 0x10\nbin a 0 1000\n")
            .unwrap();
        assert_eq!(layout.table, 16);
        assert_eq!(layout.mode, EncodingMode::Exclusive);
        assert_eq!(layout.iter().next(), Some(("a", &BinRange::new(0, 1000))));
    }

    #[test]
    fn test_duplicate_bin() {
        let content = "table 1\nbin a 0 10\nbin b 10 20\nbin a 20 30\n";
        let err = LayoutLoader::default().load(content).unwrap_err();
        assert_eq!(
            err,
            LoadError::Syntax {
                line: 4,
                snippet: "a 20 30".to_owned(),
                kind: ErrorKind::Verify,
            }
        );
    }

    #[test]
    fn test_errors_point_at_line() {
        let loader = LayoutLoader::default();
        assert_eq!(loader.load("table 1\nbin a 0 x\n").unwrap_err().line(), 2);
        assert_eq!(loader.load("table 1\nmode striped\n").unwrap_err().line(), 2);
        assert_eq!(
            loader
                .load("table 1\nbin a 0 10\n\nbin b 20\n")
                .unwrap_err()
                .line(),
            4
        );
        assert_eq!(loader.load("table 1 2\n").unwrap_err().line(), 1);
        assert_eq!(loader.load("bin a 0 10\n").unwrap_err().line(), 1);
    }
}
