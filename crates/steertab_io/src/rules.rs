use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::space1,
    combinator::{all_consuming, map, opt},
    error::{ErrorKind, ParseError},
    multi::many0,
    sequence::{delimited, pair, preceded, terminated, tuple},
    Err::Failure,
    IResult,
};
use tracing::debug;

use steertab_bank::{BankedTable, Device, EntryConfig, ReadBack, Settle, TableId};
use steertab_core::{
    classify::{ClassificationKey, ClassificationMode},
    Result,
};

use crate::{
    basic::parser::{end_of_line, keyword, parse_ident, parse_u32, skip_blank},
    layout::parse_table,
    ConfigLoader,
};

/// One steering rule: where traffic of a key, or of a raw table address, goes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Rule {
    Entry {
        key: ClassificationKey,
        destination: u32,
    },
    Raw {
        address: u32,
        destination: u32,
    },
}

impl Rule {
    pub fn destination(&self) -> u32 {
        match self {
            Rule::Entry { destination, .. } | Rule::Raw { destination, .. } => *destination,
        }
    }

    /// Writes the rule to the inactive bank of `table` and reads it back.
    pub fn apply_verify<D: Device + ?Sized, S: Settle>(
        &self,
        table: &mut BankedTable<'_, D, S>,
    ) -> Result<ReadBack> {
        match *self {
            Rule::Entry { key, destination } => table.set_entry_verify(key, destination),
            Rule::Raw {
                address,
                destination,
            } => table.set_raw_entry_verify(address, destination),
        }
    }
}

/// Rules of one table and how its keys are laid out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuleSet {
    pub table: TableId,
    pub entry: EntryConfig,
    pub rules: Vec<Rule>,
}

/// Loads `.rules` files:
///
/// ```text
/// table <id>
/// classify <mode> [overwrite]                # optional, basic by default
/// entry <iface> <color> <hash> <destination>
/// raw <address> <destination>
/// ```
#[derive(Default)]
pub struct RulesLoader {}

impl ConfigLoader for RulesLoader {
    type Output = RuleSet;

    fn _load<'x, E: ParseError<&'x str>>(&self, content: &'x str) -> IResult<(), RuleSet, E> {
        let (rest, table) = delimited(skip_blank, parse_table, end_of_line)(content)?;
        let (rest, entry) = opt(delimited(skip_blank, parse_classify, end_of_line))(rest)?;
        let (rest, rules) = many0(preceded(
            skip_blank,
            terminated(alt((parse_entry, parse_raw)), end_of_line),
        ))(rest)?;
        let (_, _) = all_consuming(skip_blank)(rest)?;

        let entry = entry.unwrap_or_default();
        debug!(table, mode = %entry.mode, rules = rules.len(), "rules loaded");
        Ok((
            (),
            RuleSet {
                table,
                entry,
                rules,
            },
        ))
    }
}

fn parse_classify<'a, E: ParseError<&'a str>>(input: &'a str) -> IResult<&'a str, EntryConfig, E> {
    let (rest, (name, overwrite)) = preceded(
        keyword("classify"),
        pair(parse_ident, opt(preceded(space1, tag("overwrite")))),
    )(input)?;
    match ClassificationMode::ALL.into_iter().find(|mode| mode.name() == name) {
        Some(mode) => Ok((
            rest,
            EntryConfig {
                mode,
                interface_overwrite: overwrite.is_some(),
            },
        )),
        None => Err(Failure(E::from_error_kind(name, ErrorKind::Tag))),
    }
}

fn parse_entry<'a, E: ParseError<&'a str>>(input: &'a str) -> IResult<&'a str, Rule, E> {
    map(
        preceded(
            keyword("entry"),
            tuple((
                parse_u32, space1, parse_u32, space1, parse_u32, space1, parse_u32,
            )),
        ),
        |(iface, _, color, _, hash, _, destination)| Rule::Entry {
            key: ClassificationKey { iface, color, hash },
            destination,
        },
    )(input)
}

fn parse_raw<'a, E: ParseError<&'a str>>(input: &'a str) -> IResult<&'a str, Rule, E> {
    map(
        preceded(keyword("raw"), tuple((parse_u32, space1, parse_u32))),
        |(address, _, destination)| Rule::Raw {
            address,
            destination,
        },
    )(input)
}

#[cfg(test)]
mod tests {
    use steertab_bank::prelude::*;
    use steertab_core::{classify::TableGeometry, table::EncodingMode, SteerError};

    use super::*;

    #[test]
    fn test_load_rules() {
        let content = r#"
        table 2
        classify color_hash overwrite
        entry 2 10 3 5     # web
        raw 0x20a4 6
        "#;
        let set = RulesLoader::default().load(content).unwrap();
        assert_eq!(set.table, 2);
        assert_eq!(
            set.entry,
            EntryConfig {
                mode: ClassificationMode::ColorHash,
                interface_overwrite: true,
            }
        );
        assert_eq!(
            set.rules,
            vec![
                Rule::Entry {
                    key: ClassificationKey {
                        iface: 2,
                        color: 10,
                        hash: 3
                    },
                    destination: 5,
                },
                Rule::Raw {
                    address: 0x20A4,
                    destination: 6,
                },
            ]
        );
        assert_eq!(set.rules[1].destination(), 6);
    }

    #[test]
    fn test_default_classify() {
        let set = RulesLoader::default().load("table 0\nraw 1 1").unwrap();
        assert_eq!(set.entry, EntryConfig::default());
        assert_eq!(set.rules.len(), 1);
    }

    #[test]
    fn test_rule_errors() {
        let loader = RulesLoader::default();
        assert_eq!(
            loader
                .load("table 0\nclassify color_low\n")
                .unwrap_err()
                .line(),
            2
        );
        assert_eq!(
            loader
                .load("table 0\nentry 1 2 3\nraw 1 1\n")
                .unwrap_err()
                .line(),
            2
        );
        assert_eq!(
            loader
                .load("table 0\nraw 1 1\nclassify basic\n")
                .unwrap_err()
                .line(),
            3
        );
    }

    #[test]
    fn test_apply_rules() {
        let geo = TableGeometry {
            input_bits: 14,
            output_bits: 6,
            hash_bits: 4,
            color_bits: 8,
            interface_bits: 2,
        };
        let dev = SimDevice::new();
        dev.add_table(2, 0x200, geo, EncodingMode::Exclusive);
        let set = RulesLoader::default()
            .load("table 2\nclassify color_hash overwrite\nentry 2 10 3 5\nraw 0x20a4 99\n")
            .unwrap();
        let mut table = BankedTable::with_settle(&dev, set.table, set.entry, NoSettle).unwrap();

        let rb = set.rules[0].apply_verify(&mut table).unwrap();
        assert!(rb.is_match());
        assert_eq!(rb.address, 0x20A3 | 1 << 14);
        assert_eq!(table.get_raw_entry(Bank::One, 0x20A3).unwrap(), 5);

        assert!(matches!(
            set.rules[1].apply_verify(&mut table),
            Err(SteerError::InvalidDestination { value: 99, bits: 6 })
        ));
    }
}
