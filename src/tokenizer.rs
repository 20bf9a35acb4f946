//! Quote-aware key=value tokenizer and row-prefix helpers.
//!
//! One tokenizer serves terse, detail and export output; call sites differ
//! only in the record delimiter and the accepted quote characters.

use crate::types::TableFlags;

/// Separator between key=value pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    /// Any whitespace character.
    Whitespace,
    Char(char),
}

impl Delimiter {
    fn matches(&self, ch: char) -> bool {
        match self {
            Delimiter::Whitespace => ch.is_whitespace(),
            Delimiter::Char(d) => ch == *d,
        }
    }
}

/// Parametrized key=value tokenizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tokenizer {
    delimiter: Delimiter,
    quotes: &'static [char],
}

/// `/print terse`: `;` between pairs, single or double quotes.
pub const TERSE: Tokenizer = Tokenizer::new(Delimiter::Char(';'), &['"', '\'']);

/// `/print detail`: whitespace between pairs, single or double quotes.
pub const DETAIL: Tokenizer = Tokenizer::new(Delimiter::Whitespace, &['"', '\'']);

/// `/export`: whitespace between pairs, double quotes only.
pub const EXPORT: Tokenizer = Tokenizer::new(Delimiter::Whitespace, &['"']);

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
    Key,
    Value,
}

impl Tokenizer {
    pub const fn new(delimiter: Delimiter, quotes: &'static [char]) -> Self {
        Self { delimiter, quotes }
    }

    /// Splits `input` into ordered (key, value) pairs.
    ///
    /// The first unquoted `=` separates key from value; later ones are value
    /// content. Quote characters are not kept. A bare token without `=`
    /// yields a pair with an empty value. Pairs with an empty key are dropped.
    pub fn pairs(&self, input: &str) -> Vec<(String, String)> {
        let mut out = Vec::new();
        let mut key = String::new();
        let mut value = String::new();
        let mut state = State::Key;
        let mut quote: Option<char> = None;

        for ch in input.chars() {
            if let Some(open) = quote {
                if ch == open {
                    quote = None;
                } else if state == State::Key {
                    key.push(ch);
                } else {
                    value.push(ch);
                }
                continue;
            }

            if self.quotes.contains(&ch) {
                quote = Some(ch);
            } else if self.delimiter.matches(ch) {
                flush(&mut out, &mut key, &mut value);
                state = State::Key;
            } else if ch == '=' && state == State::Key {
                state = State::Value;
            } else if state == State::Key {
                key.push(ch);
            } else {
                value.push(ch);
            }
        }
        flush(&mut out, &mut key, &mut value);

        out
    }
}

fn flush(out: &mut Vec<(String, String)>, key: &mut String, value: &mut String) {
    let k = key.trim();
    if !k.is_empty() {
        out.push((k.to_string(), value.trim().to_string()));
    }
    key.clear();
    value.clear();
}

/// Leading indentation width; a tab counts as four columns.
pub fn indentation(line: &str) -> usize {
    line.chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

/// True for `Flags: X - disabled, R - running` legend lines.
pub fn is_flag_legend(line: &str) -> bool {
    line.trim_start().starts_with("Flags:")
}

/// Letters that may appear in the flag column of a row.
pub fn is_row_flag(ch: char) -> bool {
    matches!(
        ch,
        'X' | 'R' | 'D' | 'I' | 'A' | 'C' | 'S' | 'H' | 'P' | 'B' | 'M' | 'L' | 'E'
    )
}

/// Row number and flags at the start of a table or detail row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowPrefix<'a> {
    pub number: Option<&'a str>,
    pub flags: TableFlags,
    /// Remainder of the line after the prefix, leading whitespace removed.
    pub rest: &'a str,
}

/// Splits `line` into row number, flag letters and the remaining data.
///
/// Flag letters are only taken as a whole whitespace-terminated run, so a
/// value such as `RB4011` is never read as flags.
pub fn split_row_prefix(line: &str) -> RowPrefix<'_> {
    let mut rest = line.trim_start();

    let digits = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    let number = if digits > 0 {
        let (num, tail) = rest.split_at(digits);
        rest = tail.trim_start();
        Some(num)
    } else {
        None
    };

    let mut flags = String::new();
    loop {
        let run = rest.len() - rest.trim_start_matches(is_row_flag).len();
        if run == 0 {
            break;
        }
        let (letters, tail) = rest.split_at(run);
        match tail.chars().next() {
            None => {}
            Some(c) if c.is_whitespace() => {}
            Some(_) => break,
        }
        flags.push_str(letters);
        rest = tail.trim_start();
    }

    RowPrefix {
        number,
        flags: TableFlags::parse(&flags),
        rest,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(t: Tokenizer, input: &str) -> Vec<(String, String)> {
        t.pairs(input)
    }

    fn kv(k: &str, v: &str) -> (String, String) {
        (k.to_string(), v.to_string())
    }

    #[test]
    fn terse_line_with_quoted_spaces() {
        let got = pairs(TERSE, r#".id=*1;name="vpn with spaces";mtu=1420"#);
        assert_eq!(
            got,
            vec![kv(".id", "*1"), kv("name", "vpn with spaces"), kv("mtu", "1420")]
        );
    }

    #[test]
    fn second_equals_is_value_content() {
        let got = pairs(DETAIL, "script=a=b comment=x");
        assert_eq!(got, vec![kv("script", "a=b"), kv("comment", "x")]);
    }

    #[test]
    fn delimiter_inside_quotes_is_literal() {
        let got = pairs(TERSE, r#"comment="a;b";name='c d'"#);
        assert_eq!(got, vec![kv("comment", "a;b"), kv("name", "c d")]);
    }

    #[test]
    fn other_quote_char_inside_quotes_is_kept() {
        let got = pairs(DETAIL, r#"comment="it's fine""#);
        assert_eq!(got, vec![kv("comment", "it's fine")]);
    }

    #[test]
    fn export_tokenizer_keeps_single_quotes() {
        let got = pairs(EXPORT, "comment=it's name=x");
        assert_eq!(got, vec![kv("comment", "it's"), kv("name", "x")]);
    }

    #[test]
    fn repeated_delimiters_are_skipped_and_bare_tokens_kept() {
        let got = pairs(DETAIL, "   name=a    disabled   mtu=1  ");
        assert_eq!(got, vec![kv("name", "a"), kv("disabled", ""), kv("mtu", "1")]);
    }

    #[test]
    fn unterminated_quote_keeps_trailing_content() {
        let got = pairs(DETAIL, r#"name="broken value"#);
        assert_eq!(got, vec![kv("name", "broken value")]);
    }

    #[test]
    fn indentation_counts_tabs_as_four() {
        assert_eq!(indentation("    a=1"), 4);
        assert_eq!(indentation("\ta=1"), 4);
        assert_eq!(indentation(" \t a"), 6);
        assert_eq!(indentation("a"), 0);
    }

    #[test]
    fn row_prefix_with_number_and_flags() {
        let prefix = split_row_prefix(" 0 R vpn-usa   51820");
        assert_eq!(prefix.number, Some("0"));
        assert!(prefix.flags.running);
        assert_eq!(prefix.rest, "vpn-usa   51820");
    }

    #[test]
    fn row_prefix_ignores_flag_letters_inside_words() {
        let prefix = split_row_prefix("12 RB4011 ether1");
        assert_eq!(prefix.number, Some("12"));
        assert_eq!(prefix.flags.raw, "");
        assert_eq!(prefix.rest, "RB4011 ether1");
    }

    #[test]
    fn row_prefix_collects_separated_flag_groups() {
        let prefix = split_row_prefix(" 3 X  D name=foo");
        assert!(prefix.flags.disabled);
        assert!(prefix.flags.dynamic);
        assert_eq!(prefix.flags.raw, "XD");
        assert_eq!(prefix.rest, "name=foo");
    }

    #[test]
    fn row_prefix_without_number() {
        let prefix = split_row_prefix("name=foo");
        assert_eq!(prefix.number, None);
        assert_eq!(prefix.rest, "name=foo");
    }
}
