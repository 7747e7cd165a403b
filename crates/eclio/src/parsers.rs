//! Library of parser functions for the formatted (ASCII) file mode
//!
//! The formatted variant carries the same logical structure as the binary
//! files: a header line `'NAME    '  COUNT 'TYPE'` followed by
//! whitespace-delimited values in type-specific Fortran list layouts.

// crate modules
use crate::error::{Error, Result};
use crate::keyword::KeywordType;

// ecltools modules
use ecltools_utils::f;

// nom parser combinators
use nom::branch::alt;
use nom::bytes::complete::take;
use nom::character::complete::{char, digit0, digit1, one_of, space0, space1};
use nom::combinator::{map, map_opt, map_res, opt, recognize};
use nom::multi::many1;
use nom::sequence::{delimited, pair, preceded, tuple};
use nom::IResult;

/// A quoted fixed-width field, e.g. `'ZCORN   '`
fn quoted(width: usize) -> impl Fn(&str) -> IResult<&str, &str> {
    move |i| delimited(char('\''), take(width), char('\''))(i)
}

/// Signed decimal integer
fn int_value(i: &str) -> IResult<&str, i32> {
    map_res(recognize(pair(opt(one_of("+-")), digit1)), str::parse)(i)
}

/// Signed integer wide enough for a (possibly corrupt) count field
fn count_value(i: &str) -> IResult<&str, i64> {
    map_res(recognize(pair(opt(one_of("+-")), digit1)), str::parse)(i)
}

/// Fortran real, accepting both `E` and `D` exponent characters
fn real_value(i: &str) -> IResult<&str, f64> {
    map_res(
        recognize(tuple((
            opt(one_of("+-")),
            alt((
                recognize(tuple((digit1, opt(pair(char('.'), digit0))))),
                recognize(pair(char('.'), digit1)),
            )),
            opt(tuple((one_of("EeDd"), opt(one_of("+-")), digit1))),
        ))),
        |text: &str| text.replace(['D', 'd'], "E").parse::<f64>(),
    )(i)
}

/// Logical as the single characters `T` or `F`
fn logical_value(i: &str) -> IResult<&str, bool> {
    map(one_of("TF"), |c| c == 'T')(i)
}

/// The textual record header line
///
/// Returns the raw count so the caller can flag negative values as corrupt
/// rather than silently failing the parse.
pub(crate) fn header_line(line: &str) -> Result<(String, i64, KeywordType)> {
    let parsed = tuple((
        space0,
        quoted(8usize),
        space1,
        count_value,
        space1,
        map_opt(quoted(4usize), |tag: &str| {
            KeywordType::from_tag(tag.as_bytes())
        }),
    ))(line);
    match parsed {
        Ok((rest, (_, name, _, count, _, ktype))) if rest.trim().is_empty() => {
            Ok((name.trim_end().to_string(), count, ktype))
        }
        _ => Err(Error::ParseError(f!("not a record header: \"{line}\""))),
    }
}

fn finish<T>(parsed: IResult<&str, Vec<T>>, line: &str) -> Result<Vec<T>> {
    match parsed {
        Ok((rest, values)) if rest.trim().is_empty() => Ok(values),
        _ => Err(Error::ParseError(f!("could not parse values: \"{line}\""))),
    }
}

/// All `INTE` values on one line
pub(crate) fn int_line(line: &str) -> Result<Vec<i32>> {
    finish(many1(preceded(space0, int_value))(line), line)
}

/// All `REAL`/`DOUB` values on one line
pub(crate) fn real_line(line: &str) -> Result<Vec<f64>> {
    finish(many1(preceded(space0, real_value))(line), line)
}

/// All `LOGI` values on one line
pub(crate) fn logical_line(line: &str) -> Result<Vec<bool>> {
    finish(many1(preceded(space0, logical_value))(line), line)
}

/// All quoted `CHAR` values on one line, trailing padding trimmed
pub(crate) fn char_line(line: &str) -> Result<Vec<String>> {
    finish(
        many1(preceded(space0, map(quoted(8usize), |s: &str| {
            s.trim_end().to_string()
        })))(line),
        line,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_line_parses_padded_fields() {
        let (name, count, ktype) =
            header_line(" 'INTEHEAD'         411 'INTE'").unwrap();
        assert_eq!(name, "INTEHEAD");
        assert_eq!(count, 411);
        assert_eq!(ktype, KeywordType::Integer);
    }

    #[test]
    fn header_line_keeps_negative_counts_for_the_caller() {
        let (_, count, _) = header_line(" 'BROKEN  '          -4 'REAL'").unwrap();
        assert_eq!(count, -4);
    }

    #[test]
    fn header_line_rejects_unknown_tags() {
        assert!(header_line(" 'INTEHEAD'         411 'XXXX'").is_err());
        assert!(header_line("   0.25000000E+00").is_err());
    }

    #[test]
    fn real_line_accepts_d_exponents() {
        let values = real_line("  0.10000000000000D+01 -0.25000000D-01").unwrap();
        assert_eq!(values, vec![1.0, -0.025]);
    }

    #[test]
    fn logical_and_char_lines() {
        assert_eq!(logical_line("  T  F  T").unwrap(), vec![true, false, true]);
        assert_eq!(
            char_line(" 'OP 1    ' '        '").unwrap(),
            vec!["OP 1".to_string(), String::new()]
        );
    }
}
