// String generation for the conjecture-spec library.
// Strings are drawn length-first so that shrinking the length choice drops
// trailing characters, and every character is a single integer choice into
// the alphabet so that characters shrink towards the start of the alphabet.

use crate::data::{ConjectureData, DrawError};
use regex_syntax::hir::{Class, Hir, HirKind};

type Draw<T> = Result<T, DrawError>;

/// Extra repetitions drawn for an unbounded `*` or `+`.
const MAX_UNBOUNDED_REPEAT: u32 = 8;

/// Lowercase letters first so that strings shrink towards "a".
pub const ALPHANUMERIC: &[(char, char)] = &[('a', 'z'), ('A', 'Z'), ('0', '9')];

/// Draw one character from a union of inclusive ranges.
pub fn draw_char(data: &mut ConjectureData, ranges: &[(char, char)]) -> Draw<char> {
    let total: i128 = ranges
        .iter()
        .map(|(start, end)| i128::from(*end as u32) - i128::from(*start as u32) + 1)
        .sum();
    if total <= 0 {
        return Err(DrawError::EmptyChoice);
    }

    let mut index = data.draw_integer(0, total - 1, 0)?;
    for (start, end) in ranges {
        let size = i128::from(*end as u32) - i128::from(*start as u32) + 1;
        if index < size {
            let code = *start as u32 + index as u32;
            // Ranges may span the surrogate gap
            return Ok(char::from_u32(code).unwrap_or(*start));
        }
        index -= size;
    }
    Ok(ranges[0].0)
}

/// Draw a string of `min_size..=max_size` characters from `ranges`.
pub fn draw_string(
    data: &mut ConjectureData,
    ranges: &[(char, char)],
    min_size: usize,
    max_size: usize,
) -> Draw<String> {
    let len = data.draw_integer(min_size as i128, max_size as i128, min_size as i128)?;
    let mut out = String::with_capacity(len as usize);
    for _ in 0..len {
        out.push(draw_char(data, ranges)?);
    }
    Ok(out)
}

/// Draw a string matched by the parsed pattern `hir`.
///
/// Anchors and other look-around assertions produce nothing, so the
/// generated string matches the pattern under an unanchored search.
pub fn draw_from_pattern(data: &mut ConjectureData, hir: &Hir, out: &mut String) -> Draw<()> {
    match hir.kind() {
        HirKind::Empty | HirKind::Look(_) => Ok(()),
        HirKind::Literal(literal) => {
            out.push_str(&String::from_utf8_lossy(&literal.0));
            Ok(())
        }
        HirKind::Class(Class::Unicode(class)) => {
            let ranges: Vec<(char, char)> = class.ranges().iter().map(|r| (r.start(), r.end())).collect();
            out.push(draw_char(data, &ranges)?);
            Ok(())
        }
        HirKind::Class(Class::Bytes(class)) => {
            let ranges: Vec<(char, char)> = class
                .ranges()
                .iter()
                .filter(|r| r.start() < 0x80)
                .map(|r| (char::from(r.start()), char::from(r.end().min(0x7f))))
                .collect();
            out.push(draw_char(data, &ranges)?);
            Ok(())
        }
        HirKind::Repetition(rep) => {
            let max = rep
                .max
                .unwrap_or(rep.min + MAX_UNBOUNDED_REPEAT)
                .min(rep.min + MAX_UNBOUNDED_REPEAT);
            let count = data.draw_integer(i128::from(rep.min), i128::from(max), i128::from(rep.min))?;
            for _ in 0..count {
                draw_from_pattern(data, &rep.sub, out)?;
            }
            Ok(())
        }
        HirKind::Capture(capture) => draw_from_pattern(data, &capture.sub, out),
        HirKind::Concat(parts) => {
            for part in parts {
                draw_from_pattern(data, part, out)?;
            }
            Ok(())
        }
        HirKind::Alternation(branches) => {
            let index = data.draw_integer(0, branches.len() as i128 - 1, 0)?;
            draw_from_pattern(data, &branches[index as usize], out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    #[test]
    fn test_draw_string_respects_alphabet_and_size() {
        let mut data = ConjectureData::new(11);
        for _ in 0..50 {
            let s = draw_string(&mut data, ALPHANUMERIC, 2, 6).unwrap();
            let n = s.chars().count();
            assert!((2..=6).contains(&n));
            assert!(s.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn test_simplest_string_is_minimal() {
        let mut data = ConjectureData::for_choices(&[]);
        assert_eq!(draw_string(&mut data, ALPHANUMERIC, 3, 10).unwrap(), "aaa");
    }

    #[test]
    fn test_pattern_strings_match() {
        let patterns = [
            r"^[a-z]+@[a-z]+\.(com|org)$",
            r"\d{3}-\d{4}",
            r"^(foo|bar)baz?$",
            r"x[^abc]y",
        ];
        for pattern in patterns {
            let hir = regex_syntax::Parser::new().parse(pattern).unwrap();
            let re = Regex::new(pattern).unwrap();
            for seed in 0..25 {
                let mut data = ConjectureData::new(seed);
                let mut s = String::new();
                draw_from_pattern(&mut data, &hir, &mut s).unwrap();
                assert!(re.is_match(&s), "{:?} does not match {}", s, pattern);
            }
        }
    }
}
