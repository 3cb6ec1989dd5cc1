//! Word-level tokenizing of G-code lines.

/// A single address word such as `G1` or `X-12.5`.
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    /// Upper-case address letter.
    pub letter: char,
    /// Numeric value.
    pub value: f64,
    /// Word as written, letter upper-cased.
    pub text: String,
}

/// Split a line into its code part and its comments.
///
/// Parenthesized comments may appear anywhere; a `;` comment runs to the end
/// of the line. Comments keep their delimiters so they can be written back.
pub fn split_comments(line: &str) -> Result<(String, Vec<String>), String> {
    let mut code = String::with_capacity(line.len());
    let mut comments = Vec::new();
    let mut rest = line;

    while let Some(pos) = rest.find(|c: char| c == '(' || c == ';') {
        code.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if tail.starts_with(';') {
            comments.push(tail.trim_end().to_string());
            rest = "";
            break;
        }
        let close = tail
            .find(')')
            .ok_or_else(|| "unclosed comment".to_string())?;
        comments.push(tail[..=close].to_string());
        code.push(' ');
        rest = &tail[close + 1..];
    }
    code.push_str(rest);

    Ok((code, comments))
}

/// Split the code part of a line into words.
pub fn tokenize(code: &str) -> Result<Vec<Word>, String> {
    let chars: Vec<char> = code.chars().collect();
    let mut words = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if !c.is_ascii_alphabetic() {
            return Err(format!("unexpected character '{}'", c));
        }
        let letter = c.to_ascii_uppercase();
        i += 1;

        // Whitespace between letter and value is legal
        while i < chars.len() && chars[i].is_whitespace() {
            i += 1;
        }

        let start = i;
        if i < chars.len() && (chars[i] == '+' || chars[i] == '-') {
            i += 1;
        }
        while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
            i += 1;
        }

        let number: String = chars[start..i].iter().collect();
        if !number.chars().any(|c| c.is_ascii_digit()) {
            return Err(format!("missing value for '{}'", letter));
        }
        let value: f64 = number
            .parse()
            .map_err(|_| format!("invalid number '{}' for '{}'", number, letter))?;

        words.push(Word {
            letter,
            value,
            text: format!("{}{}", letter, number),
        });
    }

    Ok(words)
}

/// Remove a leading `N` word from a line.
pub fn strip_line_number(line: &str) -> &str {
    let trimmed = line.trim_start();
    let mut chars = trimmed.char_indices().peekable();
    match chars.next() {
        Some((_, 'N')) | Some((_, 'n')) => {}
        _ => return trimmed,
    }
    let mut end = trimmed.len();
    let mut seen_digit = false;
    for (idx, c) in chars {
        if c.is_ascii_digit() || c == '.' {
            seen_digit = true;
        } else if !(c.is_whitespace() && !seen_digit) {
            end = idx;
            break;
        }
    }
    trimmed[end..].trim_start()
}

/// Scan a comment for a numeric annotation introduced by one of `keys`.
///
/// Keys must start a word; an optional `=` or `:` may follow. Matching is
/// case-insensitive.
pub fn scan_annotation(comment: &str, keys: &[&str]) -> Option<f64> {
    let upper = comment.to_ascii_uppercase();
    for key in keys {
        let mut from = 0;
        while let Some(found) = upper[from..].find(key) {
            let pos = from + found;
            from = pos + key.len();

            let at_word_start = upper[..pos]
                .chars()
                .next_back()
                .map_or(true, |c| !c.is_ascii_alphanumeric());
            if !at_word_start {
                continue;
            }

            let rest = upper[from..].trim_start();
            let rest = rest
                .strip_prefix('=')
                .or_else(|| rest.strip_prefix(':'))
                .unwrap_or(rest)
                .trim_start();
            let number: String = rest
                .chars()
                .take_while(|c| c.is_ascii_digit() || *c == '.')
                .collect();
            if let Ok(value) = number.parse::<f64>() {
                return Some(value);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn letters(words: &[Word]) -> Vec<(char, f64)> {
        words.iter().map(|w| (w.letter, w.value)).collect()
    }

    // ==================== split_comments tests ====================

    #[test]
    fn test_split_no_comment() {
        let (code, comments) = split_comments("G1 X10").unwrap();
        assert_eq!(code, "G1 X10");
        assert!(comments.is_empty());
    }

    #[test]
    fn test_split_paren_and_semicolon() {
        let (code, comments) = split_comments("G1 (cut) X10 ; finish").unwrap();
        assert_eq!(code.split_whitespace().collect::<Vec<_>>(), vec!["G1", "X10"]);
        assert_eq!(comments, vec!["(cut)", "; finish"]);
    }

    #[test]
    fn test_split_semicolon_inside_paren() {
        let (_, comments) = split_comments("(a;b) G0").unwrap();
        assert_eq!(comments, vec!["(a;b)"]);
    }

    #[test]
    fn test_split_unclosed() {
        assert!(split_comments("G1 (oops X10").is_err());
    }

    // ==================== tokenize tests ====================

    #[test]
    fn test_tokenize_basic() {
        let words = tokenize("G1 X10 Z-2.5 F100").unwrap();
        assert_eq!(
            letters(&words),
            vec![('G', 1.0), ('X', 10.0), ('Z', -2.5), ('F', 100.0)]
        );
    }

    #[test]
    fn test_tokenize_packed_lowercase() {
        let words = tokenize("g01x.5z+3").unwrap();
        assert_eq!(letters(&words), vec![('G', 1.0), ('X', 0.5), ('Z', 3.0)]);
        assert_eq!(words[0].text, "G01");
        assert_eq!(words[1].text, "X.5");
    }

    #[test]
    fn test_tokenize_space_after_letter() {
        let words = tokenize("X 12").unwrap();
        assert_eq!(letters(&words), vec![('X', 12.0)]);
    }

    #[test]
    fn test_tokenize_missing_value() {
        assert!(tokenize("G1 X").is_err());
        assert!(tokenize("X-").is_err());
    }

    #[test]
    fn test_tokenize_bad_number() {
        assert!(tokenize("X1.2.3").is_err());
    }

    #[test]
    fn test_tokenize_bad_character() {
        assert!(tokenize("G1 #5").is_err());
    }

    // ==================== strip_line_number tests ====================

    #[test]
    fn test_strip_line_number() {
        assert_eq!(strip_line_number("N10 G1 X5"), "G1 X5");
        assert_eq!(strip_line_number("n 20 G0"), "G0");
        assert_eq!(strip_line_number("G1 X5"), "G1 X5");
    }

    // ==================== scan_annotation tests ====================

    #[test]
    fn test_scan_annotation_forms() {
        let keys = ["DIAMETER", "CD", "D"];
        assert_eq!(scan_annotation("(TOOL D=6)", &keys), Some(6.0));
        assert_eq!(scan_annotation("(diameter: 3.175)", &keys), Some(3.175));
        assert_eq!(scan_annotation("(CD6.35 endmill)", &keys), Some(6.35));
        assert_eq!(scan_annotation("(END5)", &keys), None);
        assert_eq!(scan_annotation("(no tool info)", &keys), None);
    }
}
