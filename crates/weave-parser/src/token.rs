use weave_core::ParseError;

/// Tokens of the pipeline script grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Ident(String),
    Str(String),
    Arrow,
    LBrace,
    RBrace,
    Newline,
}

impl Token {
    pub fn describe(&self) -> String {
        match self {
            Token::Ident(s) => s.clone(),
            Token::Str(s) => format!("\"{}\"", s),
            Token::Arrow => "->".to_string(),
            Token::LBrace => "{".to_string(),
            Token::RBrace => "}".to_string(),
            Token::Newline => "newline".to_string(),
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Read a quoted string starting after the opening quote. Supports
/// `\"`, `\\`, `\n`, `\t` escapes.
fn read_string(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    line: usize,
) -> Result<String, ParseError> {
    let mut out = String::new();
    loop {
        match chars.next() {
            None => return Err(ParseError::UnterminatedString { line }),
            Some('"') => return Ok(out),
            Some('\\') => match chars.next() {
                Some('"') => out.push('"'),
                Some('\\') => out.push('\\'),
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => return Err(ParseError::UnterminatedString { line }),
            },
            Some('\n') => return Err(ParseError::UnterminatedString { line }),
            Some(c) => out.push(c),
        }
    }
}

/// One-pass tokenizer. Line comments (`//`, `#`) run to end of line;
/// consecutive newlines collapse to one.
pub fn tokenize(src: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = src.chars().peekable();
    let mut line = 1usize;

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' | '\r' => {
                chars.next();
            }
            '\n' => {
                chars.next();
                line += 1;
                if !tokens.is_empty() && tokens.last() != Some(&Token::Newline) {
                    tokens.push(Token::Newline);
                }
            }
            '#' => {
                while let Some(&c) = chars.peek() {
                    if c == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            '/' => {
                chars.next();
                if chars.peek() == Some(&'/') {
                    while let Some(&c) = chars.peek() {
                        if c == '\n' {
                            break;
                        }
                        chars.next();
                    }
                } else {
                    return Err(ParseError::ExpectedToken {
                        expected: "'//' comment",
                        found: "/".to_string(),
                    });
                }
            }
            '-' => {
                chars.next();
                if chars.peek() == Some(&'>') {
                    chars.next();
                    tokens.push(Token::Arrow);
                } else {
                    return Err(ParseError::ExpectedToken {
                        expected: "'->'",
                        found: "-".to_string(),
                    });
                }
            }
            '{' => {
                chars.next();
                tokens.push(Token::LBrace);
            }
            '}' => {
                chars.next();
                tokens.push(Token::RBrace);
            }
            '"' => {
                chars.next();
                tokens.push(Token::Str(read_string(&mut chars, line)?));
            }
            c if is_ident_char(c) => {
                let mut ident = String::new();
                while let Some(&c) = chars.peek() {
                    if !is_ident_char(c) {
                        break;
                    }
                    ident.push(c);
                    chars.next();
                }
                tokens.push(Token::Ident(ident));
            }
            other => {
                return Err(ParseError::ExpectedToken {
                    expected: "a command, string, or operator",
                    found: other.to_string(),
                });
            }
        }
    }

    // A trailing newline token carries no information
    if tokens.last() == Some(&Token::Newline) {
        tokens.pop();
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_tokens() {
        let t = tokenize("search \"rust\" -> summarize").unwrap();
        assert_eq!(
            t,
            vec![
                Token::Ident("search".into()),
                Token::Str("rust".into()),
                Token::Arrow,
                Token::Ident("summarize".into()),
            ]
        );
    }

    #[test]
    fn test_comments_stripped() {
        let t = tokenize("// header\nsearch \"x\" # trailing\n").unwrap();
        assert_eq!(t, vec![Token::Ident("search".into()), Token::Str("x".into())]);
    }

    #[test]
    fn test_string_escapes() {
        let t = tokenize(r#"echo "a \"b\" \n c""#).unwrap();
        assert_eq!(
            t,
            vec![Token::Ident("echo".into()), Token::Str("a \"b\" \n c".into())]
        );
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize("\nsearch \"oops").unwrap_err();
        assert_eq!(err, ParseError::UnterminatedString { line: 2 });
    }

    #[test]
    fn test_collapses_blank_lines() {
        let t = tokenize("a\n\n\nb").unwrap();
        assert_eq!(
            t,
            vec![
                Token::Ident("a".into()),
                Token::Newline,
                Token::Ident("b".into()),
            ]
        );
    }

    #[test]
    fn test_lone_dash_rejected() {
        assert!(matches!(
            tokenize("a - b"),
            Err(ParseError::ExpectedToken { .. })
        ));
    }
}
