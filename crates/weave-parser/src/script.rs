use weave_core::{Node, NodeId, NodeKind, ParseError, Script};

use crate::token::{tokenize, Token};

/// Parse script text into a task graph.
///
/// Pure and deterministic: a script either parses completely or not at
/// all — no partial graph is ever returned.
pub fn parse(source: &str) -> Result<Script, ParseError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        next_id: 0,
    };

    let mut pipelines = Vec::new();
    parser.skip_newlines();
    while !parser.at_end() {
        pipelines.push(parser.parse_pipeline()?);
        match parser.peek() {
            None => break,
            Some(Token::Newline) => parser.skip_newlines(),
            Some(other) => {
                return Err(ParseError::ExpectedToken {
                    expected: "end of pipeline",
                    found: other.describe(),
                })
            }
        }
    }

    Ok(Script {
        source: source.to_string(),
        pipelines,
        node_count: parser.next_id,
    })
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    next_id: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&Token> {
        let t = self.tokens.get(self.pos);
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn skip_newlines(&mut self) {
        while self.eat(&Token::Newline) {}
    }

    fn node(&mut self, kind: NodeKind) -> Node {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        Node { id, kind }
    }

    fn peek_ident(&self, name: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(s)) if s == name)
    }

    /// pipeline := unit (`->` unit)* — pipes are left-associative.
    fn parse_pipeline(&mut self) -> Result<Node, ParseError> {
        let mut node = self.parse_unit()?;
        while self.eat(&Token::Arrow) {
            if self.peek_ident("merge") {
                self.advance();
                node = match self.try_close_group(node) {
                    Closed(closed) => closed,
                    Unchanged(_) => return Err(ParseError::DanglingMerge),
                };
                continue;
            }

            match self.peek() {
                None | Some(Token::Newline) | Some(Token::RBrace) => {
                    return Err(ParseError::MissingPipeRhs)
                }
                _ => {}
            }
            let consumer = self.parse_unit()?;
            // A parallel group piped into a consumer gets its merge point
            // inferred here.
            let producer = match self.try_close_group(node) {
                Closed(closed) => closed,
                Unchanged(original) => original,
            };
            node = self.node(NodeKind::Pipe {
                producer: Box::new(producer),
                consumer: Box::new(consumer),
            });
        }
        Ok(node)
    }

    /// unit := command | `parallel` `{` pipeline (newline pipeline)* `}`
    fn parse_unit(&mut self) -> Result<Node, ParseError> {
        match self.advance().cloned() {
            Some(Token::Ident(s)) if s == "parallel" => {
                if !self.eat(&Token::LBrace) {
                    return Err(ParseError::ExpectedToken {
                        expected: "'{' after 'parallel'",
                        found: self
                            .peek()
                            .map(|t| t.describe())
                            .unwrap_or_else(|| "end of input".to_string()),
                    });
                }
                let mut branches = Vec::new();
                loop {
                    self.skip_newlines();
                    match self.peek() {
                        Some(Token::RBrace) => {
                            self.advance();
                            break;
                        }
                        None => return Err(ParseError::UnterminatedBlock),
                        _ => {
                            branches.push(self.parse_pipeline()?);
                            // Branches are newline-separated.
                            match self.peek() {
                                None | Some(Token::Newline) | Some(Token::RBrace) => {}
                                Some(other) => {
                                    return Err(ParseError::ExpectedToken {
                                        expected: "newline or '}' after branch",
                                        found: other.describe(),
                                    })
                                }
                            }
                        }
                    }
                }
                if branches.is_empty() {
                    return Err(ParseError::EmptyParallel);
                }
                Ok(self.node(NodeKind::Parallel { branches }))
            }
            Some(Token::Ident(s)) if s == "merge" => Err(ParseError::DanglingMerge),
            Some(Token::Ident(name)) => {
                let mut args = Vec::new();
                while let Some(Token::Str(s)) = self.peek() {
                    args.push(s.clone());
                    self.advance();
                }
                Ok(self.node(NodeKind::Command { name, args }))
            }
            Some(other) => Err(ParseError::ExpectedToken {
                expected: "a command",
                found: other.describe(),
            }),
            None => Err(ParseError::ExpectedToken {
                expected: "a command",
                found: "end of input".to_string(),
            }),
        }
    }

    /// Close the rightmost open parallel group in `node` with a merge
    /// node. Pipes are left-associative, so an open group can only sit
    /// at the top or as the consumer of the topmost pipe.
    fn try_close_group(&mut self, node: Node) -> CloseResult {
        let id = node.id;
        match node.kind {
            NodeKind::Parallel { branches } => {
                let group = Node {
                    id,
                    kind: NodeKind::Parallel { branches },
                };
                Closed(self.node(NodeKind::Merge {
                    group: Box::new(group),
                }))
            }
            NodeKind::Pipe { producer, consumer }
                if matches!(consumer.kind, NodeKind::Parallel { .. }) =>
            {
                let merged = match self.try_close_group(*consumer) {
                    Closed(m) => m,
                    Unchanged(n) => n,
                };
                Closed(Node {
                    id,
                    kind: NodeKind::Pipe {
                        producer,
                        consumer: Box::new(merged),
                    },
                })
            }
            kind => Unchanged(Node { id, kind }),
        }
    }
}

enum CloseResult {
    Closed(Node),
    Unchanged(Node),
}
use CloseResult::{Closed, Unchanged};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_command() {
        let s = parse(r#"search "rust async""#).unwrap();
        assert_eq!(s.shape(), "search(rust async)");
    }

    #[test]
    fn test_sequential_pipeline() {
        let s = parse(r#"search "x" -> summarize -> save "out.md""#).unwrap();
        assert_eq!(s.shape(), "pipe(pipe(search(x),summarize),save(out.md))");
    }

    #[test]
    fn test_parallel_with_explicit_merge() {
        let s = parse("parallel {\n  a\n  b\n  c\n} -> merge -> d").unwrap();
        assert_eq!(s.shape(), "pipe(merge(par[a b c]),d)");
    }

    #[test]
    fn test_implicit_merge_at_next_pipe() {
        let s = parse("parallel {\n  a\n  b\n} -> d").unwrap();
        assert_eq!(s.shape(), "pipe(merge(par[a b]),d)");
    }

    #[test]
    fn test_top_level_unmerged_parallel_allowed() {
        let s = parse("parallel {\n  a\n  b\n}").unwrap();
        assert_eq!(s.shape(), "par[a b]");
    }

    #[test]
    fn test_nested_parallel() {
        let src = "parallel {\n  parallel {\n    a\n    b\n  } -> merge -> c\n  d\n} -> merge -> e";
        let s = parse(src).unwrap();
        assert_eq!(
            s.shape(),
            "pipe(merge(par[pipe(merge(par[a b]),c) d]),e)"
        );
    }

    #[test]
    fn test_pipe_into_parallel() {
        let s = parse("fetch \"u\" -> parallel {\n  a\n  b\n} -> merge -> c").unwrap();
        assert_eq!(s.shape(), "pipe(pipe(fetch(u),merge(par[a b])),c)");
    }

    #[test]
    fn test_multiple_pipelines() {
        let s = parse("a -> b\nc -> d").unwrap();
        assert_eq!(s.shape(), "pipe(a,b)\npipe(c,d)");
        assert_eq!(s.command_names(), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_unterminated_block() {
        assert_eq!(
            parse("parallel {\n a\n b").unwrap_err(),
            ParseError::UnterminatedBlock
        );
    }

    #[test]
    fn test_missing_pipe_rhs() {
        assert_eq!(parse("a ->").unwrap_err(), ParseError::MissingPipeRhs);
        assert_eq!(parse("a ->\nb").unwrap_err(), ParseError::MissingPipeRhs);
    }

    #[test]
    fn test_empty_parallel() {
        assert_eq!(parse("parallel { }").unwrap_err(), ParseError::EmptyParallel);
        assert_eq!(parse("parallel {\n\n}").unwrap_err(), ParseError::EmptyParallel);
    }

    #[test]
    fn test_dangling_merge() {
        assert_eq!(parse("merge").unwrap_err(), ParseError::DanglingMerge);
        assert_eq!(parse("a -> merge").unwrap_err(), ParseError::DanglingMerge);
    }

    #[test]
    fn test_malformed_argument() {
        assert!(matches!(
            parse("search \"unclosed"),
            Err(ParseError::UnterminatedString { .. })
        ));
    }

    #[test]
    fn test_single_branch_on_one_line() {
        // Branches inside a group on one line: `a b` is one command `a`
        // with no args followed by command `b` — rejected, branches are
        // newline-separated.
        assert!(matches!(
            parse("parallel { a b }"),
            Err(ParseError::ExpectedToken { .. })
        ));
    }

    #[test]
    fn test_node_ids_unique() {
        let s = parse("a -> b\nparallel {\n c\n d\n} -> merge").unwrap();
        let mut seen = std::collections::HashSet::new();
        fn walk(n: &Node, seen: &mut std::collections::HashSet<usize>) {
            match &n.kind {
                NodeKind::Command { .. } => {
                    assert!(seen.insert(n.id.0));
                }
                NodeKind::Pipe { producer, consumer } => {
                    walk(producer, seen);
                    walk(consumer, seen);
                }
                NodeKind::Parallel { branches } => {
                    for b in branches {
                        walk(b, seen);
                    }
                }
                NodeKind::Merge { group } => walk(group, seen),
            }
        }
        for p in &s.pipelines {
            walk(p, &mut seen);
        }
        assert!(!seen.is_empty());
    }

    #[test]
    fn test_validates_cleanly() {
        let s = parse("parallel {\n a\n b\n} -> merge -> c").unwrap();
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_comments_and_blank_lines() {
        let src = "// fetch then store\nsearch \"q\" -> save \"f\"\n\n# done\n";
        let s = parse(src).unwrap();
        assert_eq!(s.shape(), "pipe(search(q),save(f))");
    }
}
