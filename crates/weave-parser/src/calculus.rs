//! Parser for the process-calculus notation emitted by the translator.
//!
//! Events map to commands (`name` or `name!"arg"`), `;` to pipes, a
//! parenthesized `|||` composition to a parallel group, the `sync` event
//! to the group's merge barrier, and `SKIP` marks successful termination.
//! The result is the same task graph the script grammar produces.

use weave_core::{Node, NodeId, NodeKind, ParseError, Script};

/// Parse process-calculus text into a task graph.
pub fn parse(source: &str) -> Result<Script, ParseError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        next_id: 0,
    };
    let pipeline = parser.parse_process()?;
    if let Some(tok) = parser.peek() {
        return Err(ParseError::ExpectedToken {
            expected: "end of process",
            found: tok.describe(),
        });
    }
    Ok(Script {
        source: source.to_string(),
        pipelines: vec![pipeline],
        node_count: parser.next_id,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum CToken {
    Ident(String),
    Str(String),
    Bang,
    Semi,
    Par,
    LParen,
    RParen,
}

impl CToken {
    fn describe(&self) -> String {
        match self {
            CToken::Ident(s) => s.clone(),
            CToken::Str(s) => format!("\"{}\"", s),
            CToken::Bang => "!".to_string(),
            CToken::Semi => ";".to_string(),
            CToken::Par => "|||".to_string(),
            CToken::LParen => "(".to_string(),
            CToken::RParen => ")".to_string(),
        }
    }
}

fn tokenize(src: &str) -> Result<Vec<CToken>, ParseError> {
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
            }
            ';' => {
                chars.next();
                tokens.push(CToken::Semi);
            }
            '!' => {
                chars.next();
                tokens.push(CToken::Bang);
            }
            '(' => {
                chars.next();
                tokens.push(CToken::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(CToken::RParen);
            }
            '|' => {
                let mut bars = 0;
                while chars.peek() == Some(&'|') {
                    chars.next();
                    bars += 1;
                }
                if bars != 3 {
                    return Err(ParseError::ExpectedToken {
                        expected: "'|||'",
                        found: "|".repeat(bars),
                    });
                }
                tokens.push(CToken::Par);
            }
            '"' => {
                chars.next();
                let mut s = String::new();
                loop {
                    match chars.next() {
                        None | Some('\n') => {
                            return Err(ParseError::UnterminatedString { line })
                        }
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some('"') => s.push('"'),
                            Some('\\') => s.push('\\'),
                            Some(other) => {
                                s.push('\\');
                                s.push(other);
                            }
                            None => return Err(ParseError::UnterminatedString { line }),
                        },
                        Some(c) => s.push(c),
                    }
                }
                tokens.push(CToken::Str(s));
            }
            c if c.is_alphanumeric() || c == '_' => {
                let mut ident = String::new();
                while let Some(&c) = chars.peek() {
                    if !(c.is_alphanumeric() || c == '_') {
                        break;
                    }
                    ident.push(c);
                    chars.next();
                }
                tokens.push(CToken::Ident(ident));
            }
            other => {
                return Err(ParseError::ExpectedToken {
                    expected: "an event or operator",
                    found: other.to_string(),
                });
            }
        }
    }
    Ok(tokens)
}

enum Term {
    Event { name: String, arg: Option<String> },
    Group(Vec<Node>),
    Sub(Node),
    Skip,
}

struct Parser {
    tokens: Vec<CToken>,
    pos: usize,
    next_id: usize,
}

impl Parser {
    fn peek(&self) -> Option<&CToken> {
        self.tokens.get(self.pos)
    }

    fn eat(&mut self, token: &CToken) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn node(&mut self, kind: NodeKind) -> Node {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        Node { id, kind }
    }

    /// process := term (`;` term)*
    fn parse_process(&mut self) -> Result<Node, ParseError> {
        let mut terms = vec![self.parse_term()?];
        while self.eat(&CToken::Semi) {
            terms.push(self.parse_term()?);
        }
        self.fold_terms(terms)
    }

    /// term := event | `(` process (`|||` process)* `)` | `SKIP`
    fn parse_term(&mut self) -> Result<Term, ParseError> {
        match self.peek().cloned() {
            Some(CToken::LParen) => {
                self.pos += 1;
                let mut operands = vec![self.parse_process()?];
                while self.eat(&CToken::Par) {
                    operands.push(self.parse_process()?);
                }
                if !self.eat(&CToken::RParen) {
                    return Err(ParseError::UnterminatedBlock);
                }
                if operands.len() == 1 {
                    // Plain grouping, not an interleaving
                    Ok(Term::Sub(operands.into_iter().next().unwrap()))
                } else {
                    Ok(Term::Group(operands))
                }
            }
            Some(CToken::Ident(s)) if s == "SKIP" => {
                self.pos += 1;
                Ok(Term::Skip)
            }
            Some(CToken::Ident(name)) => {
                self.pos += 1;
                let arg = if self.eat(&CToken::Bang) {
                    match self.peek().cloned() {
                        Some(CToken::Str(s)) => {
                            self.pos += 1;
                            Some(s)
                        }
                        other => {
                            return Err(ParseError::ExpectedToken {
                                expected: "a string payload after '!'",
                                found: other
                                    .map(|t| t.describe())
                                    .unwrap_or_else(|| "end of process".to_string()),
                            })
                        }
                    }
                } else {
                    None
                };
                Ok(Term::Event { name, arg })
            }
            Some(other) => Err(ParseError::ExpectedToken {
                expected: "an event",
                found: other.describe(),
            }),
            None => Err(ParseError::ExpectedToken {
                expected: "an event",
                found: "end of process".to_string(),
            }),
        }
    }

    /// Fold a `;`-sequence into left-associative pipes. A parallel
    /// composition must be followed by the `sync` event, which becomes
    /// its merge barrier.
    fn fold_terms(&mut self, terms: Vec<Term>) -> Result<Node, ParseError> {
        let mut acc: Option<Node> = None;
        let mut open_group: Option<Node> = None;

        for term in terms {
            match term {
                Term::Skip => continue,
                Term::Event { name, arg } if name == "sync" => {
                    // sync is a bare barrier, never an event with data
                    if let Some(payload) = arg {
                        return Err(ParseError::ExpectedToken {
                            expected: "'sync' without a payload",
                            found: format!("sync!\"{}\"", payload),
                        });
                    }
                    match open_group.take() {
                        Some(group) => {
                            let merged = self.node(NodeKind::Merge {
                                group: Box::new(group),
                            });
                            acc = Some(self.chain(acc, merged));
                        }
                        None => return Err(ParseError::DanglingMerge),
                    }
                }
                _ if open_group.is_some() => {
                    return Err(ParseError::ExpectedToken {
                        expected: "'sync' after a parallel composition",
                        found: term_describe(&term),
                    })
                }
                Term::Event { name, arg } => {
                    let cmd = self.node(NodeKind::Command {
                        name,
                        args: arg.into_iter().collect(),
                    });
                    acc = Some(self.chain(acc, cmd));
                }
                Term::Sub(node) => {
                    acc = Some(self.chain(acc, node));
                }
                Term::Group(branches) => {
                    open_group = Some(self.node(NodeKind::Parallel { branches }));
                }
            }
        }

        if open_group.is_some() {
            return Err(ParseError::ExpectedToken {
                expected: "'sync' after a parallel composition",
                found: "end of process".to_string(),
            });
        }
        acc.ok_or(ParseError::ExpectedToken {
            expected: "an event",
            found: "empty process".to_string(),
        })
    }

    fn chain(&mut self, acc: Option<Node>, next: Node) -> Node {
        match acc {
            None => next,
            Some(prev) => self.node(NodeKind::Pipe {
                producer: Box::new(prev),
                consumer: Box::new(next),
            }),
        }
    }
}

fn term_describe(term: &Term) -> String {
    match term {
        Term::Event { name, .. } => name.clone(),
        Term::Group(_) => "a parallel composition".to_string(),
        Term::Sub(_) => "a sub-process".to_string(),
        Term::Skip => "SKIP".to_string(),
    }
}
