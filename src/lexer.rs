//! SQL lexer using nom.
//!
//! Only splits text finely enough to find keywords and `?` placeholders
//! outside string literals, quoted identifiers and comments. Every byte of
//! the input lands in exactly one token, so concatenating token texts gives
//! the input back.

use nom::{
    branch::alt,
    bytes::complete::{is_not, tag, take_until, take_while, take_while1},
    character::complete::{anychar, char, multispace1},
    combinator::{map, opt, recognize, rest},
    multi::many0,
    sequence::{pair, tuple},
    IResult,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Word,
    Placeholder,
    /// String literal or quoted identifier.
    Quoted,
    Comment,
    Whitespace,
    OpenParen,
    CloseParen,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
}

impl<'a> Token<'a> {
    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == TokenKind::Word && self.text.eq_ignore_ascii_case(keyword)
    }

    fn is_significant(&self) -> bool {
        !matches!(self.kind, TokenKind::Whitespace | TokenKind::Comment)
    }
}

/// Split `input` into tokens.
pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut remaining = input;

    while !remaining.is_empty() {
        match parse_token(remaining) {
            Ok((next, token)) => {
                tokens.push(token);
                remaining = next;
            }
            Err(_) => {
                // Unreachable while `anychar` is the last alternative
                tokens.push(Token {
                    kind: TokenKind::Other,
                    text: remaining,
                });
                break;
            }
        }
    }

    tokens
}

fn parse_token(input: &str) -> IResult<&str, Token<'_>> {
    alt((
        token(TokenKind::Whitespace, multispace1),
        token(TokenKind::Comment, parse_line_comment),
        token(TokenKind::Comment, parse_block_comment),
        token(TokenKind::Quoted, |i| parse_quoted(i, '\'')),
        token(TokenKind::Quoted, |i| parse_quoted(i, '"')),
        token(TokenKind::Quoted, |i| parse_quoted(i, '`')),
        token(TokenKind::Placeholder, recognize(char('?'))),
        token(TokenKind::OpenParen, recognize(char('('))),
        token(TokenKind::CloseParen, recognize(char(')'))),
        token(TokenKind::Word, parse_word),
        token(TokenKind::Other, recognize(anychar)),
    ))(input)
}

fn token<'a, F>(kind: TokenKind, parser: F) -> impl FnMut(&'a str) -> IResult<&'a str, Token<'a>>
where
    F: FnMut(&'a str) -> IResult<&'a str, &'a str>,
{
    map(parser, move |text| Token { kind, text })
}

/// Identifier or keyword.
fn parse_word(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_alphabetic() || c == '_'),
        take_while(|c: char| c.is_alphanumeric() || c == '_' || c == '$'),
    ))(input)
}

/// `-- ...` up to (not including) the newline.
fn parse_line_comment(input: &str) -> IResult<&str, &str> {
    recognize(pair(tag("--"), opt(is_not("\n"))))(input)
}

/// `/* ... */`; an unterminated comment runs to the end of input.
fn parse_block_comment(input: &str) -> IResult<&str, &str> {
    alt((
        recognize(tuple((tag("/*"), take_until("*/"), tag("*/")))),
        recognize(pair(tag("/*"), rest)),
    ))(input)
}

/// Quoted run where a doubled quote is an escaped quote. An unterminated
/// run extends to the end of input.
fn parse_quoted(input: &str, quote: char) -> IResult<&str, &str> {
    let doubled: &str = match quote {
        '\'' => "''",
        '"' => "\"\"",
        _ => "``",
    };
    let single: &str = &doubled[..1];

    recognize(tuple((
        char(quote),
        many0(alt((tag(doubled), is_not(single)))),
        opt(char(quote)),
    )))(input)
}

/// Top-level clauses a SELECT can carry after FROM, in the order SQL
/// requires them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Clause {
    Where,
    GroupBy,
    Having,
    OrderBy,
    Limit,
    Offset,
    /// `for update`, `for share`, ...
    Locking,
}

/// A top-level clause and the byte offset where the text before it ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClauseMark {
    pub clause: Clause,
    pub boundary: usize,
}

/// Top-level clauses already present in a query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClauseScan {
    pub has_where: bool,
    pub has_group: bool,
    pub has_order: bool,
    /// A top-level LIMIT or OFFSET.
    pub has_limit: bool,
    /// Clauses of the last top-level SELECT, in order of appearance.
    pub marks: Vec<ClauseMark>,
    /// End of the last significant token, ignoring trailing `;`, comments
    /// and whitespace.
    pub end: usize,
}

impl ClauseScan {
    /// Offset at which text belonging to the end of `clause` goes: just
    /// before the first later clause, or at the end of the query.
    pub fn insertion_point(&self, clause: Clause) -> usize {
        self.marks
            .iter()
            .find(|m| m.clause > clause)
            .map_or(self.end, |m| m.boundary)
    }

    fn mark(&mut self, clause: Clause, boundary: usize) {
        match clause {
            Clause::Where => self.has_where = true,
            Clause::GroupBy => self.has_group = true,
            Clause::OrderBy => self.has_order = true,
            Clause::Limit | Clause::Offset => self.has_limit = true,
            Clause::Having | Clause::Locking => {}
        }
        self.marks.push(ClauseMark { clause, boundary });
    }
}

/// Detect top-level clauses at parenthesis depth zero.
///
/// Keywords inside literals, quoted identifiers, comments and subqueries are
/// ignored. A top-level set operator starts a new SELECT, so it clears what
/// was seen before it.
pub fn scan_clauses(sql: &str) -> ClauseScan {
    let mut scan = ClauseScan::default();
    let mut depth = 0usize;
    let mut offset = 0usize;
    // End of the previous significant token
    let mut last_end = 0usize;
    // Previous significant token and the boundary before it
    let mut previous: Option<(Token<'_>, usize)> = None;

    for token in tokenize(sql) {
        let start = offset;
        offset += token.text.len();
        if !token.is_significant() {
            continue;
        }

        match token.kind {
            TokenKind::OpenParen => depth += 1,
            TokenKind::CloseParen => depth = depth.saturating_sub(1),
            TokenKind::Word if depth == 0 => {
                let before_previous = previous.filter(|(p, _)| p.kind == TokenKind::Word);
                if token.is_keyword("where") {
                    scan.mark(Clause::Where, last_end);
                } else if token.is_keyword("having") {
                    scan.mark(Clause::Having, last_end);
                } else if token.is_keyword("limit") {
                    scan.mark(Clause::Limit, last_end);
                } else if token.is_keyword("offset") {
                    scan.mark(Clause::Offset, last_end);
                } else if token.is_keyword("by") {
                    match before_previous {
                        Some((p, at)) if p.is_keyword("group") => scan.mark(Clause::GroupBy, at),
                        Some((p, at)) if p.is_keyword("order") => scan.mark(Clause::OrderBy, at),
                        _ => {}
                    }
                } else if ["update", "share", "no", "key"].iter().any(|kw| token.is_keyword(kw)) {
                    if let Some((p, at)) = before_previous {
                        if p.is_keyword("for") {
                            scan.mark(Clause::Locking, at);
                        }
                    }
                } else if ["union", "intersect", "except"]
                    .iter()
                    .any(|kw| token.is_keyword(kw))
                {
                    scan = ClauseScan::default();
                }
            }
            _ => {}
        }

        previous = Some((token, last_end));
        if token.text != ";" {
            last_end = start + token.text.len();
        }
    }

    scan.end = last_end;
    scan
}
