//! Boolean and proximity queries over an [`InvertedIndex`].
//!
//! Operators are tried from the outermost level inwards: every top-level
//! ` AND ` splits the query first, then ` OR `, then the distance operators
//! ` /N `, ` /+N `, ` /-N `; what is left is a bracketed group or a term.
//! So `a OR b AND c` means `(a OR b) AND c`.

use crate::error::QueryError;
use crate::index::{DocumentId, InvertedIndex, Position};
use crate::language::Languages;
use std::collections::{HashMap, HashSet};
use std::fmt;
use unicode_normalization::UnicodeNormalization;

const AND: [char; 5] = [' ', 'A', 'N', 'D', ' '];
const OR: [char; 4] = [' ', 'O', 'R', ' '];

/// A matched span of words in one document; `start == end` for a single term.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Occurrence<D> {
    pub document: D,
    pub start: Position,
    pub end: Position,
}

impl<D: Clone> Occurrence<D> {
    pub fn term(document: D, position: Position) -> Self {
        Self { document, start: position, end: position }
    }

    /// Smallest span covering both occurrences.
    fn span(&self, other: &Self) -> Self {
        Self {
            document: self.document.clone(),
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl<D: fmt::Display> fmt::Display for Occurrence<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}:{}", self.document, self.start)
        } else {
            write!(f, "{}:{}-{}", self.document, self.start, self.end)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// Lowercased word, looked up through its normal forms.
    Term(String),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    /// `right` must start `offset` words after `left` ends; a bidirectional
    /// distance also accepts `offset` words before.
    Distance {
        left: Box<Expr>,
        right: Box<Expr>,
        offset: i64,
        bidirectional: bool,
    },
}

#[derive(Debug, Clone, Copy)]
struct DistanceOp {
    offset: i64,
    bidirectional: bool,
}

pub fn parse(query: &str, languages: &Languages) -> Result<Expr, QueryError> {
    let parser = Parser::new(query, languages)?;
    parser.parse_range(0, parser.chars.len())
}

struct Parser<'a> {
    chars: Vec<char>,
    /// Index of the matching bracket, for bracket characters.
    pairs: Vec<Option<usize>>,
    languages: &'a Languages,
}

impl<'a> Parser<'a> {
    fn new(query: &str, languages: &'a Languages) -> Result<Self, QueryError> {
        let chars: Vec<char> = query.nfc().collect();
        let mut pairs = vec![None; chars.len()];
        let mut open = Vec::new();
        for (i, &c) in chars.iter().enumerate() {
            match c {
                '(' => open.push(i),
                ')' => {
                    let o = open
                        .pop()
                        .ok_or(QueryError::UnmatchedClosingBracket { position: i + 1 })?;
                    pairs[o] = Some(i);
                    pairs[i] = Some(o);
                }
                _ if is_query_symbol(c, languages) => {}
                _ => return Err(QueryError::IncorrectSymbol { symbol: c, position: i + 1 }),
            }
        }
        if let Some(&o) = open.last() {
            return Err(QueryError::UnmatchedOpeningBracket { position: o + 1 });
        }
        Ok(Self { chars, pairs, languages })
    }

    fn parse_range(&self, from: usize, to: usize) -> Result<Expr, QueryError> {
        let parts = self.split_keyword(from, to, &AND);
        if !parts.is_empty() {
            return Ok(Expr::And(self.parse_all(parts)?));
        }
        let parts = self.split_keyword(from, to, &OR);
        if !parts.is_empty() {
            return Ok(Expr::Or(self.parse_all(parts)?));
        }
        if let Some((parts, ops)) = self.split_distance(from, to)? {
            let mut parts = parts.into_iter();
            let mut expr = match parts.next() {
                Some((a, b)) => self.parse_range(a, b)?,
                None => return Err(QueryError::EmptyExpression { position: from + 1 }),
            };
            for ((a, b), op) in parts.zip(ops) {
                expr = Expr::Distance {
                    left: Box::new(expr),
                    right: Box::new(self.parse_range(a, b)?),
                    offset: op.offset,
                    bidirectional: op.bidirectional,
                };
            }
            return Ok(expr);
        }
        if to - from >= 2 && self.chars[from] == '(' && self.pairs[from] == Some(to - 1) {
            return self.parse_range(from + 1, to - 1);
        }
        self.term(from, to)
    }

    fn parse_all(&self, parts: Vec<(usize, usize)>) -> Result<Vec<Expr>, QueryError> {
        parts.into_iter().map(|(a, b)| self.parse_range(a, b)).collect()
    }

    fn term(&self, from: usize, to: usize) -> Result<Expr, QueryError> {
        if from >= to {
            return Err(QueryError::EmptyExpression { position: from + 1 });
        }
        for i in from..to {
            let c = self.chars[i];
            if !self.languages.is_letter(c) {
                return Err(QueryError::IncorrectSymbol { symbol: c, position: i + 1 });
            }
        }
        let word: String = self.chars[from..to].iter().collect();
        Ok(Expr::Term(word.to_lowercase()))
    }

    /// Next index to inspect at the top level of a range: bracketed groups are skipped whole.
    fn step(&self, i: usize) -> usize {
        match (self.chars[i], self.pairs[i]) {
            ('(', Some(close)) => close + 1,
            _ => i + 1,
        }
    }

    fn matches_at(&self, i: usize, to: usize, op: &[char]) -> bool {
        i + op.len() <= to && self.chars[i..i + op.len()] == *op
    }

    /// Segments between all top-level occurrences of `op`; empty if there are none.
    fn split_keyword(&self, from: usize, to: usize, op: &[char]) -> Vec<(usize, usize)> {
        let mut segments = Vec::new();
        let mut start = from;
        let mut i = from;
        while i < to {
            if self.matches_at(i, to, op) {
                segments.push((start, i));
                i += op.len();
                start = i;
            } else {
                i = self.step(i);
            }
        }
        if !segments.is_empty() {
            segments.push((start, to));
        }
        segments
    }

    #[allow(clippy::type_complexity)]
    fn split_distance(
        &self,
        from: usize,
        to: usize,
    ) -> Result<Option<(Vec<(usize, usize)>, Vec<DistanceOp>)>, QueryError> {
        let mut segments = Vec::new();
        let mut ops = Vec::new();
        let mut start = from;
        let mut i = from;
        while i < to {
            if self.chars[i] == ' ' && i + 1 < to && self.chars[i + 1] == '/' {
                let (op, end) = self.distance_operator(i, to)?;
                segments.push((start, i));
                ops.push(op);
                i = end;
                start = end;
            } else {
                i = self.step(i);
            }
        }
        if ops.is_empty() {
            return Ok(None);
        }
        segments.push((start, to));
        Ok(Some((segments, ops)))
    }

    /// Parses ` /[+-]digits ` starting at the space at `i`; returns the index after it.
    fn distance_operator(&self, i: usize, to: usize) -> Result<(DistanceOp, usize), QueryError> {
        let incomplete = QueryError::IncompleteDistance { position: i + 2 };
        let mut j = i + 2;
        let sign = match self.chars.get(j) {
            Some(&c) if j < to && (c == '+' || c == '-') => {
                j += 1;
                Some(c)
            }
            _ => None,
        };
        let digits_start = j;
        while j < to && self.chars[j].is_ascii_digit() {
            j += 1;
        }
        if j == digits_start || j >= to || self.chars[j] != ' ' {
            return Err(incomplete);
        }
        let digits: String = self.chars[digits_start..j].iter().collect();
        let value: i64 = digits
            .parse()
            .map_err(|_| QueryError::DistanceOutOfRange { position: i + 2 })?;
        let offset = if sign == Some('-') { -value } else { value };
        Ok((DistanceOp { offset, bidirectional: sign.is_none() }, j + 1))
    }
}

fn is_query_symbol(c: char, languages: &Languages) -> bool {
    languages.is_letter(c)
        || c.is_whitespace()
        || c.is_ascii_digit()
        || matches!(c, '+' | '-' | '/')
        || AND.contains(&c)
        || OR.contains(&c)
}

/// Evaluates queries against a read-only index. Holds no mutable state, so
/// any number of evaluators may run concurrently.
pub struct QueryEvaluator<'a, D> {
    index: &'a InvertedIndex<D>,
}

impl<'a, D: DocumentId> QueryEvaluator<'a, D> {
    pub fn new(index: &'a InvertedIndex<D>) -> Self {
        Self { index }
    }

    pub fn find(&self, query: &str) -> Result<HashSet<Occurrence<D>>, QueryError> {
        let expr = parse(query, self.index.languages())?;
        Ok(self.evaluate(&expr))
    }

    pub fn evaluate(&self, expr: &Expr) -> HashSet<Occurrence<D>> {
        match expr {
            Expr::Term(word) => self
                .index
                .lookup(word)
                .into_iter()
                .flat_map(|(document, positions)| {
                    positions.into_iter().map(move |p| Occurrence::term(document.clone(), p))
                })
                .collect(),
            Expr::And(children) => {
                let mut result: Option<HashSet<Occurrence<D>>> = None;
                for child in children {
                    let matches = self.evaluate(child);
                    let joined = match result {
                        None => matches,
                        Some(prev) => join(&prev, &matches, |_, _| true),
                    };
                    if joined.is_empty() {
                        return joined;
                    }
                    result = Some(joined);
                }
                result.unwrap_or_default()
            }
            Expr::Or(children) => children.iter().flat_map(|c| self.evaluate(c)).collect(),
            Expr::Distance { left, right, offset, bidirectional } => {
                let prev = self.evaluate(left);
                if prev.is_empty() {
                    return prev;
                }
                let next = self.evaluate(right);
                join(&prev, &next, |p, n| {
                    let start = Some(i64::from(n.start));
                    let end = i64::from(p.end);
                    start == end.checked_add(*offset)
                        || (*bidirectional && start == end.checked_sub(*offset))
                })
            }
        }
    }
}

/// Spans of every accepted `(left, right)` pair from the same document.
fn join<D, F>(
    left: &HashSet<Occurrence<D>>,
    right: &HashSet<Occurrence<D>>,
    accept: F,
) -> HashSet<Occurrence<D>>
where
    D: DocumentId,
    F: Fn(&Occurrence<D>, &Occurrence<D>) -> bool,
{
    let mut by_document: HashMap<&D, Vec<&Occurrence<D>>> = HashMap::new();
    for occurrence in right {
        by_document.entry(&occurrence.document).or_default().push(occurrence);
    }
    let mut joined = HashSet::new();
    for l in left {
        let Some(candidates) = by_document.get(&l.document) else { continue };
        for r in candidates {
            if accept(l, r) {
                joined.insert(l.span(r));
            }
        }
    }
    joined
}
