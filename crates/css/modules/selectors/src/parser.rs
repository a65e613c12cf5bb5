//! CSS selector parsing.
//! Spec: <https://www.w3.org/TR/selectors-3/>

use crate::error::SelectorError;
use crate::escape::consume_escape;
use crate::{Combinator, ComplexSelector, CompoundSelector, SelectorList, SimpleSelector};
use core::mem::take;

#[derive(Clone, Debug, PartialEq, Eq)]
/// Internal tokenizer token kinds.
pub enum Tok {
    /// A combinator token like child/adjacent/general sibling.
    Combinator(Combinator),
    /// Whitespace that implies a descendant combinator.
    DescendantWS,
    /// A simple selector token (type, class, id, attribute, pseudo, universal).
    Simple(SimpleSelector),
    /// Separator between entries of a selector list.
    Comma,
}

/// Tokenizer over a selector string.
pub struct SelectorTokenizer {
    /// Input decoded into code points so escapes and non-ASCII names work.
    chars: Vec<char>,
    /// Current cursor index into `chars`.
    index: usize,
}

impl SelectorTokenizer {
    /// Construct a tokenizer from input.
    #[inline]
    pub(crate) fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            index: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.index).copied()
    }

    fn bump(&mut self) {
        self.index = self.index.saturating_add(1);
    }

    /// Return the next selector token, if any.
    pub(crate) fn next_token(&mut self) -> Result<Option<Tok>, SelectorError> {
        if self.skip_spaces() {
            // Whitespace right before a combinator or comma is insignificant.
            return match self.peek() {
                None | Some('>' | '+' | '~' | ',') => self.next_token(),
                Some(_) => Ok(Some(Tok::DescendantWS)),
            };
        }
        let Some(current) = self.peek() else {
            return Ok(None);
        };
        let token = match current {
            '*' => {
                self.bump();
                Tok::Simple(SimpleSelector::Universal)
            }
            '.' => {
                self.bump();
                Tok::Simple(SimpleSelector::Class(self.consume_required_ident()?))
            }
            '#' => {
                self.bump();
                Tok::Simple(SimpleSelector::IdSelector(self.consume_required_ident()?))
            }
            '[' => {
                self.bump();
                Tok::Simple(self.consume_attr()?)
            }
            ':' => {
                self.bump();
                Tok::Simple(self.consume_pseudo()?)
            }
            '>' => {
                self.bump();
                Tok::Combinator(Combinator::Child)
            }
            '+' => {
                self.bump();
                Tok::Combinator(Combinator::AdjacentSibling)
            }
            '~' => {
                self.bump();
                Tok::Combinator(Combinator::GeneralSibling)
            }
            ',' => {
                self.bump();
                Tok::Comma
            }
            other if is_name_start(other) || other == '\\' => {
                Tok::Simple(SimpleSelector::Type(
                    self.consume_ident().to_ascii_lowercase(),
                ))
            }
            other => return Err(SelectorError::UnexpectedCharacter(other)),
        };
        Ok(Some(token))
    }

    /// Consume an identifier made of name code points and escapes.
    fn consume_ident(&mut self) -> String {
        let mut out = String::new();
        while let Some(character) = self.peek() {
            if character == '\\' {
                self.bump();
                out.push(consume_escape(&self.chars, &mut self.index));
            } else if is_name_char(character) {
                out.push(character);
                self.bump();
            } else {
                break;
            }
        }
        out
    }

    fn consume_required_ident(&mut self) -> Result<String, SelectorError> {
        let ident = self.consume_ident();
        if ident.is_empty() {
            return Err(SelectorError::ExpectedIdentifier);
        }
        Ok(ident)
    }

    /// Parse an attribute selector after '[', supporting `[name]` and `[name=value]`.
    fn consume_attr(&mut self) -> Result<SimpleSelector, SelectorError> {
        self.skip_spaces();
        let name = self.consume_required_ident()?.to_ascii_lowercase();
        self.skip_spaces();
        match self.peek() {
            Some(']') => {
                self.bump();
                Ok(SimpleSelector::AttrExists(name))
            }
            Some('=') => {
                self.bump();
                self.skip_spaces();
                let value = match self.peek() {
                    Some(quote @ ('"' | '\'')) => {
                        self.bump();
                        self.consume_string(quote)?
                    }
                    Some(_) => self.consume_required_ident()?,
                    None => return Err(SelectorError::Unterminated),
                };
                self.skip_spaces();
                if self.peek() != Some(']') {
                    return Err(SelectorError::Unterminated);
                }
                self.bump();
                Ok(SimpleSelector::AttrEquals { name, value })
            }
            Some(operator @ ('~' | '|' | '^' | '$' | '*')) => Err(SelectorError::Unsupported(
                format!("attribute operator {operator}="),
            )),
            Some(_) | None => Err(SelectorError::Unterminated),
        }
    }

    /// Consume a quoted string body until the matching quote.
    fn consume_string(&mut self, quote: char) -> Result<String, SelectorError> {
        let mut out = String::new();
        loop {
            match self.peek() {
                None => return Err(SelectorError::Unterminated),
                Some(character) if character == quote => {
                    self.bump();
                    return Ok(out);
                }
                Some('\\') => {
                    self.bump();
                    out.push(consume_escape(&self.chars, &mut self.index));
                }
                Some(character) => {
                    out.push(character);
                    self.bump();
                }
            }
        }
    }

    /// Parse a pseudo-class after ':'. Only `:nth-of-type(<integer>)` is supported.
    fn consume_pseudo(&mut self) -> Result<SimpleSelector, SelectorError> {
        if self.peek() == Some(':') {
            return Err(SelectorError::Unsupported(String::from("pseudo-element")));
        }
        let name = self.consume_required_ident()?.to_ascii_lowercase();
        if name != "nth-of-type" || self.peek() != Some('(') {
            return Err(SelectorError::Unsupported(format!(":{name}")));
        }
        self.bump();
        self.skip_spaces();
        let mut digits = String::new();
        while let Some(character) = self.peek().filter(char::is_ascii_digit) {
            digits.push(character);
            self.bump();
        }
        self.skip_spaces();
        if self.peek() != Some(')') {
            return Err(SelectorError::Unsupported(format!(":{name}(...)")));
        }
        self.bump();
        match digits.parse::<usize>() {
            Ok(position) if position > 0 => Ok(SimpleSelector::NthOfType(position)),
            _ => Err(SelectorError::Unsupported(format!(":{name}({digits})"))),
        }
    }

    /// Skip ASCII whitespace, returning whether any was skipped.
    fn skip_spaces(&mut self) -> bool {
        let start = self.index;
        while self
            .peek()
            .is_some_and(|character| character.is_ascii_whitespace())
        {
            self.bump();
        }
        self.index != start
    }
}

/// Name-start code point: letter, underscore, hyphen or non-ASCII.
/// Spec: <https://www.w3.org/TR/css-syntax-3/#ident-start-code-point>
fn is_name_start(character: char) -> bool {
    character.is_ascii_alphabetic() || character == '_' || character == '-' || !character.is_ascii()
}

/// Spec: <https://www.w3.org/TR/css-syntax-3/#ident-code-point>
fn is_name_char(character: char) -> bool {
    is_name_start(character) || character.is_ascii_digit()
}

/// Parse a selector list from CSS text.
/// Spec: Section 3, 4, 5–8, 11
///
/// # Errors
/// Returns an error if any entry is empty or uses syntax outside the supported subset.
pub fn parse_selector_list(input: &str) -> Result<SelectorList, SelectorError> {
    let mut tokens = SelectorTokenizer::new(input);
    let mut list = SelectorList::default();
    loop {
        let (selector, more) = parse_complex(&mut tokens)?;
        list.selectors.push(selector);
        if !more {
            return Ok(list);
        }
    }
}

/// Parse exactly one complex selector.
/// Spec: Section 11: Combinators; Section 5–8: simple selectors
///
/// # Errors
/// Returns an error for empty input, dangling combinators, selector lists or
/// unsupported syntax.
pub fn parse_complex_selector(input: &str) -> Result<ComplexSelector, SelectorError> {
    let mut tokens = SelectorTokenizer::new(input);
    let (selector, more) = parse_complex(&mut tokens)?;
    if more {
        return Err(SelectorError::Unsupported(String::from("selector list")));
    }
    Ok(selector)
}

/// Parse tokens up to the next comma (returned as `true`) or the end of input.
fn parse_complex(tokens: &mut SelectorTokenizer) -> Result<(ComplexSelector, bool), SelectorError> {
    let mut compounds: Vec<CompoundSelector> = Vec::new();
    let mut combinators: Vec<Combinator> = Vec::new();
    let mut current = CompoundSelector::default();
    let mut pending: Option<Combinator> = None;
    let mut more = false;

    while let Some(token) = tokens.next_token()? {
        match token {
            Tok::Comma => {
                more = true;
                break;
            }
            Tok::DescendantWS => {
                if !current.simples.is_empty() {
                    compounds.push(take(&mut current));
                    pending = Some(Combinator::Descendant);
                }
            }
            Tok::Combinator(comb) => {
                if !current.simples.is_empty() {
                    compounds.push(take(&mut current));
                }
                if compounds.is_empty() {
                    return Err(SelectorError::DanglingCombinator);
                }
                match pending {
                    None | Some(Combinator::Descendant) => pending = Some(comb),
                    Some(_) => return Err(SelectorError::DanglingCombinator),
                }
            }
            Tok::Simple(simple) => {
                if let Some(comb) = pending.take() {
                    combinators.push(comb);
                }
                current.simples.push(simple);
            }
        }
    }

    if current.simples.is_empty() {
        if matches!(pending, Some(comb) if comb != Combinator::Descendant) {
            return Err(SelectorError::DanglingCombinator);
        }
    } else {
        compounds.push(current);
    }

    let mut compounds = compounds.into_iter();
    let first = compounds.next().ok_or(SelectorError::Empty)?;
    let rest = combinators.into_iter().zip(compounds).collect();
    Ok((ComplexSelector { first, rest }, more))
}
