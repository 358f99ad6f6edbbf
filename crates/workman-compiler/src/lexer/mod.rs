//! Lexer for Workman source.
//!
//! Produces span-based tokens without storing text; text is sliced from
//! the source only when needed. The token list is terminated by an
//! explicit [`TokenKind::Eof`] token.
//!
//! ## Error handling
//!
//! Lex errors are fatal for the module: parsing never starts on a token
//! stream with errors. Runs of unrecognized characters coalesce into a
//! single `Garbage` token with one `unexpected_character` diagnostic; an
//! unterminated string consumes to end of line and reports
//! `unterminated_string`.

use logos::Logos;
use workman_core::Span;

use crate::diagnostics::{DiagnosticKind, Diagnostics};

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    #[token("let")]
    KwLet,
    #[token("rec")]
    KwRec,
    #[token("and")]
    KwAnd,
    #[token("type")]
    KwType,
    #[token("match")]
    KwMatch,
    #[token("import")]
    KwImport,
    #[token("export")]
    KwExport,
    #[token("from")]
    KwFrom,
    #[token("as")]
    KwAs,
    #[token("infix")]
    KwInfix,
    #[token("infixl")]
    KwInfixl,
    #[token("infixr")]
    KwInfixr,
    #[token("prefix")]
    KwPrefix,

    #[token("true")]
    #[token("false")]
    Bool,

    /// Lowercase (or underscore-led) identifier.
    #[regex("[a-z_][A-Za-z0-9_]*")]
    Ident,

    /// Uppercase constructor / type name.
    #[regex("[A-Z][A-Za-z0-9_]*")]
    Upper,

    #[regex("[0-9]+")]
    Number,

    #[regex(r#""(?:[^"\\\n]|\\.)*""#)]
    Str,

    #[regex(r"'(?:[^'\\\n]|\\.)'")]
    Char,

    #[token("(")]
    ParenOpen,
    #[token(")")]
    ParenClose,
    #[token("{")]
    BraceOpen,
    #[token("}")]
    BraceClose,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,
    #[token("_", priority = 3)]
    Underscore,
    #[token("=>")]
    FatArrow,
    #[token("=")]
    Eq,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("|")]
    Pipe,

    /// Maximal run of operator characters. Structural spellings (`=`,
    /// `=>`, `<`, `>`, `|`) lex as their dedicated tokens instead; the
    /// parser re-splits `>`-led runs when closing type arguments.
    #[regex(r"[+\-*/<>=!&|?^~%]+", priority = 1)]
    Operator,

    #[regex(r"//[^\n]*", priority = 10, allow_greedy = true)]
    LineComment,

    #[regex(r"/\*(?:[^*]|\*[^/])*\*/", priority = 10)]
    BlockComment,

    #[regex(r"[ \t\r\n]+")]
    Whitespace,

    /// Coalesced run of unrecognized characters.
    Garbage,

    /// End-of-input sentinel, always the last token.
    Eof,
}

impl TokenKind {
    pub fn is_trivia(self) -> bool {
        matches!(
            self,
            TokenKind::Whitespace | TokenKind::LineComment | TokenKind::BlockComment
        )
    }

    pub fn is_keyword(self) -> bool {
        matches!(
            self,
            TokenKind::KwLet
                | TokenKind::KwRec
                | TokenKind::KwAnd
                | TokenKind::KwType
                | TokenKind::KwMatch
                | TokenKind::KwImport
                | TokenKind::KwExport
                | TokenKind::KwFrom
                | TokenKind::KwAs
                | TokenKind::KwInfix
                | TokenKind::KwInfixl
                | TokenKind::KwInfixr
                | TokenKind::KwPrefix
        )
    }

    /// Human-readable description used in expected-token messages.
    pub fn describe(self) -> &'static str {
        match self {
            TokenKind::KwLet => "`let`",
            TokenKind::KwRec => "`rec`",
            TokenKind::KwAnd => "`and`",
            TokenKind::KwType => "`type`",
            TokenKind::KwMatch => "`match`",
            TokenKind::KwImport => "`import`",
            TokenKind::KwExport => "`export`",
            TokenKind::KwFrom => "`from`",
            TokenKind::KwAs => "`as`",
            TokenKind::KwInfix => "`infix`",
            TokenKind::KwInfixl => "`infixl`",
            TokenKind::KwInfixr => "`infixr`",
            TokenKind::KwPrefix => "`prefix`",
            TokenKind::Bool => "boolean literal",
            TokenKind::Ident => "identifier",
            TokenKind::Upper => "constructor name",
            TokenKind::Number => "number",
            TokenKind::Str => "string literal",
            TokenKind::Char => "character literal",
            TokenKind::ParenOpen => "`(`",
            TokenKind::ParenClose => "`)`",
            TokenKind::BraceOpen => "`{`",
            TokenKind::BraceClose => "`}`",
            TokenKind::Comma => "`,`",
            TokenKind::Semicolon => "`;`",
            TokenKind::Colon => "`:`",
            TokenKind::Dot => "`.`",
            TokenKind::Underscore => "`_`",
            TokenKind::FatArrow => "`=>`",
            TokenKind::Eq => "`=`",
            TokenKind::Lt => "`<`",
            TokenKind::Gt => "`>`",
            TokenKind::Pipe => "`|`",
            TokenKind::Operator => "operator",
            TokenKind::LineComment | TokenKind::BlockComment => "comment",
            TokenKind::Whitespace => "whitespace",
            TokenKind::Garbage => "unrecognized input",
            TokenKind::Eof => "end of file",
        }
    }
}

/// Zero-copy token: kind plus span; text retrieved via [`token_text`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    #[inline]
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// Retrieves the text slice for a token. O(1) slice into source.
#[inline]
pub fn token_text<'s>(source: &'s str, token: &Token) -> &'s str {
    &source[token.span.range()]
}

/// Tokenize, dropping trivia. This is what the parser consumes.
pub fn lex(source: &str) -> (Vec<Token>, Diagnostics) {
    let (tokens, diagnostics) = lex_with_trivia(source);
    let tokens = tokens.into_iter().filter(|t| !t.kind.is_trivia()).collect();
    (tokens, diagnostics)
}

/// Tokenize keeping whitespace and comments. Used by format-aware
/// callers that need to reproduce trivia.
pub fn lex_with_trivia(source: &str) -> (Vec<Token>, Diagnostics) {
    let mut tokens = Vec::new();
    let mut diagnostics = Diagnostics::new();
    // Restart offset: the lexer is re-created after skipping an
    // unterminated string, since logos cannot be resumed mid-error.
    let mut offset = 0usize;

    'restart: while offset <= source.len() {
        let mut lexer = TokenKind::lexer(&source[offset..]);
        let mut garbage_start: Option<usize> = None;

        while let Some(result) = lexer.next() {
            let span = lexer.span();
            let start = offset + span.start;
            let end = offset + span.end;

            match result {
                Ok(kind) => {
                    flush_garbage(source, &mut garbage_start, start, &mut tokens, &mut diagnostics);
                    tokens.push(Token::new(kind, Span::new(start as u32, end as u32)));
                }
                Err(()) => {
                    if source[start..].starts_with('"') {
                        flush_garbage(
                            source,
                            &mut garbage_start,
                            start,
                            &mut tokens,
                            &mut diagnostics,
                        );
                        let rest = &source[start..];
                        let line_len = rest.find('\n').unwrap_or(rest.len());
                        let str_span = Span::new(start as u32, (start + line_len) as u32);
                        tokens.push(Token::new(TokenKind::Garbage, str_span));
                        diagnostics
                            .error(
                                DiagnosticKind::UnterminatedString,
                                "unterminated string literal",
                                str_span,
                            )
                            .emit();
                        offset = start + line_len;
                        continue 'restart;
                    }
                    if garbage_start.is_none() {
                        garbage_start = Some(start);
                    }
                }
            }
        }

        flush_garbage(
            source,
            &mut garbage_start,
            source.len(),
            &mut tokens,
            &mut diagnostics,
        );
        break;
    }

    tokens.push(Token::new(TokenKind::Eof, Span::empty(source.len() as u32)));
    (tokens, diagnostics)
}

fn flush_garbage(
    source: &str,
    garbage_start: &mut Option<usize>,
    end: usize,
    tokens: &mut Vec<Token>,
    diagnostics: &mut Diagnostics,
) {
    if let Some(start) = garbage_start.take() {
        let span = Span::new(start as u32, end as u32);
        tokens.push(Token::new(TokenKind::Garbage, span));
        diagnostics
            .error(
                DiagnosticKind::UnexpectedCharacter,
                format!("unexpected character `{}`", &source[start..end]),
                span,
            )
            .emit();
    }
}

/// Reprint a token list by joining token texts with single spaces.
///
/// `lex(print_tokens(...))` reproduces the same (kind, text) sequence
/// for any trivia-free token list; used by the round-trip tests and the
/// formatter's token stage.
pub fn print_tokens(source: &str, tokens: &[Token]) -> String {
    tokens
        .iter()
        .filter(|t| t.kind != TokenKind::Eof)
        .map(|t| token_text(source, t))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Decode the escapes of a string literal body (without quotes).
pub fn unescape_string(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

/// Decode a character literal body (without quotes).
pub fn unescape_char(body: &str) -> char {
    unescape_string(body).chars().next().unwrap_or('\0')
}
