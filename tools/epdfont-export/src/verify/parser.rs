//! Generated-header reader
//!
//! A tokenizer and recursive-descent parser for the declaration grammar the
//! header emitter writes:
//!
//! ```text
//! header      := declaration*
//! declaration := "static" "const" TYPE IDENT ( "[" INT? "]" )? "=" init ";"
//! init        := INT | IDENT | "{" ( init ( "," init )* ","? )? "}"
//! ```
//!
//! Comments (`//`, `/* */`) and preprocessor lines are skipped. The
//! `EpdFontData` aggregate is then resolved by identifier and the font model
//! rebuilt from the arrays it references.

use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use epdfont_common::formats::{glyph_codepoints, CodepointInterval, GlyphRecord};
use epdfont_common::BitDepth;

use crate::error::HeaderError;
use crate::model::{CompiledFont, FaceMetrics, GroupDescriptor};

/// Aggregate type naming the whole font
pub const FONT_DATA_TYPE: &str = "EpdFontData";

/// Element type of the group-descriptor array
pub const GROUP_TYPE: &str = "EpdFontGroup";

const AGGREGATE_FIELDS: usize = 11;

/// Whether `source` contains a `static const TYPE` declaration of type `ty`
///
/// A plain word scan that needs no successful tokenize, so files the grammar
/// rejects can still be classified.
pub fn mentions_declaration(source: &str, ty: &str) -> bool {
    let words: Vec<&str> = source.split_whitespace().collect();
    words
        .windows(3)
        .any(|w| w[0] == "static" && w[1] == "const" && w[2] == ty)
}

// ============================================================================
// Tokens
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Int(i64),
    Ident(String),
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Semicolon,
    Equals,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Int(value) => write!(f, "integer {}", value),
            Token::Ident(name) => write!(f, "'{}'", name),
            Token::LBrace => f.write_str("'{'"),
            Token::RBrace => f.write_str("'}'"),
            Token::LBracket => f.write_str("'['"),
            Token::RBracket => f.write_str("']'"),
            Token::Comma => f.write_str("','"),
            Token::Semicolon => f.write_str("';'"),
            Token::Equals => f.write_str("'='"),
        }
    }
}

/// Token with its 1-based source line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned {
    pub token: Token,
    pub line: usize,
}

pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().peekable(),
            line: 1,
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Spanned>, HeaderError> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next();
        if c == Some('\n') {
            self.line += 1;
        }
        c
    }

    fn skip_line(&mut self) {
        while let Some(&c) = self.chars.peek() {
            if c == '\n' {
                break;
            }
            self.bump();
        }
    }

    fn skip_block_comment(&mut self) {
        let mut prev = '\0';
        while let Some(c) = self.bump() {
            if prev == '*' && c == '/' {
                return;
            }
            prev = c;
        }
    }

    fn next_token(&mut self) -> Result<Option<Spanned>, HeaderError> {
        loop {
            let Some(&c) = self.chars.peek() else {
                return Ok(None);
            };
            let line = self.line;

            if c.is_whitespace() {
                self.bump();
                continue;
            }
            if c == '#' {
                self.skip_line();
                continue;
            }
            if c == '/' {
                self.bump();
                match self.chars.peek() {
                    Some('/') => self.skip_line(),
                    Some('*') => {
                        self.bump();
                        self.skip_block_comment();
                    }
                    _ => return Err(HeaderError::UnexpectedChar { line, ch: '/' }),
                }
                continue;
            }

            let token = match c {
                '{' => Token::LBrace,
                '}' => Token::RBrace,
                '[' => Token::LBracket,
                ']' => Token::RBracket,
                ',' => Token::Comma,
                ';' => Token::Semicolon,
                '=' => Token::Equals,
                '-' | '0'..='9' => return self.integer(line).map(Some),
                c if c == '_' || c.is_ascii_alphabetic() => {
                    let ident = self.take_while(|c| c == '_' || c.is_ascii_alphanumeric());
                    return Ok(Some(Spanned {
                        token: Token::Ident(ident),
                        line,
                    }));
                }
                ch => return Err(HeaderError::UnexpectedChar { line, ch }),
            };
            self.bump();
            return Ok(Some(Spanned { token, line }));
        }
    }

    fn take_while(&mut self, keep: impl Fn(char) -> bool) -> String {
        let mut text = String::new();
        while let Some(&c) = self.chars.peek() {
            if !keep(c) {
                break;
            }
            text.push(c);
            self.bump();
        }
        text
    }

    fn integer(&mut self, line: usize) -> Result<Spanned, HeaderError> {
        let negative = self.chars.peek() == Some(&'-');
        if negative {
            self.bump();
        }
        let literal = self.take_while(|c| c.is_ascii_alphanumeric());
        let bad = || HeaderError::BadInteger {
            line,
            literal: format!("{}{}", if negative { "-" } else { "" }, literal),
        };

        let magnitude = match literal
            .strip_prefix("0x")
            .or_else(|| literal.strip_prefix("0X"))
        {
            Some(hex) => i64::from_str_radix(hex, 16),
            None => literal.parse::<i64>(),
        }
        .map_err(|_| bad())?;

        Ok(Spanned {
            token: Token::Int(if negative { -magnitude } else { magnitude }),
            line,
        })
    }
}

// ============================================================================
// Declarations
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Initializer {
    Int(i64),
    Ident(String),
    List(Vec<Initializer>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub ty: String,
    pub name: String,
    /// `Some(n)` for `name[n]`; `None` for `name[]` or a scalar
    pub declared_len: Option<usize>,
    pub init: Initializer,
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn next(&mut self, expected: &'static str) -> Result<Spanned, HeaderError> {
        let spanned = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or(HeaderError::UnexpectedEof { expected })?;
        self.pos += 1;
        Ok(spanned)
    }

    fn expect(&mut self, token: Token, expected: &'static str) -> Result<(), HeaderError> {
        let spanned = self.next(expected)?;
        if spanned.token != token {
            return Err(unexpected(&spanned, expected));
        }
        Ok(())
    }

    fn ident(&mut self, expected: &'static str) -> Result<String, HeaderError> {
        let spanned = self.next(expected)?;
        match spanned.token {
            Token::Ident(name) => Ok(name),
            _ => Err(unexpected(&spanned, expected)),
        }
    }

    fn keyword(&mut self, keyword: &'static str) -> Result<(), HeaderError> {
        let spanned = self.next(keyword)?;
        match &spanned.token {
            Token::Ident(name) if name == keyword => Ok(()),
            _ => Err(unexpected(&spanned, keyword)),
        }
    }

    fn declaration(&mut self) -> Result<Declaration, HeaderError> {
        self.keyword("static")?;
        self.keyword("const")?;
        let ty = self.ident("type name")?;
        let name = self.ident("identifier")?;

        let mut declared_len = None;
        if self.peek() == Some(&Token::LBracket) {
            self.pos += 1;
            let spanned = self.next("array length or ']'")?;
            match spanned.token {
                Token::RBracket => {}
                Token::Int(len) => {
                    declared_len = Some(usize::try_from(len).map_err(|_| {
                        HeaderError::BadValue {
                            name: name.clone(),
                            message: format!("negative array length {}", len),
                        }
                    })?);
                    self.expect(Token::RBracket, "']'")?;
                }
                _ => return Err(unexpected(&spanned, "array length or ']'")),
            }
        }

        self.expect(Token::Equals, "'='")?;
        let init = self.initializer()?;
        self.expect(Token::Semicolon, "';'")?;

        Ok(Declaration {
            ty,
            name,
            declared_len,
            init,
        })
    }

    fn initializer(&mut self) -> Result<Initializer, HeaderError> {
        let spanned = self.next("initializer")?;
        match spanned.token {
            Token::Int(value) => Ok(Initializer::Int(value)),
            Token::Ident(name) => Ok(Initializer::Ident(name)),
            Token::LBrace => {
                let mut items = Vec::new();
                loop {
                    if self.peek() == Some(&Token::RBrace) {
                        self.pos += 1;
                        return Ok(Initializer::List(items));
                    }
                    items.push(self.initializer()?);
                    let spanned = self.next("',' or '}'")?;
                    match spanned.token {
                        Token::Comma => {}
                        Token::RBrace => return Ok(Initializer::List(items)),
                        _ => return Err(unexpected(&spanned, "',' or '}'")),
                    }
                }
            }
            _ => Err(unexpected(&spanned, "initializer")),
        }
    }
}

fn unexpected(spanned: &Spanned, expected: &'static str) -> HeaderError {
    HeaderError::UnexpectedToken {
        line: spanned.line,
        expected,
        found: spanned.token.to_string(),
    }
}

pub fn parse_declarations(source: &str) -> Result<Vec<Declaration>, HeaderError> {
    let mut parser = Parser {
        tokens: Lexer::new(source).tokenize()?,
        pos: 0,
    };
    let mut declarations = Vec::new();
    while parser.peek().is_some() {
        declarations.push(parser.declaration()?);
    }
    Ok(declarations)
}

// ============================================================================
// Font Reconstruction
// ============================================================================

/// Parsed header, before the aggregate is resolved
#[derive(Debug, Clone)]
pub struct ParsedHeader {
    pub declarations: Vec<Declaration>,
}

impl ParsedHeader {
    pub fn parse(source: &str) -> Result<Self, HeaderError> {
        Ok(Self {
            declarations: parse_declarations(source)?,
        })
    }

    /// Whether any declaration has element type `ty`
    pub fn declares(&self, ty: &str) -> bool {
        self.declarations.iter().any(|d| d.ty == ty)
    }

    fn lookup(&self, name: &str) -> Result<&Declaration, HeaderError> {
        self.declarations
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| HeaderError::Unresolved(name.to_string()))
    }

    /// Declaration referenced by an aggregate field, `None` for `nullptr`
    fn reference(&self, field: &str, init: &Initializer) -> Result<Option<&Declaration>, HeaderError> {
        match init {
            Initializer::Ident(name) if name == "nullptr" || name == "NULL" => Ok(None),
            Initializer::Int(0) => Ok(None),
            Initializer::Ident(name) => self.lookup(name).map(Some),
            _ => Err(bad_value(field, "expected an array name or nullptr")),
        }
    }

    fn required(&self, field: &str, init: &Initializer) -> Result<&Declaration, HeaderError> {
        self.reference(field, init)?
            .ok_or_else(|| bad_value(field, "must not be nullptr"))
    }

    /// Rebuild the compiled font described by the `EpdFontData` aggregate
    pub fn font(&self) -> Result<CompiledFont, HeaderError> {
        let aggregate = self
            .declarations
            .iter()
            .find(|d| d.ty == FONT_DATA_TYPE)
            .ok_or(HeaderError::NoAggregate)?;
        let fields = list(&aggregate.name, &aggregate.init)?;
        if fields.len() != AGGREGATE_FIELDS {
            return Err(bad_value(
                &aggregate.name,
                &format!("expected {} fields, found {}", AGGREGATE_FIELDS, fields.len()),
            ));
        }

        let bitmap = elements(self.required("bitmap", &fields[0])?)?
            .iter()
            .map(|item| int::<u8>("bitmap", item))
            .collect::<Result<Vec<_>, _>>()?;

        let mut glyphs = elements(self.required("glyph", &fields[1])?)?
            .iter()
            .map(glyph_record)
            .collect::<Result<Vec<_>, _>>()?;

        let interval_decl = self.required("intervals", &fields[2])?;
        let intervals = cumulative_intervals(interval_decl)?;
        let interval_count = int::<usize>("intervalCount", &fields[3])?;
        if interval_count != intervals.len() {
            return Err(HeaderError::LengthMismatch {
                name: interval_decl.name.clone(),
                declared: interval_count,
                actual: intervals.len(),
            });
        }

        let metrics = FaceMetrics {
            advance_y: int("advanceY", &fields[4])?,
            ascender: int("ascender", &fields[5])?,
            descender: int("descender", &fields[6])?,
        };
        let depth = BitDepth::from_is_2bit(boolean("is2Bit", &fields[7])?);

        let group_count = int::<usize>("groupCount", &fields[9])?;
        let groups = match self.reference("groups", &fields[8])? {
            Some(decl) => {
                let groups = elements(decl)?
                    .iter()
                    .map(group_descriptor)
                    .collect::<Result<Vec<_>, _>>()?;
                if groups.len() != group_count {
                    return Err(HeaderError::LengthMismatch {
                        name: decl.name.clone(),
                        declared: group_count,
                        actual: groups.len(),
                    });
                }
                Some(groups)
            }
            None if group_count == 0 => None,
            None => return Err(bad_value("groupCount", "non-zero without a group array")),
        };

        let glyph_to_group = match self.reference("glyphToGroup", &fields[10])? {
            Some(decl) => Some(
                elements(decl)?
                    .iter()
                    .map(|item| int::<u16>(&decl.name, item))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            None => None,
        };

        for (glyph, codepoint) in glyphs.iter_mut().zip(glyph_codepoints(&intervals)) {
            glyph.codepoint = codepoint;
        }

        Ok(CompiledFont {
            name: aggregate.name.clone(),
            depth,
            bitmap,
            glyphs,
            intervals,
            metrics,
            groups,
            glyph_to_group,
        })
    }
}

fn bad_value(name: &str, message: &str) -> HeaderError {
    HeaderError::BadValue {
        name: name.to_string(),
        message: message.to_string(),
    }
}

fn list<'a>(name: &str, init: &'a Initializer) -> Result<&'a [Initializer], HeaderError> {
    match init {
        Initializer::List(items) => Ok(items),
        _ => Err(bad_value(name, "expected a brace-enclosed list")),
    }
}

/// Array items, checked against the declared `[n]` length
fn elements(decl: &Declaration) -> Result<&[Initializer], HeaderError> {
    let items = list(&decl.name, &decl.init)?;
    if let Some(declared) = decl.declared_len
        && declared != items.len()
    {
        return Err(HeaderError::LengthMismatch {
            name: decl.name.clone(),
            declared,
            actual: items.len(),
        });
    }
    Ok(items)
}

fn int<T: TryFrom<i64>>(name: &str, init: &Initializer) -> Result<T, HeaderError> {
    match init {
        Initializer::Int(value) => T::try_from(*value)
            .map_err(|_| bad_value(name, &format!("value {} out of range", value))),
        _ => Err(bad_value(name, "expected an integer")),
    }
}

fn boolean(name: &str, init: &Initializer) -> Result<bool, HeaderError> {
    match init {
        Initializer::Ident(value) if value == "true" => Ok(true),
        Initializer::Ident(value) if value == "false" => Ok(false),
        Initializer::Int(value @ (0 | 1)) => Ok(*value == 1),
        _ => Err(bad_value(name, "expected true or false")),
    }
}

/// Integer fields of a fixed-arity record initializer
fn record<const N: usize>(name: &str, init: &Initializer) -> Result<[i64; N], HeaderError> {
    let items = list(name, init)?;
    if items.len() != N {
        return Err(bad_value(
            name,
            &format!("expected {} fields, found {}", N, items.len()),
        ));
    }
    let mut fields = [0i64; N];
    for (field, item) in fields.iter_mut().zip(items) {
        *field = int(name, item)?;
    }
    Ok(fields)
}

fn glyph_record(init: &Initializer) -> Result<GlyphRecord, HeaderError> {
    let [width, height, advance_x, left, top, data_length, data_offset] = record::<7>("glyph", init)?;
    Ok(GlyphRecord {
        width: narrow("glyph width", width)?,
        height: narrow("glyph height", height)?,
        advance_x: narrow("glyph advanceX", advance_x)?,
        left: narrow("glyph left", left)?,
        top: narrow("glyph top", top)?,
        data_length: narrow("glyph dataLength", data_length)?,
        data_offset: narrow("glyph dataOffset", data_offset)?,
        codepoint: 0,
    })
}

fn group_descriptor(init: &Initializer) -> Result<GroupDescriptor, HeaderError> {
    let [offset, size, uncompressed, count, first] = record::<5>("group", init)?;
    Ok(GroupDescriptor {
        compressed_offset: narrow("group compressedOffset", offset)?,
        compressed_size: narrow("group compressedSize", size)?,
        uncompressed_size: narrow("group uncompressedSize", uncompressed)?,
        glyph_count: narrow("group glyphCount", count)?,
        first_glyph_index: narrow("group firstGlyphIndex", first)?,
    })
}

/// Interval array, with each stored offset checked against the running count
fn cumulative_intervals(decl: &Declaration) -> Result<Vec<CodepointInterval>, HeaderError> {
    let mut expected = 0i64;
    elements(decl)?
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let [first, last, offset] = record::<3>(&decl.name, item)?;
            let interval = CodepointInterval::new(
                narrow("interval first", first)?,
                narrow("interval last", last)?,
            );
            if interval.is_empty() {
                return Err(bad_value(
                    &decl.name,
                    &format!("interval {} has first 0x{:X} > last 0x{:X}", index, first, last),
                ));
            }
            if offset != expected {
                return Err(bad_value(
                    &decl.name,
                    &format!("interval {} offset {} != cumulative count {}", index, offset, expected),
                ));
            }
            expected += i64::from(interval.len());
            Ok(interval)
        })
        .collect()
}

fn narrow<T: TryFrom<i64>>(field: &str, value: i64) -> Result<T, HeaderError> {
    T::try_from(value).map_err(|_| bad_value(field, &format!("value {} out of range", value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = r#"/**
 * generated by epdfont-export
 * Command used: epdfont-export compile tiny 12 a.ttf
 */
#pragma once
#include "EpdFontData.h"

static const uint8_t tinyBitmaps[3] = {
    0x1B, 0xC0, 0xFF,
};

static const EpdGlyph tinyGlyphs[] = {
    { 5, 1, 6, 0, 1, 2, 0 }, // A
    { 2, 2, 3, -1, 2, 1, 2 }, // 中
};

static const EpdUnicodeInterval tinyIntervals[] = {
    { 0x41, 0x41, 0x0 },
    { 0x4E2D, 0x4E2D, 0x1 },
};

static const EpdFontData tiny = {
    tinyBitmaps,
    tinyGlyphs,
    tinyIntervals,
    2,
    20,
    15,
    -5,
    true,
    nullptr,
    0,
    nullptr,
};
"#;

    #[test]
    fn test_tokens() {
        let tokens: Vec<Token> = Lexer::new("{ 0x1F, -3 } // x\n/* y */ name_2;")
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|s| s.token)
            .collect();
        assert_eq!(
            tokens,
            vec![
                Token::LBrace,
                Token::Int(0x1F),
                Token::Comma,
                Token::Int(-3),
                Token::RBrace,
                Token::Ident("name_2".to_string()),
                Token::Semicolon,
            ]
        );
    }

    #[test]
    fn test_lines_counted_through_comments() {
        let err = Lexer::new("/* a\nb */\n  @").tokenize().unwrap_err();
        assert_eq!(err, HeaderError::UnexpectedChar { line: 3, ch: '@' });
    }

    #[test]
    fn test_bad_integer() {
        let err = Lexer::new("0xZZ").tokenize().unwrap_err();
        assert!(matches!(err, HeaderError::BadInteger { line: 1, .. }));
    }

    #[test]
    fn test_declarations() {
        let decls = parse_declarations(HEADER).unwrap();
        assert_eq!(decls.len(), 4);
        assert_eq!(decls[0].ty, "uint8_t");
        assert_eq!(decls[0].name, "tinyBitmaps");
        assert_eq!(decls[0].declared_len, Some(3));
        assert_eq!(decls[1].declared_len, None);
        assert_eq!(decls[3].ty, "EpdFontData");
        assert!(matches!(&decls[3].init, Initializer::List(items) if items.len() == 11));
    }

    #[test]
    fn test_font_rebuilt() {
        let font = ParsedHeader::parse(HEADER).unwrap().font().unwrap();
        assert_eq!(font.name, "tiny");
        assert_eq!(font.bitmap, vec![0x1B, 0xC0, 0xFF]);
        assert_eq!(font.glyphs.len(), 2);
        assert_eq!(font.glyphs[1].left, -1);
        assert_eq!(font.glyphs[1].codepoint, 0x4E2D);
        assert_eq!(font.metrics.descender, -5);
        assert!(font.depth.is_2bit());
        assert!(font.groups.is_none());
        assert!(font.glyph_to_group.is_none());
    }

    #[test]
    fn test_declared_length_checked() {
        let source = HEADER.replace("tinyBitmaps[3]", "tinyBitmaps[4]");
        let err = ParsedHeader::parse(&source).unwrap().font().unwrap_err();
        assert_eq!(
            err,
            HeaderError::LengthMismatch {
                name: "tinyBitmaps".to_string(),
                declared: 4,
                actual: 3
            }
        );
    }

    #[test]
    fn test_interval_offsets_checked() {
        let source = HEADER.replace("{ 0x4E2D, 0x4E2D, 0x1 }", "{ 0x4E2D, 0x4E2D, 0x2 }");
        let err = ParsedHeader::parse(&source).unwrap().font().unwrap_err();
        assert!(matches!(err, HeaderError::BadValue { .. }));
    }

    #[test]
    fn test_unresolved_reference() {
        let source = HEADER.replace("    tinyGlyphs,\n", "    otherGlyphs,\n");
        let err = ParsedHeader::parse(&source).unwrap().font().unwrap_err();
        assert_eq!(err, HeaderError::Unresolved("otherGlyphs".to_string()));
    }

    #[test]
    fn test_missing_semicolon() {
        let err = parse_declarations("static const uint8_t a[] = { 1 }").unwrap_err();
        assert_eq!(err, HeaderError::UnexpectedEof { expected: "';'" });
    }
}
