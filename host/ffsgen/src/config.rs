//! libconfig-style configuration tree
//!
//! ``` text
//! # comment
//! name = value;            // `:` works as well as `=`; the terminator is optional
//! group = { a = 1; b = "two"; };
//! list = ( 1, "two", { three = 3; } );
//! array = [ 1, 2, 3 ];     /* scalars of a single type */
//! ```
//!
//! Integers are decimal or hexadecimal (`0x..`), an `L` suffix makes them 64-bit. Adjacent string
//! literals are concatenated.

use core::fmt;
use std::sync::Arc;

use crate::error::{Error, ErrorKind};

/// Where a setting was defined
#[derive(Clone, Debug, PartialEq)]
pub struct Location {
    pub file: Arc<str>,
    pub line: u32,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Int(i64),
    Int64(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    /// `[ .. ]`
    Array(Vec<Setting>),
    /// `( .. )`
    List(Vec<Setting>),
    /// `{ .. }`
    Group(Vec<Setting>),
}

impl Value {
    fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "integer",
            Value::Int64(_) => "64-bit integer",
            Value::Float(_) => "float",
            Value::Bool(_) => "boolean",
            Value::Str(_) => "string",
            Value::Array(_) => "array",
            Value::List(_) => "list",
            Value::Group(_) => "group",
        }
    }

    fn is_scalar(&self) -> bool {
        match self {
            Value::Array(_) | Value::List(_) | Value::Group(_) => false,
            _ => true,
        }
    }
}

/// A node of the configuration tree
#[derive(Clone, Debug, PartialEq)]
pub struct Setting {
    /// `None` for list and array elements
    pub name: Option<String>,
    pub value: Value,
    pub location: Location,
}

impl Setting {
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    /// Looks up the member `name` of a group
    pub fn member(&self, name: &str) -> Option<&Setting> {
        match &self.value {
            Value::Group(members) => members.iter().find(|m| m.name() == name),
            _ => None,
        }
    }

    pub fn is_group(&self) -> bool {
        match self.value {
            Value::Group(_) => true,
            _ => false,
        }
    }

    pub fn is_list(&self) -> bool {
        match self.value {
            Value::List(_) => true,
            _ => false,
        }
    }

    pub fn is_array(&self) -> bool {
        match self.value {
            Value::Array(_) => true,
            _ => false,
        }
    }

    /// Children of a group, list or array; empty for scalars
    pub fn elems(&self) -> &[Setting] {
        match &self.value {
            Value::Array(elems) | Value::List(elems) | Value::Group(elems) => elems,
            _ => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.elems().len()
    }

    pub fn elem(&self, index: usize) -> Option<&Setting> {
        self.elems().get(index)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self.value {
            Value::Int(int) | Value::Int64(int) => Some(int),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the value of this setting, which must be an integer
    pub fn get_int(&self) -> Result<i64, Error> {
        self.as_int()
            .ok_or_else(|| Error::new(self, ErrorKind::BadValue, "must be integer"))
    }

    /// Returns the value of this setting, which must be a string
    pub fn get_string(&self) -> Result<&str, Error> {
        self.as_str()
            .ok_or_else(|| Error::new(self, ErrorKind::BadValue, "must be string"))
    }

    pub fn type_name(&self) -> &'static str {
        self.value.type_name()
    }
}

/// A parsed configuration file
#[derive(Debug)]
pub struct Config {
    root: Setting,
}

impl Config {
    /// Parses `text`; `file` is only used to tag locations
    pub fn parse(text: &str, file: &str) -> Result<Self, ParseError> {
        let file: Arc<str> = Arc::from(file);
        let mut parser = Parser {
            text,
            pos: 0,
            line: 1,
            file: file.clone(),
        };

        let settings = parser.settings(None)?;

        Ok(Config {
            root: Setting {
                name: None,
                value: Value::Group(settings),
                location: Location { file, line: 1 },
            },
        })
    }

    /// The implicit top-level group
    pub fn root(&self) -> &Setting {
        &self.root
    }
}

/// Syntax error
#[derive(Clone, Debug, PartialEq)]
pub struct ParseError {
    pub location: Location,
    pub message: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} - {}",
            self.location.file, self.location.line, self.message
        )
    }
}

impl std::error::Error for ParseError {}

struct Parser<'t> {
    text: &'t str,
    // byte offset into `text`
    pos: usize,
    line: u32,
    file: Arc<str>,
}

impl Parser<'_> {
    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn peek2(&self) -> Option<char> {
        self.text[self.pos..].chars().nth(1)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn location(&self) -> Location {
        Location {
            file: self.file.clone(),
            line: self.line,
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            location: self.location(),
            message: message.into(),
        }
    }

    /// Skips whitespace and comments
    fn skip(&mut self) -> Result<(), ParseError> {
        loop {
            match (self.peek(), self.peek2()) {
                (Some(c), _) if c.is_whitespace() => {
                    self.bump();
                }

                (Some('#'), _) | (Some('/'), Some('/')) => {
                    while let Some(c) = self.bump() {
                        if c == '\n' {
                            break;
                        }
                    }
                }

                (Some('/'), Some('*')) => {
                    let start = self.location();
                    self.bump();
                    self.bump();
                    loop {
                        match self.bump() {
                            Some('*') if self.peek() == Some('/') => {
                                self.bump();
                                break;
                            }
                            Some(_) => {}
                            None => {
                                return Err(ParseError {
                                    location: start,
                                    message: "unterminated comment".to_owned(),
                                })
                            }
                        }
                    }
                }

                _ => return Ok(()),
            }
        }
    }

    /// Parses settings until `end` (or the end of the text, if `None`)
    fn settings(&mut self, end: Option<char>) -> Result<Vec<Setting>, ParseError> {
        let mut settings: Vec<Setting> = vec![];

        loop {
            self.skip()?;

            match self.peek() {
                None => {
                    return match end {
                        None => Ok(settings),
                        Some(end) => Err(self.error(format!("expected `{}`", end))),
                    }
                }

                Some(c) if Some(c) == end => {
                    self.bump();
                    return Ok(settings);
                }

                Some('@') => return Err(self.error("directives (`@include`) are not supported")),

                Some(_) => {
                    let setting = self.setting()?;
                    if settings.iter().any(|s| s.name == setting.name) {
                        let message = format!("duplicate setting name `{}`", setting.name());
                        return Err(ParseError {
                            location: setting.location,
                            message,
                        });
                    }
                    settings.push(setting);
                }
            }
        }
    }

    fn setting(&mut self) -> Result<Setting, ParseError> {
        let location = self.location();
        let name = self.name()?;

        self.skip()?;
        match self.bump() {
            Some('=') | Some(':') => {}
            _ => return Err(self.error(format!("expected `=` or `:` after `{}`", name))),
        }

        let value = self.value()?;

        self.skip()?;
        if let Some(';') | Some(',') = self.peek() {
            self.bump();
        }

        Ok(Setting {
            name: Some(name),
            value,
            location,
        })
    }

    fn name(&mut self) -> Result<String, ParseError> {
        let start = self.pos;

        match self.peek() {
            Some(c) if c.is_ascii_alphabetic() || c == '*' => {
                self.bump();
            }
            _ => return Err(self.error("expected setting name")),
        }

        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '*' {
                self.bump();
            } else {
                break;
            }
        }

        Ok(self.text[start..self.pos].to_owned())
    }

    fn value(&mut self) -> Result<Value, ParseError> {
        self.skip()?;

        match self.peek() {
            Some('{') => {
                self.bump();
                Ok(Value::Group(self.settings(Some('}'))?))
            }

            Some('(') => {
                self.bump();
                Ok(Value::List(self.elems(')')?))
            }

            Some('[') => {
                self.bump();
                let elems = self.elems(']')?;

                if let Some(first) = elems.first() {
                    for elem in &elems {
                        if !elem.value.is_scalar() {
                            return Err(ParseError {
                                location: elem.location.clone(),
                                message: "arrays may only contain scalar values".to_owned(),
                            });
                        }

                        if elem.type_name() != first.type_name() {
                            return Err(ParseError {
                                location: elem.location.clone(),
                                message: "array elements must all have the same type".to_owned(),
                            });
                        }
                    }
                }

                Ok(Value::Array(elems))
            }

            Some('"') => self.string().map(Value::Str),

            Some(c) if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => self.number(),

            Some(c) if c.is_ascii_alphabetic() => {
                let start = self.pos;
                while let Some(c) = self.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        self.bump();
                    } else {
                        break;
                    }
                }

                let word = &self.text[start..self.pos];
                if word.eq_ignore_ascii_case("true") {
                    Ok(Value::Bool(true))
                } else if word.eq_ignore_ascii_case("false") {
                    Ok(Value::Bool(false))
                } else {
                    Err(self.error(format!("unexpected `{}`", word)))
                }
            }

            Some(c) => Err(self.error(format!("unexpected character `{}`", c))),

            None => Err(self.error("unexpected end of file")),
        }
    }

    /// Comma separated list or array elements up to `end`
    fn elems(&mut self, end: char) -> Result<Vec<Setting>, ParseError> {
        let mut elems = vec![];

        loop {
            self.skip()?;
            if self.peek() == Some(end) {
                self.bump();
                return Ok(elems);
            }

            if !elems.is_empty() {
                if self.peek() != Some(',') {
                    return Err(self.error(format!("expected `,` or `{}`", end)));
                }
                self.bump();

                // trailing comma
                self.skip()?;
                if self.peek() == Some(end) {
                    self.bump();
                    return Ok(elems);
                }
            }

            let location = self.location();
            let value = self.value()?;
            elems.push(Setting {
                name: None,
                value,
                location,
            });
        }
    }

    fn string(&mut self) -> Result<String, ParseError> {
        // `\xHH` inserts a raw byte so the contents are only checked for UTF-8 at the end
        let mut bytes = vec![];
        let first = self.location();

        // adjacent literals are concatenated
        while self.peek() == Some('"') {
            let start = self.location();
            self.bump();

            loop {
                match self.bump() {
                    Some('"') => break,

                    Some('\\') => {
                        let c = match self.bump() {
                            Some('\\') => '\\',
                            Some('"') => '"',
                            Some('n') => '\n',
                            Some('r') => '\r',
                            Some('t') => '\t',
                            Some('f') => '\x0c',
                            Some('x') => {
                                let start = self.pos;
                                for _ in 0..2 {
                                    match self.peek() {
                                        Some(c) if c.is_ascii_hexdigit() => {
                                            self.bump();
                                        }
                                        _ => return Err(self.error("expected two hex digits after `\\x`")),
                                    }
                                }
                                let byte = u8::from_str_radix(&self.text[start..self.pos], 16)
                                    .map_err(|e| self.error(e.to_string()))?;
                                bytes.push(byte);
                                continue;
                            }
                            Some(c) => return Err(self.error(format!("unknown escape `\\{}`", c))),
                            None => {
                                return Err(ParseError {
                                    location: start.clone(),
                                    message: "unterminated string".to_owned(),
                                })
                            }
                        };
                        push_char(&mut bytes, c);
                    }

                    Some(c) => push_char(&mut bytes, c),

                    None => {
                        return Err(ParseError {
                            location: start.clone(),
                            message: "unterminated string".to_owned(),
                        })
                    }
                }
            }

            self.skip()?;
        }

        String::from_utf8(bytes).map_err(|e| ParseError {
            location: first,
            message: format!(
                "string is not valid UTF-8 (invalid byte at offset {})",
                e.utf8_error().valid_up_to()
            ),
        })
    }

    fn number(&mut self) -> Result<Value, ParseError> {
        let start = self.pos;

        if let Some('-') | Some('+') = self.peek() {
            self.bump();
        }
        let negative = &self.text[start..self.pos] == "-";

        let value = if self.peek() == Some('0') && (self.peek2() == Some('x') || self.peek2() == Some('X')) {
            self.bump();
            self.bump();

            let digits = self.pos;
            while let Some(c) = self.peek() {
                if c.is_ascii_hexdigit() {
                    self.bump();
                } else {
                    break;
                }
            }

            let magnitude = u64::from_str_radix(&self.text[digits..self.pos], 16)
                .map_err(|_| self.error("malformed hexadecimal integer"))?;
            // hex literals are bit patterns; `0xffffffffffffffffL` is -1
            let int = if negative {
                (magnitude as i64).wrapping_neg()
            } else {
                magnitude as i64
            };
            self.int(int)?
        } else {
            let mut float = false;
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    self.bump();
                } else if c == '.' {
                    float = true;
                    self.bump();
                } else if c == 'e' || c == 'E' {
                    float = true;
                    self.bump();
                    if let Some('-') | Some('+') = self.peek() {
                        self.bump();
                    }
                } else {
                    break;
                }
            }

            let literal = &self.text[start..self.pos];
            if float {
                Value::Float(
                    literal
                        .parse()
                        .map_err(|_| self.error(format!("malformed float `{}`", literal)))?,
                )
            } else {
                let int = literal
                    .parse()
                    .map_err(|_| self.error(format!("integer `{}` out of range", literal)))?;
                self.int(int)?
            }
        };

        match self.peek() {
            Some(c) if c.is_ascii_alphanumeric() || c == '_' => {
                Err(self.error(format!("unexpected character `{}` after number", c)))
            }
            _ => Ok(value),
        }
    }

    // handles the `L` / `LL` suffix
    fn int(&mut self, int: i64) -> Result<Value, ParseError> {
        if self.peek() == Some('L') {
            self.bump();
            if self.peek() == Some('L') {
                self.bump();
            }
            Ok(Value::Int64(int))
        } else if int < i64::from(i32::min_value()) || int > i64::from(u32::max_value()) {
            Ok(Value::Int64(int))
        } else {
            Ok(Value::Int(int))
        }
    }
}

fn push_char(bytes: &mut Vec<u8>, c: char) {
    let mut buf = [0; 4];
    bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
}
