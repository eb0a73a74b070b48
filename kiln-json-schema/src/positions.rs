//! Source position tracking for JSON documents.
//!
//! Maps every JSON Pointer in a document to the line and column its value
//! starts at, so the serving side can point at the offending spot in the
//! original file. This is a purpose-built scanner rather than a full parser:
//! the documents it sees have already been parsed once by `serde_json`.

use std::iter::Peekable;
use std::str::Chars;

use jsonptr::PointerBuf;
use serde_json::{Map, Value};

use crate::error::SchemaError;

/// Scans `input` and returns a mapping from JSON Pointer to
/// `{"line": …, "column": …}` (both 1-based), in document order.
///
/// # Errors
/// Returns [`SchemaError::Scan`] on malformed input.
pub fn positions(input: &str) -> Result<Value, SchemaError> {
    let mut scanner = Scanner {
        characters: input.chars().peekable(),
        line: 1,
        column: 1,
    };
    let mut output = Map::new();
    scanner.skip_whitespace();
    scanner.value(&PointerBuf::new(), &mut output)?;
    scanner.skip_whitespace();
    if scanner.characters.peek().is_some() {
        return Err(scanner.error());
    }
    Ok(Value::Object(output))
}

struct Scanner<'a> {
    characters: Peekable<Chars<'a>>,
    line: u64,
    column: u64,
}

impl Scanner<'_> {
    fn bump(&mut self) -> Option<char> {
        let character = self.characters.next()?;
        if character == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(character)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.characters.peek(), Some(' ' | '\t' | '\n' | '\r')) {
            self.bump();
        }
    }

    fn error(&self) -> SchemaError {
        SchemaError::Scan {
            line: self.line,
            column: self.column,
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), SchemaError> {
        match self.bump() {
            Some(found) if found == expected => Ok(()),
            _ => Err(self.error()),
        }
    }

    fn record(&self, pointer: &PointerBuf, output: &mut Map<String, Value>) {
        let mut entry = Map::new();
        entry.insert("line".to_owned(), Value::from(self.line));
        entry.insert("column".to_owned(), Value::from(self.column));
        output.insert(pointer.to_string(), Value::Object(entry));
    }

    fn value(
        &mut self,
        pointer: &PointerBuf,
        output: &mut Map<String, Value>,
    ) -> Result<(), SchemaError> {
        self.skip_whitespace();
        self.record(pointer, output);
        match self.characters.peek() {
            Some('{') => self.object(pointer, output),
            Some('[') => self.array(pointer, output),
            Some('"') => self.string().map(|_| ()),
            Some(_) => self.literal(),
            None => Err(self.error()),
        }
    }

    fn object(
        &mut self,
        pointer: &PointerBuf,
        output: &mut Map<String, Value>,
    ) -> Result<(), SchemaError> {
        self.expect('{')?;
        self.skip_whitespace();
        if self.characters.peek() == Some(&'}') {
            self.bump();
            return Ok(());
        }
        loop {
            self.skip_whitespace();
            let key = self.string()?;
            self.skip_whitespace();
            self.expect(':')?;
            let mut child = pointer.clone();
            child.push_back(key);
            self.value(&child, output)?;
            self.skip_whitespace();
            match self.bump() {
                Some(',') => {}
                Some('}') => return Ok(()),
                _ => return Err(self.error()),
            }
        }
    }

    fn array(
        &mut self,
        pointer: &PointerBuf,
        output: &mut Map<String, Value>,
    ) -> Result<(), SchemaError> {
        self.expect('[')?;
        self.skip_whitespace();
        if self.characters.peek() == Some(&']') {
            self.bump();
            return Ok(());
        }
        let mut index = 0usize;
        loop {
            let mut child = pointer.clone();
            child.push_back(index.to_string());
            self.value(&child, output)?;
            self.skip_whitespace();
            match self.bump() {
                Some(',') => index += 1,
                Some(']') => return Ok(()),
                _ => return Err(self.error()),
            }
        }
    }

    fn string(&mut self) -> Result<String, SchemaError> {
        self.expect('"')?;
        let mut decoded = String::new();
        loop {
            let character = self.bump().ok_or_else(|| self.error())?;
            match character {
                '"' => return Ok(decoded),
                '\\' => {
                    let escape = self.bump().ok_or_else(|| self.error())?;
                    match escape {
                        '"' => decoded.push('"'),
                        '\\' => decoded.push('\\'),
                        '/' => decoded.push('/'),
                        'b' => decoded.push('\u{0008}'),
                        'f' => decoded.push('\u{000C}'),
                        'n' => decoded.push('\n'),
                        'r' => decoded.push('\r'),
                        't' => decoded.push('\t'),
                        'u' => {
                            let first = self.hex_escape()?;
                            let code = if (0xD800..0xDC00).contains(&first) {
                                // Surrogate pair.
                                self.expect('\\')?;
                                self.expect('u')?;
                                let second = self.hex_escape()?;
                                0x10000 + ((first - 0xD800) << 10) + (second - 0xDC00)
                            } else {
                                first
                            };
                            decoded.push(char::from_u32(code).unwrap_or('\u{FFFD}'));
                        }
                        _ => return Err(self.error()),
                    }
                }
                other => decoded.push(other),
            }
        }
    }

    fn hex_escape(&mut self) -> Result<u32, SchemaError> {
        let mut code = 0u32;
        for _ in 0..4 {
            let digit = self
                .bump()
                .and_then(|character| character.to_digit(16))
                .ok_or_else(|| self.error())?;
            code = code * 16 + digit;
        }
        Ok(code)
    }

    fn literal(&mut self) -> Result<(), SchemaError> {
        let mut consumed = false;
        while let Some(character) = self.characters.peek() {
            if matches!(character, ',' | ']' | '}' | ' ' | '\t' | '\n' | '\r') {
                break;
            }
            self.bump();
            consumed = true;
        }
        if consumed {
            Ok(())
        } else {
            Err(self.error())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_of_nested_values() {
        let document = "{\n  \"type\": \"object\",\n  \"properties\": {\n    \"name\": { \"type\": \"string\" }\n  }\n}\n";
        let map = positions(document).unwrap();
        let map = map.as_object().unwrap();
        assert_eq!(map[""]["line"], 1);
        assert_eq!(map[""]["column"], 1);
        assert_eq!(map["/type"]["line"], 2);
        assert_eq!(map["/properties/name"]["line"], 4);
        assert_eq!(map["/properties/name/type"]["line"], 4);
    }

    #[test]
    fn array_items_are_indexed() {
        let document = "{\"enum\": [1,\n 2]}";
        let map = positions(document).unwrap();
        let map = map.as_object().unwrap();
        assert_eq!(map["/enum/0"]["line"], 1);
        assert_eq!(map["/enum/1"]["line"], 2);
    }

    #[test]
    fn escaped_keys_become_pointer_tokens() {
        let document = "{\"a/b\": 1}";
        let map = positions(document).unwrap();
        assert!(map.as_object().unwrap().contains_key("/a~1b"));
    }

    #[test]
    fn malformed_documents_are_rejected() {
        assert!(matches!(
            positions("{\"a\": }"),
            Err(SchemaError::Scan { .. })
        ));
        assert!(positions("{} trailing").is_err());
    }
}
