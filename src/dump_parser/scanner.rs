// Hand-written scanner for COPY headers and INSERT statements
//
// Dump structure is ASCII, so the scanner walks bytes. Non-ASCII text can only
// appear inside identifiers or literals, which are sliced on ASCII boundaries.

/// Quoting mode of a single-quoted literal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QuoteKind {
    /// `'...'` where only `''` escapes a quote
    Standard,
    /// `E'...'` where a backslash escapes the next byte
    Escaped,
}

/// Tracks parenthesis depth and literal quoting while walking SQL text
#[derive(Debug, Default)]
pub(crate) struct NestingTracker {
    depth: usize,
    quote: Option<QuoteKind>,
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

impl NestingTracker {
    /// Feed the byte at `i`. Returns how many following bytes belong to the
    /// same token and must be skipped by the caller.
    pub(crate) fn step(&mut self, bytes: &[u8], i: usize) -> Result<usize, String> {
        let b = bytes[i];
        match self.quote {
            Some(kind) => {
                if kind == QuoteKind::Escaped && b == b'\\' {
                    return Ok(1);
                }
                if b == b'\'' {
                    if bytes.get(i + 1) == Some(&b'\'') {
                        return Ok(1);
                    }
                    self.quote = None;
                }
                Ok(0)
            }
            None => {
                match b {
                    b'\'' => {
                        let escaped = i > 0
                            && matches!(bytes[i - 1], b'E' | b'e')
                            && (i < 2 || !is_ident_byte(bytes[i - 2]));
                        self.quote = Some(if escaped {
                            QuoteKind::Escaped
                        } else {
                            QuoteKind::Standard
                        });
                    }
                    b'(' => self.depth += 1,
                    b')' => {
                        if self.depth == 0 {
                            return Err(format!("unbalanced ')' at offset {}", i));
                        }
                        self.depth -= 1;
                    }
                    _ => {}
                }
                Ok(0)
            }
        }
    }

    pub(crate) fn is_top_level(&self) -> bool {
        self.depth == 0 && self.quote.is_none()
    }

    pub(crate) fn in_literal(&self) -> bool {
        self.quote.is_some()
    }
}

/// Split `text` on commas that are outside parentheses and quoted literals.
/// Each piece is trimmed.
pub fn split_top_level(text: &str) -> Result<Vec<String>, String> {
    let bytes = text.as_bytes();
    let mut tracker = NestingTracker::default();
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b',' && tracker.is_top_level() {
            pieces.push(text[start..i].trim().to_string());
            start = i + 1;
            i += 1;
            continue;
        }
        i += 1 + tracker.step(bytes, i)?;
    }

    if tracker.in_literal() {
        return Err("unterminated string literal".to_string());
    }
    if !tracker.is_top_level() {
        return Err("unbalanced '('".to_string());
    }
    pieces.push(text[start..].trim().to_string());
    Ok(pieces)
}

/// Cursor over one dump line
pub struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn bytes(&self) -> &'a [u8] {
        self.src.as_bytes()
    }

    pub fn peek(&self) -> Option<u8> {
        self.bytes().get(self.pos).copied()
    }

    pub fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    pub fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b) if b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    /// Consume `keyword` (case-insensitive) if it is the next whole word
    pub fn eat_keyword(&mut self, keyword: &str) -> bool {
        self.skip_whitespace();
        let end = self.pos + keyword.len();
        if end > self.src.len() || !self.src.is_char_boundary(end) {
            return false;
        }
        if !self.src[self.pos..end].eq_ignore_ascii_case(keyword) {
            return false;
        }
        if matches!(self.bytes().get(end), Some(&b) if is_ident_byte(b)) {
            return false;
        }
        self.pos = end;
        true
    }

    pub fn expect_byte(&mut self, expected: u8) -> Result<(), String> {
        self.skip_whitespace();
        match self.peek() {
            Some(b) if b == expected => {
                self.pos += 1;
                Ok(())
            }
            Some(b) => Err(format!(
                "expected '{}' but found '{}' at offset {}",
                expected as char, b as char, self.pos
            )),
            None => Err(format!("expected '{}' but reached end of line", expected as char)),
        }
    }

    /// Read a possibly schema-qualified, possibly quoted name and return its
    /// last segment unquoted
    pub fn qualified_name(&mut self) -> Result<String, String> {
        let mut segment = self.name_segment()?;
        while self.peek() == Some(b'.') {
            self.pos += 1;
            segment = self.name_segment()?;
        }
        Ok(segment)
    }

    fn name_segment(&mut self) -> Result<String, String> {
        self.skip_whitespace();
        if self.peek() == Some(b'"') {
            self.pos += 1;
            let mut name = String::new();
            loop {
                let rest = self.rest();
                let Some(close) = rest.find('"') else {
                    return Err("unterminated quoted identifier".to_string());
                };
                name.push_str(&rest[..close]);
                self.pos += close + 1;
                if self.peek() == Some(b'"') {
                    name.push('"');
                    self.pos += 1;
                } else {
                    break;
                }
            }
            if name.is_empty() {
                return Err("empty quoted identifier".to_string());
            }
            return Ok(name);
        }

        let start = self.pos;
        while matches!(self.peek(), Some(b) if is_ident_byte(b)) {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(format!("expected identifier at offset {}", start));
        }
        Ok(self.src[start..self.pos].to_string())
    }

    /// Read a balanced `( ... )` group and return its inner text
    pub fn parenthesized(&mut self) -> Result<&'a str, String> {
        self.skip_whitespace();
        if self.peek() != Some(b'(') {
            return Err(format!("expected '(' at offset {}", self.pos));
        }
        let open = self.pos;
        let bytes = self.bytes();
        let mut tracker = NestingTracker::default();
        let mut i = open;
        while i < bytes.len() {
            let skip = tracker.step(bytes, i)?;
            if bytes[i] == b')' && tracker.is_top_level() {
                self.pos = i + 1;
                return Ok(&self.src[open + 1..i]);
            }
            i += 1 + skip;
        }
        if tracker.in_literal() {
            Err("unterminated string literal".to_string())
        } else {
            Err(format!("unbalanced '(' at offset {}", open))
        }
    }

    pub fn is_at_end(&mut self) -> bool {
        self.skip_whitespace();
        self.pos >= self.src.len()
    }
}

/// Parse a parenthesized column list into unquoted column names
pub fn column_list(inner: &str) -> Result<Vec<String>, String> {
    let mut columns = Vec::new();
    for raw in split_top_level(inner)? {
        let mut cursor = Cursor::new(&raw);
        let name = cursor.qualified_name()?;
        if !cursor.is_at_end() {
            return Err(format!("unexpected text after column name '{}'", name));
        }
        columns.push(name);
    }
    Ok(columns)
}

/// `COPY <table> (<cols>) FROM stdin;`
pub fn parse_copy_header(line: &str) -> Result<(String, Vec<String>), String> {
    let mut cursor = Cursor::new(line);
    if !cursor.eat_keyword("COPY") {
        return Err("expected COPY".to_string());
    }
    let table = cursor.qualified_name()?;
    let columns = column_list(cursor.parenthesized()?)?;
    if !cursor.eat_keyword("FROM") || !cursor.eat_keyword("stdin") {
        return Err("expected FROM stdin".to_string());
    }
    cursor.expect_byte(b';')?;
    if !cursor.is_at_end() {
        return Err(format!("unexpected text after header: '{}'", cursor.rest()));
    }
    Ok((table, columns))
}

/// Parsed `INSERT INTO <table> (<cols>) VALUES (...), (...);`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertStatement {
    pub table: String,
    pub columns: Vec<String>,
    pub tuples: Vec<Vec<String>>,
}

pub fn parse_insert(line: &str) -> Result<InsertStatement, String> {
    let mut cursor = Cursor::new(line);
    if !cursor.eat_keyword("INSERT") || !cursor.eat_keyword("INTO") {
        return Err("expected INSERT INTO".to_string());
    }
    let table = cursor.qualified_name()?;
    let columns = column_list(cursor.parenthesized()?)?;
    if !cursor.eat_keyword("VALUES") {
        return Err("expected VALUES".to_string());
    }

    let mut tuples = Vec::new();
    loop {
        tuples.push(split_top_level(cursor.parenthesized()?)?);
        cursor.skip_whitespace();
        match cursor.peek() {
            Some(b',') => cursor.expect_byte(b',')?,
            Some(b';') => {
                cursor.expect_byte(b';')?;
                break;
            }
            Some(b) => return Err(format!("unexpected '{}' after tuple", b as char)),
            None => return Err("missing ';' after VALUES list".to_string()),
        }
    }
    if !cursor.is_at_end() {
        return Err(format!("unexpected text after statement: '{}'", cursor.rest()));
    }

    Ok(InsertStatement {
        table,
        columns,
        tuples,
    })
}

/// Whether an `INSERT INTO <table>` line names its columns. Lines without a
/// column list cannot be mapped onto a table block.
pub fn insert_has_column_list(line: &str) -> bool {
    let mut cursor = Cursor::new(line);
    if !cursor.eat_keyword("INSERT") || !cursor.eat_keyword("INTO") {
        return false;
    }
    if cursor.qualified_name().is_err() {
        return false;
    }
    cursor.skip_whitespace();
    cursor.peek() == Some(b'(')
}

/// Whether `line` begins with `keyword` as a whole word (case-insensitive)
pub fn starts_with_keyword(line: &str, keyword: &str) -> bool {
    Cursor::new(line).eat_keyword(keyword)
}
