use std::collections::HashMap;

use crate::error::ParseError;

#[derive(Debug, Clone, PartialEq)]
pub enum StepValue {
    String(String),
    Real(f64),
    Integer(i64),
    Boolean(bool),
    Enum(String),
    Reference(u64),
    List(Vec<StepValue>),
    /// A typed value such as `IFCLABEL('F90')`.
    Typed(String, Box<StepValue>),
    Null,
    Derived,
}

impl StepValue {
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            StepValue::String(s) => Some(s),
            StepValue::Typed(_, inner) => inner.as_str(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_reference(&self) -> Option<u64> {
        match self {
            StepValue::Reference(id) => Some(*id),
            _ => None,
        }
    }

    /// Collects references from a list value; anything else yields nothing.
    #[must_use]
    pub fn references(&self) -> Vec<u64> {
        match self {
            StepValue::List(items) => items.iter().filter_map(StepValue::as_reference).collect(),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StepEntity {
    pub id: u64,
    pub entity_type: String,
    pub values: Vec<StepValue>,
}

impl StepEntity {
    #[must_use]
    pub fn str_at(&self, index: usize) -> Option<&str> {
        self.values.get(index).and_then(StepValue::as_str)
    }
}

#[derive(Debug, Default)]
pub struct StepFile {
    pub entities: HashMap<u64, StepEntity>,
    pub schema: String,
    by_type: HashMap<String, Vec<u64>>,
}

impl StepFile {
    /// Parses the DATA section of a STEP physical file.
    ///
    /// Statements may span several lines; a statement ends at the first `;`
    /// outside a string literal. Lines that do not form a valid entity are
    /// skipped.
    pub fn parse(content: &str) -> Result<Self, ParseError> {
        let mut file = StepFile::default();
        let mut saw_data = false;
        let mut in_data = false;

        for statement in split_statements(content) {
            let statement = statement.trim();

            if let Some(rest) = statement.strip_prefix("FILE_SCHEMA") {
                if let Some(schema) = rest.split('\'').nth(1) {
                    file.schema = schema.to_string();
                }
                continue;
            }

            if statement == "DATA" {
                saw_data = true;
                in_data = true;
                continue;
            }
            if statement == "ENDSEC" {
                in_data = false;
                continue;
            }

            if in_data && statement.starts_with('#') {
                if let Some(entity) = Self::parse_entity(statement) {
                    file.insert(entity);
                }
            }
        }

        if !saw_data {
            return Err(ParseError::InvalidStep {
                message: "missing DATA section".to_string(),
            });
        }

        Ok(file)
    }

    fn insert(&mut self, entity: StepEntity) {
        self.by_type
            .entry(entity.entity_type.clone())
            .or_default()
            .push(entity.id);
        self.entities.insert(entity.id, entity);
    }

    fn parse_entity(statement: &str) -> Option<StepEntity> {
        // Format: #123=IFCWALL('guid',#ref,'name',...)
        let (id, rest) = statement.strip_prefix('#')?.split_once('=')?;
        let id: u64 = id.trim().parse().ok()?;

        let rest = rest.trim();
        let paren_pos = rest.find('(')?;
        let entity_type = rest[..paren_pos].trim().to_ascii_uppercase();
        let body = rest[paren_pos + 1..].strip_suffix(')')?;

        Some(StepEntity {
            id,
            entity_type,
            values: parse_values(body),
        })
    }

    #[must_use]
    pub fn get_entity(&self, id: u64) -> Option<&StepEntity> {
        self.entities.get(&id)
    }

    /// Entities of one type, in ascending id order.
    #[must_use]
    pub fn get_entities_by_type(&self, entity_type: &str) -> Vec<&StepEntity> {
        let mut found: Vec<&StepEntity> = self
            .by_type
            .get(entity_type)
            .into_iter()
            .flatten()
            .filter_map(|id| self.entities.get(id))
            .collect();
        found.sort_by_key(|e| e.id);
        found
    }
}

fn split_statements(content: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut in_string = false;

    for ch in content.chars() {
        match ch {
            '\'' => {
                in_string = !in_string;
                current.push(ch);
            }
            ';' if !in_string => statements.push(std::mem::take(&mut current)),
            '\n' | '\r' if !in_string => current.push(' '),
            _ => current.push(ch),
        }
    }
    if !current.trim().is_empty() {
        statements.push(current);
    }

    statements
}

fn parse_values(s: &str) -> Vec<StepValue> {
    let mut values = Vec::new();
    let mut current = String::new();
    let mut in_string = false;
    let mut depth = 0usize;

    for ch in s.chars() {
        match ch {
            '\'' => {
                in_string = !in_string;
                current.push(ch);
            }
            '(' if !in_string => {
                depth += 1;
                current.push(ch);
            }
            ')' if !in_string => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            ',' if !in_string && depth == 0 => {
                values.push(parse_single_value(&current));
                current.clear();
            }
            _ => current.push(ch),
        }
    }

    if !current.trim().is_empty() {
        values.push(parse_single_value(&current));
    }

    values
}

fn parse_single_value(s: &str) -> StepValue {
    let s = s.trim();

    match s {
        "$" => return StepValue::Null,
        "*" => return StepValue::Derived,
        ".T." => return StepValue::Boolean(true),
        ".F." => return StepValue::Boolean(false),
        _ => {}
    }
    if let Some(id) = s.strip_prefix('#').and_then(|r| r.parse::<u64>().ok()) {
        return StepValue::Reference(id);
    }
    if s.len() >= 2 && s.starts_with('\'') && s.ends_with('\'') {
        return StepValue::String(decode_step_string(&s[1..s.len() - 1]));
    }
    if s.len() >= 2 && s.starts_with('.') && s.ends_with('.') {
        return StepValue::Enum(s[1..s.len() - 1].to_string());
    }
    if let Some(inner) = s.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
        return StepValue::List(parse_values(inner));
    }
    if let Ok(i) = s.parse::<i64>() {
        return StepValue::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return StepValue::Real(f);
    }
    if let Some(paren_pos) = s.find('(') {
        if let Some(inner) = s[paren_pos + 1..].strip_suffix(')') {
            let type_name = s[..paren_pos].trim().to_ascii_uppercase();
            return StepValue::Typed(type_name, Box::new(parse_single_value(inner)));
        }
    }

    StepValue::String(s.to_string())
}

/// Decodes STEP string escapes: `\X2\....\X0\` (UCS-2 runs), `\X\hh`
/// (ISO 8859-1 byte), `\S\c` (high-bit shift), `\\` and `''`.
fn decode_step_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some('X') => match chars.next() {
                    Some('2') => {
                        chars.next(); // '\'
                        let hex: String = std::iter::from_fn(|| chars.next_if(|&c| c != '\\'))
                            .collect();
                        // terminator \X0\
                        for _ in 0..4 {
                            chars.next();
                        }
                        let units: Vec<u16> = hex
                            .as_bytes()
                            .chunks(4)
                            .filter_map(|chunk| std::str::from_utf8(chunk).ok())
                            .filter_map(|h| u16::from_str_radix(h, 16).ok())
                            .collect();
                        out.extend(char::decode_utf16(units).filter_map(Result::ok));
                    }
                    Some('\\') => {
                        let hex: String = chars.by_ref().take(2).collect();
                        if let Ok(code) = u8::from_str_radix(&hex, 16) {
                            out.push(char::from(code));
                        }
                    }
                    other => {
                        out.push_str("\\X");
                        out.extend(other);
                    }
                },
                Some('S') => {
                    chars.next(); // '\'
                    if let Some(c) = chars.next() {
                        if let Ok(byte) = u8::try_from(u32::from(c)) {
                            out.push(char::from(byte.wrapping_add(128)));
                        }
                    }
                }
                Some('\\') => out.push('\\'),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            },
            '\'' => {
                if chars.peek() == Some(&'\'') {
                    chars.next();
                }
                out.push('\'');
            }
            _ => out.push(ch),
        }
    }

    out
}
