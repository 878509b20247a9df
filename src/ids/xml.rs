//! Small XML reader for IDS documents.
//!
//! Handles elements, attributes, text, CDATA, comments, processing
//! instructions and the predefined/numeric entities. Namespace prefixes are
//! stripped from element and attribute names (`ids:entity` → `entity`).
//! DTDs and external entities are ignored.

use crate::error::IdsError;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: BTreeMap<String, String>,
    pub children: Vec<XmlElement>,
    pub text: String,
}

impl XmlElement {
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |c| c.name == name)
    }

    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Trimmed text content, `None` when blank.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        Some(self.text.trim()).filter(|t| !t.is_empty())
    }
}

fn local_name(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}

/// Returns the raw text of every top-level `<name ...>...</name>` block,
/// matched by local name. Blocks are found textually so a broken block does
/// not hide the ones after it.
#[must_use]
pub fn find_blocks<'a>(document: &'a str, name: &str) -> Vec<&'a str> {
    let mut blocks = Vec::new();
    let mut cursor = 0;

    while let Some(start) = find_tag(document, cursor, name, false) {
        let Some(open_end) = document[start..].find('>').map(|i| start + i + 1) else {
            break;
        };
        if document[..open_end].ends_with("/>") {
            blocks.push(&document[start..open_end]);
            cursor = open_end;
            continue;
        }
        let Some(close) = find_tag(document, open_end, name, true) else {
            break;
        };
        let Some(close_end) = document[close..].find('>').map(|i| close + i + 1) else {
            break;
        };
        blocks.push(&document[start..close_end]);
        cursor = close_end;
    }

    blocks
}

/// Byte offset of the next start (or end) tag with the given local name.
fn find_tag(document: &str, from: usize, name: &str, closing: bool) -> Option<usize> {
    let mut cursor = from;
    while let Some(rel) = document[cursor..].find('<') {
        let start = cursor + rel;
        let mut rest = &document[start + 1..];
        if closing {
            match rest.strip_prefix('/') {
                Some(r) => rest = r,
                None => {
                    cursor = start + 1;
                    continue;
                }
            }
        }
        let tag_name: &str = rest
            .split(|c: char| c.is_whitespace() || c == '>' || c == '/')
            .next()
            .unwrap_or_default();
        if local_name(tag_name) == name {
            return Some(start);
        }
        cursor = start + 1;
    }
    None
}

/// Parses a complete XML fragment with a single root element.
pub fn parse(input: &str) -> Result<XmlElement, IdsError> {
    let mut reader = Reader { input, pos: 0 };
    reader.skip_misc()?;
    let root = reader.element()?;
    reader.skip_misc()?;
    if reader.pos < input.len() {
        return Err(reader.error("content after root element"));
    }
    Ok(root)
}

struct Reader<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Reader<'a> {
    fn rest(&self) -> &str {
        &self.input[self.pos..]
    }

    fn error(&self, message: &str) -> IdsError {
        IdsError::Xml {
            offset: self.pos,
            message: message.to_string(),
        }
    }

    fn skip_whitespace(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.input.len() - trimmed.len();
    }

    fn skip_past(&mut self, terminator: &str) -> Result<(), IdsError> {
        match self.rest().find(terminator) {
            Some(i) => {
                self.pos += i + terminator.len();
                Ok(())
            }
            None => Err(self.error(&format!("unterminated construct, expected '{terminator}'"))),
        }
    }

    /// Skips whitespace, comments, processing instructions and DOCTYPE.
    fn skip_misc(&mut self) -> Result<(), IdsError> {
        loop {
            self.skip_whitespace();
            if self.rest().starts_with("<?") {
                self.skip_past("?>")?;
            } else if self.rest().starts_with("<!--") {
                self.skip_past("-->")?;
            } else if self.rest().starts_with("<!DOCTYPE") {
                self.skip_past(">")?;
            } else {
                return Ok(());
            }
        }
    }

    fn name(&mut self) -> Result<&'a str, IdsError> {
        let input = self.input;
        let rest = self.rest();
        let len = rest
            .find(|c: char| c.is_whitespace() || matches!(c, '>' | '/' | '='))
            .unwrap_or(rest.len());
        if len == 0 {
            return Err(self.error("expected a name"));
        }
        let start = self.pos;
        self.pos += len;
        Ok(&input[start..start + len])
    }

    fn element(&mut self) -> Result<XmlElement, IdsError> {
        if !self.rest().starts_with('<') {
            return Err(self.error("expected '<'"));
        }
        self.pos += 1;
        let qualified = self.name()?.to_string();
        let mut element = XmlElement {
            name: local_name(&qualified).to_string(),
            ..XmlElement::default()
        };

        loop {
            self.skip_whitespace();
            let rest = self.rest();
            if rest.starts_with("/>") {
                self.pos += 2;
                return Ok(element);
            }
            if rest.starts_with('>') {
                self.pos += 1;
                break;
            }
            if rest.is_empty() {
                return Err(self.error("unterminated start tag"));
            }
            let (key, value) = self.attribute()?;
            element.attributes.insert(key, value);
        }

        self.content(&mut element)?;

        // Closing tag must match the qualified name.
        self.pos += 2; // "</"
        let closing = self.name()?;
        if closing != qualified {
            return Err(self.error(&format!(
                "mismatched closing tag '{closing}' for '{qualified}'"
            )));
        }
        self.skip_whitespace();
        if !self.rest().starts_with('>') {
            return Err(self.error("expected '>'"));
        }
        self.pos += 1;
        Ok(element)
    }

    fn attribute(&mut self) -> Result<(String, String), IdsError> {
        let key = local_name(self.name()?).to_string();
        self.skip_whitespace();
        if !self.rest().starts_with('=') {
            return Err(self.error("expected '=' after attribute name"));
        }
        self.pos += 1;
        self.skip_whitespace();
        let quote = match self.rest().chars().next() {
            Some(q @ ('"' | '\'')) => q,
            _ => return Err(self.error("expected quoted attribute value")),
        };
        self.pos += 1;
        let Some(end) = self.rest().find(quote) else {
            return Err(self.error("unterminated attribute value"));
        };
        let raw = &self.input[self.pos..self.pos + end];
        let value = decode_entities(raw).ok_or_else(|| self.error("invalid entity"))?;
        self.pos += end + 1;
        Ok((key, value))
    }

    /// Reads children and text up to (not including) the closing `</`.
    fn content(&mut self, element: &mut XmlElement) -> Result<(), IdsError> {
        loop {
            let rest = self.rest();
            if rest.is_empty() {
                return Err(self.error(&format!("missing closing tag for '{}'", element.name)));
            }
            if rest.starts_with("</") {
                return Ok(());
            }
            if rest.starts_with("<!--") {
                self.skip_past("-->")?;
            } else if let Some(cdata) = rest.strip_prefix("<![CDATA[") {
                let Some(end) = cdata.find("]]>") else {
                    return Err(self.error("unterminated CDATA"));
                };
                element.text.push_str(&cdata[..end]);
                self.pos += "<![CDATA[".len() + end + "]]>".len();
            } else if rest.starts_with("<?") {
                self.skip_past("?>")?;
            } else if rest.starts_with('<') {
                let child = self.element()?;
                element.children.push(child);
            } else {
                let end = rest.find('<').unwrap_or(rest.len());
                let text = decode_entities(&rest[..end]).ok_or_else(|| self.error("invalid entity"))?;
                element.text.push_str(&text);
                self.pos += end;
            }
        }
    }
}

fn decode_entities(raw: &str) -> Option<String> {
    if !raw.contains('&') {
        return Some(raw.to_string());
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let semi = rest[amp..].find(';')? + amp;
        let entity = &rest[amp + 1..semi];
        let decoded = match entity {
            "lt" => '<',
            "gt" => '>',
            "amp" => '&',
            "quot" => '"',
            "apos" => '\'',
            _ => {
                let code = if let Some(hex) = entity.strip_prefix("#x") {
                    u32::from_str_radix(hex, 16).ok()?
                } else {
                    entity.strip_prefix('#')?.parse().ok()?
                };
                char::from_u32(code)?
            }
        };
        out.push(decoded);
        rest = &rest[semi + 1..];
    }
    out.push_str(rest);
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_nested_elements_and_strips_prefixes() {
        let doc = r#"<?xml version="1.0"?>
<!-- header -->
<ids:entity xmlns:ids="http://standards.buildingsmart.org/IDS">
  <ids:name><ids:simpleValue>IFCWALL</ids:simpleValue></ids:name>
  <ids:predefinedType/>
</ids:entity>"#;
        let root = parse(doc).unwrap();
        assert_eq!(root.name, "entity");
        assert_eq!(root.attr("ids"), Some("http://standards.buildingsmart.org/IDS"));
        let value = root.child("name").and_then(|n| n.child("simpleValue"));
        assert_eq!(value.and_then(XmlElement::text), Some("IFCWALL"));
        assert!(root.child("predefinedType").is_some());
    }

    #[test]
    fn decodes_entities_and_cdata() {
        let root = parse(r#"<a t="x &amp; y">1 &lt; 2 <![CDATA[<raw>]]>&#x41;</a>"#).unwrap();
        assert_eq!(root.attr("t"), Some("x & y"));
        assert_eq!(root.text, "1 < 2 <raw>A");
    }

    #[test]
    fn rejects_mismatched_tags() {
        assert!(parse("<a><b></a>").is_err());
        assert!(parse("<a>").is_err());
        assert!(parse("<a x=1></a>").is_err());
    }

    #[test]
    fn find_blocks_ignores_plural_wrapper_and_survives_broken_block() {
        let doc = r#"<ids:specifications>
  <ids:specification name="A"><broken></ids:specification>
  <ids:specification name="B"></ids:specification>
</ids:specifications>"#;
        let blocks = find_blocks(doc, "specification");
        assert_eq!(blocks.len(), 2);
        assert!(parse(blocks[0]).is_err());
        assert_eq!(parse(blocks[1]).unwrap().attr("name"), Some("B"));
    }
}
