//! YAML front matter of local markdown files.
//!
//! A front matter block is delimited by `---` lines at the very top of the
//! file. Keys keep their original order; values are read as strings.

use crate::error::{ModelError, ModelResult};
use serde_yaml::{Mapping, Value};

const DELIMITER: &str = "---";

/// Splits a file into its raw front matter and body.
///
/// Returns `(None, text)` when the file does not open with a delimited
/// block. Blank lines between the block and the body are dropped.
pub fn split_front_matter(text: &str) -> (Option<&str>, &str) {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let Some(first_line_end) = text.find('\n') else {
        return (None, text);
    };
    if text[..first_line_end].trim_end() != DELIMITER {
        return (None, text);
    }

    let content_start = first_line_end + 1;
    let mut offset = content_start;
    for line in text[content_start..].split_inclusive('\n') {
        if line.trim_end() == DELIMITER {
            let raw = &text[content_start..offset];
            let body = text[offset + line.len()..].trim_start_matches(['\n', '\r']);
            return (Some(raw), body);
        }
        offset += line.len();
    }
    (None, text)
}

/// Ordered key-value header of a markdown file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrontMatter {
    map: Mapping,
}

impl FrontMatter {
    /// Creates an empty front matter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses the raw YAML between the delimiters.
    pub fn parse(raw: &str) -> ModelResult<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let value: Value =
            serde_yaml::from_str(raw).map_err(|e| ModelError::FrontMatter(e.to_string()))?;
        match value {
            Value::Mapping(map) => Ok(Self { map }),
            Value::Null => Ok(Self::default()),
            _ => Err(ModelError::FrontMatter(
                "front matter is not a key-value mapping".into(),
            )),
        }
    }

    /// Splits a whole file and parses its front matter, if any.
    pub fn extract(text: &str) -> ModelResult<(Self, &str)> {
        match split_front_matter(text) {
            (Some(raw), body) => Ok((Self::parse(raw)?, body)),
            (None, body) => Ok((Self::default(), body)),
        }
    }

    /// Returns a value as a string. Nulls and empty strings read as `None`.
    pub fn get(&self, key: &str) -> Option<String> {
        let text = match self.map.get(key)? {
            Value::Null => return None,
            Value::String(s) => s.trim().to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            other => serde_yaml::to_string(other).ok()?.trim().to_string(),
        };
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    /// Sets a string value, keeping the key's position if it exists.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.map
            .insert(Value::String(key.to_string()), Value::String(value.into()));
    }

    /// Removes a key.
    pub fn remove(&mut self, key: &str) -> bool {
        self.map.remove(key).is_some()
    }

    /// Returns true if the key is present.
    pub fn contains(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns true if there are no keys.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Keys in order.
    pub fn keys(&self) -> Vec<String> {
        self.map
            .keys()
            .filter_map(|k| k.as_str().map(str::to_string))
            .collect()
    }

    /// Renders the YAML between the delimiters.
    pub fn render(&self) -> ModelResult<String> {
        if self.map.is_empty() {
            return Ok(String::new());
        }
        serde_yaml::to_string(&self.map).map_err(|e| ModelError::FrontMatter(e.to_string()))
    }

    /// Renders a whole file: this front matter followed by `body`.
    pub fn to_document(&self, body: &str) -> ModelResult<String> {
        let body = body.trim_start_matches(['\n', '\r']);
        let mut out = String::new();
        if !self.map.is_empty() {
            out.push_str(DELIMITER);
            out.push('\n');
            out.push_str(&self.render()?);
            out.push_str(DELIMITER);
            out.push_str("\n\n");
        }
        out.push_str(body);
        if !out.ends_with('\n') {
            out.push('\n');
        }
        Ok(out)
    }

    /// Applies `updates` to the front matter of `text`, preserving every
    /// other key and the body.
    pub fn merge_into(text: &str, updates: &[(&str, String)]) -> ModelResult<String> {
        let (mut front, body) = Self::extract(text)?;
        for (key, value) in updates {
            front.set(key, value.clone());
        }
        front.to_document(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "---\ntitle: Design Notes\ntype: spec\ntags:\n  - a\n  - b\n---\n\n# Heading\n\nBody.\n";

    #[test]
    fn split_finds_body() {
        let (raw, body) = split_front_matter(DOC);
        assert!(raw.unwrap().contains("title: Design Notes"));
        assert_eq!(body, "# Heading\n\nBody.\n");
    }

    #[test]
    fn no_front_matter() {
        let text = "# Title\n\n---\n\ntext\n";
        let (raw, body) = split_front_matter(text);
        assert!(raw.is_none());
        assert_eq!(body, text);
    }

    #[test]
    fn unterminated_block_is_body() {
        let text = "---\ntitle: x\nno end\n";
        let (raw, body) = split_front_matter(text);
        assert!(raw.is_none());
        assert_eq!(body, text);
    }

    #[test]
    fn get_reads_scalars_as_strings() {
        let fm = FrontMatter::parse("title: Hi\ncount: 3\nflag: true\nempty:\nblank: ''").unwrap();
        assert_eq!(fm.get("title").as_deref(), Some("Hi"));
        assert_eq!(fm.get("count").as_deref(), Some("3"));
        assert_eq!(fm.get("flag").as_deref(), Some("true"));
        assert_eq!(fm.get("empty"), None);
        assert_eq!(fm.get("blank"), None);
        assert_eq!(fm.get("missing"), None);
    }

    #[test]
    fn non_mapping_is_rejected() {
        assert!(matches!(
            FrontMatter::parse("- a\n- b"),
            Err(ModelError::FrontMatter(_))
        ));
    }

    #[test]
    fn merge_preserves_unrelated_keys_and_order() {
        let merged = FrontMatter::merge_into(
            DOC,
            &[
                ("notion_id", "abc".to_string()),
                ("title", "Design Notes".to_string()),
            ],
        )
        .unwrap();
        let (fm, body) = FrontMatter::extract(&merged).unwrap();
        assert_eq!(fm.keys(), vec!["title", "type", "tags", "notion_id"]);
        assert_eq!(fm.get("notion_id").as_deref(), Some("abc"));
        assert!(fm.get("tags").unwrap().contains('a'));
        assert_eq!(body, "# Heading\n\nBody.\n");
    }

    #[test]
    fn merge_is_idempotent() {
        let updates = [("notion_id", "abc".to_string())];
        let once = FrontMatter::merge_into(DOC, &updates).unwrap();
        let twice = FrontMatter::merge_into(&once, &updates).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn merge_adds_front_matter_to_plain_file() {
        let merged = FrontMatter::merge_into("Just text\n", &[("title", "T".into())]).unwrap();
        assert!(merged.starts_with("---\ntitle: T\n---\n\nJust text"));
    }
}
