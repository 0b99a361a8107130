use crate::bard::Block;
use crate::error::MigrationError;
use crate::yaml::{Mapping, Value, emit_front_matter, parse_front_matter};

pub const DELIMITER: &str = "---";
pub const MAIN_BLOCKS_KEY: &str = "main_blocks";

/// An article file: front-matter mapping plus the inert body after it.
///
/// `body` is everything after the closing delimiter characters, newline
/// included, so serializing reproduces the file exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub front_matter: Mapping,
    pub body: String,
}

impl Document {
    pub fn parse(text: &str) -> Result<Self, MigrationError> {
        let Some(rest) = text
            .strip_prefix("---\n")
            .or_else(|| text.strip_prefix("---\r\n"))
        else {
            return Err(MigrationError::malformed(
                "missing opening `---` front-matter delimiter",
            ));
        };
        let header_start = text.len() - rest.len();

        let mut offset = header_start;
        let mut closing = None;
        for line in rest.split_inclusive('\n') {
            if line.trim_end_matches(['\n', '\r']) == DELIMITER {
                closing = Some(offset);
                break;
            }
            offset += line.len();
        }
        let Some(close_at) = closing else {
            return Err(MigrationError::malformed(
                "missing closing `---` front-matter delimiter",
            ));
        };

        let front_matter = parse_front_matter(&text[header_start..close_at])?;
        if let Some(value) = front_matter.get(MAIN_BLOCKS_KEY)
            && !matches!(value, Value::Seq(_, _) | Value::Null)
        {
            return Err(MigrationError::malformed("main_blocks must be a sequence"));
        }
        Ok(Self {
            front_matter,
            body: text[close_at + DELIMITER.len()..].to_string(),
        })
    }

    pub fn serialize(&self) -> String {
        let mut out = String::from("---\n");
        out.push_str(&emit_front_matter(&self.front_matter));
        out.push_str(DELIMITER);
        out.push_str(&self.body);
        out
    }

    pub fn main_blocks(&self) -> Result<Vec<Block>, MigrationError> {
        let Some(items) = self.front_matter.get(MAIN_BLOCKS_KEY).and_then(Value::as_seq) else {
            return Ok(Vec::new());
        };
        items
            .iter()
            .enumerate()
            .map(|(index, value)| Block::from_value(value, index))
            .collect()
    }

    pub fn set_main_blocks(&mut self, blocks: &[Block]) {
        let style = match self.front_matter.get(MAIN_BLOCKS_KEY) {
            Some(Value::Seq(_, style)) => *style,
            _ => Default::default(),
        };
        let items = blocks.iter().map(Block::to_value).collect();
        self.front_matter
            .insert(MAIN_BLOCKS_KEY, Value::Seq(items, style));
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.front_matter.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.front_matter.get_str(key)
    }

    pub fn id(&self) -> Option<&str> {
        self.get_str("id")
    }

    pub fn title(&self) -> Option<&str> {
        self.get_str("title")
    }

    pub fn slug(&self) -> Option<&str> {
        self.get_str("slug")
    }
}
