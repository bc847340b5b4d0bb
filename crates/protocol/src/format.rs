//! Wire form of formatted values.

use serde::{Deserialize, Serialize};

use crate::constants::NBSP;
use crate::value::Value;

/// A captured value after formatting, ready for transmission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum Formatted {
    /// Primitive passed through unchanged.
    ///
    /// On the wire the value goes through [`Value::to_json`], so `undefined`
    /// and non-finite numbers are sent as `null` and decode as
    /// [`Value::Null`]. Receivers cannot tell them apart.
    Primitive(Value),
    /// Serialized text of an array.
    Text(String),
    /// Block rendering of an object or callable.
    Block(RenderedBlock),
    /// Constructor name of an object that is neither plain nor callable.
    TypeName(String),
}

impl Formatted {
    /// Human-readable text of this value, as a viewer would show it.
    pub fn text(&self) -> String {
        match self {
            Formatted::Primitive(v) => v.to_string(),
            Formatted::Text(s) | Formatted::TypeName(s) => s.clone(),
            Formatted::Block(block) => match &block.hint {
                Some(hint) => format!("{hint}\n{}", block.flatten()),
                None => block.flatten(),
            },
        }
    }
}

impl From<&str> for Formatted {
    fn from(s: &str) -> Self {
        Formatted::Primitive(Value::from(s))
    }
}

impl From<String> for Formatted {
    fn from(s: String) -> Self {
        Formatted::Primitive(Value::String(s))
    }
}

/// Text laid out as lines of single characters for display widgets.
///
/// Spaces are replaced by [`NBSP`] so that renderers which collapse
/// whitespace keep indentation intact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedBlock {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    pub lines: Vec<Vec<char>>,
}

impl RenderedBlock {
    /// Splits `text` into lines and characters.
    pub fn render(text: &str) -> Self {
        let lines = text
            .split('\n')
            .map(|line| {
                line.chars()
                    .map(|c| if c == ' ' { NBSP } else { c })
                    .collect()
            })
            .collect();
        Self { hint: None, lines }
    }

    /// Attaches an explanatory hint shown above the block.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Reassembles the text the block was rendered from.
    pub fn flatten(&self) -> String {
        self.lines
            .iter()
            .map(|line| {
                line.iter()
                    .map(|&c| if c == NBSP { ' ' } else { c })
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
