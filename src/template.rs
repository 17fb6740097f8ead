//! Destination templates.
//!
//! A template is plain text with `${name}` placeholders. It is parsed once into
//! segments and then rendered against a capture map as often as needed. Only
//! identifier substitution is supported; nothing inside `${...}` is evaluated.
//!
//! ```
//! use rulemove::template::Template;
//! use std::collections::HashMap;
//!
//! let template = Template::compile("scenes/${scene}/${part}.mp4").unwrap();
//! let captures = HashMap::from([("scene", "01"), ("part", "02")]);
//! assert_eq!(template.render(&captures).unwrap(), "scenes/01/02.mp4");
//! ```

use std::collections::HashMap;
use thiserror::Error;

/// Errors raised while compiling or rendering a template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// A `${` was opened but never closed.
    #[error("unterminated placeholder starting at byte {offset} in '{template}'")]
    Unterminated { template: String, offset: usize },
    /// The text between `${` and `}` is not a valid identifier.
    #[error("invalid placeholder name '{name}' in '{template}'")]
    InvalidName { template: String, name: String },
    /// Rendering referenced a name absent from the capture map.
    #[error("no value for placeholder '{name}'")]
    Missing { name: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// A compiled destination template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

impl Template {
    /// Parses `source` into literal and placeholder segments.
    ///
    /// A `$` that is not followed by `{` is kept as literal text.
    pub fn compile(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = source;

        while let Some(pos) = rest.find("${") {
            literal.push_str(&rest[..pos]);
            let after = &rest[pos + 2..];
            let Some(end) = after.find('}') else {
                return Err(TemplateError::Unterminated {
                    template: source.to_string(),
                    offset: source.len() - rest.len() + pos,
                });
            };

            let name = &after[..end];
            if !is_identifier(name) {
                return Err(TemplateError::InvalidName {
                    template: source.to_string(),
                    name: name.to_string(),
                });
            }

            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(Segment::Placeholder(name.to_string()));
            rest = &after[end + 1..];
        }

        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    /// The template text as written.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Names referenced by the template, in order of appearance (duplicates kept).
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Placeholder(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Expands the template, substituting each placeholder from `captures`.
    ///
    /// # Errors
    ///
    /// Returns `TemplateError::Missing` for the first placeholder with no entry.
    pub fn render(&self, captures: &HashMap<&str, &str>) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(name) => {
                    let value = captures
                        .get(name.as_str())
                        .ok_or_else(|| TemplateError::Missing { name: name.clone() })?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}
