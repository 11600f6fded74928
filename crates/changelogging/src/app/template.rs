//! `{placeholder}` format strings rendered through minijinja.
//!
//! Formats such as `[#{issue}]({url}/pull/{issue})` are compiled into equivalent minijinja
//! templates. `{{` and `}}` stand for literal braces, and a placeholder missing from the render
//! context is an error.

use minijinja::{Environment, UndefinedBehavior};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("unclosed placeholder in `{0}`")]
    Unclosed(String),
    #[error("unmatched `}}` in `{0}`")]
    Unmatched(String),
    #[error("invalid placeholder `{{{name}}}` in `{format}`")]
    InvalidPlaceholder { name: String, format: String },
    #[error("failed to render `{format}`")]
    Render {
        format: String,
        #[source]
        source: minijinja::Error,
    },
}

/// A parsed format string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Format {
    source: String,
    template: String,
}

impl Format {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut template = String::with_capacity(source.len() * 2);
        let mut chars = source.chars().peekable();

        while let Some(ch) = chars.next() {
            match ch {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    template.push_str(r#"{{ "{" }}"#);
                }
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(next) => name.push(next),
                            None => return Err(TemplateError::Unclosed(source.to_owned())),
                        }
                    }
                    if !is_identifier(&name) {
                        return Err(TemplateError::InvalidPlaceholder {
                            name,
                            format: source.to_owned(),
                        });
                    }
                    template.push_str("{{ ");
                    template.push_str(&name);
                    template.push_str(" }}");
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    template.push_str(r#"{{ "}" }}"#);
                }
                '}' => return Err(TemplateError::Unmatched(source.to_owned())),
                other => template.push(other),
            }
        }

        Ok(Self {
            source: source.to_owned(),
            template,
        })
    }

    /// The format string as written in the configuration.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn render<S: Serialize>(&self, context: S) -> Result<String, TemplateError> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.render_str(&self.template, context)
            .map_err(|source| TemplateError::Render {
                format: self.source.clone(),
                source,
            })
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|rest| rest.is_ascii_alphanumeric() || rest == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use minijinja::context;

    #[test]
    fn renders_placeholders() {
        let format = Format::parse("[#{issue}]({url}/pull/{issue})").unwrap();
        let rendered = format
            .render(context! { issue => 13, url => "https://example.com" })
            .unwrap();
        assert_eq!(rendered, "[#13](https://example.com/pull/13)");
    }

    #[test]
    fn doubled_braces_are_literal() {
        let format = Format::parse("{{{version}}} {{literal}}").unwrap();
        let rendered = format.render(context! { version => "1.0.0" }).unwrap();
        assert_eq!(rendered, "{1.0.0} {literal}");
    }

    #[test]
    fn jinja_syntax_in_literal_text_is_inert() {
        let format = Format::parse("%} #} {version}").unwrap();
        let rendered = format.render(context! { version => "2" }).unwrap();
        assert_eq!(rendered, "%} #} 2");
    }

    #[test]
    fn rejects_malformed_formats() {
        assert!(matches!(
            Format::parse("{version"),
            Err(TemplateError::Unclosed(_))
        ));
        assert!(matches!(
            Format::parse("version}"),
            Err(TemplateError::Unmatched(_))
        ));
        assert!(matches!(
            Format::parse("{not valid}"),
            Err(TemplateError::InvalidPlaceholder { name, .. }) if name == "not valid"
        ));
        assert!(matches!(
            Format::parse("{}"),
            Err(TemplateError::InvalidPlaceholder { .. })
        ));
    }

    #[test]
    fn unknown_placeholder_fails_to_render() {
        let format = Format::parse("{version} ({codename})").unwrap();
        let err = format.render(context! { version => "1.0.0" }).unwrap_err();
        assert!(matches!(err, TemplateError::Render { .. }));
    }
}
