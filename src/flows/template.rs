//! Prompt instruction templates.
//!
//! Supported syntax:
//! - `{{field}}` / `{{{field}}}` for substitution (dotted paths, `this`,
//!   `@index`, `@first`, `@last`)
//! - `{{#each list}}...{{/each}}`, optionally `{{#each list separator=", "}}`
//! - `{{#if cond}}...{{else}}...{{/if}}` and `{{#unless cond}}...{{/unless}}`
//! - `{{media url=field}}` to inline a data-URI field as a media part
//! - `{{! comment }}`
//!
//! Templates are parsed once into a [`Node`] tree and rendered against an
//! already validated input.

use std::borrow::Cow;

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use super::schema::Violation;
use crate::genai::Part;
use crate::media::from_data_uri;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TemplateError {
    #[error("unclosed tag at byte {0}")]
    UnclosedTag(usize),
    #[error("closing tag /{0} has no matching block")]
    UnexpectedClose(String),
    #[error("block #{0} is never closed")]
    UnclosedBlock(String),
    #[error("unknown block helper #{0}")]
    UnknownHelper(String),
    #[error("malformed tag '{0}'")]
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Path {
    This,
    Index,
    First,
    Last,
    Field(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Text(String),
    Var(Path),
    Media(Path),
    Each {
        list: Path,
        separator: Option<String>,
        body: Vec<Node>,
    },
    If {
        cond: Path,
        then: Vec<Node>,
        otherwise: Vec<Node>,
    },
    Unless {
        cond: Path,
        body: Vec<Node>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    nodes: Vec<Node>,
}

lazy_static! {
    static ref PATH_RE: Regex =
        Regex::new(r"^(this|@index|@first|@last|[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*)$")
            .unwrap();
    static ref EACH_RE: Regex =
        Regex::new(r#"^each\s+(\S+)(?:\s+separator="([^"]*)")?$"#).unwrap();
    static ref COND_RE: Regex = Regex::new(r"^(if|unless)\s+(\S+)$").unwrap();
    static ref MEDIA_RE: Regex = Regex::new(r"^media\s+url=(\S+)$").unwrap();
}

impl Path {
    fn parse(raw: &str) -> Result<Self, TemplateError> {
        if !PATH_RE.is_match(raw) {
            return Err(TemplateError::Malformed(raw.to_string()));
        }
        Ok(match raw {
            "this" => Path::This,
            "@index" => Path::Index,
            "@first" => Path::First,
            "@last" => Path::Last,
            _ => Path::Field(raw.split('.').map(str::to_string).collect()),
        })
    }

    fn describe(&self) -> String {
        match self {
            Path::This => "this".into(),
            Path::Index => "@index".into(),
            Path::First => "@first".into(),
            Path::Last => "@last".into(),
            Path::Field(segments) => segments.join("."),
        }
    }
}

// ---- parsing ----

enum Token<'a> {
    Text(&'a str),
    Tag(&'a str),
}

fn tokenize(src: &str) -> Result<Vec<Token<'_>>, TemplateError> {
    let mut tokens = Vec::new();
    let mut rest = src;
    let mut offset = 0;

    while let Some(start) = rest.find("{{") {
        if start > 0 {
            tokens.push(Token::Text(&rest[..start]));
        }
        let tail = &rest[start..];
        let (open, close) = if tail.starts_with("{{{") {
            (3, "}}}")
        } else {
            (2, "}}")
        };
        let len = tail[open..]
            .find(close)
            .ok_or(TemplateError::UnclosedTag(offset + start))?;
        tokens.push(Token::Tag(tail[open..open + len].trim()));

        let consumed = start + open + len + close.len();
        rest = &rest[consumed..];
        offset += consumed;
    }
    if !rest.is_empty() {
        tokens.push(Token::Text(rest));
    }
    Ok(tokens)
}

enum Stop {
    Eof,
    Else,
    Close(String),
}

struct Parser<'a> {
    tokens: Vec<Token<'a>>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn block(&mut self) -> Result<(Vec<Node>, Stop), TemplateError> {
        let mut nodes = Vec::new();
        while self.pos < self.tokens.len() {
            let token = &self.tokens[self.pos];
            self.pos += 1;
            let tag = match token {
                Token::Text(t) => {
                    nodes.push(Node::Text((*t).to_string()));
                    continue;
                }
                Token::Tag(tag) => *tag,
            };

            if tag.starts_with('!') {
                continue;
            }
            if tag == "else" {
                return Ok((nodes, Stop::Else));
            }
            if let Some(name) = tag.strip_prefix('/') {
                return Ok((nodes, Stop::Close(name.trim().to_string())));
            }
            if let Some(header) = tag.strip_prefix('#') {
                nodes.push(self.helper(header.trim())?);
                continue;
            }
            if let Some(caps) = MEDIA_RE.captures(tag) {
                nodes.push(Node::Media(Path::parse(&caps[1])?));
                continue;
            }
            nodes.push(Node::Var(Path::parse(tag)?));
        }
        Ok((nodes, Stop::Eof))
    }

    fn expect_close(&mut self, helper: &str, stop: Stop) -> Result<(), TemplateError> {
        match stop {
            Stop::Close(name) if name == helper => Ok(()),
            Stop::Close(name) => Err(TemplateError::UnexpectedClose(name)),
            Stop::Else => Err(TemplateError::Malformed(format!("else inside #{}", helper))),
            Stop::Eof => Err(TemplateError::UnclosedBlock(helper.to_string())),
        }
    }

    fn helper(&mut self, header: &str) -> Result<Node, TemplateError> {
        if let Some(caps) = EACH_RE.captures(header) {
            let list = Path::parse(&caps[1])?;
            let separator = caps.get(2).map(|m| m.as_str().to_string());
            let (body, stop) = self.block()?;
            self.expect_close("each", stop)?;
            return Ok(Node::Each {
                list,
                separator,
                body,
            });
        }

        if let Some(caps) = COND_RE.captures(header) {
            let kind = caps[1].to_string();
            let cond = Path::parse(&caps[2])?;
            let (body, stop) = self.block()?;
            if kind == "unless" {
                self.expect_close("unless", stop)?;
                return Ok(Node::Unless { cond, body });
            }
            let otherwise = match stop {
                Stop::Else => {
                    let (otherwise, stop) = self.block()?;
                    self.expect_close("if", stop)?;
                    otherwise
                }
                stop => {
                    self.expect_close("if", stop)?;
                    Vec::new()
                }
            };
            return Ok(Node::If {
                cond,
                then: body,
                otherwise,
            });
        }

        let name = header.split_whitespace().next().unwrap_or(header);
        Err(TemplateError::UnknownHelper(name.to_string()))
    }
}

impl Template {
    pub fn parse(src: &str) -> Result<Self, TemplateError> {
        let mut parser = Parser {
            tokens: tokenize(src)?,
            pos: 0,
        };
        let (nodes, stop) = parser.block()?;
        match stop {
            Stop::Eof => Ok(Self { nodes }),
            Stop::Close(name) => Err(TemplateError::UnexpectedClose(name)),
            Stop::Else => Err(TemplateError::Malformed("else".into())),
        }
    }

    /// Renders into prompt parts; adjacent text is merged and media
    /// references become inline media parts.
    pub fn render(&self, input: &Value) -> Result<Vec<Part>, Violation> {
        let mut out = Output::default();
        let frame = Frame {
            this: input,
            index: None,
        };
        render_nodes(&self.nodes, &frame, &mut out)?;
        Ok(out.finish())
    }
}

// ---- rendering ----

struct Frame<'v> {
    this: &'v Value,
    /// (position, length) of the enclosing `#each` iteration.
    index: Option<(usize, usize)>,
}

impl<'v> Frame<'v> {
    fn resolve(&self, path: &Path) -> Cow<'v, Value> {
        match path {
            Path::This => Cow::Borrowed(self.this),
            Path::Index => self
                .index
                .map(|(i, _)| Cow::Owned(Value::from(i)))
                .unwrap_or(Cow::Owned(Value::Null)),
            Path::First => Cow::Owned(Value::Bool(matches!(self.index, Some((0, _))))),
            Path::Last => Cow::Owned(Value::Bool(
                self.index.is_some_and(|(i, len)| i + 1 == len),
            )),
            Path::Field(segments) => {
                let mut cur = self.this;
                for seg in segments {
                    match cur.get(seg.as_str()) {
                        Some(v) => cur = v,
                        None => return Cow::Owned(Value::Null),
                    }
                }
                Cow::Borrowed(cur)
            }
        }
    }
}

#[derive(Default)]
struct Output {
    parts: Vec<Part>,
}

impl Output {
    fn text(&mut self, s: &str) {
        if s.is_empty() {
            return;
        }
        if let Some(Part::Text(last)) = self.parts.last_mut() {
            last.push_str(s);
        } else {
            self.parts.push(Part::Text(s.to_string()));
        }
    }

    fn finish(self) -> Vec<Part> {
        self.parts
    }
}

fn render_nodes(nodes: &[Node], frame: &Frame<'_>, out: &mut Output) -> Result<(), Violation> {
    for node in nodes {
        match node {
            Node::Text(t) => out.text(t),
            Node::Var(path) => out.text(&stringify(&frame.resolve(path))),
            Node::Media(path) => {
                let value = frame.resolve(path);
                let raw = value.as_str().ok_or_else(|| {
                    Violation::new(
                        format!("$.{}", path.describe()),
                        "media reference is not a data uri string",
                    )
                })?;
                let media = from_data_uri(raw)
                    .map_err(|e| Violation::new(format!("$.{}", path.describe()), e.to_string()))?;
                out.parts.push(Part::Media(media));
            }
            Node::Each {
                list,
                separator,
                body,
            } => {
                let value = frame.resolve(list);
                let Some(items) = value.as_array() else {
                    continue;
                };
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        if let Some(sep) = separator {
                            out.text(sep);
                        }
                    }
                    let child = Frame {
                        this: item,
                        index: Some((i, items.len())),
                    };
                    render_nodes(body, &child, out)?;
                }
            }
            Node::If {
                cond,
                then,
                otherwise,
            } => {
                let branch = if truthy(&frame.resolve(cond)) {
                    then
                } else {
                    otherwise
                };
                render_nodes(branch, frame, out)?;
            }
            Node::Unless { cond, body } => {
                if !truthy(&frame.resolve(cond)) {
                    render_nodes(body, frame, out)?;
                }
            }
        }
    }
    Ok(())
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_f64() {
            // whole floats print without a trailing `.0`
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => (f as i64).to_string(),
            _ => n.to_string(),
        },
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(stringify).collect::<Vec<_>>().join(","),
        Value::Object(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render_text(src: &str, input: Value) -> String {
        let parts = Template::parse(src).unwrap().render(&input).unwrap();
        match parts.as_slice() {
            [] => String::new(),
            [Part::Text(t)] => t.clone(),
            other => panic!("expected a single text part, got {:?}", other),
        }
    }

    #[test]
    fn substitutes_fields_in_both_brace_styles() {
        let out = render_text(
            "Goals: {{{fitnessGoals}}} / Level: {{experienceLevel}} / Age: {{age}}",
            json!({"fitnessGoals": "lose fat", "experienceLevel": "beginner", "age": 31}),
        );
        assert_eq!(out, "Goals: lose fat / Level: beginner / Age: 31");
    }

    #[test]
    fn missing_fields_render_empty() {
        assert_eq!(render_text("[{{nothing}}]", json!({})), "[]");
        assert_eq!(render_text("[{{a.b.c}}]", json!({"a": {"b": 1}})), "[]");
    }

    #[test]
    fn dotted_paths_walk_objects() {
        assert_eq!(
            render_text("{{profile.name}}", json!({"profile": {"name": "Sam"}})),
            "Sam"
        );
    }

    #[test]
    fn each_with_unless_last_joins_items() {
        let out = render_text(
            "Goals: {{#each goals}}{{{this}}}{{#unless @last}}, {{/unless}}{{/each}}.",
            json!({"goals": ["weight_loss", "muscle_gain", "endurance"]}),
        );
        assert_eq!(out, "Goals: weight_loss, muscle_gain, endurance.");
    }

    #[test]
    fn each_with_separator_and_index() {
        let out = render_text(
            r#"{{#each days separator="; "}}{{@index}}={{day}}:{{duration}}{{/each}}"#,
            json!({"days": [{"day": "Mon", "duration": 30}, {"day": "Tue", "duration": 0}]}),
        );
        assert_eq!(out, "0=Mon:30; 1=Tue:0");
    }

    #[test]
    fn each_over_missing_list_renders_nothing() {
        assert_eq!(render_text("a{{#each xs}}x{{/each}}b", json!({})), "ab");
    }

    #[test]
    fn if_else_and_unless_follow_truthiness() {
        let src = "{{#if items}}has{{else}}none{{/if}}|{{#unless flag}}off{{/unless}}";
        assert_eq!(render_text(src, json!({"items": [1], "flag": true})), "has|");
        assert_eq!(render_text(src, json!({"items": [], "flag": false})), "none|off");
        assert_eq!(render_text(src, json!({"items": 0})), "none|off");
    }

    #[test]
    fn comments_are_dropped() {
        assert_eq!(render_text("a{{! ignore me }}b", json!({})), "ab");
    }

    #[test]
    fn media_splits_prompt_into_parts() {
        let t = Template::parse("Analyze:\n{{media url=imageDataUri}}\nThanks").unwrap();
        let parts = t
            .render(&json!({"imageDataUri": "data:image/jpeg;base64,AAEC"}))
            .unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], Part::Text("Analyze:\n".into()));
        match &parts[1] {
            Part::Media(m) => {
                assert_eq!(m.mime_type, "image/jpeg");
                assert_eq!(m.data, vec![0, 1, 2]);
            }
            other => panic!("expected media, got {:?}", other),
        }
        assert_eq!(parts[2], Part::Text("\nThanks".into()));
    }

    #[test]
    fn media_must_be_a_data_uri() {
        let t = Template::parse("{{media url=photo}}").unwrap();
        let err = t.render(&json!({"photo": 42})).unwrap_err();
        assert_eq!(err.path, "$.photo");
        let err = t.render(&json!({"photo": "not base64!"})).unwrap_err();
        assert_eq!(err.path, "$.photo");
    }

    #[test]
    fn reports_structural_errors() {
        assert_eq!(
            Template::parse("{{#each xs}}x").unwrap_err(),
            TemplateError::UnclosedBlock("each".into())
        );
        assert_eq!(
            Template::parse("{{#if a}}x{{/each}}").unwrap_err(),
            TemplateError::UnexpectedClose("each".into())
        );
        assert_eq!(
            Template::parse("x{{/if}}").unwrap_err(),
            TemplateError::UnexpectedClose("if".into())
        );
        assert_eq!(
            Template::parse("{{#with a}}{{/with}}").unwrap_err(),
            TemplateError::UnknownHelper("with".into())
        );
        assert!(matches!(
            Template::parse("hello {{name"),
            Err(TemplateError::UnclosedTag(6))
        ));
        assert!(matches!(
            Template::parse("{{bad name}}"),
            Err(TemplateError::Malformed(_))
        ));
    }

    #[test]
    fn parses_nested_blocks_into_tree() {
        let t = Template::parse("{{#each a}}{{#if b}}x{{/if}}{{/each}}").unwrap();
        match t.nodes.as_slice() {
            [Node::Each { body, .. }] => assert!(matches!(body.as_slice(), [Node::If { .. }])),
            other => panic!("unexpected tree {:?}", other),
        }
    }

    #[test]
    fn whole_floats_render_like_integers() {
        let out = render_text("{{a}} {{b}} {{c}}", json!({"a": 82.0, "b": 62.5, "c": 3}));
        assert_eq!(out, "82 62.5 3");
    }
}
