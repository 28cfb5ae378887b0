use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use thiserror::Error;
use tracing::debug;

use crate::render::RenderArgs;
use crate::tree::Block;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("unknown template `{0}`")]
    Unknown(String),
    #[error("failed to read template `{name}` from {path}: {source}")]
    Read {
        name: String,
        path: PathBuf,
        source: std::io::Error,
    },
}

/// An external renderer bound to a block. A bound template takes precedence
/// over the block's own rendering, including its `visible` flag.
pub trait Template {
    fn apply(&self, block: &Block) -> String;
}

/// Where blocks resolve templates by name (`Block::load_template`).
pub trait TemplateSource {
    fn get_template(&self, name: &str) -> Result<Rc<dyn Template>, TemplateError>;
}

/// Segment of a parsed [`SlotTemplate`].
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Slot(String),
}

/// Literal markup with `{path}` slots rendered through the bound block's
/// `render_by_path`.
///
/// `{{` and `}}` escape literal braces. An unclosed `{` and a stray `}` are
/// kept as literal text. A slot whose path does not resolve renders empty.
#[derive(Debug, Clone)]
pub struct SlotTemplate {
    segments: Vec<Segment>,
}

impl SlotTemplate {
    pub fn parse(text: &str) -> Self {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = text;

        loop {
            let Some(brace) = rest.find(['{', '}']) else {
                literal.push_str(rest);
                break;
            };
            literal.push_str(&rest[..brace]);
            let after = &rest[brace..];

            if let Some(tail) = after.strip_prefix("{{") {
                literal.push('{');
                rest = tail;
            } else if let Some(tail) = after.strip_prefix("}}") {
                literal.push('}');
                rest = tail;
            } else if let Some(tail) = after.strip_prefix('}') {
                literal.push('}');
                rest = tail;
            } else {
                let body = &after[1..];
                match body.find('}') {
                    Some(close) => {
                        if !literal.is_empty() {
                            segments.push(Segment::Literal(std::mem::take(&mut literal)));
                        }
                        segments.push(Segment::Slot(body[..close].to_string()));
                        rest = &body[close + 1..];
                    }
                    None => {
                        literal.push('{');
                        rest = body;
                    }
                }
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        SlotTemplate { segments }
    }
}

impl Template for SlotTemplate {
    fn apply(&self, block: &Block) -> String {
        let args = RenderArgs::default();
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Slot(path) => match block.render_by_path(path, &args) {
                    Ok(rendered) => out.push_str(&rendered),
                    Err(err) => {
                        debug!(%path, %err, "template slot did not resolve");
                    }
                },
            }
        }
        out
    }
}

/// In-memory name→template source.
#[derive(Default)]
pub struct TemplateSet {
    templates: HashMap<String, Rc<dyn Template>>,
}

impl TemplateSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, template: Rc<dyn Template>) {
        self.templates.insert(name.into(), template);
    }

    /// Shorthand for registering a parsed [`SlotTemplate`].
    pub fn insert_slots(&mut self, name: impl Into<String>, text: &str) {
        self.insert(name, Rc::new(SlotTemplate::parse(text)));
    }
}

impl TemplateSource for TemplateSet {
    fn get_template(&self, name: &str) -> Result<Rc<dyn Template>, TemplateError> {
        self.templates
            .get(name)
            .cloned()
            .ok_or_else(|| TemplateError::Unknown(name.to_string()))
    }
}

/// Template source backed by `<name>.tpl` files under a root directory.
/// Parsed templates are cached per name.
pub struct FileTemplates {
    root: PathBuf,
    cache: RefCell<HashMap<String, Rc<dyn Template>>>,
}

impl FileTemplates {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl TemplateSource for FileTemplates {
    fn get_template(&self, name: &str) -> Result<Rc<dyn Template>, TemplateError> {
        if let Some(template) = self.cache.borrow().get(name) {
            return Ok(Rc::clone(template));
        }

        let path = self.root.join(format!("{name}.tpl"));
        let text = std::fs::read_to_string(&path).map_err(|source| TemplateError::Read {
            name: name.to_string(),
            path: path.clone(),
            source,
        })?;

        debug!(name, path = %path.display(), "loaded template file");
        let template: Rc<dyn Template> = Rc::new(SlotTemplate::parse(&text));
        self.cache
            .borrow_mut()
            .insert(name.to_string(), Rc::clone(&template));
        Ok(template)
    }
}
