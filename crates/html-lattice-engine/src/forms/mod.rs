//! The form-facing surface of the composition tree: the shared context that
//! carries bound field values through nested blocks, and the element factory
//! collaborator that maps element kinds to constructors.

pub mod elements;

pub use elements::register_stock_elements;

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

use thiserror::Error;

use crate::tree::Block;

#[derive(Debug, Error)]
pub enum FormError {
    #[error("unmapped element type `{0}`")]
    UnmappedElement(String),
}

/// Shared per-form state. Blocks hold it behind an `Rc`: a block inserted
/// into a parent adopts the parent's context unless it already owns one, and
/// an adopted context is forced onto the whole inserted subtree.
///
/// Elements read their bound value from here at render time, so binding data
/// after the tree is assembled still takes effect.
#[derive(Debug, Default)]
pub struct FormContext {
    form_id: String,
    values: RefCell<BTreeMap<String, String>>,
}

impl FormContext {
    pub fn new(form_id: impl Into<String>) -> Self {
        Self {
            form_id: form_id.into(),
            values: RefCell::new(BTreeMap::new()),
        }
    }

    pub fn form_id(&self) -> &str {
        &self.form_id
    }

    /// Bind a field value by name.
    pub fn bind(&self, name: impl Into<String>, value: impl Into<String>) {
        self.values.borrow_mut().insert(name.into(), value.into());
    }

    pub fn value(&self, name: &str) -> Option<String> {
        self.values.borrow().get(name).cloned()
    }
}

/// Extra construction parameters for a form element (attributes, initial
/// value, label text).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    entries: BTreeMap<String, String>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Constructor for one element kind: `(kind, name, params) -> Block`.
pub type ElementCtor = dyn Fn(&str, &str, &Params) -> Block;

/// The factory collaborator: resolves an element kind to its constructor.
pub trait ElementFactory {
    fn resolve(&self, kind: &str) -> Result<&ElementCtor, FormError>;

    /// Construct an element block. The element is not inserted anywhere; it
    /// joins a form context like any other block when it is added to one.
    fn create(&self, kind: &str, name: &str, params: &Params) -> Result<Block, FormError> {
        Ok(self.resolve(kind)?(kind, name, params))
    }
}

/// Map-backed [`ElementFactory`].
#[derive(Default)]
pub struct ElementMap {
    ctors: HashMap<String, Box<ElementCtor>>,
}

impl ElementMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// An element map preloaded with the stock input elements.
    pub fn with_stock_elements() -> Self {
        let mut map = Self::new();
        register_stock_elements(&mut map);
        map
    }

    pub fn register(
        &mut self,
        kind: impl Into<String>,
        ctor: impl Fn(&str, &str, &Params) -> Block + 'static,
    ) {
        self.ctors.insert(kind.into(), Box::new(ctor));
    }
}

impl ElementFactory for ElementMap {
    fn resolve(&self, kind: &str) -> Result<&ElementCtor, FormError> {
        self.ctors
            .get(kind)
            .map(|ctor| &**ctor)
            .ok_or_else(|| FormError::UnmappedElement(kind.to_string()))
    }
}
