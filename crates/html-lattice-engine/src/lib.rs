pub mod forms;
pub mod render;
pub mod tree;
pub mod url;

// Re-export key types for easier usage
pub use forms::{ElementFactory, ElementMap, FormContext, FormError, Params};
pub use render::{
    BlockRenderer, FileTemplates, RenderArgs, SlotTemplate, Template, TemplateError, TemplateSet,
    TemplateSource,
};
pub use tree::{Block, Group, Key, Member, PathError};
pub use url::{Query, Url};
