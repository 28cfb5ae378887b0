use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::forms::FormContext;
use crate::render::{BlockRenderer, RenderArgs, Template, TemplateError, TemplateSource};

use super::member::{Group, Key, Member};
use super::path::{self, PathError};

/// A container node in the composition tree.
///
/// A block holds an ordered collection of members (markup text, URLs, nested
/// blocks, nested groups) addressable through slash-delimited paths, and
/// renders by concatenating them in order. The `visible` flag silences the
/// block, and a custom [`BlockRenderer`] replaces the default concatenation.
/// A bound [`Template`] takes precedence over everything else, `visible`
/// included.
#[derive(Clone)]
pub struct Block {
    /// When false the block renders to the empty string (unless a template
    /// is bound, which bypasses this flag).
    pub visible: bool,
    members: Group,
    template: Option<Rc<dyn Template>>,
    renderer: Option<Rc<dyn BlockRenderer>>,
    form_ctx: Option<Rc<FormContext>>,
}

impl Default for Block {
    fn default() -> Self {
        Self {
            visible: true,
            members: Group::new(),
            template: None,
            renderer: None,
            form_ctx: None,
        }
    }
}

impl Block {
    pub fn new() -> Self {
        Self::default()
    }

    /// A block pre-filled with members, in order.
    pub fn with_members<I, M>(members: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<Member>,
    {
        let mut block = Block::new();
        block.add_all(members);
        block
    }

    /// A block rendered by `renderer` instead of member concatenation.
    pub fn with_renderer(renderer: Rc<dyn BlockRenderer>) -> Self {
        let mut block = Block::new();
        block.renderer = Some(renderer);
        block
    }

    /// Number of top-level members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// The top-level member collection.
    pub fn members(&self) -> &Group {
        &self.members
    }

    /// Append a member at top level under the next free index key.
    pub fn add(&mut self, member: impl Into<Member>) {
        let member = self.adopt(member.into());
        self.members.push(member);
    }

    /// Append several members, in order.
    pub fn add_all<I, M>(&mut self, members: I)
    where
        I: IntoIterator<Item = M>,
        M: Into<Member>,
    {
        for member in members {
            self.add(member);
        }
    }

    /// Fold a group into the top-level collection: named entries replace in
    /// place, indexed entries are re-appended.
    pub fn add_group(&mut self, group: Group) {
        if let Member::Group(group) = self.adopt(Member::Group(group)) {
            self.members.merge(group);
        }
    }

    /// Insert at `path`, creating missing interior groups on the way down.
    ///
    /// The slot at `path` is turned into a group if it holds anything else
    /// (the old member moves to index 0). A [`Group`] argument is merged into
    /// that slot entry by entry, unless the path ends with `/`, which pushes
    /// it as one nested element instead. Any other member is pushed.
    pub fn add_p(&mut self, path: &str, member: impl Into<Member>) -> Result<(), PathError> {
        let member = self.adopt(member.into());
        let push_nested = path.ends_with('/');
        trace!(path, push_nested, "add_p");
        match path::split(path) {
            None => insert_into(&mut self.members, member, push_nested),
            Some(segments) => {
                let slot = path::descend_create(&mut self.members, &segments, path)?;
                insert_into(slot.group_for_insert(), member, push_nested);
            }
        }
        Ok(())
    }

    /// Replace the member at `path`, creating missing interior groups.
    /// An empty path is a no-op.
    pub fn set(&mut self, path: &str, member: impl Into<Member>) -> Result<(), PathError> {
        let Some(segments) = path::split(path) else {
            return Ok(());
        };
        let member = self.adopt(member.into());
        trace!(path, "set");
        let slot = path::descend_create(&mut self.members, &segments, path)?;
        *slot = member;
        Ok(())
    }

    /// Remove the member at `path`. Missing paths and the empty path are
    /// no-ops; descending through a leaf is still an error.
    pub fn unset(&mut self, path: &str) -> Result<(), PathError> {
        let Some(segments) = path::split(path) else {
            return Ok(());
        };
        let Some((last, parents)) = segments.split_last() else {
            return Ok(());
        };
        trace!(path, "unset");
        let group = if parents.is_empty() {
            &mut self.members
        } else {
            match path::descend_mut(&mut self.members, parents, path) {
                Ok(Member::Group(group)) => group,
                Ok(_) => return Err(PathError::NotAGroup(path.to_string())),
                Err(PathError::NotFound(_)) => return Ok(()),
                Err(err) => return Err(err),
            }
        };
        group.remove(last);
        Ok(())
    }

    /// Look up the member at `path` without creating anything.
    ///
    /// Single-entry groups whose only member sits at index 0 are collapsed
    /// away before returning. The empty path resolves only when the whole
    /// tree collapses to a single member; use [`Block::members`] for the raw
    /// top-level collection.
    pub fn get(&self, path: &str) -> Result<&Member, PathError> {
        match path::split(path) {
            None => self
                .members
                .sole_indexed()
                .map(Member::collapsed)
                .ok_or_else(|| PathError::NotFound(path.to_string())),
            Some(segments) => {
                path::descend(&self.members, &segments, path).map(Member::collapsed)
            }
        }
    }

    /// Mutable variant of [`Block::get`].
    pub fn get_mut(&mut self, path: &str) -> Result<&mut Member, PathError> {
        match path::split(path) {
            None => self
                .members
                .sole_indexed_mut()
                .map(Member::collapsed_mut)
                .ok_or_else(|| PathError::NotFound(path.to_string())),
            Some(segments) => {
                path::descend_mut(&mut self.members, &segments, path).map(Member::collapsed_mut)
            }
        }
    }

    /// Non-failing probe: does `path` resolve to a non-empty member?
    /// The empty path is always valid.
    pub fn valid_path(&self, path: &str) -> bool {
        let Some(segments) = path::split(path) else {
            return true;
        };
        match path::descend(&self.members, &segments, path) {
            Ok(member) => !member.collapsed().is_empty(),
            Err(_) => false,
        }
    }

    /// Child paths (`{path}/{key}`) of the group at `path`. A resolvable
    /// non-group member yields no subpaths.
    pub fn subpaths(&self, path: &str) -> Result<Vec<String>, PathError> {
        let prefix = path.trim_matches('/');
        let keys: Vec<String> = match path::split(path) {
            None => self.members.keys().map(Key::to_string).collect(),
            Some(segments) => match path::descend(&self.members, &segments, path)? {
                Member::Group(group) => group.keys().map(Key::to_string).collect(),
                _ => return Ok(Vec::new()),
            },
        };
        Ok(keys
            .into_iter()
            .map(|key| {
                if prefix.is_empty() {
                    key
                } else {
                    format!("{prefix}/{key}")
                }
            })
            .collect())
    }

    /// Render the member at `path` (the whole member list for the empty
    /// path). This is the hook slot templates resolve through.
    pub fn render_by_path(&self, path: &str, args: &RenderArgs) -> Result<String, PathError> {
        match path::split(path) {
            None => Ok(self.render_members(args)),
            Some(segments) => {
                Ok(path::descend(&self.members, &segments, path)?.render(args))
            }
        }
    }

    /// Render entry point. A bound template wins outright; otherwise an
    /// invisible block renders empty; otherwise the custom renderer or the
    /// default member concatenation.
    pub fn html(&self, args: &RenderArgs) -> String {
        if let Some(template) = &self.template {
            return template.apply(self);
        }
        if !self.visible {
            return String::new();
        }
        match &self.renderer {
            Some(renderer) => renderer.render(self, args),
            None => self.render_members(args),
        }
    }

    /// All members concatenated in order.
    pub fn render_members(&self, args: &RenderArgs) -> String {
        self.members
            .iter()
            .map(|(_, member)| member.render(args))
            .collect()
    }

    /// Resolve `name` through `source` and bind the template. An empty name
    /// unbinds.
    pub fn load_template(
        &mut self,
        name: &str,
        source: &dyn TemplateSource,
    ) -> Result<(), TemplateError> {
        if name.is_empty() {
            self.template = None;
            return Ok(());
        }
        self.template = Some(source.get_template(name)?);
        Ok(())
    }

    /// Bind an already-built template.
    pub fn set_template(&mut self, template: Rc<dyn Template>) {
        self.template = Some(template);
    }

    pub fn clear_template(&mut self) {
        self.template = None;
    }

    pub fn template(&self) -> Option<&Rc<dyn Template>> {
        self.template.as_ref()
    }

    pub fn has_template(&self) -> bool {
        self.template.is_some()
    }

    pub fn set_renderer(&mut self, renderer: Rc<dyn BlockRenderer>) {
        self.renderer = Some(renderer);
    }

    /// Set this block's form context and force it onto every nested block.
    pub fn set_form_context(&mut self, ctx: Rc<FormContext>) {
        self.members.force_context(&ctx);
        self.form_ctx = Some(ctx);
    }

    pub fn form_context(&self) -> Option<&Rc<FormContext>> {
        self.form_ctx.as_ref()
    }

    /// Called when this block is inserted into a parent: adopt the parent's
    /// form context unless this block already owns one, then initialize
    /// nested blocks the same way.
    pub(crate) fn init(&mut self, parent_ctx: Option<&Rc<FormContext>>) {
        if self.form_ctx.is_none()
            && let Some(ctx) = parent_ctx
        {
            self.set_form_context(Rc::clone(ctx));
        }
        let ctx = self.form_ctx.clone();
        self.members.init_blocks(ctx.as_ref());
    }

    /// Run context propagation over a member about to be inserted.
    fn adopt(&self, mut member: Member) -> Member {
        match &mut member {
            Member::Block(block) => block.init(self.form_ctx.as_ref()),
            Member::Group(group) => group.init_blocks(self.form_ctx.as_ref()),
            _ => {}
        }
        member
    }
}

fn insert_into(group: &mut Group, member: Member, push_nested: bool) {
    match member {
        Member::Group(incoming) if !push_nested => group.merge(incoming),
        member => group.push(member),
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block")
            .field("visible", &self.visible)
            .field("members", &self.members)
            .field("template", &self.template.is_some())
            .field("renderer", &self.renderer.is_some())
            .field("form_ctx", &self.form_ctx)
            .finish()
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.html(&RenderArgs::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::template::TemplateSet;
    use crate::url::Url;
    use pretty_assertions::assert_eq;

    #[test]
    fn members_render_in_insertion_order() {
        let mut block = Block::new();
        block.add("<ul>");
        block.add("<li>one</li>");
        block.add("<li>two</li>");
        block.add("</ul>");
        assert_eq!(block.to_string(), "<ul><li>one</li><li>two</li></ul>");
        assert_eq!(block.len(), 4);
    }

    #[test]
    fn urls_render_through_reassembly() {
        let mut block = Block::new();
        block.add(Url::parse("https://example.com//docs/?v=1"));
        assert_eq!(block.to_string(), "https://example.com/docs?v=1");
    }

    #[test]
    fn add_p_creates_interior_groups() {
        let mut block = Block::new();
        block.add_p("header/nav/items", "<a>home</a>").unwrap();
        block.add_p("header/nav/items", "<a>docs</a>").unwrap();
        assert_eq!(
            block.render_by_path("header/nav", &RenderArgs::default()).unwrap(),
            "<a>home</a><a>docs</a>"
        );
    }

    #[test]
    fn add_p_wraps_existing_scalar_at_index_zero() {
        let mut block = Block::new();
        block.set("title", "first").unwrap();
        block.add_p("title", "second").unwrap();
        assert_eq!(
            block.render_by_path("title", &RenderArgs::default()).unwrap(),
            "firstsecond"
        );
        // the old member is addressable at index 0
        assert_eq!(block.get("title/0").unwrap().as_text(), Some("first"));
        assert_eq!(block.get("title/1").unwrap().as_text(), Some("second"));
    }

    #[test]
    fn add_p_merges_groups_without_trailing_slash() {
        let mut block = Block::new();
        block.add_p("rows", Group::from_iter(["a", "b"])).unwrap();
        block.add_p("rows", Group::from_iter(["c"])).unwrap();
        assert_eq!(block.subpaths("rows").unwrap().len(), 3);
    }

    #[test]
    fn add_p_trailing_slash_pushes_group_as_one_element() {
        let mut block = Block::new();
        block.add_p("rows/", Group::from_iter(["a", "b"])).unwrap();
        block.add_p("rows/", Group::from_iter(["c"])).unwrap();
        // two nested elements, not three flattened ones
        assert_eq!(block.subpaths("rows").unwrap(), vec!["rows/0", "rows/1"]);
        assert_eq!(
            block.render_by_path("rows", &RenderArgs::default()).unwrap(),
            "abc"
        );
    }

    #[test]
    fn add_p_refuses_to_cross_a_leaf() {
        let mut block = Block::new();
        block.set("title", "text").unwrap();
        let err = block.add_p("title/deep/slot", "x").unwrap_err();
        assert_eq!(err, PathError::NotAGroup("title/deep/slot".to_string()));
    }

    #[test]
    fn set_replaces_and_empty_path_is_noop() {
        let mut block = Block::new();
        block.set("body", "old").unwrap();
        block.set("body", "new").unwrap();
        assert_eq!(block.get("body").unwrap().as_text(), Some("new"));

        block.set("", "ignored").unwrap();
        assert_eq!(block.len(), 1);
    }

    #[test]
    fn unset_removes_members() {
        let mut block = Block::new();
        block.set("a/b", "x").unwrap();
        block.unset("a/b").unwrap();
        assert!(!block.valid_path("a/b"));
        // parent group survives, now empty
        assert!(block.get("a").unwrap().as_group().is_some());
    }

    #[test]
    fn unset_missing_path_is_noop() {
        let mut block = Block::new();
        block.unset("never/created").unwrap();
        block.unset("").unwrap();
        // lookup-only: nothing was created along the way
        assert!(block.is_empty());
    }

    #[test]
    fn get_collapses_single_indexed_groups() {
        let mut block = Block::new();
        block.add_p("slot", "only").unwrap();
        // the slot group holds one member at index 0 and collapses away
        assert_eq!(block.get("slot").unwrap().as_text(), Some("only"));

        block.add_p("slot", "more").unwrap();
        assert!(block.get("slot").unwrap().as_group().is_some());
    }

    #[test]
    fn get_empty_path_needs_a_collapsing_tree() {
        let mut block = Block::new();
        block.add("only");
        assert_eq!(block.get("").unwrap().as_text(), Some("only"));

        block.add("more");
        assert!(block.get("").is_err());
    }

    #[test]
    fn get_mut_edits_in_place() {
        let mut block = Block::new();
        block.set("title", "old").unwrap();
        if let Member::Text(text) = block.get_mut("title").unwrap() {
            *text = "new".to_string();
        }
        assert_eq!(block.to_string(), "new");
    }

    #[test]
    fn add_group_merges_at_top_level() {
        let mut block = Block::new();
        block.set("title", "old").unwrap();
        block.add("tail");

        let mut incoming = Group::new();
        *incoming.ensure("title") = Member::Text("new".into());
        incoming.push("extra");
        block.add_group(incoming);

        assert_eq!(block.to_string(), "newtailextra");
        assert_eq!(block.get("title").unwrap().as_text(), Some("new"));
    }

    #[test]
    fn get_missing_path_is_an_error() {
        let block = Block::new();
        assert_eq!(
            block.get("nope").unwrap_err(),
            PathError::NotFound("nope".to_string())
        );
    }

    #[test]
    fn valid_path_probes_without_mutating() {
        let mut block = Block::new();
        block.set("header/title", "Hello").unwrap();

        assert!(block.valid_path(""));
        assert!(block.valid_path("header"));
        assert!(block.valid_path("/header/title/"));
        assert!(!block.valid_path("header/missing"));
        assert!(!block.valid_path("header/title/deeper"));
        // probing did not create anything
        assert_eq!(block.subpaths("header").unwrap(), vec!["header/title"]);
    }

    #[test]
    fn empty_members_are_not_valid_paths() {
        let mut block = Block::new();
        block.set("blank", "").unwrap();
        block.add_p("group", Group::new()).unwrap();
        assert!(!block.valid_path("blank"));
        assert!(!block.valid_path("group"));
    }

    #[test]
    fn subpaths_list_keys_under_a_prefix() {
        let mut block = Block::new();
        block.set("nav/home", "a").unwrap();
        block.set("nav/docs", "b").unwrap();
        block.add_p("nav", "c").unwrap();
        // name keys do not advance the append counter
        assert_eq!(
            block.subpaths("/nav/").unwrap(),
            vec!["nav/home", "nav/docs", "nav/0"]
        );
        assert_eq!(block.subpaths("").unwrap(), vec!["nav"]);
        // a leaf has no subpaths
        assert_eq!(block.subpaths("nav/home").unwrap(), Vec::<String>::new());
    }

    #[test]
    fn invisible_blocks_render_empty() {
        let mut inner = Block::new();
        inner.add("secret");
        inner.visible = false;

        let mut outer = Block::new();
        outer.add("[");
        outer.add(inner);
        outer.add("]");
        assert_eq!(outer.to_string(), "[]");
    }

    #[test]
    fn template_takes_precedence_over_visibility() {
        let mut set = TemplateSet::new();
        set.insert_slots("wrap", "<main>{body}</main>");

        let mut block = Block::new();
        block.set("body", "content").unwrap();
        block.visible = false;
        block.load_template("wrap", &set).unwrap();
        assert_eq!(block.to_string(), "<main>content</main>");

        // unbinding restores the visibility check
        block.load_template("", &set).unwrap();
        assert_eq!(block.to_string(), "");
    }

    #[test]
    fn custom_renderer_replaces_member_concatenation() {
        struct Upper;
        impl BlockRenderer for Upper {
            fn render(&self, block: &Block, args: &RenderArgs) -> String {
                block.render_members(args).to_uppercase()
            }
        }

        let mut block = Block::with_renderer(Rc::new(Upper));
        block.add("shout");
        assert_eq!(block.to_string(), "SHOUT");
    }

    #[test]
    fn render_args_reach_nested_renderers() {
        struct Themed;
        impl BlockRenderer for Themed {
            fn render(&self, _block: &Block, args: &RenderArgs) -> String {
                format!("theme={}", args.get("theme").unwrap_or("none"))
            }
        }

        let mut outer = Block::new();
        outer.add(Block::with_renderer(Rc::new(Themed)));
        let args = RenderArgs::new().with("theme", "dark");
        assert_eq!(outer.html(&args), "theme=dark");
    }

    #[test]
    fn inserted_block_adopts_parent_context() {
        let ctx = Rc::new(FormContext::new("f"));
        let mut parent = Block::new();
        parent.set_form_context(Rc::clone(&ctx));

        let mut grandchild = Block::new();
        grandchild.add("x");
        let mut child = Block::new();
        child.add(grandchild);
        parent.add(child);

        let child_ref = parent.get("0").unwrap().as_block().unwrap();
        assert!(Rc::ptr_eq(child_ref.form_context().unwrap(), &ctx));
        let grandchild_ref = child_ref.get("0").unwrap().as_block().unwrap();
        assert!(Rc::ptr_eq(grandchild_ref.form_context().unwrap(), &ctx));
    }

    #[test]
    fn child_with_own_context_keeps_it() {
        let parent_ctx = Rc::new(FormContext::new("outer"));
        let child_ctx = Rc::new(FormContext::new("inner"));

        let mut parent = Block::new();
        parent.set_form_context(Rc::clone(&parent_ctx));

        let mut child = Block::new();
        child.set_form_context(Rc::clone(&child_ctx));
        parent.add(child);

        let child_ref = parent.get("0").unwrap().as_block().unwrap();
        assert!(Rc::ptr_eq(child_ref.form_context().unwrap(), &child_ctx));
    }

    #[test]
    fn set_form_context_forces_onto_descendants() {
        let first = Rc::new(FormContext::new("first"));
        let second = Rc::new(FormContext::new("second"));

        let mut inner = Block::new();
        inner.set_form_context(Rc::clone(&first));
        let mut outer = Block::new();
        outer.add(inner);

        outer.set_form_context(Rc::clone(&second));
        let inner_ref = outer.get("0").unwrap().as_block().unwrap();
        assert!(Rc::ptr_eq(inner_ref.form_context().unwrap(), &second));
    }

    #[test]
    fn blocks_reached_through_groups_adopt_context() {
        let ctx = Rc::new(FormContext::new("f"));
        let mut parent = Block::new();
        parent.set_form_context(Rc::clone(&ctx));

        let mut leaf = Block::new();
        leaf.add("x");
        parent.add_p("deep/slot", leaf).unwrap();

        let leaf_ref = parent.get("deep/slot").unwrap().as_block().unwrap();
        assert!(Rc::ptr_eq(leaf_ref.form_context().unwrap(), &ctx));
    }
}
