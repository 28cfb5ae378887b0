use std::fmt;
use std::rc::Rc;

use crate::forms::FormContext;
use crate::render::RenderArgs;
use crate::url::Url;

use super::block::Block;

/// Key of a member inside a [`Group`]: an auto-assigned index (appends) or a
/// name (path-addressed inserts).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Index(usize),
    Name(String),
}

impl Key {
    /// Key created for a path segment: canonical decimal segments become
    /// index keys (`"3"` addresses index 3), everything else is a name.
    /// `"07"` is not canonical and stays a name.
    pub(crate) fn for_segment(segment: &str) -> Key {
        match canonical_index(segment) {
            Some(index) => Key::Index(index),
            None => Key::Name(segment.to_string()),
        }
    }

    pub(crate) fn matches(&self, segment: &str) -> bool {
        match self {
            Key::Name(name) => name == segment,
            Key::Index(index) => canonical_index(segment) == Some(*index),
        }
    }
}

fn canonical_index(segment: &str) -> Option<usize> {
    let canonical =
        segment == "0" || (!segment.starts_with('0') && segment.bytes().all(|b| b.is_ascii_digit()));
    if canonical && !segment.is_empty() {
        segment.parse().ok()
    } else {
        None
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Index(index) => write!(f, "{index}"),
            Key::Name(name) => f.write_str(name),
        }
    }
}

/// One node in the composition tree.
#[derive(Debug, Clone)]
pub enum Member {
    /// Markup emitted verbatim.
    Text(String),
    /// A link, emitted through URL reassembly.
    Url(Url),
    /// A nested block, rendered recursively.
    Block(Block),
    /// A nested ordered collection of members.
    Group(Group),
}

impl Member {
    /// Render this member to markup. Groups concatenate their members in
    /// order; blocks go through their full render pipeline.
    pub fn render(&self, args: &RenderArgs) -> String {
        match self {
            Member::Text(text) => text.clone(),
            Member::Url(url) => url.to_url(None),
            Member::Block(block) => block.html(args),
            Member::Group(group) => group.iter().map(|(_, member)| member.render(args)).collect(),
        }
    }

    /// Empty members are invisible to [`Block::valid_path`]: empty text and
    /// empty groups.
    pub fn is_empty(&self) -> bool {
        match self {
            Member::Text(text) => text.is_empty(),
            Member::Group(group) => group.is_empty(),
            Member::Url(_) | Member::Block(_) => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Member::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_url(&self) -> Option<&Url> {
        match self {
            Member::Url(url) => Some(url),
            _ => None,
        }
    }

    pub fn as_block(&self) -> Option<&Block> {
        match self {
            Member::Block(block) => Some(block),
            _ => None,
        }
    }

    pub fn as_group(&self) -> Option<&Group> {
        match self {
            Member::Group(group) => Some(group),
            _ => None,
        }
    }

    /// See through single-entry groups: a group whose only member sits at
    /// index 0 is transparent, repeatedly.
    pub(crate) fn collapsed(&self) -> &Member {
        let mut current = self;
        while let Member::Group(group) = current
            && let Some(sole) = group.sole_indexed()
        {
            current = sole;
        }
        current
    }

    pub(crate) fn collapsed_mut(&mut self) -> &mut Member {
        if matches!(self, Member::Group(group) if group.is_sole_index_zero()) {
            match self {
                Member::Group(group) => group.entries[0].1.collapsed_mut(),
                _ => unreachable!("just matched a sole-index-zero group"),
            }
        } else {
            self
        }
    }

    /// Mutable group view of this slot for path inserts. A non-group member
    /// is wrapped into a fresh group with the old member at index 0.
    pub(crate) fn group_for_insert(&mut self) -> &mut Group {
        if !matches!(self, Member::Group(_)) {
            let old = std::mem::replace(self, Member::Group(Group::new()));
            if let Member::Group(group) = self {
                group.push(old);
            }
        }
        match self {
            Member::Group(group) => group,
            _ => unreachable!("slot was just replaced with a group"),
        }
    }
}

impl From<String> for Member {
    fn from(text: String) -> Self {
        Member::Text(text)
    }
}

impl From<&str> for Member {
    fn from(text: &str) -> Self {
        Member::Text(text.to_string())
    }
}

impl From<Url> for Member {
    fn from(url: Url) -> Self {
        Member::Url(url)
    }
}

impl From<Block> for Member {
    fn from(block: Block) -> Self {
        Member::Block(block)
    }
}

impl From<Group> for Member {
    fn from(group: Group) -> Self {
        Member::Group(group)
    }
}

/// Ordered key→member collection.
///
/// Appends take the next free index (`max(index) + 1`), path inserts use
/// name keys; both kinds keep their insertion position.
#[derive(Debug, Clone, Default)]
pub struct Group {
    entries: Vec<(Key, Member)>,
    next_index: usize,
}

impl Group {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Member)> {
        self.entries.iter().map(|(key, member)| (key, member))
    }

    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.entries.iter().map(|(key, _)| key)
    }

    /// Append a member under the next free index key.
    pub fn push(&mut self, member: impl Into<Member>) {
        let key = Key::Index(self.next_index);
        self.next_index += 1;
        self.entries.push((key, member.into()));
    }

    pub fn get(&self, segment: &str) -> Option<&Member> {
        self.entries
            .iter()
            .find(|(key, _)| key.matches(segment))
            .map(|(_, member)| member)
    }

    pub fn get_mut(&mut self, segment: &str) -> Option<&mut Member> {
        self.entries
            .iter_mut()
            .find(|(key, _)| key.matches(segment))
            .map(|(_, member)| member)
    }

    /// Remove the member addressed by `segment`, if present.
    pub fn remove(&mut self, segment: &str) -> Option<Member> {
        let position = self.entries.iter().position(|(key, _)| key.matches(segment))?;
        Some(self.entries.remove(position).1)
    }

    /// Existing member for `segment`, or a freshly created empty group under
    /// the segment's key. Index keys claimed this way advance the append
    /// counter past them.
    pub(crate) fn ensure(&mut self, segment: &str) -> &mut Member {
        if let Some(position) = self.entries.iter().position(|(key, _)| key.matches(segment)) {
            return &mut self.entries[position].1;
        }
        let key = Key::for_segment(segment);
        if let Key::Index(index) = key {
            self.next_index = self.next_index.max(index + 1);
        }
        self.entries.push((key, Member::Group(Group::new())));
        let last = self.entries.len() - 1;
        &mut self.entries[last].1
    }

    /// Fold `other` into `self`: named entries replace in place (or append),
    /// indexed entries are re-appended under fresh indices.
    pub(crate) fn merge(&mut self, other: Group) {
        for (key, member) in other.entries {
            match key {
                Key::Name(name) => match self.entries.iter_mut().find(
                    |(existing, _)| matches!(existing, Key::Name(n) if *n == name),
                ) {
                    Some((_, slot)) => *slot = member,
                    None => self.entries.push((Key::Name(name), member)),
                },
                Key::Index(_) => self.push(member),
            }
        }
    }

    pub(crate) fn is_sole_index_zero(&self) -> bool {
        self.entries.len() == 1 && self.entries[0].0 == Key::Index(0)
    }

    pub(crate) fn sole_indexed(&self) -> Option<&Member> {
        if self.is_sole_index_zero() {
            Some(&self.entries[0].1)
        } else {
            None
        }
    }

    pub(crate) fn sole_indexed_mut(&mut self) -> Option<&mut Member> {
        if self.is_sole_index_zero() {
            Some(&mut self.entries[0].1)
        } else {
            None
        }
    }

    /// Initialize nested blocks after insertion: blocks adopt `ctx` when they
    /// have no form context of their own.
    pub(crate) fn init_blocks(&mut self, ctx: Option<&Rc<FormContext>>) {
        for (_, member) in &mut self.entries {
            match member {
                Member::Block(block) => block.init(ctx),
                Member::Group(group) => group.init_blocks(ctx),
                _ => {}
            }
        }
    }

    /// Force `ctx` onto every nested block, recursively.
    pub(crate) fn force_context(&mut self, ctx: &Rc<FormContext>) {
        for (_, member) in &mut self.entries {
            match member {
                Member::Block(block) => block.set_form_context(Rc::clone(ctx)),
                Member::Group(group) => group.force_context(ctx),
                _ => {}
            }
        }
    }
}

impl<M: Into<Member>> FromIterator<M> for Group {
    fn from_iter<T: IntoIterator<Item = M>>(iter: T) -> Self {
        let mut group = Group::new();
        for member in iter {
            group.push(member);
        }
        group
    }
}
