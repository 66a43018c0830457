use crate::agents::version_control::{TagRef, VersionControl};
use crate::error::Result;
use crate::version::Version;
use std::cmp::Ordering;

/// A tag resolved to the commit it points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagEntry {
    pub name: String,
    pub version: Option<Version>,
    pub target: String,
}

impl TagEntry {
    pub fn new(name: impl Into<String>, target: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            version: Version::parse(&name),
            name,
            target: target.into(),
        }
    }
}

impl From<TagRef> for TagEntry {
    fn from(tag: TagRef) -> Self {
        TagEntry::new(tag.name, tag.target)
    }
}

/// Newest version first; tags that are not versions go last, by name.
fn catalog_order(a: &TagEntry, b: &TagEntry) -> Ordering {
    match (&a.version, &b.version) {
        (Some(va), Some(vb)) => vb.cmp(va),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.name.cmp(&b.name),
    }
}

/// Ordered view over the repository's tags.
#[derive(Debug, Clone, Default)]
pub struct TagCatalog {
    entries: Vec<TagEntry>,
}

impl TagCatalog {
    pub fn load(vc: &dyn VersionControl) -> Result<Self> {
        Ok(Self::from_entries(
            vc.list_tags()?.into_iter().map(TagEntry::from).collect(),
        ))
    }

    pub fn from_entries(mut entries: Vec<TagEntry>) -> Self {
        entries.sort_by(catalog_order);
        Self { entries }
    }

    pub fn latest(&self) -> Option<&TagEntry> {
        self.entries.first()
    }

    /// Tags after the latest one, at most `limit` of them.
    pub fn older(&self, limit: usize) -> &[TagEntry] {
        let rest = self.entries.get(1..).unwrap_or(&[]);
        &rest[..rest.len().min(limit)]
    }

    /// Tags pointing at `commit`, in catalog order.
    pub fn tags_at(&self, commit: &str) -> Vec<&TagEntry> {
        self.entries.iter().filter(|t| t.target == commit).collect()
    }

    /// The newest tag pointing at `commit`, if any.
    pub fn current_tag(&self, commit: &str) -> Option<&TagEntry> {
        self.entries.iter().find(|t| t.target == commit)
    }

    /// Whether the latest tag is a strictly newer version than `current`.
    pub fn latest_is_newer_than(&self, current: &TagEntry) -> bool {
        match (self.latest().and_then(|t| t.version.as_ref()), &current.version) {
            (Some(latest), Some(current)) => latest.is_newer_than(current),
            _ => false,
        }
    }
}
