//! Name and id resolution over the reference tables.
//!
//! Resolution is an exact match on the canonical name column. Fact tables
//! sometimes carry their own "last known name" for an entity; when that
//! diverges from the reference table the reference name wins, and the fact
//! name is only shown when the id does not resolve at all
//! ([`EntityResolver::display_with_fallback`]).

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use arrow::array::{Array, RecordBatch};

use crate::error::{Error, Result};
use crate::schema::Table;
use crate::utils::{cell, get_str_column};

/// Display text for an id that does not resolve.
pub const UNKNOWN: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Driver,
    Constructor,
    GrandPrix,
    Country,
    Circuit,
}

impl EntityKind {
    pub fn table(self) -> Table {
        match self {
            EntityKind::Driver => Table::Drivers,
            EntityKind::Constructor => Table::Constructors,
            EntityKind::GrandPrix => Table::GrandsPrix,
            EntityKind::Country => Table::Countries,
            EntityKind::Circuit => Table::Circuits,
        }
    }

    pub fn id_column(self) -> &'static str {
        "id"
    }

    /// Column holding the canonical display name.
    pub fn name_column(self) -> &'static str {
        match self {
            EntityKind::GrandPrix => "fullName",
            _ => "name",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntityKind::Driver => "driver",
            EntityKind::Constructor => "constructor",
            EntityKind::GrandPrix => "grand prix",
            EntityKind::Country => "country",
            EntityKind::Circuit => "circuit",
        })
    }
}

/// Bidirectional id/name index over one reference table.
#[derive(Debug, Clone)]
pub struct EntityResolver {
    kind: EntityKind,
    batch: RecordBatch,
    /// id -> (row, canonical name)
    by_id: HashMap<String, (usize, Option<String>)>,
    /// name -> distinct ids, in first-seen order
    by_name: BTreeMap<String, Vec<String>>,
}

impl EntityResolver {
    pub fn from_batch(kind: EntityKind, batch: RecordBatch) -> Result<Self> {
        let ids = get_str_column(&batch, kind.id_column())?;
        let names = get_str_column(&batch, kind.name_column())?;

        let mut by_id = HashMap::with_capacity(batch.num_rows());
        let mut by_name: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for row in 0..batch.num_rows() {
            if ids.is_null(row) {
                continue;
            }
            let id = ids.value(row).to_string();
            let name = (!names.is_null(row)).then(|| names.value(row).to_string());
            if let Some(name) = &name {
                let entry = by_name.entry(name.clone()).or_default();
                if !entry.contains(&id) {
                    entry.push(id.clone());
                }
            }
            by_id.entry(id).or_insert((row, name));
        }

        Ok(Self {
            kind,
            batch,
            by_id,
            by_name,
        })
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Resolve a display name to its id.
    pub fn resolve_name_to_id(&self, name: &str) -> Result<&str> {
        match self.by_name.get(name).map(Vec::as_slice) {
            Some([id]) => Ok(id.as_str()),
            Some(ids) if !ids.is_empty() => Err(Error::AmbiguousName {
                kind: self.kind,
                name: name.to_string(),
                ids: ids.to_vec(),
            }),
            _ => Err(Error::NotFound {
                kind: self.kind,
                key: name.to_string(),
            }),
        }
    }

    /// Canonical display name of an id, `None` when it does not resolve.
    pub fn id_to_display(&self, id: &str) -> Option<&str> {
        self.by_id.get(id).and_then(|(_, name)| name.as_deref())
    }

    /// Canonical display name, or [`UNKNOWN`].
    pub fn display_or_unknown(&self, id: &str) -> &str {
        self.id_to_display(id).unwrap_or(UNKNOWN)
    }

    /// Display name for a fact row that also carries its own name for the
    /// entity. The reference name takes precedence; `last_known` is used only
    /// for ids missing from the reference table.
    pub fn display_with_fallback<'a>(&'a self, id: &str, last_known: Option<&'a str>) -> &'a str {
        self.id_to_display(id).or(last_known).unwrap_or(UNKNOWN)
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// All display names, sorted, for selection lists.
    pub fn names(&self) -> Vec<&str> {
        self.by_name.keys().map(String::as_str).collect()
    }

    /// Any other column of the entity's reference row, rendered as text.
    pub fn attribute(&self, id: &str, column: &str) -> Result<Option<String>> {
        match self.by_id.get(id) {
            Some((row, _)) => cell(&self.batch, column, *row),
            None => Err(Error::NotFound {
                kind: self.kind,
                key: id.to_string(),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
