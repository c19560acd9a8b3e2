use std::collections::BTreeMap;

/// A type that maps to one database table.
pub trait Entity {
    /// Name callers use to refer to the entity on the command line.
    const NAME: &'static str;
    const TABLE: &'static str;
}

/// Maps a target to the table it denotes. Returning `None` means the target is
/// taken as a literal table name.
pub trait TableResolver {
    fn table_for(&self, target: &str) -> Option<String>;

    fn resolve(&self, target: &str) -> String {
        self.table_for(target).unwrap_or_else(|| target.to_string())
    }
}

/// Resolver for callers without entities: every target is a table name.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiteralTables;

impl TableResolver for LiteralTables {
    fn table_for(&self, _target: &str) -> Option<String> {
        None
    }
}

impl<F> TableResolver for F
where
    F: Fn(&str) -> Option<String>,
{
    fn table_for(&self, target: &str) -> Option<String> {
        self(target)
    }
}

/// Explicit entity-name to table-name mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityRegistry {
    entities: BTreeMap<String, String>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entity: impl Into<String>, table: impl Into<String>) -> &mut Self {
        self.entities.insert(entity.into(), table.into());
        self
    }

    pub fn register<E: Entity>(&mut self) -> &mut Self {
        self.insert(E::NAME, E::TABLE)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl From<BTreeMap<String, String>> for EntityRegistry {
    fn from(entities: BTreeMap<String, String>) -> Self {
        Self { entities }
    }
}

impl TableResolver for EntityRegistry {
    fn table_for(&self, target: &str) -> Option<String> {
        self.entities
            .get(target)
            .filter(|table| !table.trim().is_empty())
            .cloned()
    }
}
