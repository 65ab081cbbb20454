/// Key-construction helpers shared by the Redis and memory stores.
#[derive(Debug, Clone)]
pub struct KeyContext<'a> {
    pub prefix: &'a str,
}

impl<'a> KeyContext<'a> {
    pub fn new(prefix: &'a str) -> Self {
        Self { prefix }
    }

    pub fn entity(&self, collection: &str, entity_id: &str) -> String {
        format!("{}{}", self.entity_prefix(collection), entity_id)
    }

    /// Everything before the id in an entity key; also the search index prefix.
    pub fn entity_prefix(&self, collection: &str) -> String {
        format!("{}:{}:", self.prefix, collection)
    }

    /// Prefix for unique reservations; the joined values are appended.
    /// Format: prefix:collection:unique:field1,field2:
    pub fn unique_prefix(&self, collection: &str, fields: &[&str]) -> String {
        format!("{}:{}:unique:{}:", self.prefix, collection, fields.join(","))
    }

    /// Key for reverse relation lookup - the set of children of `child_collection`
    /// whose `alias` relation points at `parent_id`.
    /// Format: prefix:child_collection:rev_rel:alias:parent_id
    pub fn reverse_relation(&self, child_collection: &str, alias: &str, parent_id: &str) -> String {
        format!("{}{}", self.reverse_relation_prefix(child_collection, alias), parent_id)
    }

    pub fn reverse_relation_prefix(&self, child_collection: &str, alias: &str) -> String {
        format!("{}:{}:rev_rel:{}:", self.prefix, child_collection, alias)
    }

    pub fn search_index(&self, collection: &str) -> String {
        format!("{}:{}:idx", self.prefix, collection)
    }

    /// Glob matching every key under this prefix.
    pub fn prefix_pattern(&self) -> String {
        format!("{}:*", self.prefix)
    }
}

/// Joins unique-constraint values the same way the Lua scripts do.
pub fn join_unique_values(values: &[String], case_insensitive: bool) -> String {
    let joined = values.join("|");
    if case_insensitive { joined.to_ascii_lowercase() } else { joined }
}
