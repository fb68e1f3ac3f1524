use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

use crate::schema::Entity;

static PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[.,!?;:'"()\[\]«»]"#).expect("valid punctuation pattern"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

/// Canonical form of an entity name: lowercase, punctuation stripped,
/// whitespace collapsed. Two entities are the same iff their canonical names
/// are equal.
pub fn canonical_name(name: &str) -> String {
    let lowered = name.to_lowercase();
    let stripped = PUNCTUATION.replace_all(lowered.trim(), "");
    WHITESPACE.replace_all(stripped.trim(), " ").to_string()
}

/// Folds entity records that name the same person.
pub struct EntityNormalizer {
    /// Maps canonical name -> index into the folded list
    aliases: HashMap<String, usize>,
    entities: Vec<Entity>,
}

impl EntityNormalizer {
    pub fn new() -> Self {
        Self {
            aliases: HashMap::new(),
            entities: Vec::new(),
        }
    }

    /// Start from an already folded list, e.g. the entities of a prior report.
    pub fn seeded(entities: Vec<Entity>) -> Self {
        let mut normalizer = Self::new();
        normalizer.extend(entities);
        normalizer
    }

    /// Add one record. The first spelling of a name is the one kept for display.
    pub fn push(&mut self, mut entity: Entity) {
        entity.name = entity.name.trim().to_string();
        let key = canonical_name(&entity.name);

        if key.is_empty() {
            // Nameless entities cannot be matched against anything.
            self.entities.push(entity);
            return;
        }

        if let Some(&idx) = self.aliases.get(&key) {
            self.entities[idx].absorb(entity);
            return;
        }

        self.aliases.insert(key, self.entities.len());
        self.entities.push(entity);
    }

    pub fn extend(&mut self, entities: impl IntoIterator<Item = Entity>) {
        for entity in entities {
            self.push(entity);
        }
    }

    pub fn into_entities(self) -> Vec<Entity> {
        self.entities
    }

    /// Get the mapping of all canonical names
    pub fn get_aliases(&self) -> &HashMap<String, usize> {
        &self.aliases
    }
}

impl Default for EntityNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Fold a list in one pass.
pub fn fold_entities(entities: Vec<Entity>) -> Vec<Entity> {
    let mut normalizer = EntityNormalizer::new();
    normalizer.extend(entities);
    normalizer.into_entities()
}
