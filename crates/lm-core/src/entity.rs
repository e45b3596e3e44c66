//! Entity catalog and hierarchy resolution
//!
//! Entities form single-inheritance trees. Each entity owns one physical
//! table holding only the fields it declares itself; inherited fields live in
//! the ancestor tables and are reached by joining on the record identifier.

use crate::error::{CoreError, CoreResult};
use crate::newtype_string::define_newtype_string;
use crate::variant::StorageVariant;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

define_newtype_string! {
    /// Name of an entity type in the catalog.
    pub struct EntityName;
    valid = |s: &str| !s.trim().is_empty(),
    expected = "a non-empty name";
}

/// Declarative description of one entity type, as written in `locmig.yml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntityDef {
    /// Entity type name
    pub name: EntityName,

    /// Physical base table owned by this entity
    pub table: String,

    /// Parent entity type, if this type extends another
    #[serde(default)]
    pub parent: Option<EntityName>,

    /// Translatable fields declared directly on this entity's table
    #[serde(default)]
    pub fields: Vec<String>,

    /// Whether the entity keeps a `_Versions` history table
    #[serde(default)]
    pub versioned: bool,

    /// Whether the entity keeps a published `_Live` copy
    #[serde(default)]
    pub staged_live: bool,
}

/// A resolved entity type.
///
/// `versioned` and `staged_live` are effective flags: a subclass inherits
/// them from any ancestor that declares them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityType {
    pub name: EntityName,
    pub table: String,
    pub parent: Option<EntityName>,
    pub fields: Vec<String>,
    pub versioned: bool,
    pub staged_live: bool,
}

impl EntityType {
    /// Storage variants this entity is replicated across, in migration order.
    pub fn variants(&self) -> Vec<StorageVariant> {
        StorageVariant::ALL
            .into_iter()
            .filter(|variant| match variant {
                StorageVariant::Current => true,
                StorageVariant::Live => self.staged_live,
                StorageVariant::Versions => self.versioned,
            })
            .collect()
    }

    /// Fields declared directly on this entity's own table.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Whether this entity is a hierarchy root.
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// The entity graph, built once from declarative definitions.
#[derive(Debug)]
pub struct EntityCatalog {
    /// Inheritance edges, parent -> child
    graph: DiGraph<EntityName, ()>,

    /// Map from entity name to node index
    node_map: HashMap<EntityName, NodeIndex>,

    /// Resolved entities in declaration order
    entities: Vec<EntityType>,

    /// Map from entity name to position in `entities`
    positions: HashMap<EntityName, usize>,
}

impl EntityCatalog {
    /// Build and validate the catalog.
    pub fn build(defs: &[EntityDef]) -> CoreResult<Self> {
        let mut graph = DiGraph::new();
        let mut node_map = HashMap::new();
        let mut positions = HashMap::new();
        let mut tables = HashSet::new();

        for (pos, def) in defs.iter().enumerate() {
            if node_map.contains_key(&def.name) {
                return Err(CoreError::InvalidCatalog {
                    message: format!("entity '{}' is declared more than once", def.name),
                });
            }
            if def.table.trim().is_empty() {
                return Err(CoreError::InvalidCatalog {
                    message: format!("entity '{}' has an empty table name", def.name),
                });
            }
            if !tables.insert(def.table.to_lowercase()) {
                return Err(CoreError::InvalidCatalog {
                    message: format!(
                        "table '{}' is claimed by more than one entity (second: '{}')",
                        def.table, def.name
                    ),
                });
            }
            let mut seen_fields = HashSet::new();
            for field in &def.fields {
                if field.trim().is_empty() {
                    return Err(CoreError::InvalidCatalog {
                        message: format!("entity '{}' declares an empty field name", def.name),
                    });
                }
                if !seen_fields.insert(field.to_lowercase()) {
                    return Err(CoreError::InvalidCatalog {
                        message: format!(
                            "field '{}' is declared twice on entity '{}'",
                            field, def.name
                        ),
                    });
                }
            }

            let idx = graph.add_node(def.name.clone());
            node_map.insert(def.name.clone(), idx);
            positions.insert(def.name.clone(), pos);
        }

        for def in defs {
            if let Some(parent) = &def.parent {
                let Some(&parent_idx) = node_map.get(parent) else {
                    return Err(CoreError::InvalidCatalog {
                        message: format!(
                            "entity '{}' extends unknown parent '{}'",
                            def.name, parent
                        ),
                    });
                };
                graph.add_edge(parent_idx, node_map[&def.name], ());
            }
        }

        if let Err(cycle) = toposort(&graph, None) {
            let start = &graph[cycle.node_id()];
            return Err(CoreError::CircularInheritance {
                cycle: Self::describe_cycle(defs, start),
            });
        }

        let mut catalog = Self {
            graph,
            node_map,
            entities: Vec::with_capacity(defs.len()),
            positions,
        };
        catalog.entities = defs
            .iter()
            .map(|def| catalog.resolve(defs, def))
            .collect();
        catalog.check_field_ownership()?;

        log::debug!("Built entity catalog with {} entities", catalog.entities.len());
        Ok(catalog)
    }

    /// Follow parent links from `start` until the chain repeats.
    fn describe_cycle(defs: &[EntityDef], start: &EntityName) -> String {
        let parents: HashMap<&EntityName, &EntityName> = defs
            .iter()
            .filter_map(|d| d.parent.as_ref().map(|p| (&d.name, p)))
            .collect();
        let mut path = vec![start.to_string()];
        let mut visited = HashSet::new();
        let mut current = start;
        visited.insert(current);
        while let Some(parent) = parents.get(current) {
            path.push(parent.to_string());
            if !visited.insert(*parent) {
                break;
            }
            current = *parent;
        }
        path.join(" -> ")
    }

    /// Compute effective flags for `def` by walking its declared ancestry.
    fn resolve(&self, defs: &[EntityDef], def: &EntityDef) -> EntityType {
        let mut versioned = def.versioned;
        let mut staged_live = def.staged_live;
        let mut parent = def.parent.as_ref();
        while let Some(name) = parent {
            let ancestor = &defs[self.positions[name]];
            versioned |= ancestor.versioned;
            staged_live |= ancestor.staged_live;
            parent = ancestor.parent.as_ref();
        }
        EntityType {
            name: def.name.clone(),
            table: def.table.clone(),
            parent: def.parent.clone(),
            fields: def.fields.clone(),
            versioned,
            staged_live,
        }
    }

    /// A field must be owned by exactly one table along any ancestor chain.
    fn check_field_ownership(&self) -> CoreResult<()> {
        for entity in &self.entities {
            let chain = self.ancestors(&entity.name)?;
            let mut owners: HashMap<String, &EntityName> = HashMap::new();
            for member in chain {
                for field in &member.fields {
                    if let Some(owner) = owners.insert(field.to_lowercase(), &member.name) {
                        return Err(CoreError::InvalidCatalog {
                            message: format!(
                                "field '{}' on entity '{}' is already owned by ancestor '{}'",
                                field, member.name, owner
                            ),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Look up an entity by name.
    pub fn get(&self, name: &str) -> CoreResult<&EntityType> {
        self.positions
            .get(name)
            .map(|&pos| &self.entities[pos])
            .ok_or_else(|| CoreError::UnknownEntityType {
                name: name.to_string(),
            })
    }

    /// Root entity types in declaration order.
    pub fn roots(&self) -> Vec<&EntityType> {
        self.entities.iter().filter(|e| e.is_root()).collect()
    }

    /// All entities in declaration order.
    pub fn entities(&self) -> &[EntityType] {
        &self.entities
    }

    /// Whether the catalog has no entities at all.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// The ancestor chain of `name`, root first, ending with the entity itself.
    pub fn ancestors(&self, name: &str) -> CoreResult<Vec<&EntityType>> {
        let mut chain = vec![self.get(name)?];
        while let Some(parent) = chain.last().copied().and_then(|e| e.parent.as_ref()) {
            chain.push(self.get(parent)?);
        }
        chain.reverse();
        Ok(chain)
    }

    /// The root type plus every registered subclass, ancestors before descendants.
    ///
    /// Siblings keep their declaration order so plans are deterministic.
    pub fn resolve_hierarchy(&self, root: &str) -> CoreResult<Vec<&EntityType>> {
        let root_entity = self.get(root)?;
        let mut ordered = Vec::new();
        self.collect_preorder(self.node_map[&root_entity.name], &mut ordered);
        Ok(ordered
            .into_iter()
            .map(|idx| &self.entities[self.positions[&self.graph[idx]]])
            .collect())
    }

    fn collect_preorder(&self, idx: NodeIndex, out: &mut Vec<NodeIndex>) {
        out.push(idx);
        let mut children: Vec<NodeIndex> = self.graph.edges(idx).map(|e| e.target()).collect();
        children.sort_by_key(|child| self.positions[&self.graph[*child]]);
        for child in children {
            self.collect_preorder(child, out);
        }
    }

    /// Every hierarchy in the catalog, concatenated root by root.
    pub fn all_hierarchies(&self) -> Vec<&EntityType> {
        self.roots()
            .into_iter()
            .flat_map(|root| {
                let mut ordered = Vec::new();
                self.collect_preorder(self.node_map[&root.name], &mut ordered);
                ordered
            })
            .map(|idx| &self.entities[self.positions[&self.graph[idx]]])
            .collect()
    }
}

#[cfg(test)]
#[path = "entity_test.rs"]
mod tests;
