//! Rename resolution.
//!
//! When an entity disappears from one side and another of the same kind
//! appears on the other, the diff engine cannot tell a rename from a
//! drop-and-create. It asks a [`Resolver`], supplied by the caller, to
//! partition the candidates.
//!
//! ```rust,ignore
//! use ddlkit_migrate::resolver::{HeuristicResolver, HintResolver};
//!
//! // Rename when the shape matches exactly.
//! let resolver = HeuristicResolver;
//!
//! // Replay decisions recorded in earlier snapshots.
//! let resolver = HintResolver::load("migrations/renames.json").await?;
//! ```

use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::ddl::{Entity, EntityKey, EntityKind};
use crate::error::{MigrateResult, MigrationError};
use crate::snapshot::RenameHint;

/// Candidates offered to a resolver.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolverInput {
    /// Entities only on the `to` side.
    pub created: Vec<Entity>,
    /// Entities only on the `from` side.
    pub deleted: Vec<Entity>,
}

/// A rename decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Renamed {
    pub from: Entity,
    pub to: Entity,
}

/// Partition of a [`ResolverInput`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolverOutput {
    pub created: Vec<Entity>,
    pub deleted: Vec<Entity>,
    pub renamed: Vec<Renamed>,
}

impl ResolverOutput {
    /// Everything stays a create or a drop.
    pub fn unchanged(input: ResolverInput) -> Self {
        Self {
            created: input.created,
            deleted: input.deleted,
            renamed: Vec::new(),
        }
    }
}

/// Decides which create/drop pairs are renames.
///
/// Implementations must place every input entity in exactly one output
/// bucket. The engine checks this and fails with
/// [`MigrationError::ResolverContract`] otherwise.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Partition one group of candidates of a single kind.
    async fn resolve(&self, kind: EntityKind, input: ResolverInput)
    -> MigrateResult<ResolverOutput>;
}

/// Never renames.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRenames;

#[async_trait]
impl Resolver for NoRenames {
    async fn resolve(
        &self,
        _kind: EntityKind,
        input: ResolverInput,
    ) -> MigrateResult<ResolverOutput> {
        Ok(ResolverOutput::unchanged(input))
    }
}

/// Renames when a deleted and a created entity have the same shape apart
/// from their key. Pairs are taken first-come in input order.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicResolver;

#[async_trait]
impl Resolver for HeuristicResolver {
    async fn resolve(
        &self,
        _kind: EntityKind,
        input: ResolverInput,
    ) -> MigrateResult<ResolverOutput> {
        let mut created: Vec<Option<Entity>> = input.created.into_iter().map(Some).collect();
        let mut output = ResolverOutput::default();

        for deleted in input.deleted {
            let found = created
                .iter()
                .position(|c| c.as_ref().is_some_and(|c| same_shape(&deleted, c)));
            match found.and_then(|i| created[i].take()) {
                Some(to) => output.renamed.push(Renamed { from: deleted, to }),
                None => output.deleted.push(deleted),
            }
        }
        output.created = created.into_iter().flatten().collect();
        Ok(output)
    }
}

fn same_shape(a: &Entity, b: &Entity) -> bool {
    use crate::ddl::DdlEntity;

    match (a, b) {
        (Entity::Schema(a), Entity::Schema(b)) => a.same_shape(b),
        (Entity::Enum(a), Entity::Enum(b)) => a.same_shape(b),
        (Entity::Sequence(a), Entity::Sequence(b)) => a.same_shape(b),
        (Entity::Role(a), Entity::Role(b)) => a.same_shape(b),
        // A table's shape lives in its columns, which are not visible here.
        (Entity::Table(_), Entity::Table(_)) => false,
        (Entity::Column(a), Entity::Column(b)) => a.same_shape(b),
        (Entity::Index(a), Entity::Index(b)) => a.same_shape(b),
        (Entity::Pk(a), Entity::Pk(b)) => a.same_shape(b),
        (Entity::Unique(a), Entity::Unique(b)) => a.same_shape(b),
        (Entity::Check(a), Entity::Check(b)) => a.same_shape(b),
        (Entity::Fk(a), Entity::Fk(b)) => a.same_shape(b),
        (Entity::Policy(a), Entity::Policy(b)) => a.same_shape(b),
        (Entity::View(a), Entity::View(b)) => a.same_shape(b),
        _ => false,
    }
}

/// Applies recorded [`RenameHint`]s. Chains (`a → b`, `b → c`) compose.
///
/// The diff renames schemas and tables before it looks at their children,
/// so hints for table-level entities are rebased onto the final name of
/// their table when the resolver is built.
#[derive(Debug, Clone, Default)]
pub struct HintResolver {
    hints: Vec<RenameHint>,
}

impl HintResolver {
    /// Create a resolver from hints in application order.
    pub fn new(hints: Vec<RenameHint>) -> Self {
        Self {
            hints: rebase(hints),
        }
    }

    /// Load hints from a JSON array file. A missing file yields no hints.
    pub async fn load(path: impl AsRef<Path>) -> MigrateResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = tokio::fs::read_to_string(path).await?;
        let hints = serde_json::from_str(&content).map_err(|e| {
            MigrationError::other(format!(
                "Failed to parse rename hints {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(Self::new(hints))
    }

    /// Recorded hints.
    pub fn hints(&self) -> &[RenameHint] {
        &self.hints
    }

    /// Follow the hint chain starting at `key`.
    fn destinations(&self, kind: EntityKind, key: &EntityKey) -> Vec<EntityKey> {
        let mut out = Vec::new();
        let mut current = key.clone();
        let mut visited = HashSet::new();
        while visited.insert(current.clone()) {
            match self
                .hints
                .iter()
                .find(|h| h.entity_type == kind && h.from == current)
            {
                Some(hint) => {
                    current = hint.to.clone();
                    out.push(current.clone());
                }
                None => break,
            }
        }
        out
    }
}

#[async_trait]
impl Resolver for HintResolver {
    async fn resolve(
        &self,
        kind: EntityKind,
        input: ResolverInput,
    ) -> MigrateResult<ResolverOutput> {
        let mut created: Vec<Option<Entity>> = input.created.into_iter().map(Some).collect();
        let mut output = ResolverOutput::default();

        for deleted in input.deleted {
            let destinations = self.destinations(kind, &deleted.key());
            // The furthest hop that exists on the `to` side wins.
            let found = destinations.iter().rev().find_map(|dest| {
                created
                    .iter()
                    .position(|c| c.as_ref().is_some_and(|c| c.key() == *dest))
            });
            match found.and_then(|i| created[i].take()) {
                Some(to) => output.renamed.push(Renamed { from: deleted, to }),
                None => output.deleted.push(deleted),
            }
        }
        output.created = created.into_iter().flatten().collect();
        Ok(output)
    }
}

/// Rewrite every hint through the schema and table renames recorded after it.
fn rebase(mut hints: Vec<RenameHint>) -> Vec<RenameHint> {
    for later in 1..hints.len() {
        let container = hints[later].clone();
        if !matches!(container.entity_type, EntityKind::Schema | EntityKind::Table) {
            continue;
        }
        for hint in &mut hints[..later] {
            rebase_key(&mut hint.from, &container);
            rebase_key(&mut hint.to, &container);
        }
    }
    hints
}

fn rebase_key(key: &mut EntityKey, container: &RenameHint) {
    match container.entity_type {
        EntityKind::Schema => {
            if key.schema.as_deref() == Some(container.from.name.as_str()) {
                key.schema = Some(container.to.name.clone());
            }
        }
        EntityKind::Table => {
            if key.parent().as_ref() == Some(&container.from) {
                key.schema = container.to.schema.clone();
                key.table = Some(container.to.name.clone());
            }
        }
        _ => {}
    }
}

/// Check that `output` is an exact partition of `input`.
pub fn check_partition(
    kind: EntityKind,
    input: &ResolverInput,
    output: &ResolverOutput,
) -> MigrateResult<()> {
    let expected_created: Vec<EntityKey> = input.created.iter().map(Entity::key).collect();
    let expected_deleted: Vec<EntityKey> = input.deleted.iter().map(Entity::key).collect();

    let got_created = output
        .created
        .iter()
        .chain(output.renamed.iter().map(|r| &r.to));
    let got_deleted = output
        .deleted
        .iter()
        .chain(output.renamed.iter().map(|r| &r.from));

    same_members(kind, "created", &expected_created, got_created)?;
    same_members(kind, "deleted", &expected_deleted, got_deleted)
}

fn same_members<'a>(
    kind: EntityKind,
    bucket: &str,
    expected: &[EntityKey],
    got: impl Iterator<Item = &'a Entity>,
) -> MigrateResult<()> {
    let mut remaining: Vec<Option<&EntityKey>> = expected.iter().map(Some).collect();

    for entity in got {
        if entity.kind() != kind {
            return Err(MigrationError::resolver_contract(
                kind,
                format!("returned {} \"{}\"", entity.kind(), entity.key()),
            ));
        }
        let key = entity.key();
        match remaining.iter_mut().find(|k| k.is_some_and(|k| *k == key)) {
            Some(slot) => *slot = None,
            None if expected.contains(&key) => {
                return Err(MigrationError::resolver_contract(
                    kind,
                    format!("{} {} \"{}\" returned twice", bucket, kind, key),
                ));
            }
            None => {
                return Err(MigrationError::resolver_contract(
                    kind,
                    format!("unknown {} {} \"{}\" returned", bucket, kind, key),
                ));
            }
        }
    }

    if let Some(lost) = remaining.into_iter().flatten().next() {
        return Err(MigrationError::resolver_contract(
            kind,
            format!("{} {} \"{}\" was dropped", bucket, kind, lost),
        ));
    }
    Ok(())
}
