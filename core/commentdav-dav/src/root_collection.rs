//! The `comments` root and the registry of commentable entity types.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use tracing::debug;

use crate::{
    CommentsContext, DavCollection, DavError, DavNode, DavResult, EntityExistence,
    EntityTypeCollection,
};

/// Name of the root collection.
pub const ROOT_NAME: &str = "comments";

type ExistenceMap = BTreeMap<String, Arc<dyn EntityExistence>>;

/// Receives entity types while the root collection initializes.
#[derive(Default)]
pub struct EntityTypeCollector {
    types: ExistenceMap,
}

impl EntityTypeCollector {
    /// Adds `name`. Each name may be registered once.
    pub fn add_entity_type(
        &mut self,
        name: impl Into<String>,
        existence: Arc<dyn EntityExistence>,
    ) -> DavResult<()> {
        let name = name.into();
        if self.types.contains_key(&name) {
            return Err(DavError::DuplicateEntityType(name));
        }
        self.types.insert(name, existence);
        Ok(())
    }

    pub fn entity_type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }
}

/// Something that contributes entity types, typically an app module.
pub trait EntityTypeProvider: Send + Sync {
    fn register(&self, collector: &mut EntityTypeCollector) -> DavResult<()>;
}

/// Static entity types plus providers, consulted once per root collection.
#[derive(Default)]
pub struct EntityTypeRegistry {
    types: Vec<(String, Arc<dyn EntityExistence>)>,
    providers: Vec<Box<dyn EntityTypeProvider>>,
}

impl EntityTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an entity type directly. Duplicates are reported when the
    /// registry is collected.
    pub fn register_entity_type(
        &mut self,
        name: impl Into<String>,
        existence: impl EntityExistence + 'static,
    ) {
        self.types.push((name.into(), Arc::new(existence)));
    }

    pub fn add_provider(&mut self, provider: Box<dyn EntityTypeProvider>) {
        self.providers.push(provider);
    }

    /// Runs every registration into a fresh collector.
    pub fn collect(&self) -> DavResult<EntityTypeCollector> {
        let mut collector = EntityTypeCollector::default();
        for (name, existence) in &self.types {
            collector.add_entity_type(name.clone(), Arc::clone(existence))?;
        }
        for provider in &self.providers {
            provider.register(&mut collector)?;
        }
        Ok(collector)
    }
}

/// The `comments` collection. Its children are the registered entity types.
///
/// Entity types are gathered lazily on first access and then fixed for the
/// lifetime of this value. Gathering requires an authenticated user.
#[derive(Clone)]
pub struct RootCollection {
    ctx: CommentsContext,
    registry: Arc<EntityTypeRegistry>,
    types: Arc<OnceLock<ExistenceMap>>,
}

impl RootCollection {
    pub fn new(ctx: CommentsContext, registry: Arc<EntityTypeRegistry>) -> Self {
        Self {
            ctx,
            registry,
            types: Arc::new(OnceLock::new()),
        }
    }

    pub fn context(&self) -> &CommentsContext {
        &self.ctx
    }

    /// Names gathered so far, without triggering initialization.
    pub fn registered_types(&self) -> Vec<String> {
        self.types
            .get()
            .map(|types| types.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn init(&self) -> DavResult<&ExistenceMap> {
        if self.ctx.current_user().is_none() {
            return Err(DavError::NotAuthenticated);
        }
        if let Some(types) = self.types.get() {
            return Ok(types);
        }
        let collected = self.registry.collect()?.types;
        debug!(count = collected.len(), "Collected comment entity types");
        Ok(self.types.get_or_init(|| collected))
    }

    /// The collection for entity type `name`.
    pub fn entity_type(&self, name: &str) -> DavResult<EntityTypeCollection> {
        let types = self.init()?;
        let existence = types
            .get(name)
            .ok_or_else(|| DavError::NotFound(format!("Entity type \"{name}\" not found.")))?;
        Ok(EntityTypeCollection::new(
            self.ctx.clone(),
            name,
            Arc::clone(existence),
        ))
    }
}

impl DavCollection for RootCollection {
    fn name(&self) -> String {
        ROOT_NAME.to_string()
    }

    fn child(&self, name: &str) -> DavResult<DavNode> {
        self.entity_type(name).map(DavNode::EntityType)
    }

    fn children(&self) -> DavResult<Vec<DavNode>> {
        let types = self.init()?;
        Ok(types
            .iter()
            .map(|(name, existence)| {
                DavNode::EntityType(EntityTypeCollection::new(
                    self.ctx.clone(),
                    name,
                    Arc::clone(existence),
                ))
            })
            .collect())
    }

    fn child_exists(&self, name: &str) -> DavResult<bool> {
        Ok(self.init()?.contains_key(name))
    }

    fn create_directory(&self, _name: &str) -> DavResult<()> {
        Err(DavError::Forbidden("Cannot create comments by id".to_string()))
    }
}
