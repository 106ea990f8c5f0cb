//! Drop handler: tracking-site link in, `Read` node out.
//!
//! Flow for one drop:
//! 1. resolve the payload to an entity (decline if it is not ours)
//! 2. Shot/Asset: swap in the most recently created Version linked to it
//! 3. fetch the record and plan the `Read` node (see [`crate::reader`])
//! 4. create the node
//!
//! A recognized drop is reported as consumed even when nothing was found to
//! load, so the host does not fall back to pasting the URL as text.

use std::sync::{Arc, Mutex};

use log::{debug, error, info, warn};

use crate::config::DropperSettings;
use crate::entity::{EntityKind, EntityRef};
use crate::error::DropError;
use crate::event_bus::DropSource;
use crate::node_graph::NodeGraph;
use crate::query::{Filter, QueryClient, QueryError, SortSpec};
use crate::reader::{plan_read, READ_FIELDS};
use crate::resolver::Resolver;

/// Link field on a Version pointing at its Shot or Asset.
const F_ENTITY: &str = "entity";
const F_CREATED_AT: &str = "created_at";

pub struct DropHandler<Q, G> {
    settings: DropperSettings,
    resolver: Resolver,
    query: Q,
    graph: G,
}

impl<Q: QueryClient, G: NodeGraph> DropHandler<Q, G> {
    pub fn new(settings: DropperSettings, query: Q, graph: G) -> Self {
        let resolver = Resolver::new(settings.site_marker.clone());
        debug!("Drop handler ready (site marker '{}')", resolver.site_marker());
        Self {
            settings,
            resolver,
            query,
            graph,
        }
    }

    pub fn settings(&self) -> &DropperSettings {
        &self.settings
    }

    pub fn graph(&self) -> &G {
        &self.graph
    }

    /// Handle one drop. `Ok(false)` means the payload is not ours.
    pub fn on_drop(&mut self, mime: &str, text: &str) -> Result<bool, DropError> {
        let Some(dropped) = self.resolver.resolve(mime, text) else {
            return Ok(false);
        };
        info!("Dropped {}", dropped);

        let target = if dropped.kind.is_container() {
            match self.latest_version(dropped)? {
                Some(version) => version,
                None => {
                    warn!("{} has no versions, nothing to load", dropped);
                    return Ok(true);
                }
            }
        } else {
            dropped
        };

        self.create_read_node(target)?;
        Ok(true)
    }

    /// Most recently created Version linked to a Shot or Asset.
    pub fn latest_version(&self, container: EntityRef) -> Result<Option<EntityRef>, QueryError> {
        let latest = self.query.find_one(
            EntityKind::Version.as_str(),
            &[Filter::is_entity(F_ENTITY, container)],
            &["id"],
            Some(&[SortSpec::desc(F_CREATED_AT)]),
        )?;

        let version = latest
            .and_then(|record| record.id())
            .map(|id| EntityRef::new(EntityKind::Version, id));
        if let Some(v) = &version {
            debug!("Latest version of {} is {}", container, v);
        }
        Ok(version)
    }

    /// Fetch `entity` and create a `Read` node for it.
    ///
    /// Returns `Ok(None)` when the record does not exist.
    pub fn create_read_node(&mut self, entity: EntityRef) -> Result<Option<G::Node>, DropError> {
        let record = self.query.find_one(
            entity.kind.as_str(),
            &[Filter::is("id", entity.id)],
            &READ_FIELDS,
            None,
        )?;
        let Some(record) = record else {
            warn!("{} not found", entity);
            return Ok(None);
        };

        let plan = plan_read(entity, &record, &self.settings)?;
        let node = plan.apply(&mut self.graph)?;
        Ok(Some(node))
    }
}

impl<Q, G> DropHandler<Q, G>
where
    Q: QueryClient + Send + 'static,
    G: NodeGraph + Send + 'static,
{
    /// Subscribe this handler to `source`.
    ///
    /// The returned handle gives access to the handler after registration.
    /// Failures on a recognized drop are logged and the drop is still
    /// reported as consumed.
    #[must_use = "dropping the returned handle unsubscribes the handler"]
    pub fn register(self, source: &impl DropSource) -> Arc<Mutex<Self>> {
        let handler = Arc::new(Mutex::new(self));
        let weak = Arc::downgrade(&handler);

        source.add_drop_callback(Arc::new(move |mime: &str, text: &str| {
            let Some(handler) = weak.upgrade() else {
                return false;
            };
            let mut handler = handler.lock().unwrap_or_else(|e| e.into_inner());
            match handler.on_drop(mime, text) {
                Ok(consumed) => consumed,
                Err(e) => {
                    error!("Failed to load drop: {}", e);
                    true
                }
            }
        }));

        info!("Drop handler registered");
        handler
    }
}
