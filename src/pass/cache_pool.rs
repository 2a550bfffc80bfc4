//! Cache pool wiring
//!
//! Walks every component tagged as a cache pool, merges the tag attributes
//! inherited through its parent definitions, and rewrites the constructor
//! arguments the adapter expects: provider, namespace and default lifetime,
//! in that order. Chain adapters push provider, namespace and lifetime down
//! to each nested pool instead.
//!
//! Pools are then grouped under their clearers, and the listing commands
//! receive the names of every pool.

use indexmap::IndexMap;
use tracing::{debug, info, warn};

use super::error::PassError;
use super::namespace::{compute_seed, derive_namespace};
use super::provider::resolve_provider;
use crate::config::PassConfig;
use crate::domain::{AdapterKind, Definition, Factory, Reference, TagAttributes, Value};
use crate::registry::Registry;

/// Tag attributes mapped onto the pool, in argument order
const ATTRIBUTES: [&str; 6] = [
    "provider",
    "name",
    "namespace",
    "default_lifetime",
    "early_expiration_message_bus",
    "reset",
];

/// What the pass did to one pool
#[derive(Debug, Clone, PartialEq)]
pub struct PoolSummary {
    pub id: String,
    pub name: String,
    pub adapter: AdapterKind,
    pub namespace: Option<String>,
    pub provider: Option<String>,
    pub clearer: Option<String>,
    pub default_lifetime: Option<Value>,
    pub early_expiration: bool,
}

/// Summary of one run of the pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassReport {
    pub pools: Vec<PoolSummary>,
    /// Connection components registered for DSN providers
    pub connections: Vec<String>,
    /// Clearer id -> names of the pools it received
    pub clearers: IndexMap<String, Vec<String>>,
    pub early_expiration_handler_kept: bool,
}

impl PassReport {
    pub fn pool(&self, name: &str) -> Option<&PoolSummary> {
        self.pools.iter().find(|p| p.name == name)
    }
}

/// Accumulators shared by every pool of one run
#[derive(Debug, Default)]
struct PassState {
    needs_message_handler: bool,
    all_pools: IndexMap<String, Reference>,
    clearers: IndexMap<String, IndexMap<String, Reference>>,
    report: PassReport,
}

/// Tag attributes and class collected along an inheritance chain
struct Lineage {
    attributes: TagAttributes,
    class: Option<String>,
    /// Class of the root definition, the end of the parent chain
    base_class: Option<String>,
    first_argument: Option<Value>,
}

/// The cache pool build pass
#[derive(Debug, Clone, Default)]
pub struct CachePoolPass {
    config: PassConfig,
}

impl CachePoolPass {
    pub fn new(config: PassConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PassConfig {
        &self.config
    }

    /// Runs the pass over `registry`
    ///
    /// Fails on the first invalid pool; pools handled before it keep their
    /// changes.
    pub fn process(&self, registry: &mut Registry) -> Result<PassReport, PassError> {
        let seed = compute_seed(registry, &self.config.seed)?;
        debug!(seed = %seed, "computed namespace seed");

        let mut state = PassState::default();
        for (id, tags) in registry.find_tagged(&self.config.tags.pool) {
            self.process_pool(registry, &mut state, &seed, &id, tags)?;
        }

        self.finalize(registry, state)
    }

    fn lineage(
        &self,
        registry: &Registry,
        start: &Definition,
        start_id: &str,
        mut attributes: TagAttributes,
    ) -> Result<Lineage, PassError> {
        let tag = self.config.tags.pool.as_str();
        let mut class: Option<String> = None;
        let mut first_argument: Option<Value> = None;

        let base = registry.walk_ancestors(start, start_id, |def| {
            if class.is_none() {
                class = def.class().map(str::to_string);
            }
            if first_argument.is_none() {
                first_argument = def.argument(0).filter(|v| v.is_set()).cloned();
            }
            // Most derived definition wins
            if let Some(inherited) = def.tag(tag).first() {
                for (key, value) in inherited {
                    attributes.entry(key.clone()).or_insert_with(|| value.clone());
                }
            }
        })?;

        Ok(Lineage {
            attributes,
            class,
            base_class: base.class().map(str::to_string),
            first_argument,
        })
    }

    fn provider(&self, registry: &mut Registry, state: &mut PassState, name: &str) -> String {
        let resolved = resolve_provider(registry, &self.config.factories, name);
        if resolved.created {
            state.report.connections.push(resolved.id.clone());
        }
        resolved.id
    }

    fn process_pool(
        &self,
        registry: &mut Registry,
        state: &mut PassState,
        seed: &str,
        id: &str,
        tags: Vec<TagAttributes>,
    ) -> Result<(), PassError> {
        let pool = registry.get_definition(id)?;
        if pool.is_abstract {
            debug!(pool = id, "skipping abstract pool");
            return Ok(());
        }

        let own = tags.into_iter().next().unwrap_or_default();
        let Lineage {
            mut attributes,
            class,
            first_argument,
            ..
        } = self.lineage(registry, pool, id, own)?;
        let kind = AdapterKind::classify(class.as_deref(), &self.config.adapters);

        let name = attributes
            .get("name")
            .filter(|v| v.is_set())
            .and_then(Value::to_plain_string)
            .unwrap_or_else(|| id.to_string());

        if !attributes.get("namespace").is_some_and(Value::is_set) {
            let namespace = derive_namespace(seed, class.as_deref(), &name);
            attributes.insert("namespace".to_string(), Value::String(namespace));
        }

        let clearer = match attributes.shift_remove("clearer").filter(Value::is_set) {
            Some(value) => {
                let clearer = value.to_plain_string().ok_or_else(|| PassError::InvalidAttribute {
                    id: id.to_string(),
                    message: "the \"clearer\" attribute must be a component id".to_string(),
                })?;
                Some(registry.resolve_alias(&clearer)?)
            }
            None => None,
        };
        attributes.shift_remove("name");

        let mut provider_id = None;
        if let Some(provider) = attributes.get("provider").filter(|v| v.is_set()).cloned() {
            let raw = provider.to_plain_string().ok_or_else(|| PassError::InvalidAttribute {
                id: id.to_string(),
                message: "the \"provider\" attribute must be a component id or a DSN".to_string(),
            })?;
            let resolved = self.provider(registry, state, &raw);
            attributes.insert("provider".to_string(), Value::Reference(Reference::new(resolved.clone())));
            provider_id = Some(resolved);
        }

        let mut summary = PoolSummary {
            id: id.to_string(),
            name: name.clone(),
            adapter: kind,
            namespace: attributes
                .get("namespace")
                .filter(|_| !kind.is_trivial() && kind != AdapterKind::Chain)
                .and_then(Value::to_plain_string),
            provider: provider_id,
            clearer: clearer.clone(),
            default_lifetime: attributes.get("default_lifetime").filter(|v| v.is_set()).cloned(),
            early_expiration: false,
        };

        let mut cursor = 0;
        if kind == AdapterKind::Chain {
            let chained = self.resolve_chain(registry, state, id, first_argument, &attributes)?;
            registry.get_definition_mut(id)?.replace_argument(0, Value::List(chained));
            attributes.shift_remove("provider");
            attributes.shift_remove("namespace");
            cursor = 1;
        }

        let tags = &self.config.tags;
        let factories = &self.config.factories;
        let pool = registry.get_definition_mut(id)?;

        for attr in ATTRIBUTES {
            let Some(value) = attributes.shift_remove(attr) else {
                continue;
            };
            if !value.is_set() {
                continue;
            }

            match attr {
                "reset" => {
                    if value.is_truthy() {
                        let mut hook = TagAttributes::new();
                        hook.insert("method".to_string(), value);
                        pool.add_tag(tags.reset.clone(), hook);
                    }
                }
                "early_expiration_message_bus" => {
                    let bus = value.to_plain_string().ok_or_else(|| PassError::InvalidAttribute {
                        id: id.to_string(),
                        message: "the \"early_expiration_message_bus\" attribute must be a component id"
                            .to_string(),
                    })?;
                    let dispatcher = self.early_expiration_dispatcher(id, &bus);
                    pool.add_method_call(factories.callback_wrapper_method.clone(), vec![dispatcher.into()]);
                    pool.add_tag(tags.reversible.clone(), TagAttributes::new());
                    state.needs_message_handler = true;
                    summary.early_expiration = true;
                }
                "namespace" if kind.is_trivial() => {}
                _ => {
                    let argument = if attr == "default_lifetime" && !value.is_numeric() {
                        self.deferred_duration(value)
                    } else {
                        value
                    };
                    pool.replace_argument(cursor, argument);
                    cursor += 1;
                }
            }
        }

        if !attributes.is_empty() {
            return Err(PassError::InvalidTagAttributes {
                id: id.to_string(),
                tag: tags.pool.clone(),
                found: attributes.keys().cloned().collect(),
            });
        }

        debug!(
            pool = id,
            name = %name,
            adapter = kind.as_str(),
            namespace = ?summary.namespace,
            clearer = ?clearer,
            "wired cache pool"
        );

        if let Some(clearer) = clearer {
            state
                .clearers
                .entry(clearer)
                .or_default()
                .insert(name.clone(), Reference::ignore_on_uninitialized(id));
        }
        state
            .all_pools
            .insert(name, Reference::ignore_on_uninitialized(id));
        state.report.pools.push(summary);

        Ok(())
    }

    /// Rewrites the nested pools of a chain adapter
    fn resolve_chain(
        &self,
        registry: &mut Registry,
        state: &mut PassState,
        id: &str,
        entries: Option<Value>,
        parent: &TagAttributes,
    ) -> Result<Vec<Value>, PassError> {
        let entries: Vec<(Option<String>, Value)> = match entries {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::List(items)) => items.into_iter().map(|entry| (None, entry)).collect(),
            // Integer keys are positions, anything else names a provider
            Some(Value::Map(map)) => map
                .into_iter()
                .map(|(key, entry)| {
                    let key = if key.parse::<i64>().is_ok() { None } else { Some(key) };
                    (key, entry)
                })
                .collect(),
            Some(other) => {
                return Err(PassError::InvalidAttribute {
                    id: id.to_string(),
                    message: format!(
                        "a chain adapter expects a list of pools as first argument, got {:?}",
                        other
                    ),
                })
            }
        };

        let namespace = parent.get("namespace").filter(|v| v.is_set());
        let lifetime = parent.get("default_lifetime").filter(|v| v.is_set());

        let mut chained = Vec::with_capacity(entries.len());
        for (key, entry) in entries {
            chained.push(self.resolve_chained_pool(registry, state, id, key, entry, namespace, lifetime)?);
        }
        Ok(chained)
    }

    #[allow(clippy::too_many_arguments)]
    fn resolve_chained_pool(
        &self,
        registry: &mut Registry,
        state: &mut PassState,
        id: &str,
        key: Option<String>,
        entry: Value,
        namespace: Option<&Value>,
        lifetime: Option<&Value>,
    ) -> Result<Value, PassError> {
        let mut pool = match entry {
            Value::Definition(def) => *def,
            Value::String(parent) => Definition::child(parent),
            Value::Reference(reference) => Definition::child(reference.id),
            other => {
                return Err(PassError::InvalidAttribute {
                    id: id.to_string(),
                    message: format!("chain entries must be pool ids or definitions, got {:?}", other),
                })
            }
        };

        let mut seeded = TagAttributes::new();
        if let Some(key) = key {
            seeded.insert("provider".to_string(), Value::String(key));
        }

        let lineage = self.lineage(registry, &pool, &format!("{} (chained)", id), seeded)?;
        let base = AdapterKind::classify(lineage.base_class.as_deref(), &self.config.adapters);
        let kind = AdapterKind::classify(lineage.class.as_deref(), &self.config.adapters);
        if base == AdapterKind::Chain || kind == AdapterKind::Chain {
            return Err(PassError::NestedChain {
                id: id.to_string(),
                parent: pool.parent().unwrap_or("inline definition").to_string(),
            });
        }

        let mut slot = 0;
        if let Some(provider) = lineage.attributes.get("provider").filter(|v| v.is_set()) {
            let raw = provider.to_plain_string().ok_or_else(|| PassError::InvalidAttribute {
                id: id.to_string(),
                message: "a chained pool's \"provider\" must be a component id or a DSN".to_string(),
            })?;
            let resolved = self.provider(registry, state, &raw);
            pool.replace_argument(slot, Reference::new(resolved));
            slot += 1;
        }
        if let Some(namespace) = namespace.filter(|_| !kind.is_trivial()) {
            pool.replace_argument(slot, namespace.clone());
            slot += 1;
        }
        if let Some(lifetime) = lifetime {
            pool.replace_argument(slot, lifetime.clone());
        }

        Ok(Value::Definition(Box::new(pool)))
    }

    /// Inline definition that normalizes a lifetime like "5 minutes" at runtime
    fn deferred_duration(&self, value: Value) -> Value {
        let factories = &self.config.factories;
        Definition::new("int")
            .with_factory(Factory::Static {
                class: factories.duration_class.clone(),
                method: factories.duration_method.clone(),
            })
            .with_argument(value)
            .into()
    }

    fn early_expiration_dispatcher(&self, id: &str, bus: &str) -> Definition {
        let factories = &self.config.factories;
        let callback = Definition::new("callable")
            .with_factory(Factory::Service {
                target: Reference::new(id),
                method: factories.callback_wrapper_method.clone(),
            })
            .with_argument(Value::Null);

        Definition::new(factories.early_expiration_dispatcher.clone())
            .with_argument(Reference::new(bus))
            .with_argument(Reference::new(self.config.services.reverse_container.clone()))
            .with_argument(callback)
    }

    fn finalize(&self, registry: &mut Registry, state: PassState) -> Result<PassReport, PassError> {
        let PassState {
            needs_message_handler,
            all_pools,
            mut clearers,
            mut report,
        } = state;
        let services = &self.config.services;
        let tags = &self.config.tags;

        if !needs_message_handler && registry.remove_definition(&services.early_expiration_handler).is_some() {
            debug!(handler = %services.early_expiration_handler, "removed unused early expiration handler");
        }
        report.early_expiration_handler_kept =
            needs_message_handler && registry.has_definition(&services.early_expiration_handler);

        let global_clearer = registry.resolve_alias(&services.global_clearer)?;
        if registry.has_definition(&global_clearer) {
            clearers.insert(global_clearer, all_pools.clone());
        }

        for (clearer_id, pools) in &clearers {
            let Ok(clearer) = registry.get_definition_mut(clearer_id) else {
                warn!(clearer = %clearer_id, pools = pools.len(), "clearer not found, pools left ungrouped");
                continue;
            };

            let group: IndexMap<String, Value> = pools
                .iter()
                .map(|(name, reference)| (name.clone(), Value::Reference(reference.clone())))
                .collect();
            clearer.replace_argument(0, Value::Map(group));
            clearer.add_tag(tags.pool_clearer.clone(), TagAttributes::new());
            if clearer_id == &services.system_clearer {
                clearer.add_tag(tags.kernel_cache_clearer.clone(), TagAttributes::new());
            }

            report
                .clearers
                .insert(clearer_id.clone(), pools.keys().cloned().collect());
        }

        let names: Vec<Value> = all_pools.keys().map(|name| Value::String(name.clone())).collect();
        if let Ok(command) = registry.get_definition_mut(&services.pool_list_command) {
            command.replace_argument(0, Value::List(names.clone()));
        }
        if let Ok(command) = registry.get_definition_mut(&services.invalidate_tags_command) {
            command.add_argument(Value::List(names));
        }

        info!(
            pools = report.pools.len(),
            clearers = report.clearers.len(),
            connections = report.connections.len(),
            early_expiration = report.early_expiration_handler_kept,
            "cache pools wired"
        );

        Ok(report)
    }
}
