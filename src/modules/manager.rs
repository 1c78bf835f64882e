//! Module manager - handles module lifecycle and the hook registry

use crate::application::errors::{HookError, ModuleError};
use crate::modules::context::BotCtx;
use crate::modules::trait_def::{panic_message, Module};
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, RwLock};
use tracing::{info, warn};

/// Request to reload (or first-load) a module, enqueued by collaborators
/// such as the touch-reload watcher and drained by the dispatch loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadRequest {
    pub name: String,
}

/// Factory constructing a module instance for a name
pub type ModuleFactory =
    Box<dyn Fn(Arc<BotCtx>, &str) -> Result<Box<dyn Module>, HookError> + Send + Sync>;

/// Registered map from module name to factory. Modules are compiled in and
/// resolved by name; there is no dynamic library loading.
pub struct ModuleCatalog {
    factories: HashMap<String, ModuleFactory>,
}

impl ModuleCatalog {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a factory under a module name
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(Arc<BotCtx>, &str) -> Result<Box<dyn Module>, HookError> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
    }

    pub fn resolve(&self, name: &str) -> Option<&ModuleFactory> {
        self.factories.get(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }
}

impl Default for ModuleCatalog {
    fn default() -> Self {
        Self::new()
    }
}

/// Insertion-ordered mapping from module name to live instance.
///
/// The order of entries is the dispatch order across modules. At most one
/// instance per name; replacement keeps the entry's position.
pub struct Registry {
    entries: Vec<(String, Arc<dyn Module>)>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Cloned view for dispatch; never exposes the live entries
    pub fn snapshot(&self) -> Vec<(String, Arc<dyn Module>)> {
        self.entries.clone()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Module>> {
        self.position(name).map(|i| self.entries[i].1.clone())
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|(n, _)| n == name)
    }

    fn push(&mut self, name: String, module: Arc<dyn Module>) {
        self.entries.push((name, module));
    }

    /// Swap the instance for `name` in place, preserving its position.
    /// Returns false when the name is absent.
    fn replace(&mut self, name: &str, module: Arc<dyn Module>) -> bool {
        match self.position(name) {
            Some(i) => {
                self.entries[i].1 = module;
                true
            }
            None => false,
        }
    }

    fn remove(&mut self, name: &str) -> Option<Arc<dyn Module>> {
        self.position(name).map(|i| self.entries.remove(i).1)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe shared registry handle
pub type SharedRegistry = Arc<RwLock<Registry>>;

/// Create a new shared registry
pub fn shared_registry() -> SharedRegistry {
    Arc::new(RwLock::new(Registry::new()))
}

/// Manages module lifecycle: load, reload, unload.
///
/// All registry mutation happens here, under the registry lock, so a
/// dispatch in flight sees either the fully-old or fully-new entry for a
/// name, never a torn state. Safe to call from any execution context;
/// collaborators outside the dispatch loop should prefer enqueueing a
/// [`ReloadRequest`] instead of calling in directly.
pub struct ModuleManager {
    catalog: ModuleCatalog,
    registry: SharedRegistry,
    ctx: Arc<BotCtx>,
}

impl ModuleManager {
    pub fn new(catalog: ModuleCatalog, registry: SharedRegistry, ctx: Arc<BotCtx>) -> Self {
        Self {
            catalog,
            registry,
            ctx,
        }
    }

    pub fn registry(&self) -> SharedRegistry {
        self.registry.clone()
    }

    /// Construct the named module and append it to the registry
    pub fn load(&self, name: &str) -> Result<(), ModuleError> {
        if self.read()?.contains(name) {
            return Err(ModuleError::AlreadyLoaded(name.to_string()));
        }

        let module = self.construct(name)?;

        let mut registry = self.write()?;
        if registry.contains(name) {
            return Err(ModuleError::AlreadyLoaded(name.to_string()));
        }
        registry.push(name.to_string(), module);
        info!("Loaded module: {}", name);
        Ok(())
    }

    /// Replace the named module with a freshly constructed instance,
    /// preserving its position in dispatch order. Loads it when absent.
    ///
    /// The old instance's teardown runs first, best-effort. If the
    /// replacement fails to construct, the stale entry is removed (it has
    /// already been torn down) and the error surfaced.
    pub fn reload(&self, name: &str) -> Result<(), ModuleError> {
        // bind before matching so the read guard is released here; load()
        // below takes the write lock
        let old = self.read()?.get(name);
        let old = match old {
            Some(old) => old,
            None => return self.load(name),
        };

        self.teardown(name, old.as_ref());

        match self.construct(name) {
            Ok(module) => {
                let mut registry = self.write()?;
                if !registry.replace(name, module.clone()) {
                    registry.push(name.to_string(), module);
                }
                info!("Reloaded module: {}", name);
                Ok(())
            }
            Err(e) => {
                self.write()?.remove(name);
                Err(e)
            }
        }
    }

    /// Remove the named module from the registry and tear it down
    pub fn unload(&self, name: &str) -> Result<(), ModuleError> {
        let removed = self
            .write()?
            .remove(name)
            .ok_or_else(|| ModuleError::NotFound(name.to_string()))?;
        self.teardown(name, removed.as_ref());
        info!("Unloaded module: {}", name);
        Ok(())
    }

    /// Names of currently loaded modules, in dispatch order
    pub fn loaded(&self) -> Vec<String> {
        self.read().map(|r| r.names()).unwrap_or_default()
    }

    fn construct(&self, name: &str) -> Result<Arc<dyn Module>, ModuleError> {
        let factory = self
            .catalog
            .resolve(name)
            .ok_or_else(|| ModuleError::NotFound(name.to_string()))?;

        match catch_unwind(AssertUnwindSafe(|| factory(self.ctx.clone(), name))) {
            Ok(Ok(module)) => Ok(Arc::from(module)),
            Ok(Err(e)) => Err(ModuleError::Construction(name.to_string(), e.to_string())),
            Err(panic) => Err(ModuleError::Construction(
                name.to_string(),
                panic_message(&panic),
            )),
        }
    }

    /// Best-effort teardown; a fault is logged, never fatal
    fn teardown(&self, name: &str, module: &dyn Module) {
        match catch_unwind(AssertUnwindSafe(|| module.teardown())) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Teardown of '{}' failed: {}", name, e),
            Err(panic) => warn!("Teardown of '{}' panicked: {}", name, panic_message(&panic)),
        }
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Registry>, ModuleError> {
        self.registry
            .read()
            .map_err(|_| ModuleError::Internal("Registry lock poisoned".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Registry>, ModuleError> {
        self.registry
            .write()
            .map_err(|_| ModuleError::Internal("Registry lock poisoned".to_string()))
    }
}
