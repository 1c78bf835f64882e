//! Built-in modules, registered in the default catalog

pub mod chanlog;
pub mod echo;
pub mod ping;

use crate::modules::manager::ModuleCatalog;

/// Catalog with every built-in module registered. Which of them actually
/// load is decided by the `modules` list in the config.
pub fn catalog() -> ModuleCatalog {
    let mut catalog = ModuleCatalog::new();
    catalog.register("ping", ping::construct);
    catalog.register("echo", echo::construct);
    catalog.register("chanlog", chanlog::construct);
    catalog
}
