//! Explicit server context.
//!
//! The command registry, descriptor registry, user roster and durable
//! store handle live here instead of as globals, and are threaded through
//! every handler as an `Arc<ServerContext>`.

use crate::{
    command::{CommandRegistry, HandlerContext},
    config::Config,
    descriptor::DescriptorRegistry,
    roster::Roster,
    store::{SledStore, Store},
};
use anyhow::Result;

pub struct ServerContext {
    pub registry: CommandRegistry,
    pub store: Box<dyn Store>,
    pub roster: Roster,
    pub descriptors: DescriptorRegistry,
}

impl ServerContext {
    pub fn new(registry: CommandRegistry, store: Box<dyn Store>) -> Self {
        Self {
            registry,
            store,
            roster: Roster::new(),
            descriptors: DescriptorRegistry::new(),
        }
    }

    /// Builds the registry (built-ins plus whatever external binaries sit
    /// under `config.bin_path()`) and opens the durable store at
    /// `config.store_path()`.
    pub fn bootstrap(config: &Config) -> Result<Self> {
        let mut registry = CommandRegistry::new();
        register_builtins(&mut registry);
        if !config.bin_path().is_empty() {
            registry.register_external(config.bin_path());
        }

        let store = SledStore::open(config.store_path())?;
        Ok(Self::new(registry, Box::new(store)))
    }

    /// Builds a context with every built-in registered and no external
    /// binaries, against whatever `store` the caller supplies. Used by
    /// integration tests that want the real command registry without
    /// standing up a `sled` database or scanning a bin path.
    pub fn for_tests(store: Box<dyn Store>) -> Self {
        let mut registry = CommandRegistry::new();
        register_builtins(&mut registry);
        Self::new(registry, store)
    }
}

fn register_builtins(registry: &mut CommandRegistry) {
    registry.register_builtin("who", "", HandlerContext::Session);
    registry.register_builtin("tell", "name:msg", HandlerContext::Session);
    registry.register_builtin("yell", "msg", HandlerContext::Session);
    registry.register_builtin("name", "new", HandlerContext::Session);
    registry.register_builtin("listMail", "", HandlerContext::Session);
    registry.register_builtin("sentMail", "name:msg", HandlerContext::Session);
    registry.register_builtin("delMail", "idx", HandlerContext::Session);
    registry.register_builtin("Groups", "", HandlerContext::Session);
    registry.register_builtin("listGroup", "", HandlerContext::Session);
    registry.register_builtin("createGroup", "name", HandlerContext::Session);
    registry.register_builtin("delGroup", "name", HandlerContext::Session);
    registry.register_builtin("addGroup", "name", HandlerContext::Session);
    registry.register_builtin("leaveGroup", "name", HandlerContext::Session);
    registry.register_builtin("kickUser", "group:names", HandlerContext::Session);
    registry.register_builtin("gyell", "group:msg", HandlerContext::Session);
}
