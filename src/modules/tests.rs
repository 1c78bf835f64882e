//! Tests for module lifecycle, context, and the built-in modules

#[cfg(test)]
mod tests {
    use crate::application::errors::{HookError, ModuleError};
    use crate::domain::entities::{Event, UserPrefix};
    use crate::domain::traits::BusMessage;
    use crate::modules::builtin;
    use crate::modules::context::BotCtx;
    use crate::modules::manager::{shared_registry, ModuleCatalog, ModuleManager};
    use crate::modules::trait_def::{Module, ModuleHook, Validation};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;
    use tokio::sync::mpsc;

    fn test_ctx(name: &str) -> (Arc<BotCtx>, mpsc::UnboundedReceiver<BusMessage>, TempDir) {
        let dir = TempDir::new().unwrap();
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let (reloads, _) = mpsc::unbounded_channel();
        let ctx = Arc::new(BotCtx::new(
            name,
            dir.path(),
            "ircbus",
            outbound,
            reloads,
        ));
        (ctx, outbound_rx, dir)
    }

    struct Inert {
        name: String,
        hooks: Vec<ModuleHook>,
        teardown_fails: bool,
    }

    impl Module for Inert {
        fn name(&self) -> &str {
            &self.name
        }

        fn hooks(&self) -> &[ModuleHook] {
            &self.hooks
        }

        fn teardown(&self) -> Result<(), HookError> {
            if self.teardown_fails {
                Err(HookError::Failed("teardown refused".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn inert_catalog(names: &[&str]) -> ModuleCatalog {
        let mut catalog = ModuleCatalog::new();
        for name in names {
            catalog.register(*name, |_ctx, name| {
                Ok(Box::new(Inert {
                    name: name.to_string(),
                    hooks: Vec::new(),
                    teardown_fails: false,
                }) as Box<dyn Module>)
            });
        }
        catalog
    }

    // ---- lifecycle manager ----

    #[test]
    fn test_load_unknown_module() {
        let (ctx, _outbound, _dir) = test_ctx("bot1");
        let manager = ModuleManager::new(ModuleCatalog::new(), shared_registry(), ctx);
        assert!(matches!(
            manager.load("nope"),
            Err(ModuleError::NotFound(_))
        ));
    }

    #[test]
    fn test_load_twice_is_an_error() {
        let (ctx, _outbound, _dir) = test_ctx("bot1");
        let manager = ModuleManager::new(inert_catalog(&["a"]), shared_registry(), ctx);
        manager.load("a").unwrap();
        assert!(matches!(
            manager.load("a"),
            Err(ModuleError::AlreadyLoaded(_))
        ));
    }

    #[test]
    fn test_unload_then_load_again() {
        let (ctx, _outbound, _dir) = test_ctx("bot1");
        let manager = ModuleManager::new(inert_catalog(&["a", "b"]), shared_registry(), ctx);
        manager.load("a").unwrap();
        manager.load("b").unwrap();

        manager.unload("a").unwrap();
        assert_eq!(manager.loaded(), vec!["b"]);
        assert!(matches!(
            manager.unload("a"),
            Err(ModuleError::NotFound(_))
        ));

        // re-loading appends behind the surviving modules
        manager.load("a").unwrap();
        assert_eq!(manager.loaded(), vec!["b", "a"]);
    }

    #[test]
    fn test_reload_preserves_position() {
        let (ctx, _outbound, _dir) = test_ctx("bot1");
        let built = Arc::new(AtomicUsize::new(0));

        let mut catalog = inert_catalog(&["a", "c"]);
        {
            let built = built.clone();
            catalog.register("b", move |_ctx, name| {
                built.fetch_add(1, Ordering::SeqCst);
                Ok(Box::new(Inert {
                    name: name.to_string(),
                    hooks: Vec::new(),
                    teardown_fails: false,
                }) as Box<dyn Module>)
            });
        }

        let manager = ModuleManager::new(catalog, shared_registry(), ctx);
        for name in ["a", "b", "c"] {
            manager.load(name).unwrap();
        }

        manager.reload("b").unwrap();
        assert_eq!(manager.loaded(), vec!["a", "b", "c"]);
        // a fresh instance was constructed, not the old one re-used
        assert_eq!(built.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_reload_absent_module_loads_it() {
        let (ctx, _outbound, _dir) = test_ctx("bot1");
        let manager = ModuleManager::new(inert_catalog(&["a"]), shared_registry(), ctx);
        manager.reload("a").unwrap();
        assert_eq!(manager.loaded(), vec!["a"]);
    }

    #[test]
    fn test_teardown_fault_does_not_block_replacement() {
        let (ctx, _outbound, _dir) = test_ctx("bot1");
        let mut catalog = ModuleCatalog::new();
        catalog.register("grumpy", |_ctx, name| {
            Ok(Box::new(Inert {
                name: name.to_string(),
                hooks: Vec::new(),
                teardown_fails: true,
            }) as Box<dyn Module>)
        });

        let manager = ModuleManager::new(catalog, shared_registry(), ctx);
        manager.load("grumpy").unwrap();
        manager.reload("grumpy").unwrap();
        assert_eq!(manager.loaded(), vec!["grumpy"]);
        manager.unload("grumpy").unwrap();
        assert!(manager.loaded().is_empty());
    }

    #[test]
    fn test_construction_failure_is_surfaced() {
        let (ctx, _outbound, _dir) = test_ctx("bot1");
        let mut catalog = ModuleCatalog::new();
        catalog.register("broken", |_ctx, _name| {
            Err(HookError::Failed("no config".to_string()))
        });
        catalog.register("panicky", |_ctx, _name| panic!("initializer exploded"));

        let manager = ModuleManager::new(catalog, shared_registry(), ctx);
        assert!(matches!(
            manager.load("broken"),
            Err(ModuleError::Construction(_, _))
        ));
        assert!(matches!(
            manager.load("panicky"),
            Err(ModuleError::Construction(_, _))
        ));
        assert!(manager.loaded().is_empty());
    }

    #[test]
    fn test_reload_construction_failure_removes_stale_entry() {
        let (ctx, _outbound, _dir) = test_ctx("bot1");
        let built = Arc::new(AtomicUsize::new(0));

        let mut catalog = ModuleCatalog::new();
        {
            let built = built.clone();
            catalog.register("flaky", move |_ctx, name| {
                // constructs once, then refuses
                if built.fetch_add(1, Ordering::SeqCst) > 0 {
                    return Err(HookError::Failed("second construction refused".to_string()));
                }
                Ok(Box::new(Inert {
                    name: name.to_string(),
                    hooks: Vec::new(),
                    teardown_fails: false,
                }) as Box<dyn Module>)
            });
        }

        let manager = ModuleManager::new(catalog, shared_registry(), ctx);
        manager.load("flaky").unwrap();
        assert!(matches!(
            manager.reload("flaky"),
            Err(ModuleError::Construction(_, _))
        ));
        // the torn-down instance must not keep receiving dispatches
        assert!(manager.loaded().is_empty());
    }

    // ---- validation ----

    #[test]
    fn test_validation_when() {
        assert!(Validation::when(true).is_match());
        assert_eq!(Validation::when(false), Validation::NoMatch);
        assert_eq!(Validation::matched(), Validation::Matched(Value::Null));
    }

    // ---- bot context ----

    #[test]
    fn test_act_tags_identity_and_encodes_args() {
        let (ctx, mut outbound, _dir) = test_ctx("bot1");
        ctx.act("privmsg", &("#chan", "hi")).unwrap();

        let message = outbound.try_recv().unwrap();
        assert_eq!(message.topic, "ircbus_send");
        assert_eq!(message.body, r##"bot1 privmsg ["#chan","hi"]"##);
    }

    #[test]
    fn test_pong_action() {
        let (ctx, mut outbound, _dir) = test_ctx("bot1");
        ctx.pong("server42").unwrap();

        let message = outbound.try_recv().unwrap();
        assert_eq!(message.body, r#"bot1 pong ["server42"]"#);
    }

    #[test]
    fn test_addressed_requires_current_nick() {
        let (ctx, _outbound, _dir) = test_ctx("bot1");
        let event = Event::new("PRIVMSG").with_trailing(Some("mybot: echo hi".to_string()));

        // no nick known yet
        assert_eq!(ctx.addressed(&event), None);

        ctx.meta()
            .merge([("nick".to_string(), json!("mybot"))].into_iter().collect());
        assert_eq!(ctx.addressed(&event), Some("echo hi".to_string()));

        let comma = Event::new("PRIVMSG").with_trailing(Some("MyBot, hello".to_string()));
        assert_eq!(ctx.addressed(&comma), Some("hello".to_string()));

        let other = Event::new("PRIVMSG").with_trailing(Some("someone: hi".to_string()));
        assert_eq!(ctx.addressed(&other), None);

        assert_eq!(ctx.addressed(&Event::new("PRIVMSG")), None);
    }

    #[test]
    fn test_module_filesystem_boundary() {
        let (ctx, _outbound, dir) = test_ctx("bot1");

        assert_eq!(ctx.config_path("chanlog"), None);
        assert_eq!(ctx.load_config("chanlog").unwrap(), None);

        let config_dir = dir.path().join("config");
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(config_dir.join("chanlog.json"), r##"{"channels":["#a"]}"##).unwrap();

        assert!(ctx.config_path("chanlog").is_some());
        assert_eq!(
            ctx.load_config("chanlog").unwrap(),
            Some(json!({"channels": ["#a"]}))
        );

        let data = ctx.data_path("chanlog").unwrap();
        assert!(data.is_dir());
        assert!(data.ends_with("data/chanlog"));
    }

    // ---- built-in modules ----

    fn fire(module: &dyn Module, ctx: &BotCtx, event: &Event) {
        for hook in module.hooks() {
            if let Validation::Matched(payload) = (hook.validator)(event, ctx) {
                (hook.handler)(event, &payload).unwrap();
            }
        }
    }

    #[test]
    fn test_ping_module_answers_with_pong() {
        let (ctx, mut outbound, _dir) = test_ctx("bot1");
        let module = builtin::ping::construct(ctx.clone(), "ping").unwrap();

        fire(
            module.as_ref(),
            &ctx,
            &Event::new("PING").with_trailing(Some("server42".to_string())),
        );
        let message = outbound.try_recv().unwrap();
        assert_eq!(message.body, r#"bot1 pong ["server42"]"#);

        // a PRIVMSG must not trigger the PING hook
        fire(module.as_ref(), &ctx, &Event::new("PRIVMSG"));
        assert!(outbound.try_recv().is_err());
    }

    #[test]
    fn test_echo_module_replies_when_addressed() {
        let (ctx, mut outbound, _dir) = test_ctx("bot1");
        ctx.meta()
            .merge([("nick".to_string(), json!("mybot"))].into_iter().collect());
        let module = builtin::echo::construct(ctx.clone(), "echo").unwrap();

        let event = Event::new("PRIVMSG")
            .with_args(vec!["#chan".to_string(), "mybot: echo hello".to_string()])
            .with_sender(UserPrefix::new("nick", "user", "host"))
            .with_trailing(Some("mybot: echo hello".to_string()));
        fire(module.as_ref(), &ctx, &event);

        let message = outbound.try_recv().unwrap();
        assert_eq!(message.body, r##"bot1 privmsg ["#chan","hello"]"##);

        // not addressed to us
        let event = Event::new("PRIVMSG")
            .with_args(vec!["#chan".to_string(), "echo hello".to_string()])
            .with_trailing(Some("echo hello".to_string()));
        fire(module.as_ref(), &ctx, &event);
        assert!(outbound.try_recv().is_err());
    }

    #[test]
    fn test_echo_module_replies_to_sender_on_query() {
        let (ctx, mut outbound, _dir) = test_ctx("bot1");
        ctx.meta()
            .merge([("nick".to_string(), json!("mybot"))].into_iter().collect());
        let module = builtin::echo::construct(ctx.clone(), "echo").unwrap();

        let event = Event::new("PRIVMSG")
            .with_args(vec!["mybot".to_string(), "mybot: echo hi".to_string()])
            .with_sender(UserPrefix::new("alice", "user", "host"))
            .with_trailing(Some("mybot: echo hi".to_string()));
        fire(module.as_ref(), &ctx, &event);

        let message = outbound.try_recv().unwrap();
        assert_eq!(message.body, r#"bot1 privmsg ["alice","hi"]"#);
    }

    #[test]
    fn test_chanlog_module_appends_lines() {
        let (ctx, _outbound, dir) = test_ctx("bot1");
        let module = builtin::chanlog::construct(ctx.clone(), "chanlog").unwrap();

        let event = Event::new("PRIVMSG")
            .with_args(vec!["#chan".to_string(), "hello".to_string()])
            .with_sender(UserPrefix::new("alice", "user", "host"))
            .with_trailing(Some("hello".to_string()));
        fire(module.as_ref(), &ctx, &event);

        let join = Event::new("JOIN")
            .with_args(vec!["#chan".to_string()])
            .with_sender(UserPrefix::new("bob", "user", "host"));
        fire(module.as_ref(), &ctx, &join);

        let logged =
            std::fs::read_to_string(dir.path().join("data/chanlog/#chan.log")).unwrap();
        assert!(logged.contains("<alice> hello"));
        assert!(logged.contains("bob joined"));
    }

    #[test]
    fn test_chanlog_config_restricts_channels() {
        let (ctx, _outbound, dir) = test_ctx("bot1");
        let config_dir = dir.path().join("config");
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(config_dir.join("chanlog.json"), r##"{"channels":["#kept"]}"##).unwrap();

        let module = builtin::chanlog::construct(ctx.clone(), "chanlog").unwrap();

        for channel in ["#kept", "#ignored"] {
            let event = Event::new("PRIVMSG")
                .with_args(vec![channel.to_string(), "hi".to_string()])
                .with_sender(UserPrefix::new("alice", "user", "host"))
                .with_trailing(Some("hi".to_string()));
            fire(module.as_ref(), &ctx, &event);
        }

        assert!(dir.path().join("data/chanlog/#kept.log").exists());
        assert!(!dir.path().join("data/chanlog/#ignored.log").exists());
    }
}
