//! Bot service - the single dispatch loop

use crate::application::errors::{BotError, BusError};
use crate::application::messaging::{EventDecoder, HookDispatcher, Inbound};
use crate::domain::traits::{BusMessage, BusTransport};
use crate::modules::context::BotCtx;
use crate::modules::manager::{ModuleManager, ReloadRequest};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Event categories subscribed on the bus, under the configured prefix
pub const EVENT_CATEGORIES: [&str; 7] = [
    "privmsg",
    "join",
    "kick",
    "part",
    "mode",
    "quit",
    "meta_update",
];

/// What the loop woke up for
enum Step {
    Message(Result<BusMessage, BusError>),
    Outbound(BusMessage),
    Reload(ReloadRequest),
}

/// Ties the transport, decoder, dispatcher, and lifecycle manager together.
///
/// Events are pulled one at a time: dispatch of one event, including all
/// matching handlers, completes before the next bus message is read, so no
/// two hook invocations ever run concurrently. Outbound actions and reload
/// requests queued by handlers or collaborators are drained between events.
pub struct BotService<T: BusTransport> {
    transport: T,
    decoder: EventDecoder,
    dispatcher: HookDispatcher,
    manager: ModuleManager,
    ctx: Arc<BotCtx>,
    outbound: mpsc::UnboundedReceiver<BusMessage>,
    reloads: mpsc::UnboundedReceiver<ReloadRequest>,
}

impl<T: BusTransport> BotService<T> {
    pub fn new(
        transport: T,
        manager: ModuleManager,
        ctx: Arc<BotCtx>,
        outbound: mpsc::UnboundedReceiver<BusMessage>,
        reloads: mpsc::UnboundedReceiver<ReloadRequest>,
    ) -> Self {
        let decoder = EventDecoder::new(ctx.name(), ctx.topic_prefix());
        let dispatcher = HookDispatcher::new(manager.registry(), ctx.clone());
        Self {
            transport,
            decoder,
            dispatcher,
            manager,
            ctx,
            outbound,
            reloads,
        }
    }

    /// Subscribe, request identity metadata, then loop until the transport
    /// fails. No error inside the loop is fatal except a transport one.
    pub async fn run(&mut self) -> Result<(), BotError> {
        for category in EVENT_CATEGORIES {
            self.transport.subscribe(&self.ctx.topic(category)).await?;
        }
        // the identity authority answers with a meta update
        self.transport.publish(&self.ctx.topic("meta_req"), "x").await?;
        info!("Listening on the bus as '{}'", self.ctx.name());

        loop {
            let step = tokio::select! {
                message = self.transport.recv() => Step::Message(message),
                Some(action) = self.outbound.recv() => Step::Outbound(action),
                Some(request) = self.reloads.recv() => Step::Reload(request),
            };

            match step {
                Step::Message(message) => self.handle_message(message?),
                Step::Outbound(action) => {
                    self.transport.publish(&action.topic, &action.body).await?;
                }
                Step::Reload(request) => {
                    if let Err(e) = self.manager.reload(&request.name) {
                        warn!("Reload of '{}' failed: {}", request.name, e);
                    }
                }
            }
        }
    }

    fn handle_message(&self, message: BusMessage) {
        match self.decoder.decode(&message.topic, &message.body) {
            Ok(Inbound::Event(event)) => self.dispatcher.dispatch(&event),
            Ok(Inbound::MetaUpdate(partial)) => {
                self.ctx.meta().merge(partial);
                debug!("Meta updated: {:?}", self.ctx.meta().snapshot());
            }
            Ok(Inbound::Foreign) => {}
            Err(e) => warn!("Dropping message on '{}': {}", message.topic, e),
        }
    }
}
