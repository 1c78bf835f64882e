//! Message bus transports
//!
//! `TcpBus` speaks the msgbus line protocol against a real server;
//! `MemoryBus` is an in-process stand-in for development and tests.

use crate::application::errors::BusError;
use crate::domain::traits::{BusMessage, BusTransport};
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::info;

/// TCP client for the msgbus server.
///
/// Line-oriented: `sub <topic>` and `pub <topic> <body>` upstream, and one
/// `<topic> <body>` line per delivered message downstream.
pub struct TcpBus {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl TcpBus {
    pub async fn connect(host: &str, port: u16) -> Result<Self, BusError> {
        let stream = TcpStream::connect((host, port)).await?;
        info!("Connected to msgbus at {}:{}", host, port);
        let (read, writer) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(read),
            writer,
        })
    }

    async fn send_line(&mut self, line: String) -> Result<(), BusError> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        Ok(())
    }
}

#[async_trait]
impl BusTransport for TcpBus {
    async fn subscribe(&mut self, topic: &str) -> Result<(), BusError> {
        self.send_line(format!("sub {}", topic)).await
    }

    async fn publish(&mut self, topic: &str, body: &str) -> Result<(), BusError> {
        self.send_line(format!("pub {} {}", topic, body)).await
    }

    async fn recv(&mut self) -> Result<BusMessage, BusError> {
        let mut line = String::new();
        loop {
            line.clear();
            let read = self.reader.read_line(&mut line).await?;
            if read == 0 {
                return Err(BusError::Closed);
            }
            let frame = line.trim_end_matches(['\r', '\n']);
            if frame.is_empty() {
                continue;
            }
            let (topic, body) = frame
                .split_once(' ')
                .ok_or_else(|| BusError::Frame(frame.to_string()))?;
            return Ok(BusMessage::new(topic, body));
        }
    }
}

/// In-process bus for development and tests.
///
/// Delivers only messages on subscribed topics, mirroring the real bus.
pub struct MemoryBus {
    inbound: mpsc::UnboundedReceiver<BusMessage>,
    outbound: mpsc::UnboundedSender<BusMessage>,
    subscriptions: Vec<String>,
}

/// The far side of a [`MemoryBus`]: inject inbound messages, observe
/// everything the bot publishes
pub struct MemoryBusHandle {
    inject: mpsc::UnboundedSender<BusMessage>,
    published: mpsc::UnboundedReceiver<BusMessage>,
}

impl MemoryBus {
    pub fn pair() -> (Self, MemoryBusHandle) {
        let (inject, inbound) = mpsc::unbounded_channel();
        let (outbound, published) = mpsc::unbounded_channel();
        (
            Self {
                inbound,
                outbound,
                subscriptions: Vec::new(),
            },
            MemoryBusHandle { inject, published },
        )
    }
}

#[async_trait]
impl BusTransport for MemoryBus {
    async fn subscribe(&mut self, topic: &str) -> Result<(), BusError> {
        self.subscriptions.push(topic.to_string());
        Ok(())
    }

    async fn publish(&mut self, topic: &str, body: &str) -> Result<(), BusError> {
        self.outbound
            .send(BusMessage::new(topic, body))
            .map_err(|_| BusError::Closed)
    }

    async fn recv(&mut self) -> Result<BusMessage, BusError> {
        loop {
            let message = self.inbound.recv().await.ok_or(BusError::Closed)?;
            if self.subscriptions.iter().any(|t| t == &message.topic) {
                return Ok(message);
            }
        }
    }
}

impl MemoryBusHandle {
    /// Deliver a message to the bot; returns false when the bot is gone
    pub fn inject(&self, topic: &str, body: &str) -> bool {
        self.inject.send(BusMessage::new(topic, body)).is_ok()
    }

    /// Next message the bot published, in order
    pub async fn next_published(&mut self) -> Option<BusMessage> {
        self.published.recv().await
    }
}
