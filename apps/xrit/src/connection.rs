//! # Connection Loop
//!
//! A [`Link`] holds the [`ChunkedChannel`] and the outbound queue for one
//! endpoint and outlives individual connections: messages queued while the
//! peer is away are sent after the next connect, and a message cut off by a
//! disconnect is resent from its first byte.
//!
//! While connected, one task drives the link and is the only place that
//! touches the channel. It multiplexes three event sources:
//!
//! - **transmit requests**: the channel's requester is a [`Notify`]; each
//!   wake-up writes at most one frame;
//! - **outbound messages**: any task holding a [`ChannelHandle`] pushes
//!   whole messages through an unbounded mpsc queue;
//! - **inbound frames**: read from the stream and reassembled; complete
//!   messages go to the [`MessageHandler`].

use crate::config::TransportConfig;
use crate::transport::FrameCodec;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::{Notify, mpsc};
use tokio_util::codec::Framed;
use xrit_core::{ChunkedChannel, TransmitRequester, XritError};

/// Wakes the connection loop when the channel has a frame to send.
#[derive(Debug, Clone)]
struct NotifyRequester(Arc<Notify>);

impl TransmitRequester for NotifyRequester {
    fn request_transmit(&self) {
        self.0.notify_one();
    }
}

/// Cloneable sender into a link's outbound queue.
///
/// Safe to use from any task or thread, connected or not; the connection
/// loop picks the message up and feeds it to its channel.
#[derive(Debug, Clone)]
pub struct ChannelHandle {
    outbound: mpsc::UnboundedSender<Vec<u8>>,
}

impl ChannelHandle {
    /// Queue a whole message for sending.
    pub fn send(&self, message: String) -> Result<(), XritError> {
        if message.is_empty() {
            return Err(XritError::EmptyMessage);
        }
        self.outbound
            .send(message.into_bytes())
            .map_err(|_| XritError::IoError("link closed".to_string()))
    }

    /// Queue several messages in order, stopping at the first failure.
    pub fn send_all(&self, messages: Vec<String>) -> Result<(), XritError> {
        messages.into_iter().try_for_each(|message| self.send(message))
    }
}

/// Channel state shared by every connection of one endpoint.
#[derive(Debug)]
pub struct Link {
    channel: ChunkedChannel<NotifyRequester>,
    notify: Arc<Notify>,
    handle: ChannelHandle,
    queued: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl Link {
    /// A disconnected link slicing outbound messages per `transport`.
    #[must_use]
    pub fn new(transport: &TransportConfig) -> Self {
        let notify = Arc::new(Notify::new());
        let channel = ChunkedChannel::new(
            NotifyRequester(Arc::clone(&notify)),
            transport.max_bytes_per_frame,
        );
        let (outbound, queued) = mpsc::unbounded_channel();
        Self {
            channel,
            notify,
            handle: ChannelHandle { outbound },
            queued,
        }
    }

    /// A sender that stays valid across reconnects.
    #[must_use]
    pub fn handle(&self) -> ChannelHandle {
        self.handle.clone()
    }

    /// Messages held by the channel, including one partially sent.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.channel.queued()
    }
}

/// Reacts to connection events. Runs on the connection task.
pub trait MessageHandler {
    /// The transport is up; `handle` stays valid for the connection.
    fn on_connected(&mut self, handle: &ChannelHandle);

    /// A complete text message arrived.
    fn on_message(&mut self, message: &str, handle: &ChannelHandle);

    /// Checked after every event; `true` closes the connection.
    fn is_finished(&self) -> bool {
        false
    }
}

/// Drive one connection over `link` until the peer closes it or the
/// handler finishes.
pub async fn run_connection<S, H>(
    stream: S,
    transport: &TransportConfig,
    link: &mut Link,
    handler: &mut H,
) -> Result<(), XritError>
where
    S: AsyncRead + AsyncWrite + Unpin,
    H: MessageHandler + ?Sized,
{
    let Link {
        channel,
        notify,
        handle,
        queued,
    } = link;
    let mut framed = Framed::new(stream, FrameCodec::new(transport.max_frame_size));

    channel.on_connected();
    handler.on_connected(handle);

    let result = loop {
        if handler.is_finished() {
            break Ok(());
        }

        tokio::select! {
            Some(content) = queued.recv() => {
                if let Err(e) = channel.send_message(content) {
                    tracing::warn!("Dropping outbound message: {}", e);
                }
            }
            () = notify.notified() => {
                if let Some(frame) = channel.poll_transmit() {
                    if let Err(e) = framed.send(frame).await {
                        break Err(e);
                    }
                }
            }
            inbound = framed.next() => match inbound {
                None => {
                    tracing::info!("Peer closed the connection");
                    break Ok(());
                }
                Some(Err(e)) => break Err(e),
                Some(Ok(frame)) => match channel.receive_frame(&frame.payload, frame.flags) {
                    Ok(Some(payload)) => match String::from_utf8(payload) {
                        Ok(message) => {
                            tracing::debug!(bytes = message.len(), "Message received");
                            handler.on_message(&message, handle);
                        }
                        Err(e) => tracing::warn!("Dropping non-UTF-8 message: {}", e),
                    },
                    Ok(None) => {}
                    Err(e) => tracing::warn!("Dropping frame: {}", e),
                },
            },
        }
    };

    channel.on_disconnected();
    if channel.queued() > 0 {
        tracing::debug!("{} message(s) held for the next connection", channel.queued());
    }
    result
}

/// Dial `transport.address()` and serve `handler` over `link`,
/// reconnecting after every disconnect.
///
/// Runs until the surrounding task is cancelled.
pub async fn run_client<H>(transport: &TransportConfig, link: &mut Link, handler: &mut H)
where
    H: MessageHandler + ?Sized,
{
    let address = transport.address();
    let interval = Duration::from_millis(transport.reconnect_interval_ms);

    loop {
        match TcpStream::connect(&address).await {
            Ok(stream) => {
                if let Err(e) = stream.set_nodelay(true) {
                    tracing::debug!("Could not disable Nagle: {}", e);
                }
                match run_connection(stream, transport, link, handler).await {
                    Ok(()) => tracing::info!("Disconnected from {}", address),
                    Err(e) => tracing::warn!("Connection to {} failed: {}", address, e),
                }
            }
            Err(e) => tracing::debug!("{} unreachable: {}", address, e),
        }

        tokio::time::sleep(interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xrit_core::FrameFlags;

    struct Recorder {
        greeting: Option<&'static str>,
        received: Vec<String>,
        limit: usize,
    }

    impl MessageHandler for Recorder {
        fn on_connected(&mut self, handle: &ChannelHandle) {
            if let Some(greeting) = self.greeting {
                handle.send(greeting.to_string()).expect("send");
            }
        }

        fn on_message(&mut self, message: &str, _handle: &ChannelHandle) {
            self.received.push(message.to_string());
        }

        fn is_finished(&self) -> bool {
            self.received.len() >= self.limit
        }
    }

    #[test]
    fn empty_message_is_rejected_by_handle() {
        let (outbound, _queued) = mpsc::unbounded_channel();
        let handle = ChannelHandle { outbound };

        assert!(matches!(handle.send(String::new()), Err(XritError::EmptyMessage)));
    }

    fn recorder(greeting: Option<&'static str>, limit: usize) -> Recorder {
        Recorder {
            greeting,
            received: Vec::new(),
            limit,
        }
    }

    #[tokio::test]
    async fn message_crosses_a_duplex_pipe_in_small_frames() {
        let (left, right) = tokio::io::duplex(64);
        let transport = TransportConfig {
            max_bytes_per_frame: 2,
            ..TransportConfig::default()
        };
        let mut sender_link = Link::new(&transport);
        let mut receiver_link = Link::new(&transport);

        let mut sender = recorder(Some("hello, node"), usize::MAX);
        let mut receiver = recorder(None, 1);

        let (sent, received) = tokio::join!(
            run_connection(left, &transport, &mut sender_link, &mut sender),
            run_connection(right, &transport, &mut receiver_link, &mut receiver)
        );

        assert!(sent.is_ok());
        assert!(received.is_ok());
        assert_eq!(receiver.received, vec!["hello, node".to_string()]);
    }

    #[tokio::test]
    async fn cut_message_is_resent_whole_on_the_next_connection() {
        use tokio::io::AsyncReadExt;

        let transport = TransportConfig {
            max_bytes_per_frame: 4,
            ..TransportConfig::default()
        };
        let mut link = Link::new(&transport);
        link.handle()
            .send("0123456789abcdef".to_string())
            .expect("queued while disconnected");

        // Room for exactly one 9-byte frame; the peer takes it and hangs up.
        let (near, mut far) = tokio::io::duplex(9);
        let peer = async move {
            let mut first = [0u8; 9];
            far.read_exact(&mut first).await.expect("first frame");
            first
        };
        let mut silent = recorder(None, usize::MAX);
        let (_, first) = tokio::join!(
            run_connection(near, &transport, &mut link, &mut silent),
            peer
        );

        assert_eq!(first[0], FrameFlags { start: true, end: false }.bits());
        assert_eq!(&first[5..], b"0123");
        assert_eq!(link.pending(), 1);

        let (near, far) = tokio::io::duplex(64);
        let mut receiver_link = Link::new(&transport);
        let mut receiver = recorder(None, 1);
        let (sent, received) = tokio::join!(
            run_connection(near, &transport, &mut link, &mut silent),
            run_connection(far, &transport, &mut receiver_link, &mut receiver)
        );

        assert!(sent.is_ok());
        assert!(received.is_ok());
        assert_eq!(receiver.received, vec!["0123456789abcdef".to_string()]);
        assert_eq!(link.pending(), 0);
    }
}
