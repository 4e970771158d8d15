//! # Chunked Channel
//!
//! Queues outbound payloads, slices them into bounded frames, and
//! reassembles inbound frames into whole payloads.
//!
//! The channel performs no I/O. A transport drives it:
//!
//! 1. whenever the transport can accept a frame it calls
//!    [`ChunkedChannel::poll_transmit`] and writes what it gets back;
//! 2. for every received frame it calls [`ChunkedChannel::receive_frame`]
//!    and handles any completed payload.
//!
//! The channel asks for transmit opportunities through a
//! [`TransmitRequester`]. All methods take `&mut self`, so a channel is
//! owned by exactly one poll loop; other threads hand payloads to that
//! loop instead of touching the queue.

use crate::XritError;
use std::collections::VecDeque;

// =============================================================================
// FRAMES
// =============================================================================

/// Start/end-of-message markers carried by every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameFlags {
    pub start: bool,
    pub end: bool,
}

impl FrameFlags {
    const START_BIT: u8 = 0b01;
    const END_BIT: u8 = 0b10;

    /// A frame that is both the first and the last of its message.
    pub const COMPLETE: Self = Self {
        start: true,
        end: true,
    };

    /// Pack into the low two bits of a byte.
    #[must_use]
    pub const fn bits(self) -> u8 {
        let mut bits = 0;
        if self.start {
            bits |= Self::START_BIT;
        }
        if self.end {
            bits |= Self::END_BIT;
        }
        bits
    }

    /// Unpack from a byte; unknown bits are ignored.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self {
            start: bits & Self::START_BIT != 0,
            end: bits & Self::END_BIT != 0,
        }
    }
}

/// One bounded slice of an outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub flags: FrameFlags,
    pub payload: Vec<u8>,
}

/// The transport's "give me another chance to send" primitive.
pub trait TransmitRequester {
    fn request_transmit(&self);
}

// =============================================================================
// CHANNEL
// =============================================================================

#[derive(Debug)]
struct OutgoingMessage {
    content: Vec<u8>,
    bytes_sent: usize,
}

/// Inbound reassembly state.
#[derive(Debug, Default, PartialEq, Eq)]
enum Reassembly {
    /// Between messages.
    #[default]
    Idle,
    /// A start frame has been seen.
    Receiving,
    /// A sequencing error occurred; frames are dropped until the next start.
    Discarding,
}

/// Outbound queue plus inbound reassembly buffer for one endpoint.
///
/// Lives across reconnects; the transport reports them through
/// [`ChunkedChannel::on_connected`] and [`ChunkedChannel::on_disconnected`].
#[derive(Debug)]
pub struct ChunkedChannel<R> {
    requester: R,
    outgoing: VecDeque<OutgoingMessage>,
    can_send: bool,
    max_bytes_per_frame: usize,
    incoming: Vec<u8>,
    reassembly: Reassembly,
}

impl<R: TransmitRequester> ChunkedChannel<R> {
    /// Create a disconnected channel. A frame size of zero is raised to one.
    #[must_use]
    pub fn new(requester: R, max_bytes_per_frame: usize) -> Self {
        Self {
            requester,
            outgoing: VecDeque::new(),
            can_send: false,
            max_bytes_per_frame: max_bytes_per_frame.max(1),
            incoming: Vec::new(),
            reassembly: Reassembly::Idle,
        }
    }

    /// Open the send gate; queued messages start draining.
    pub fn on_connected(&mut self) {
        self.can_send = true;
        if !self.outgoing.is_empty() {
            self.requester.request_transmit();
        }
    }

    /// Close the send gate and drop partial inbound state.
    ///
    /// Queued messages are kept for the next connection; a partially sent
    /// head message is restarted from its first byte.
    pub fn on_disconnected(&mut self) {
        self.can_send = false;
        self.incoming.clear();
        self.reassembly = Reassembly::Idle;
        if let Some(head) = self.outgoing.front_mut() {
            head.bytes_sent = 0;
        }
    }

    /// Queue a whole payload for sending.
    pub fn send_message(&mut self, content: Vec<u8>) -> Result<(), XritError> {
        if content.is_empty() {
            return Err(XritError::EmptyMessage);
        }
        self.outgoing.push_back(OutgoingMessage {
            content,
            bytes_sent: 0,
        });
        self.requester.request_transmit();
        Ok(())
    }

    /// Number of payloads waiting (including one partially sent).
    #[must_use]
    pub fn queued(&self) -> usize {
        self.outgoing.len()
    }

    /// Produce the next frame, or `None` when there is nothing to send.
    ///
    /// While anything is left in the queue after this frame, including the
    /// rest of a partially sent message, another transmit opportunity is
    /// requested so the queue drains without outside help.
    pub fn poll_transmit(&mut self) -> Option<Frame> {
        if !self.can_send {
            return None;
        }
        let head = self.outgoing.front_mut()?;

        let start = head.bytes_sent == 0;
        let remaining = head.content.len() - head.bytes_sent;
        let length = remaining.min(self.max_bytes_per_frame);
        let payload = head.content[head.bytes_sent..head.bytes_sent + length].to_vec();
        head.bytes_sent += length;

        let end = head.bytes_sent == head.content.len();
        if end {
            self.outgoing.pop_front();
        }
        if !self.outgoing.is_empty() {
            self.requester.request_transmit();
        }

        Some(Frame {
            flags: FrameFlags { start, end },
            payload,
        })
    }

    /// Feed one received frame. Returns the full payload when `flags.end`
    /// completes a message.
    ///
    /// A start frame while a message is in progress, or a continuation with
    /// no message in progress, is a sequencing error: the partial payload
    /// is dropped and frames are discarded until the next start frame.
    pub fn receive_frame(
        &mut self,
        payload: &[u8],
        flags: FrameFlags,
    ) -> Result<Option<Vec<u8>>, XritError> {
        match (&self.reassembly, flags.start) {
            (Reassembly::Receiving, true) => {
                self.incoming.clear();
                self.reassembly = Reassembly::Discarding;
                return Err(XritError::FrameOutOfOrder(
                    "start of message while another message is in progress".to_string(),
                ));
            }
            (Reassembly::Idle, false) => {
                self.reassembly = Reassembly::Discarding;
                return Err(XritError::FrameOutOfOrder(
                    "continuation frame without start of message".to_string(),
                ));
            }
            (Reassembly::Discarding, false) => return Ok(None),
            (Reassembly::Idle | Reassembly::Discarding, true) | (Reassembly::Receiving, false) => {}
        }

        self.reassembly = Reassembly::Receiving;
        self.incoming.extend_from_slice(payload);

        if flags.end {
            self.reassembly = Reassembly::Idle;
            return Ok(Some(std::mem::take(&mut self.incoming)));
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Debug, Clone, Default)]
    struct CountingRequester(Rc<Cell<usize>>);

    impl TransmitRequester for CountingRequester {
        fn request_transmit(&self) {
            self.0.set(self.0.get() + 1);
        }
    }

    fn connected(max: usize) -> (ChunkedChannel<CountingRequester>, Rc<Cell<usize>>) {
        let requester = CountingRequester::default();
        let count = Rc::clone(&requester.0);
        let mut channel = ChunkedChannel::new(requester, max);
        channel.on_connected();
        (channel, count)
    }

    #[test]
    fn flags_pack_into_bits() {
        assert_eq!(FrameFlags::COMPLETE.bits(), 0b11);
        assert_eq!(FrameFlags::from_bits(0b10), FrameFlags { start: false, end: true });
    }

    #[test]
    fn empty_message_is_rejected() {
        let (mut channel, _) = connected(4);
        assert!(matches!(channel.send_message(Vec::new()), Err(XritError::EmptyMessage)));
        assert_eq!(channel.queued(), 0);
    }

    #[test]
    fn send_requests_transmit() {
        let (mut channel, count) = connected(4);
        channel.send_message(b"abc".to_vec()).expect("send");
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn slices_message_into_frames() {
        let (mut channel, _) = connected(4);
        channel.send_message(b"0123456789".to_vec()).expect("send");

        let first = channel.poll_transmit().expect("frame");
        let second = channel.poll_transmit().expect("frame");
        let third = channel.poll_transmit().expect("frame");

        assert_eq!(first.payload, b"0123");
        assert_eq!(first.flags, FrameFlags { start: true, end: false });
        assert_eq!(second.payload, b"4567");
        assert_eq!(second.flags, FrameFlags::default());
        assert_eq!(third.payload, b"89");
        assert_eq!(third.flags, FrameFlags { start: false, end: true });
        assert!(channel.poll_transmit().is_none());
    }

    #[test]
    fn nothing_is_sent_before_connect() {
        let mut channel = ChunkedChannel::new(CountingRequester::default(), 4);
        channel.send_message(b"abc".to_vec()).expect("send");

        assert!(channel.poll_transmit().is_none());
        channel.on_connected();
        assert!(channel.poll_transmit().is_some());
    }

    #[test]
    fn burst_requests_follow_up_transmits() {
        let (mut channel, count) = connected(16);
        channel.send_message(b"one".to_vec()).expect("send");
        channel.send_message(b"two".to_vec()).expect("send");
        count.set(0);

        let frame = channel.poll_transmit().expect("frame");
        assert_eq!(frame.flags, FrameFlags::COMPLETE);
        assert_eq!(count.get(), 1);

        channel.poll_transmit().expect("frame");
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn partial_message_requests_next_frame() {
        let (mut channel, count) = connected(2);
        channel.send_message(b"abcd".to_vec()).expect("send");
        count.set(0);

        let first = channel.poll_transmit().expect("frame");
        assert!(!first.flags.end);
        assert_eq!(count.get(), 1);

        let last = channel.poll_transmit().expect("frame");
        assert!(last.flags.end);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn disconnect_restarts_partial_message() {
        let (mut channel, _) = connected(2);
        channel.send_message(b"abcd".to_vec()).expect("send");
        channel.poll_transmit().expect("frame");

        channel.on_disconnected();
        channel.on_connected();

        let frame = channel.poll_transmit().expect("frame");
        assert!(frame.flags.start);
        assert_eq!(frame.payload, b"ab");
    }

    #[test]
    fn reassembles_frames() {
        let (mut channel, _) = connected(4);

        let partial = channel
            .receive_frame(b"hel", FrameFlags { start: true, end: false })
            .expect("frame");
        assert!(partial.is_none());

        let whole = channel
            .receive_frame(b"lo", FrameFlags { start: false, end: true })
            .expect("frame");
        assert_eq!(whole, Some(b"hello".to_vec()));
    }

    #[test]
    fn start_during_message_is_an_error_and_discards() {
        let (mut channel, _) = connected(4);
        channel
            .receive_frame(b"a", FrameFlags { start: true, end: false })
            .expect("frame");

        let result = channel.receive_frame(b"b", FrameFlags { start: true, end: false });
        assert!(matches!(result, Err(XritError::FrameOutOfOrder(_))));

        let dropped = channel
            .receive_frame(b"c", FrameFlags { start: false, end: true })
            .expect("frame");
        assert!(dropped.is_none());

        let recovered = channel
            .receive_frame(b"ok", FrameFlags::COMPLETE)
            .expect("frame");
        assert_eq!(recovered, Some(b"ok".to_vec()));
    }

    #[test]
    fn continuation_without_start_is_an_error() {
        let (mut channel, _) = connected(4);
        let result = channel.receive_frame(b"x", FrameFlags { start: false, end: true });
        assert!(matches!(result, Err(XritError::FrameOutOfOrder(_))));
    }
}
