//! Per-invocation contexts carried through the two pipeline scopes.

use crate::ports::MessageReceiver;
use shared_types::Message;
use std::fmt;
use std::sync::Arc;

/// Final state of a message after its pipeline ran.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Disposition {
    /// Acknowledged and removed from the active queue.
    Completed,
    /// Moved to dead-letter storage.
    DeadLettered,
    /// Not settled; the transport will redeliver it.
    LeftForRedelivery,
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Disposition::Completed => write!(f, "completed"),
            Disposition::DeadLettered => write!(f, "dead-lettered"),
            Disposition::LeftForRedelivery => write!(f, "left-for-redelivery"),
        }
    }
}

/// One received message travelling through the message pipeline.
///
/// Created per message by the batch dispatcher and dropped once the pipeline
/// returns. Never cloned.
pub struct MessageContext {
    message: Message,
    receiver: Arc<dyn MessageReceiver>,
    subscriber_name: Arc<str>,
    disposition: Option<Disposition>,
}

impl MessageContext {
    /// Wrap a received message.
    pub fn new(
        message: Message,
        receiver: Arc<dyn MessageReceiver>,
        subscriber_name: Arc<str>,
    ) -> Self {
        Self {
            message,
            receiver,
            subscriber_name,
            disposition: None,
        }
    }

    /// The message being processed.
    pub fn message(&self) -> &Message {
        &self.message
    }

    /// Receiver capability for settling this message.
    pub fn receiver(&self) -> &Arc<dyn MessageReceiver> {
        &self.receiver
    }

    /// Name of the subscriber processing the message.
    pub fn subscriber_name(&self) -> &str {
        &self.subscriber_name
    }

    /// Message type tag, with the logging fallback.
    pub fn message_type(&self) -> &str {
        self.message.message_type_or_unknown()
    }

    /// Correlation id, with the logging fallback.
    pub fn correlation_id(&self) -> &str {
        self.message.correlation_id_or_null()
    }

    /// Disposition recorded by the disposing behaviour, if any.
    pub fn disposition(&self) -> Option<Disposition> {
        self.disposition
    }

    pub(crate) fn set_disposition(&mut self, disposition: Disposition) {
        self.disposition = Some(disposition);
    }
}

impl fmt::Debug for MessageContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageContext")
            .field("message_id", &self.message.id)
            .field("message_type", &self.message_type())
            .field("correlation_id", &self.correlation_id())
            .field("disposition", &self.disposition)
            .finish()
    }
}

/// One received batch travelling through the batch pipeline.
pub struct BatchContext {
    messages: Vec<Message>,
    receiver: Arc<dyn MessageReceiver>,
    subscriber_name: Arc<str>,
    dispositions: Vec<Disposition>,
}

impl BatchContext {
    /// Wrap a received batch.
    pub fn new(
        messages: Vec<Message>,
        receiver: Arc<dyn MessageReceiver>,
        subscriber_name: Arc<str>,
    ) -> Self {
        Self {
            messages,
            receiver,
            subscriber_name,
            dispositions: Vec::new(),
        }
    }

    /// Messages not yet dispatched.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of messages in the batch.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Name of the subscriber processing the batch.
    pub fn subscriber_name(&self) -> &str {
        &self.subscriber_name
    }

    /// Dispositions of the messages dispatched so far.
    pub fn dispositions(&self) -> &[Disposition] {
        &self.dispositions
    }

    /// Split the batch into per-message contexts, leaving it empty.
    pub(crate) fn take_message_contexts(&mut self) -> Vec<MessageContext> {
        std::mem::take(&mut self.messages)
            .into_iter()
            .map(|message| {
                MessageContext::new(
                    message,
                    Arc::clone(&self.receiver),
                    Arc::clone(&self.subscriber_name),
                )
            })
            .collect()
    }

    /// Hand every undispatched message back to the transport.
    pub(crate) fn leave_undispatched(&mut self) {
        let remaining = std::mem::take(&mut self.messages).len();
        self.dispositions
            .extend(std::iter::repeat(Disposition::LeftForRedelivery).take(remaining));
    }

    pub(crate) fn push_disposition(&mut self, disposition: Disposition) {
        self.dispositions.push(disposition);
    }
}

impl fmt::Debug for BatchContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchContext")
            .field("messages", &self.messages.len())
            .field("dispositions", &self.dispositions)
            .finish()
    }
}
