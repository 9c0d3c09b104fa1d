use std::collections::HashMap;

use log::trace;
use queues::{IsQueue, Queue};

use crate::factor_types::factor_trait::{Factor, Identity};
use crate::maxsum::errors::{FactorError, FactorResult};

// Delivery boundary between factors. Factors never hold references to their neighbors, they
// address them by identity through an adapter.
pub trait CommunicationAdapter<T> {
    fn send(&mut self, message: f64, sender: &T, recipient: &T) -> FactorResult<()>;
}

// Anything able to hand a message to a factor given its identity
pub trait MessageRecipients<T> {
    fn deliver(&mut self, message: f64, sender: &T, recipient: &T) -> FactorResult<()>;
}

impl<T: Identity, F: Factor<T>> MessageRecipients<T> for HashMap<T, F> {
    fn deliver(&mut self, message: f64, sender: &T, recipient: &T) -> FactorResult<()> {
        self.get_mut(recipient)
            .ok_or_else(|| FactorError::unknown_recipient(recipient))?
            .receive(message, sender)
    }
}

// Delivers inside `send`, so a factor running later in the same round already sees the message
pub struct ImmediateCommunicationAdapter<'a, R> {
    recipients: &'a mut R,
}

impl<'a, R> ImmediateCommunicationAdapter<'a, R> {
    pub fn new(recipients: &'a mut R) -> Self {
        ImmediateCommunicationAdapter { recipients }
    }
}

impl<'a, T: Identity, R: MessageRecipients<T>> CommunicationAdapter<T>
    for ImmediateCommunicationAdapter<'a, R>
{
    fn send(&mut self, message: f64, sender: &T, recipient: &T) -> FactorResult<()> {
        trace!("{:?} -> {:?}: {} (immediate)", sender, recipient, message);
        self.recipients.deliver(message, sender, recipient)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Envelope<T> {
    pub message: f64,
    pub sender: T,
    pub recipient: T,
}

// Buffers every send until `tick`, which gives synchronous (Jacobi) rounds
pub struct TickCommunicationAdapter<T: Clone> {
    buffer: Queue<Envelope<T>>,
}

impl<T: Identity> TickCommunicationAdapter<T> {
    pub fn new() -> Self {
        TickCommunicationAdapter {
            buffer: Queue::new(),
        }
    }

    // Number of messages waiting for the next tick
    pub fn pending(&self) -> usize {
        self.buffer.size()
    }

    // Delivers the buffered messages in the order they were sent and empties the buffer
    pub fn tick<R: MessageRecipients<T>>(&mut self, recipients: &mut R) -> FactorResult<usize> {
        let mut delivered = 0;
        while self.buffer.size() > 0 {
            let envelope = self
                .buffer
                .remove()
                .map_err(|err| FactorError::Delivery(err.to_string()))?;
            recipients.deliver(envelope.message, &envelope.sender, &envelope.recipient)?;
            delivered += 1;
        }
        trace!("Tick delivered {} messages", delivered);
        Ok(delivered)
    }

    // Moves every message buffered in `other` to the back of this buffer
    pub fn absorb(&mut self, mut other: TickCommunicationAdapter<T>) -> FactorResult<()> {
        while let Ok(envelope) = other.buffer.remove() {
            self.enqueue(envelope)?;
        }
        Ok(())
    }

    fn enqueue(&mut self, envelope: Envelope<T>) -> FactorResult<()> {
        self.buffer
            .add(envelope)
            .map(|_| ())
            .map_err(|err| FactorError::Delivery(err.to_string()))
    }
}

impl<T: Identity> Default for TickCommunicationAdapter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Identity> CommunicationAdapter<T> for TickCommunicationAdapter<T> {
    fn send(&mut self, message: f64, sender: &T, recipient: &T) -> FactorResult<()> {
        trace!("{:?} -> {:?}: {} (buffered)", sender, recipient, message);
        self.enqueue(Envelope {
            message,
            sender: sender.clone(),
            recipient: recipient.clone(),
        })
    }
}
