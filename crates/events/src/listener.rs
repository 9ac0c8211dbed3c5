use crate::IntegrationEvent;

/// Reacts to integration events received from a topic (consumer-side handler).
///
/// Listeners are driven by a worker loop that owns the subscription. The
/// worker decodes each payload into `Ev` and calls `on_event`; an error is
/// logged by the worker and the loop moves on to the next message. There is
/// no acknowledgement back to the publisher and no retry.
///
/// Listeners must tolerate duplicates and concurrent deliveries for the same
/// key: nothing upstream deduplicates or serializes messages.
pub trait EventListener<Ev: IntegrationEvent>: Send + 'static {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn on_event(&mut self, event: Ev) -> Result<(), Self::Error>;
}
