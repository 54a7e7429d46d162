use std::sync::Arc;

use super::backend::ImmediateBackend;
use crate::subscribers::Subscribe;

/// Builder for constructing an [`ImmediateBackend`] with optional features.
#[derive(Default)]
pub struct BackendBuilder {
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl BackendBuilder {
    /// Creates a builder without subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive backend events (call lifecycle, ignored options, drain)
    /// through dedicated workers with bounded queues, starting at `initialize`.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Adds a single subscriber.
    pub fn with_subscriber(mut self, subscriber: Arc<dyn Subscribe>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    /// Builds an uninitialized backend.
    ///
    /// Nothing is spawned here; the bus and subscriber workers start in `initialize`,
    /// so building does not require a runtime.
    pub fn build(self) -> ImmediateBackend {
        ImmediateBackend::from_parts(self.subscribers)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::core::BackendState;
    use crate::events::Event;

    struct Quiet;

    #[async_trait]
    impl Subscribe for Quiet {
        async fn on_event(&self, _event: &Event) {}
    }

    #[test]
    fn builds_outside_a_runtime() {
        let backend = BackendBuilder::new()
            .with_subscriber(Arc::new(Quiet))
            .with_subscriber(Arc::new(Quiet))
            .build();
        assert_eq!(backend.state(), BackendState::Uninitialized);
    }
}
