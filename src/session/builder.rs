//! Builder pattern for client configuration.
//!
//! Provides a fluent API for configuring and creating [`Client`] instances.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use websocket_ssl_pinning::{Client, TungsteniteTransport};
//!
//! let client = Client::builder()
//!     .transport(Arc::new(TungsteniteTransport::new()))
//!     .event_capacity(1024)
//!     .build()?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use tokio::sync::broadcast;

use crate::cookie::{CookieJar, CookieSink};
use crate::error::{Error, Result};
use crate::transport::{Transport, TungsteniteTransport};

use super::client::Client;

// ============================================================================
// Constants
// ============================================================================

/// Events buffered per subscriber before the slowest one starts lagging.
pub(crate) const DEFAULT_EVENT_CAPACITY: usize = 256;

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for configuring a [`Client`] instance.
///
/// Use [`Client::builder()`] to create a new builder.
#[derive(Clone)]
pub struct ClientBuilder {
    /// Transport used to dial sockets.
    transport: Option<Arc<dyn Transport>>,
    /// Durable sink for accepted cookies.
    cookie_sink: Option<Arc<dyn CookieSink>>,
    /// Event channel capacity.
    event_capacity: usize,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            transport: None,
            cookie_sink: None,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("custom_transport", &self.transport.is_some())
            .field("cookie_sink", &self.cookie_sink.is_some())
            .field("event_capacity", &self.event_capacity)
            .finish()
    }
}

// ============================================================================
// ClientBuilder Implementation
// ============================================================================

impl ClientBuilder {
    /// Creates a builder with the default transport and no cookie sink.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the transport.
    ///
    /// Defaults to [`TungsteniteTransport`].
    #[inline]
    #[must_use]
    pub fn transport<T: Transport + 'static>(mut self, transport: Arc<T>) -> Self {
        let transport: Arc<dyn Transport> = transport;
        self.transport = Some(transport);
        self
    }

    /// Sets the sink that receives every accepted cookie.
    #[inline]
    #[must_use]
    pub fn cookie_sink<S: CookieSink + 'static>(mut self, sink: Arc<S>) -> Self {
        let sink: Arc<dyn CookieSink> = sink;
        self.cookie_sink = Some(sink);
        self
    }

    /// Sets how many events each subscriber may fall behind by.
    #[inline]
    #[must_use]
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Builds the client with validation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the event capacity is zero.
    pub fn build(self) -> Result<Client> {
        if self.event_capacity == 0 {
            return Err(Error::config(
                "Event capacity must be at least 1. Use .event_capacity() to set it.",
            ));
        }

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(TungsteniteTransport::new()),
        };
        let jar = match self.cookie_sink {
            Some(sink) => CookieJar::with_sink(sink),
            None => CookieJar::new(),
        };
        let (events, _) = broadcast::channel(self.event_capacity);

        Ok(Client::from_parts(transport, Arc::new(jar), events))
    }
}

// ============================================================================
// Tests
// ============================================================================
