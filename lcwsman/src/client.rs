//! Low-level WS-Management client.

use tracing::{debug, info};

use crate::enumeration::Pager;
use crate::errors::WsmanError;
use crate::selectors::{SelectorCache, invoke_selectors};
use crate::soap::{
    self, DEFAULT_MAX_ELEMENTS, Properties, PropertyValue, PullBatch, SelectorSet,
};
use crate::transport::{Endpoint, HttpTransport, Transport, send_with_retry};

/// One client per device.
///
/// Calls are issued one at a time; the client holds its selector cache in a
/// `RefCell`, so it is `!Sync` and cannot be shared between threads.
pub struct WsmanClient<T: Transport = HttpTransport> {
    transport: T,
    selectors: SelectorCache,
}

impl WsmanClient<HttpTransport> {
    pub fn connect(endpoint: &Endpoint) -> Self {
        info!(url = %endpoint.url(), "Creating WSMAN client");
        Self::new(HttpTransport::new(endpoint))
    }
}

impl<T: Transport> WsmanClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            selectors: SelectorCache::new(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn selector_cache(&self) -> &SelectorCache {
        &self.selectors
    }

    pub fn identify(&self) -> Result<Properties, WsmanError> {
        let body = send_with_retry(&self.transport, soap::build_identify)?;
        soap::parse_identify(&body)
    }

    pub fn get(&self, class: &str, selectors: &SelectorSet) -> Result<Properties, WsmanError> {
        debug!(class, selectors = ?selectors.names(), "Get");
        let body = send_with_retry(&self.transport, || {
            soap::build_get(self.transport.url(), class, selectors)
        })?;
        soap::parse_get(&body, class)
    }

    /// Every instance of `class`, across all Pull batches.
    pub fn enumerate(&self, class: &str) -> Result<Vec<Properties>, WsmanError> {
        self.pager(class, DEFAULT_MAX_ELEMENTS)?.drain()
    }

    /// Starts an enumeration and returns its batch iterator.
    pub fn pager(&self, class: &str, max_elements: u32) -> Result<Pager<'_, T>, WsmanError> {
        Pager::start(self, class, max_elements)
    }

    pub fn enumeration_context(&self, class: &str) -> Result<String, WsmanError> {
        let body = send_with_retry(&self.transport, || {
            soap::build_enumerate(self.transport.url(), class)
        })?;
        soap::parse_enumerate(&body)
    }

    pub fn pull(
        &self,
        class: &str,
        context: &str,
        max_elements: u32,
    ) -> Result<PullBatch, WsmanError> {
        let body = send_with_retry(&self.transport, || {
            soap::build_pull(self.transport.url(), class, context, max_elements)
        })?;
        soap::parse_pull(&body, class)
    }

    /// Selectors addressing the service instance of `class`, resolved on
    /// first use and then served from the cache.
    pub fn invoke_selectors(&self, class: &str) -> Result<SelectorSet, WsmanError> {
        if let Some(selectors) = self.selectors.get(class) {
            return Ok(selectors);
        }

        let instances = self.enumerate(class)?;
        let first = instances.first().ok_or_else(|| {
            WsmanError::element_not_found(format!("No {} instance to invoke methods on", class))
        })?;

        let selectors = invoke_selectors(first);
        info!(class, selectors = ?selectors.names(), "Resolved invoke selectors");
        self.selectors.insert(class, selectors.clone());
        Ok(selectors)
    }

    /// Invokes `method` on the service instance of `class`.
    pub fn invoke(
        &self,
        class: &str,
        method: &str,
        properties: &[(String, PropertyValue)],
    ) -> Result<Properties, WsmanError> {
        let selectors = self.invoke_selectors(class)?;
        self.invoke_with_selectors(class, method, &selectors, properties)
    }

    pub fn invoke_with_selectors(
        &self,
        class: &str,
        method: &str,
        selectors: &SelectorSet,
        properties: &[(String, PropertyValue)],
    ) -> Result<Properties, WsmanError> {
        debug!(class, method, arguments = properties.len(), "Invoke");
        let body = send_with_retry(&self.transport, || {
            soap::build_invoke(self.transport.url(), class, method, selectors, properties)
        })?;
        soap::parse_invoke(&body, class, method)
    }
}
