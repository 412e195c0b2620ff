// # Record Source Trait
//
// Defines the interface for reading raw router state.
//
// ## Purpose
//
// A record source answers "what does the router report right now" for one
// resource (hotspot sessions, DHCP leases, interfaces). It returns the payload
// as-is: decoding, keying and diffing belong to the core.
//
// ## Implementations
//
// - MikroTik RouterOS REST API (`routerwatch-source-mikrotik`)
// - Scripted doubles in tests

use async_trait::async_trait;

use crate::record::Resource;

/// Trait for record source implementations
///
/// # Thread Safety
///
/// The four cycles may call `fetch` concurrently for different resources.
///
/// # Trust Level: Untrusted (Plugin)
///
/// ## Allowed Capabilities
/// - ✅ Perform network I/O against the router
/// - ✅ Hold connection pools and credentials
///
/// ## Forbidden Capabilities
/// - ❌ Interpret rows (owned by the snapshot builder)
/// - ❌ Cache or synthesize payloads when the router is unreachable
/// - ❌ Retry internally beyond one request per call (the schedule is the retry)
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Fetch the current raw payload for a resource
    ///
    /// # Returns
    ///
    /// - `Ok(Value)`: The payload the router returned. Normally a JSON array
    ///   of row objects; anything else is rejected by the snapshot builder.
    /// - `Err(Error)`: Transport, HTTP or authentication failure. The caller
    ///   treats any error as "source unavailable" for this cycle.
    async fn fetch(&self, resource: Resource) -> Result<serde_json::Value, crate::Error>;

    /// Human-readable source name for logs
    fn name(&self) -> &str {
        "record-source"
    }
}

/// Helper trait for constructing record sources from configuration
pub trait RecordSourceFactory: Send + Sync {
    /// Create a RecordSource instance from configuration
    ///
    /// # Parameters
    ///
    /// - `config`: Source configuration
    ///
    /// # Returns
    ///
    /// A boxed RecordSource trait object
    fn create(
        &self,
        config: &crate::config::SourceConfig,
    ) -> Result<Box<dyn RecordSource>, crate::Error>;
}
