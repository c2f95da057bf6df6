//! Ingress channel factory and handles.

use super::types::Ingress;
use tokio::sync::mpsc;

/// Default buffer size for the ingress channel.
///
/// Enough to absorb bursts from a script or adapter without unbounded memory.
pub const DEFAULT_CHANNEL_BUFFER: usize = 256;

/// Sender handle for ingress messages.
pub type IngressSender = mpsc::Sender<Ingress>;
/// Receiver handle for ingress messages.
pub type IngressReceiver = mpsc::Receiver<Ingress>;

/// Create a new ingress channel.
///
/// Returns a (sender, receiver) pair. Multiple producers can clone the
/// sender; the receiver belongs to the `CoordinatorService`.
pub fn ingress_channel() -> (IngressSender, IngressReceiver) {
    mpsc::channel(DEFAULT_CHANNEL_BUFFER)
}
