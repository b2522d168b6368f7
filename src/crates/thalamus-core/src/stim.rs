//! Stimulation command contract.

use futures::future::LocalBoxFuture;
use thalamus_proto::{StimRequest, StimResponse};

/// Synchronously invoked stimulation surface. A request either declares a
/// program under an id, retrieves a previous declaration, or triggers a
/// declared program; the returned future resolves to the declaration or
/// acknowledgement.
pub trait StimNode {
    fn stim(&self, request: StimRequest) -> LocalBoxFuture<'static, StimResponse>;
}
