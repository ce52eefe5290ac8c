/*! # Copresence Tests

Multi-client setup for the integration tests of the copresence library.

Every client owns its own [`VisibilityCoordinator`](copresence::prelude::VisibilityCoordinator); the clients
only learn about each other's scene changes through an in-process relay.
*/

extern crate alloc;

#[cfg(test)]
mod multi_client;
pub mod relay;
pub mod stepper;
