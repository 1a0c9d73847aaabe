//! Session services: storage bridge, remote mirror, sync, and the session.
//!
//! ARCHITECTURE
//! ============
//! Service modules own the persistence and sync rules so the CLI and the
//! event loop stay focused on input translation.

pub mod remote;
pub mod session;
pub mod store;
pub mod sync;

// =============================================================================
// TEST HELPERS
// =============================================================================
