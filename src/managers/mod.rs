// Download registry state managers
// Managers own stateful collections and the invariants over them.

pub mod download_registry;
