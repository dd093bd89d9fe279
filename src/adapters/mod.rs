// Adapters layer: concrete implementations for external systems.
// Filesystem storage lives with the CLI config in `config::cli`.

pub mod blocklist_source;
pub mod http;
pub mod nextdns;
