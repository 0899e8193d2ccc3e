//! Crate root module declarations for the embedded engine bridge.
//!
//! The bridge runs a stdin/stdout-only UCI engine in-process: the engine's
//! standard streams are rerouted through a pair of pipes, commands are
//! written into one and newline/sentinel-framed responses are polled from the
//! other. Auxiliary data files are located through an ordered resolver chain,
//! and a small C surface exposes the whole thing to managed hosts.

pub mod config;
pub mod errors;
pub mod ffi;

pub mod bridge {
    pub mod command_channel;
    pub mod pipe_bridge;
    pub mod response_channel;
    pub mod session;
}

pub mod resolver {
    pub mod probes;
    pub mod resolver_chain;
    pub mod staging;
}

pub mod engines {
    pub mod engine_loader;
    pub mod engine_trait;
    pub mod protocol_engine;
}

pub mod host {
    pub mod analysis;
    pub mod host_client;
    pub mod output_parser;
}
