//! Configuration types for the JSON-RPC server

use std::num::NonZeroUsize;
use std::thread;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::decode::DEFAULT_READ_BUFFER;

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Maximum number of batch elements executing at once (0 is treated as 1)
    pub max_workers: usize,

    /// Lookahead buffer used when detecting batch input
    pub read_buffer_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_workers: thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
            read_buffer_size: DEFAULT_READ_BUFFER,
        }
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }

    /// Worker pool size actually used
    pub fn workers(&self) -> usize {
        self.max_workers.clamp(1, Semaphore::MAX_PERMITS)
    }
}
