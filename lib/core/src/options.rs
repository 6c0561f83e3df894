use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_BUFFER_SIZE: u64 = 64 * 1024 * 1024;

/// How a collection is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionOptions {
    pub read_only: bool,
    pub enable_mmap: bool,
    /// Write buffer size in bytes before the engine spills.
    pub max_buffer_size: u64,
}

impl Default for CollectionOptions {
    fn default() -> Self {
        Self {
            read_only: false,
            enable_mmap: true,
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
        }
    }
}

impl CollectionOptions {
    pub fn read_only() -> Self {
        Self {
            read_only: true,
            ..Self::default()
        }
    }
}

macro_rules! concurrency_options {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
            pub struct $name {
                /// Worker fan-out hint; 0 lets the engine decide.
                pub concurrency: u32,
            }

            impl $name {
                pub fn new(concurrency: u32) -> Self {
                    Self { concurrency }
                }
            }
        )*
    };
}

concurrency_options!(
    CreateIndexOptions,
    OptimizeOptions,
    /// Options for adding a column.
    AddColumnOptions,
    AlterColumnOptions,
);
