//! Error type shared by every graph operation.

use crate::node::NodeId;
use crate::patch::PatchId;

/// Errors that can occur while building, mutating, or rendering a graph.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A graph is already live in this process.
    #[error("a graph already exists in this process")]
    DuplicateGraph,

    /// A configuration value cannot be used.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Configuration loading or validation failed.
    #[error(transparent)]
    Config(#[from] rivulet_config::ConfigError),

    /// Destination buffer is wider than the graph output.
    #[error("buffer has {buffer} channels but the graph output has {output}")]
    ChannelCountMismatch {
        /// Channels in the destination buffer.
        buffer: usize,
        /// Input channels of the output sink.
        output: usize,
    },

    /// The node type has no input with this name.
    #[error("node '{node}' has no input named '{name}'")]
    UnknownParameter {
        /// Type name of the node (or patch name).
        node: String,
        /// Requested input name.
        name: String,
    },

    /// The node type has no buffer slot with this name.
    #[error("node '{node}' has no buffer named '{name}'")]
    UnknownBuffer {
        /// Type name of the node.
        node: String,
        /// Requested buffer slot name.
        name: String,
    },

    /// No patch is registered under this name.
    #[error("no patch registered as '{0}'")]
    UnknownPatch(String),

    /// No node type is registered under this name.
    #[error("no node type registered as '{0}'")]
    UnknownNodeType(String),

    /// The file format cannot be read or written by this build.
    #[error("no codec available for '{0}'")]
    CodecUnavailable(String),

    /// Handle refers to a node that has been freed.
    #[error("{0} not found")]
    NodeNotFound(NodeId),

    /// Handle refers to a patch that has been freed.
    #[error("{0} not found")]
    PatchNotFound(PatchId),

    /// Binding this input would close a cycle.
    #[error("connecting {from} into {to} would create a cycle")]
    CycleDetected {
        /// Producer that was being bound.
        from: NodeId,
        /// Consumer whose input was being rebound.
        to: NodeId,
    },

    /// A render asked for more frames than node blocks hold.
    #[error("cannot render {requested} frames; maximum block size is {max}")]
    BlockTooLarge {
        /// Frames requested.
        requested: usize,
        /// Configured maximum.
        max: usize,
    },

    /// The control queue is full; the render thread has fallen behind.
    #[error("graph command queue is full")]
    CommandQueueFull,

    /// The graph behind a controller has been dropped.
    #[error("graph has been dropped")]
    GraphClosed,

    /// A recording was requested while none is running.
    #[error("no recording in progress")]
    NotRecording,

    /// Patch description could not be parsed.
    #[error("invalid patch description: {0}")]
    PatchDescription(String),

    /// WAV decode/encode failure.
    #[cfg(feature = "wav")]
    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type for graph operations.
pub type Result<T> = std::result::Result<T, Error>;
