use thiserror::Error;

/// Errors from the Layer Registry.
///
/// These are hard integration failures: the caller drove the registry with
/// an edge, layer, or interface that was never set up. Governance outcomes
/// (unauthorized edges, mismatched interfaces on registration) are recorded
/// as violations instead and never surface here.
#[derive(Error, Debug)]
pub enum LayerError {
    #[error("no dependency edge registered from '{from}' to '{to}' over '{interface}'")]
    NoDependencyEdge {
        from: String,
        to: String,
        interface: String,
    },

    #[error("unknown layer: {0}")]
    UnknownLayer(String),

    #[error("unknown interface: {0}")]
    UnknownInterface(String),

    #[error("interface '{interface}' is owned by '{owner}', not '{expected}'")]
    InterfaceNotOwned {
        interface: String,
        owner: String,
        expected: String,
    },
}
