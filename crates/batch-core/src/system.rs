use batch_model::NodeLabel;

const FALLBACK_NODE: &str = "built-in";

/// Label of the node this process runs on.
///
/// Uses the host name; falls back to `"built-in"` when it is unavailable or not UTF-8.
pub fn local_node() -> NodeLabel {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .filter(|name| !name.is_empty())
        .map(NodeLabel::from)
        .unwrap_or_else(|| NodeLabel::from(FALLBACK_NODE))
}
