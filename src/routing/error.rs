use thiserror::Error;

/// Reasons the obstacle-aware router gives up on a connection. Callers
/// recover by falling back to midpoint routing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("visibility graph would need {nodes} nodes (limit {limit})")]
    TooManyNodes { nodes: usize, limit: usize },
    #[error("query endpoint is not part of the visibility graph")]
    EndpointMissing,
    #[error("no obstacle-free path between endpoints")]
    NoPath,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_limit() {
        let err = GraphError::TooManyNodes {
            nodes: 12,
            limit: 10,
        };
        assert!(err.to_string().contains("12"));
        assert!(err.to_string().contains("limit 10"));
    }
}
