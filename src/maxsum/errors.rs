use std::fmt::Debug;

use thiserror::Error;

pub type FactorResult<R> = Result<R, FactorError>;

// Identities are rendered with `Debug` so that the error type does not depend on them
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FactorError {
    #[error("factor {factor} has no neighbor {neighbor}")]
    InvalidNeighbor { factor: String, neighbor: String },

    #[error("assignment evaluated by factor {factor} does not assign neighbor {neighbor}")]
    UnassignedNeighbor { factor: String, neighbor: String },

    #[error("factor {factor} does not support {operation}")]
    UnsupportedOperation {
        factor: String,
        operation: &'static str,
    },

    #[error("factor {factor} cannot place {requested} neighbors in set A, it only has {neighbors}")]
    InvalidPartition {
        factor: String,
        requested: usize,
        neighbors: usize,
    },

    #[error("potential of factor {factor} must have shape {expected:?}, found {found:?}")]
    ShapeMismatch {
        factor: String,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[error("no factor {recipient} to deliver a message to")]
    UnknownRecipient { recipient: String },

    #[error("no factor {factor} in the graph")]
    UnknownFactor { factor: String },

    #[error("message delivery failed: {0}")]
    Delivery(String),
}

impl FactorError {
    pub fn invalid_neighbor<T: Debug>(factor: &T, neighbor: &T) -> Self {
        FactorError::InvalidNeighbor {
            factor: format!("{:?}", factor),
            neighbor: format!("{:?}", neighbor),
        }
    }

    pub fn unassigned_neighbor<T: Debug>(factor: &T, neighbor: &T) -> Self {
        FactorError::UnassignedNeighbor {
            factor: format!("{:?}", factor),
            neighbor: format!("{:?}", neighbor),
        }
    }

    pub fn unsupported<T: Debug>(factor: &T, operation: &'static str) -> Self {
        FactorError::UnsupportedOperation {
            factor: format!("{:?}", factor),
            operation,
        }
    }

    pub fn unknown_recipient<T: Debug>(recipient: &T) -> Self {
        FactorError::UnknownRecipient {
            recipient: format!("{:?}", recipient),
        }
    }

    pub fn unknown_factor<T: Debug>(factor: &T) -> Self {
        FactorError::UnknownFactor {
            factor: format!("{:?}", factor),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_identities() {
        let error = FactorError::invalid_neighbor(&3, &7);
        assert_eq!(error.to_string(), "factor 3 has no neighbor 7");

        let error = FactorError::unsupported(&"agent", "direct send");
        assert_eq!(
            error.to_string(),
            "factor \"agent\" does not support direct send"
        );
    }
}
