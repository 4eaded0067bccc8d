// error.rs -- errors surfaced by world queries that take caller-supplied handles

use thiserror::Error;

/// Caller mistakes the world code can't recover from on its own.
///
/// Runtime degradations (capacity caps, out-of-world entities, registry
/// inconsistencies) are never reported through this type; those only print
/// a diagnostic.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum WorldError {
    #[error("entity number {0} is out of range")]
    BadEntityNumber(i32),
    #[error("entity {entity} references inline model {modelindex}, which the collision model does not have")]
    MissingInlineModel { entity: i32, modelindex: i32 },
}

pub type WorldResult<T> = Result<T, WorldError>;
