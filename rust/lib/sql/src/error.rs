use thiserror::Error;

#[derive(Error, Debug)]
pub enum SQLError {
    #[error("query error: {0}")]
    Query(String),

    #[error("execution error: {0}")]
    Execution(String),

    #[error("constraint violation: {0}")]
    Constraint(String),

    /// A foreign key points at a row that does not exist.
    #[error("foreign key violation: {0}")]
    ForeignKey(String),

    #[error("connection error: {0}")]
    Connection(String),
}
