/// An error while interpreting query arguments
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error(
        "Invalid order direction '{0}'. Expected one of AscNullsFirst, AscNullsLast, DescNullsFirst, DescNullsLast, ASC or DESC"
    )]
    InvalidOrderDirection(String),
}
