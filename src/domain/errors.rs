/// Failures talking to the backend tables (`orders`, `order_items`, `promo_codes`).
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("Malformed {table} record {id}: {reason}")]
    Malformed {
        table: &'static str,
        id: String,
        reason: String,
    },
    #[error("Record {0} does not exist.")]
    NotFound(String),
    #[error("Backend is unavailable.")]
    Unavailable,
}
