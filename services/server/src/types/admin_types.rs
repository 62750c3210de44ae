use serde::Deserialize;
use validator::Validate;

#[derive(Deserialize, Debug)]
pub struct FailedTransactionQuery {
    pub resolved: Option<bool>,
}

#[derive(Deserialize, Validate, Debug)]
pub struct ResolveFailedTransactionInput {
    #[validate(length(min = 1, max = 2000, message = "Resolution notes are required"))]
    pub notes: String,
}
