//! Reserved request parameter names

/// Query/form parameter carrying the transaction token
pub const TRANSACTION_TOKEN_PARAM: &str = "transactionToken";

/// Query parameter carrying the redirect context identifier
pub const CONTEXT_ID_PARAM: &str = "contextId";

/// Parameters that must never be echoed into a further redirect
pub const RESERVED_PARAMS: &[&str] = &[TRANSACTION_TOKEN_PARAM, CONTEXT_ID_PARAM];

/// Whether `name` is a reserved parameter
pub fn is_reserved(name: &str) -> bool {
    RESERVED_PARAMS.contains(&name)
}
