//! The report type shared across samlkit layers.
//!
//! Handler, session-store and configuration failures are raised as
//! `Report<HandlerError>`, `Report<SessionStoreError>` and so on. The
//! orchestrator attaches a `ServiceProviderError` on top with `.context()`, so
//! a caller sees which operation failed with the original fault as its cause.

use rootcause::Report;

/// `Result` carrying a `Report` whose top context is `C`.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_type_works() {
        let ok: Result<&str> = Ok("_authn");
        assert_eq!(ok.expect("should be ok"), "_authn");
    }
}
