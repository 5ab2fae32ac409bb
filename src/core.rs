//! Client core
//!
//! Translation memo, detection pipeline and auth session. Everything here is
//! UI-agnostic; the view layer drives it through in-process calls.

pub mod translation;
pub mod detection;
pub mod auth;

#[cfg(test)]
pub(crate) mod test_support;
