//! Router Module Index
//!
//! Splits the API by access level so the authentication layer is applied per
//! module, never per handler. Pages are not listed here: they go through the
//! route guard in the fallback handler.

/// Routes open to anonymous visitors: health, sign-in/out and the guard probe.
pub mod public;

/// Routes behind the `AuthUser` middleware: lock screen, navigation, current user.
pub mod authenticated;
