/// Router Module Index
///
/// Splits the routing table by access level. Authentication is applied per module
/// through an Axum layer, so a protected endpoint cannot be exposed by accident.

/// Routes open to anonymous callers. Handlers apply visibility themselves using the
/// optional caller identity.
pub mod public;

/// Routes behind the `AuthUser` middleware. Ownership is checked in the handlers.
pub mod authenticated;
