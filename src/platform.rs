//! Chat-platform metadata consumed by the exchange client, the link controller, and the session.
//!
//! [`PlatformDescriptor`] bundles the OAuth endpoints, the identity endpoint, the REST base used
//! for direct messages, the requested scopes, and the client authentication mode. Endpoints are
//! validated once at construction so flows never handle a half-configured platform.

pub mod descriptor;

pub use descriptor::*;
