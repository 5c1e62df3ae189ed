mod admin;
mod signature;

pub use admin::{
    AdminApiKey,
    AdminGuardFactory,
    AdminGuardService,
    AdminIdentity,
    ADMIN_ID_HEADER,
    ADMIN_KEY_HEADER,
};
pub use signature::{SignatureMiddlewareFactory, SignatureMiddlewareService};
