mod acl;
mod jwt;

pub use acl::{claims_satisfy, AclMiddlewareFactory, AclMiddlewareService};
pub use jwt::{JwtMiddlewareFactory, JwtMiddlewareService, ACCESS_TOKEN_HEADER};
