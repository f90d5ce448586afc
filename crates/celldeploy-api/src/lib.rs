//! celldeploy-api: Shared types
//!
//! Discovery metadata handed back to test clients after a deployment, the
//! remote protocol description, and the deployment event stream.

pub mod events;
pub mod metadata;

pub use events::DeployEvent;
pub use metadata::{
    ARQUILLIAN_SERVLET_NAME, DEFAULT_PROTOCOL, HttpContext, PROTOCOL_LABEL, ProtocolDescription,
    ProtocolMetadata, Servlet,
};
