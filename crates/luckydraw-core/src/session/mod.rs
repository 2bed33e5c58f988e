// Operator session: credential storage, HTTP transport, and the
// refresh-and-retry manager that every remote call goes through.

pub mod manager;
pub mod store;
pub mod transport;

pub use manager::SessionManager;
pub use store::{Credential, SessionState, SessionStore};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Transport};
