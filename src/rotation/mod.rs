//! # Credential Rotation
//!
//! Replaces a long-lived external API token without an outage window. A
//! rotation coordinator drives four independently invoked steps against one
//! `(SecretId, ClientRequestToken)` pair:
//!
//! | Step | Action | Writes |
//! |---|---|---|
//! | `createSecret` | refresh the current token, store the result as PENDING | one pending value |
//! | `setSecret` | nothing | none |
//! | `testSecret` | check the pending token against the live API | none |
//! | `finishSecret` | move CURRENT onto the pending version | one relabel |
//!
//! Before any step the token must be registered against the secret: a version
//! already labeled CURRENT short-circuits, anything not labeled PENDING is
//! rejected. The previous credential is never deleted; it keeps its data under
//! the PREVIOUS label.
//!
//! ```rust,ignore
//! let workflow = RotationWorkflow::new(store, provider);
//! let request = RotationRequest::new("INSTAGRAM_SECRET_KEY", token, "createSecret");
//! workflow.handle(&request).await?;
//! ```

pub mod error;
pub mod request;
pub mod workflow;

pub use error::{Result, RotationError};
pub use request::{RotationRequest, RotationStep};
pub use workflow::{RotationOutcome, RotationWorkflow};
