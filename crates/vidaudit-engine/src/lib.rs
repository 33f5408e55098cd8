//! Analysis pipeline: attachment intake, request building, the retrying
//! Gemini transport, response validation and the session state machine.

pub mod attachments;
pub mod builder;
pub mod config;
pub mod session;
pub mod transport;
pub mod validator;

pub use attachments::AttachmentStore;
pub use builder::RequestBuilder;
pub use config::{RetryPolicy, TransportConfig};
pub use session::{failure_message, AnalysisSession, AnalysisStateMachine, ViewRenderer};
pub use transport::{
    AnalysisTransport, HttpExchange, HttpReply, ReqwestExchange, RetryingTransport, Sleeper,
    ThreadSleeper,
};
pub use validator::ResponseValidator;
