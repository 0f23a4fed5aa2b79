//! Domain model (envelope, callback result, consumer state, errors).

pub mod envelope;
pub mod errors;
pub mod outcome;
pub mod state;

pub use self::envelope::{TaskEnvelope, TaskMeta};
pub use self::errors::{
    CallbackError, CodecError, ConsumeError, CorruptEnvelopeError, PublishError, StoreError,
};
pub use self::outcome::CallbackResult;
pub use self::state::{ConsumerState, StopCause};
