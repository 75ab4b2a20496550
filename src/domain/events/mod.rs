//! Protocol event names the pipeline fires itself.

pub const ON_SEND_COMPLETED: &str = "onSendCompleted";
pub const ON_CONNECT: &str = "onConnect";
pub const ON_DISCONNECT: &str = "onDisconnect";
