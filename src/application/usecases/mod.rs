pub mod compose_message;
pub mod receive_messages;
pub mod send_messages;
