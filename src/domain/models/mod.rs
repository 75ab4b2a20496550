pub mod account;
pub mod contact;
pub mod inbound;
pub mod media;
pub mod message;
pub mod recipient;
pub mod record;

pub use account::Account;
pub use contact::ContactCard;
pub use inbound::{InboundMessage, InboundNode, MessageBody, ProtocolNode};
pub use media::{InboundMediaType, LinkedMedia, MediaDescriptor, MediaKind};
pub use message::{
    ContactMessage, LocationMessage, MediaMessage, MessageKind, PendingMessage, SendCall,
};
pub use recipient::{RecipientGroup, Target};
pub use record::DispatchRecord;
