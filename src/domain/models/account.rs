use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub nickname: String,
    pub number: String,
    #[serde(skip_serializing)]
    pub password: String,
}
