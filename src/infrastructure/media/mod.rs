pub mod hasher;
pub mod http;
