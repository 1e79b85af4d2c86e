pub mod health;
pub mod oauth;
pub mod sse;
pub mod wallet;
