//! paxhook - LLM provider interception for Pax Historia
//!
//! A local proxy that sits between the game and its backend. Requests to the
//! game's chat endpoint are answered by a provider of the player's choice
//! (Gemini, Claude, OpenRouter, local servers, ...); everything else, and
//! every interception that fails, goes to the game's own backend unchanged.

pub mod admin;
pub mod classify;
pub mod config;
pub mod error;
pub mod normalize;
pub mod providers;
pub mod proxy;
pub mod retry;
pub mod schema;
pub mod settings;
pub mod testing;

pub use error::HookError;
