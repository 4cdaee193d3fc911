//! API handlers for MeetMatch.
//!
//! `auth` owns signup, login, and the token gate; `events` is the catalog
//! behind that gate; `health` is public.

pub mod auth;
pub mod events;
pub mod health;
