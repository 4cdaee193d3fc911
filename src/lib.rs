//! # MeetMatch (Campus Event Listings)
//!
//! `meetmatch` serves a catalog of campus events to signed-in users. Anyone can
//! create an account or log in; every catalog route sits behind a bearer token
//! gate.
//!
//! ## Accounts
//!
//! Users sign up with a name, email, and password. Emails are normalized
//! (trimmed, lowercased) and unique: the `users_email_key` index decides, so
//! two concurrent signups for one address produce exactly one account.
//! Passwords are stored only as Argon2id PHC strings.
//!
//! ## Session Tokens
//!
//! Signup and login both return an HS256 JWT carrying `userId`, `email`,
//! `iat`, and `exp` (24 hours by default). Verification checks the signature
//! before looking at any claim and rejects tokens at or past `exp`. There is
//! no server-side session table and no revocation; a token is valid until it
//! expires.
//!
//! ## Authorization Gate
//!
//! Protected routes go through [`api::handlers::auth::require_token`]:
//! no `Authorization: Bearer` header answers `401 Access denied`, any token that
//! fails verification answers `403 Invalid token`, and a valid token attaches a
//! [`api::handlers::auth::Principal`] to the request.
//!
//! ## Storage
//!
//! `PostgreSQL` through `sqlx`, with an idempotent schema (`sql/schema.sql`)
//! applied at startup. An empty catalog is filled with sample events unless
//! `--skip-seed` is given.

pub mod api;
pub mod auth;
pub mod cli;
pub mod store;
pub mod vault;
