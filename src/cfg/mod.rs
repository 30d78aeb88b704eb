// SPDX-License-Identifier: AGPL-3.0-or-later

//! Session configuration and its small supporting enumerations.

/// Tunables applied to a [`crate::session::Session`] before `run()`.
pub mod config;
/// Enumerations used by the configuration and the public API.
pub mod enums;
