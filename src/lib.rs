//! Judgement and spawn engine for a four-lane arrow rhythm game.
//!
//! A [`game::Session`] owns the falling notes and the score/combo/health
//! state. The host samples its playback clock once per frame and calls
//! [`game::Session::tick`], forwards key-down edges to
//! [`game::Session::handle_edge`], and draws from [`game::Session::snapshot`].

pub mod config;
pub mod game;
