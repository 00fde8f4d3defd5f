//! Widget reconciliation engine for live audience panels embedded in slide decks.
//!
//! A deck is edited by a human while this crate keeps a set of document-native
//! shapes (Q&A panels, polls, word clouds) in step with a remote session. The
//! document host is injected through [`host::DocumentHost`]; everything the
//! engine needs to remember lives in string tags on pages and shapes, so the
//! engine has to cope with ids that were deleted, duplicated, or never written.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Serialized entry points: insert, update, bind, sync |
//! | [`drivers`] | Per-kind update drivers (Q&A/discussion, poll, word cloud) |
//! | [`binding`] | Per-page binding state machine |
//! | [`recovery`] | Manifest reconstruction from shape tags and heuristics |
//! | [`manifest`] | Role → shape id manifests and their validation |
//! | [`tags`] | Typed tag schema over the host's string tags |
//! | [`layout`] | Word-cloud, poll and panel geometry |
//! | [`style`] | Style normalization per widget kind |
//! | [`geometry`] / [`color`] | Rect math, easing, color mixing |
//! | [`host`] / [`memory`] | Document host interface and the in-memory deck |
//! | [`capability`] | Shape-kind fallback resolution |
//! | [`session`] | Session data records and push-event folding |
//! | [`client`] | REST + websocket client for the session service |
//! | [`config`] | Environment-driven configuration |
//! | [`consts`] | Shared constants (tag keys, slot limits, thresholds) |

pub mod binding;
pub mod capability;
pub mod client;
pub mod color;
pub mod config;
pub mod consts;
pub mod drivers;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod host;
pub mod kind;
pub mod layout;
pub mod manifest;
pub mod memory;
pub mod recovery;
pub mod session;
pub mod style;
pub mod tags;
