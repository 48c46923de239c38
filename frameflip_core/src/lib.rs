// Copyright 2026 the Frameflip Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Video render manager: frame slots, late-frame selection and vsync clock
//! sync between a decoder thread and a render thread.
//!
//! `frameflip_core` sits between a video decoder and a renderer backend. The
//! decoder hands pictures to a fixed pool of frame slots; the render thread
//! decides, once per display refresh, which queued frame should be on
//! screen, skipping frames that are already too late and nudging the media
//! clock toward the vblank phase.
//!
//! # Architecture
//!
//! ```text
//!   producer thread                          render thread
//!   ───────────────                          ─────────────
//!   wait_for_buffer ─┐                       frame_move ──► prepare_next_render
//!   add_picture ─────┼──► SlotPool ◄─────────┤                    │
//!   flip_page ───────┘   Free/Queued/        │              select_frame
//!                        Presenting/Discard  │                    │
//!                                            │           RenderBackend::flip_page
//!                                            ▼
//!                                         render ──► present ──► RenderBackend::render_update
//!
//!          ClockSource ◄── clock sync ──┘        PlayerPort ◄── buffer levels, info
//! ```
//!
//! **[`manager`]**: [`RenderManager`](manager::RenderManager), the
//! three-lock coordinator and the only type most callers need.
//!
//! **[`slots`]**: The slot pool. Every slot is in exactly one lifecycle
//! collection at a time.
//!
//! **[`scheduler`]**: Pure frame-selection and clock-sync math.
//!
//! **[`backend`]**: The [`RenderBackend`](backend::RenderBackend) contract
//! and stream parameters. [`software`] is a copy-based implementation.
//!
//! **[`clock`]**, **[`display`]**, **[`port`]**: Collaborators the
//! manager reads time and display state from and reports to.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) events for pipeline
//! instrumentation.
//!
//! Timestamps are [`MediaTime`](time::MediaTime): `f64` microseconds.

pub mod backend;
pub mod clock;
pub mod config;
pub mod display;
pub mod error;
pub mod event;
pub mod flags;
pub mod format;
pub mod manager;
pub mod picture;
pub mod port;
pub mod present;
mod queue;
pub mod scheduler;
pub mod slot;
pub mod slots;
pub mod software;
pub mod time;
pub mod timing;
pub mod trace;

pub use manager::{BufferWait, RenderManager, RenderStats};
