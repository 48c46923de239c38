// Copyright 2026 the Frameflip Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render-pass dispatch by present method.
//!
//! | method | passes per call | flags |
//! |--------|-----------------|-------|
//! | SINGLE | 1 | field of the frame, if any |
//! | BOB    | 1 (two calls per frame) | first field + `FIELD0`, then other field + `FIELD1` |
//! | WEAVE  | as BOB | as BOB, plus `WEAVE` |
//! | BLEND  | 2 | first field + `NOOSD` at `alpha`, other field at `alpha / 2` |

use crate::backend::RenderBackend;
use crate::flags::RenderFlags;
use crate::timing::{PresentField, PresentMethod, PresentStep};

/// Draws the current page according to its present method.
///
/// `step` tells the two-pass methods which field is due: [`PresentStep::Frame`]
/// selects the first field, anything else the second.
pub fn present(
    backend: &mut dyn RenderBackend,
    method: PresentMethod,
    field: PresentField,
    step: PresentStep,
    clear: bool,
    flags: RenderFlags,
    alpha: u8,
) {
    match method {
        PresentMethod::Bob => present_fields(backend, field, step, clear, flags, alpha),
        PresentMethod::Weave => present_fields(
            backend,
            field,
            step,
            clear,
            flags | RenderFlags::WEAVE,
            alpha,
        ),
        PresentMethod::Blend => present_blend(backend, field, clear, flags, alpha),
        PresentMethod::Single => present_single(backend, field, clear, flags, alpha),
    }
}

fn present_single(
    backend: &mut dyn RenderBackend,
    field: PresentField,
    clear: bool,
    flags: RenderFlags,
    alpha: u8,
) {
    let field_flag = match field {
        PresentField::Top => RenderFlags::TOP,
        PresentField::Bot => RenderFlags::BOT,
        PresentField::None => RenderFlags::empty(),
    };
    backend.render_update(clear, flags | field_flag, alpha);
}

fn present_fields(
    backend: &mut dyn RenderBackend,
    field: PresentField,
    step: PresentStep,
    clear: bool,
    flags: RenderFlags,
    alpha: u8,
) {
    let pass = if step == PresentStep::Frame {
        let first = if field == PresentField::Bot {
            RenderFlags::BOT
        } else {
            RenderFlags::TOP
        };
        first | RenderFlags::FIELD0
    } else {
        let second = if field == PresentField::Top {
            RenderFlags::BOT
        } else {
            RenderFlags::TOP
        };
        second | RenderFlags::FIELD1
    };
    backend.render_update(clear, flags | pass, alpha);
}

fn present_blend(
    backend: &mut dyn RenderBackend,
    field: PresentField,
    clear: bool,
    flags: RenderFlags,
    alpha: u8,
) {
    let (first, second) = if field == PresentField::Bot {
        (RenderFlags::BOT, RenderFlags::TOP)
    } else {
        (RenderFlags::TOP, RenderFlags::BOT)
    };
    backend.render_update(clear, flags | first | RenderFlags::NOOSD, alpha);
    backend.render_update(false, flags | second, alpha / 2);
}
