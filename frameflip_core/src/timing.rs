// Copyright 2026 the Frameflip Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Presentation state machines and per-frame presentation attributes.
//!
//! Two state machines drive the manager:
//!
//! ```text
//!   RenderState:   Unconfigured ──configure()──► Configuring ──backend ok──► Configured
//!                        ▲                            │
//!                        └──────── backend failed ────┘
//!
//!   PresentStep:   Idle ──flip_page()──► Ready ──select──► Flip ──page flip──► Frame
//!                   ▲                                                          │
//!                   └──────────── render() (Frame2 first for BOB/WEAVE) ───────┘
//! ```
//!
//! [`present_method`] maps the producer's deinterlacing request onto the
//! method the render pass will use.

/// Configuration state of the render manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum RenderState {
    /// No backend configuration is active.
    #[default]
    Unconfigured,
    /// A configuration has been requested and awaits the render thread.
    Configuring,
    /// The backend is configured and frames may flow.
    Configured,
}

/// Position of the presentation pipeline within one frame's lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum PresentStep {
    /// Nothing pending.
    #[default]
    Idle,
    /// A frame is queued and awaits selection.
    Ready,
    /// A frame has been selected and awaits the backend page flip.
    Flip,
    /// The first (or only) field is being rendered.
    Frame,
    /// The second field is being rendered.
    Frame2,
}

/// Field of an interlaced frame that is shown first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum PresentField {
    /// Progressive content.
    #[default]
    None,
    /// Top field first.
    Top,
    /// Bottom field first.
    Bot,
}

/// How a frame is rendered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum PresentMethod {
    /// One pass.
    #[default]
    Single,
    /// One field at full alpha and the other at half alpha.
    Blend,
    /// Both fields woven into one frame, one pass per field.
    Weave,
    /// Each field line-doubled in its own pass.
    Bob,
}

impl PresentMethod {
    /// Returns `true` if the method renders two passes per frame.
    #[inline]
    #[must_use]
    pub const fn is_two_pass(self) -> bool {
        matches!(self, Self::Bob | Self::Weave)
    }
}

/// Deinterlacing requested by the producer for one frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum DeinterlaceMethod {
    /// Progressive content, no deinterlacing.
    #[default]
    None,
    /// Let the backend decide; two passes if it wants them.
    Auto,
    /// Render-time blend.
    Blend,
    /// Render-time weave.
    Weave,
    /// Render-time bob.
    Bob,
}

/// Resolves the present method and effective field for a flipped frame.
///
/// Progressive frames (or frames with no field sync) always render as
/// [`PresentMethod::Single`]; unspecified deinterlacing falls back to BOB
/// only when the backend asks for a double pass.
#[must_use]
pub fn present_method(
    deinterlace: DeinterlaceMethod,
    field_sync: PresentField,
    wants_double_pass: bool,
) -> (PresentMethod, PresentField) {
    if deinterlace == DeinterlaceMethod::None {
        return (PresentMethod::Single, PresentField::None);
    }
    if field_sync == PresentField::None {
        return (PresentMethod::Single, field_sync);
    }
    let method = match deinterlace {
        DeinterlaceMethod::Blend => PresentMethod::Blend,
        DeinterlaceMethod::Weave => PresentMethod::Weave,
        DeinterlaceMethod::Bob => PresentMethod::Bob,
        DeinterlaceMethod::Auto | DeinterlaceMethod::None => {
            if wants_double_pass {
                PresentMethod::Bob
            } else {
                PresentMethod::Single
            }
        }
    };
    (method, field_sync)
}

/// Returns the step that follows a completed render pass.
///
/// `Frame` advances to `Frame2` for two-pass methods; everything else
/// settles to `Idle`. Steps before the page flip are left unchanged.
#[must_use]
pub fn step_after_render(step: PresentStep, method: PresentMethod) -> PresentStep {
    match step {
        PresentStep::Frame if method.is_two_pass() => PresentStep::Frame2,
        PresentStep::Frame | PresentStep::Frame2 => PresentStep::Idle,
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progressive_frames_render_single_without_field() {
        let (method, field) = present_method(DeinterlaceMethod::None, PresentField::Top, true);
        assert_eq!(method, PresentMethod::Single);
        assert_eq!(field, PresentField::None, "field is forced off");
    }

    #[test]
    fn missing_field_sync_renders_single() {
        let (method, _) = present_method(DeinterlaceMethod::Bob, PresentField::None, true);
        assert_eq!(method, PresentMethod::Single);
    }

    #[test]
    fn explicit_methods_are_honored() {
        assert_eq!(
            present_method(DeinterlaceMethod::Blend, PresentField::Bot, false).0,
            PresentMethod::Blend
        );
        assert_eq!(
            present_method(DeinterlaceMethod::Weave, PresentField::Top, false).0,
            PresentMethod::Weave
        );
        assert_eq!(
            present_method(DeinterlaceMethod::Bob, PresentField::Top, false).0,
            PresentMethod::Bob
        );
    }

    #[test]
    fn auto_depends_on_double_pass() {
        assert_eq!(
            present_method(DeinterlaceMethod::Auto, PresentField::Top, false).0,
            PresentMethod::Single
        );
        assert_eq!(
            present_method(DeinterlaceMethod::Auto, PresentField::Top, true).0,
            PresentMethod::Bob
        );
    }

    #[test]
    fn two_pass_methods_visit_frame2() {
        assert_eq!(
            step_after_render(PresentStep::Frame, PresentMethod::Bob),
            PresentStep::Frame2
        );
        assert_eq!(
            step_after_render(PresentStep::Frame2, PresentMethod::Bob),
            PresentStep::Idle
        );
        assert_eq!(
            step_after_render(PresentStep::Frame, PresentMethod::Single),
            PresentStep::Idle
        );
        assert_eq!(
            step_after_render(PresentStep::Ready, PresentMethod::Single),
            PresentStep::Ready,
            "steps before the flip are untouched"
        );
    }
}
