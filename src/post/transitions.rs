use crate::assemble::AssembledTimeline;
use crate::foundation::core::FrameRGBA;
use crate::foundation::error::{ReelError, ReelResult};
use crate::post::composite::{WipeDir, WipeParams, crossfade_in_place, wipe_in_place};
use crate::post::error::PostProcessError;

/// Transition settings as written in configuration.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TransitionSpec {
    /// `cut`, `crossfade` or `wipe`.
    pub kind: String,
    /// Length of the blend window at the end of each outgoing scene.
    pub duration_secs: f64,
    /// Kind-specific parameters (`dir`, `soft_edge` for wipes).
    pub params: serde_json::Value,
}

impl Default for TransitionSpec {
    fn default() -> Self {
        Self {
            kind: "crossfade".to_string(),
            duration_secs: 0.5,
            params: serde_json::Value::Null,
        }
    }
}

impl TransitionSpec {
    /// Hard cuts at every boundary.
    pub fn cut() -> Self {
        Self {
            kind: "cut".to_string(),
            duration_secs: 0.0,
            params: serde_json::Value::Null,
        }
    }
}

/// Parsed transition.
#[derive(Clone, Debug, PartialEq)]
pub enum TransitionKind {
    /// No blending.
    Cut,
    /// Linear blend.
    Crossfade,
    /// Moving edge, optionally feathered.
    Wipe {
        /// Reveal direction.
        dir: WipeDir,
        /// Feather width as a fraction of the wipe axis, in `[0, 1]`.
        soft_edge: f32,
    },
}

/// Parse and check a [`TransitionSpec`].
pub fn parse_transition(spec: &TransitionSpec) -> ReelResult<TransitionKind> {
    if !spec.duration_secs.is_finite() || spec.duration_secs < 0.0 {
        return Err(ReelError::validation(
            "transition duration_secs must be finite and >= 0",
        ));
    }
    let kind = spec.kind.trim().to_ascii_lowercase();
    if kind.is_empty() {
        return Err(ReelError::validation("transition kind must be non-empty"));
    }

    match kind.as_str() {
        "cut" | "none" => Ok(TransitionKind::Cut),
        "crossfade" | "fade" => Ok(TransitionKind::Crossfade),
        "wipe" => {
            let params = if spec.params.is_null() {
                None
            } else {
                Some(
                    spec.params
                        .as_object()
                        .ok_or_else(|| ReelError::validation("wipe params must be an object"))?,
                )
            };

            let dir = match params.and_then(|p| p.get("dir")).and_then(|v| v.as_str()) {
                None => WipeDir::LeftToRight,
                Some(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "left_to_right" | "lefttoright" | "ltr" => WipeDir::LeftToRight,
                    "right_to_left" | "righttoleft" | "rtl" => WipeDir::RightToLeft,
                    "top_to_bottom" | "toptobottom" | "ttb" => WipeDir::TopToBottom,
                    "bottom_to_top" | "bottomtotop" | "btt" => WipeDir::BottomToTop,
                    other => {
                        return Err(ReelError::validation(format!("unknown wipe.dir '{other}'")));
                    }
                },
            };

            let soft_edge = match params
                .and_then(|p| p.get("soft_edge"))
                .and_then(|v| v.as_f64())
            {
                None => 0.0,
                Some(v) => {
                    let f = v as f32;
                    if !f.is_finite() {
                        return Err(ReelError::validation(
                            "wipe.soft_edge must be finite when set",
                        ));
                    }
                    f.clamp(0.0, 1.0)
                }
            };

            Ok(TransitionKind::Wipe { dir, soft_edge })
        }
        _ => Err(ReelError::validation(format!(
            "unknown transition kind '{kind}'"
        ))),
    }
}

/// A blend window at the end of one clip into the start of the next.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct BoundaryTransition {
    pub outgoing: usize,
    pub window_start: u64,
    pub frames: u64,
    pub kind: TransitionKind,
}

impl BoundaryTransition {
    pub(crate) fn covers(&self, frame: u64) -> bool {
        frame >= self.window_start && frame < self.window_start + self.frames
    }

    /// Blend progress at `frame`, strictly inside `(0, 1)`.
    pub(crate) fn progress(&self, frame: u64) -> f32 {
        let j = frame.saturating_sub(self.window_start);
        ((j + 1) as f64 / (self.frames + 1) as f64) as f32
    }
}

/// Decide the transition window at every scene boundary.
///
/// Windows never exceed either neighbouring clip, so the timeline length is unchanged.
pub(crate) fn plan_transitions(
    timeline: &AssembledTimeline,
    kind: &TransitionKind,
    duration_secs: f64,
    issues: &mut Vec<PostProcessError>,
) -> Vec<BoundaryTransition> {
    if *kind == TransitionKind::Cut {
        return Vec::new();
    }
    let want = timeline.fps.secs_to_frames_round(duration_secs);
    if want == 0 {
        return Vec::new();
    }

    let mut out = Vec::new();
    for (pos, pair) in timeline.clips.windows(2).enumerate() {
        let (a, b) = (&pair[0], &pair[1]);
        let frames = want.min(a.frame_count()).min(b.frame_count());
        if frames == 0 {
            continue;
        }
        if a.dimensions() != b.dimensions() {
            let detail = format!(
                "frame sizes differ ({:?} vs {:?})",
                a.dimensions(),
                b.dimensions()
            );
            tracing::warn!(scene_index = a.scene_index, %detail, "transition skipped");
            issues.push(PostProcessError::Transition {
                scene_index: a.scene_index,
                detail,
            });
            continue;
        }
        out.push(BoundaryTransition {
            outgoing: pos,
            window_start: a.end_frame() - frames,
            frames,
            kind: kind.clone(),
        });
    }
    out
}

/// Render the blended frame between `outgoing` and `incoming` at progress `t`.
pub(crate) fn blend_frames(
    outgoing: &FrameRGBA,
    incoming: &FrameRGBA,
    kind: &TransitionKind,
    t: f32,
) -> Result<FrameRGBA, PostProcessError> {
    if !outgoing.same_size(incoming) {
        return Err(PostProcessError::Composite(
            "transition frames differ in size".to_string(),
        ));
    }
    let mut out = FrameRGBA::transparent(outgoing.width, outgoing.height);
    match kind {
        TransitionKind::Cut => out.data.copy_from_slice(&outgoing.data),
        TransitionKind::Crossfade => {
            crossfade_in_place(&mut out.data, &outgoing.data, &incoming.data, t)?;
        }
        TransitionKind::Wipe { dir, soft_edge } => wipe_in_place(
            &mut out.data,
            &outgoing.data,
            &incoming.data,
            WipeParams {
                width: outgoing.width,
                height: outgoing.height,
                t,
                dir: *dir,
                soft_edge: *soft_edge,
            },
        )?,
    }
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/post/transitions.rs"]
mod tests;
