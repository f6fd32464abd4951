use crate::script::model::{Scene, Script};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

/// Longest accepted title, in characters.
const MAX_TITLE_CHARS: usize = 200;
/// Slack used when comparing section boundaries.
const BOUNDARY_EPS: f64 = 1e-6;

/// Duration policy applied after structural validation.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Expected total duration in seconds when the script does not declare one.
    pub target_duration_secs: f64,
    /// Allowed relative deviation from the target (`0.1` = ±10%).
    pub tolerance: f64,
    /// Proceed with a warning instead of failing on a duration mismatch.
    pub allow_duration_mismatch: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            target_duration_secs: 60.0,
            tolerance: 0.10,
            allow_duration_mismatch: false,
        }
    }
}

impl ValidationConfig {
    /// Check that the policy itself is usable.
    pub fn validate(&self) -> Result<(), String> {
        if !self.target_duration_secs.is_finite() || self.target_duration_secs <= 0.0 {
            return Err("validation.target_duration_secs must be a positive number".to_string());
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err("validation.tolerance must be a non-negative number".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// One step of a JSON path.
pub enum PathElem {
    /// Object field.
    Field(&'static str),
    /// Array index.
    Index(usize),
}

/// A single violated constraint, located by JSON path.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldError {
    /// Location of the offending value.
    pub path: Vec<PathElem>,
    /// Human-readable constraint that was violated.
    pub constraint: String,
}

impl FieldError {
    fn at(path: &[PathElem], constraint: impl Into<String>) -> Self {
        Self {
            path: path.to_vec(),
            constraint: constraint.into(),
        }
    }

    /// Render the path as `$.scenes[1].duration`.
    pub fn path_string(&self) -> String {
        format_path(&self.path)
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", format_path(&self.path), self.constraint)
    }
}

fn format_path(path: &[PathElem]) -> String {
    let mut s = String::from("$");
    for p in path {
        match *p {
            PathElem::Field(name) => {
                s.push('.');
                s.push_str(name);
            }
            PathElem::Index(i) => {
                s.push('[');
                s.push_str(&i.to_string());
                s.push(']');
            }
        }
    }
    s
}

/// Structural problems found in a script, all reported together.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Every violated constraint, in document order.
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    /// Return `true` when some error is located at `path` (e.g. `"$.title"`).
    pub fn has_error_at(&self, path: &str) -> bool {
        self.errors.iter().any(|e| e.path_string() == path)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid script: ")?;
        for (i, e) in self.errors.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// The script is structurally valid but its total duration misses the target.
///
/// The parsed script travels with the error so a caller can decide to proceed anyway.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error(
    "script duration {declared_secs:.2}s deviates from target {target_secs:.2}s by more than {pct:.0}%",
    pct = .tolerance * 100.0
)]
pub struct DurationMismatchError {
    /// Sum of scene durations.
    pub declared_secs: f64,
    /// Target total duration.
    pub target_secs: f64,
    /// Relative tolerance that was exceeded.
    pub tolerance: f64,
    script: Box<Script>,
}

impl DurationMismatchError {
    /// Borrow the otherwise-valid script.
    pub fn script(&self) -> &Script {
        &self.script
    }

    /// Accept the mismatch and take the script.
    pub fn into_script(self) -> Script {
        *self.script
    }
}

/// Failure to turn raw input into a [`Script`].
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    /// Input is not parseable JSON.
    #[error("script parse error: {0}")]
    Parse(String),
    /// Script file could not be read or written.
    #[error("script io error: {0}")]
    Io(String),
    /// Structural validation failed.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Duration check failed.
    #[error(transparent)]
    DurationMismatch(#[from] DurationMismatchError),
}

/// Parse JSON text and validate it.
pub fn parse_script(text: &str, cfg: &ValidationConfig) -> Result<Script, ScriptError> {
    let value: Value = serde_json::from_str(text).map_err(|e| ScriptError::Parse(e.to_string()))?;
    validate_script(&value, cfg)
}

/// Validate arbitrary key/value input into a [`Script`].
///
/// Pure function: structural errors are collected into one [`ValidationError`]; the duration
/// check only runs on structurally valid input and reports [`DurationMismatchError`].
#[tracing::instrument(skip_all)]
pub fn validate_script(value: &Value, cfg: &ValidationConfig) -> Result<Script, ScriptError> {
    let mut errors = Vec::new();

    let Some(root) = value.as_object() else {
        return Err(ValidationError {
            errors: vec![FieldError::at(&[], "script must be an object")],
        }
        .into());
    };

    let title = required_text(root, "title", &[], &mut errors);
    if let Some(t) = &title
        && t.chars().count() > MAX_TITLE_CHARS
    {
        errors.push(FieldError::at(
            &[PathElem::Field("title")],
            format!("must be at most {MAX_TITLE_CHARS} characters"),
        ));
    }
    let description = optional_text(root, "description", &[], &mut errors).unwrap_or_default();
    let call_to_action = optional_text(root, "call_to_action", &[], &mut errors);
    let target_audience = optional_text(root, "target_audience", &[], &mut errors);
    let hashtags = hashtags(root, &mut errors);
    let target_duration_secs = match root.get("duration") {
        None | Some(Value::Null) => None,
        Some(v) => positive_number(v, &[PathElem::Field("duration")], &mut errors),
    };

    let scenes = match (root.get("scenes"), root.get("sections")) {
        (Some(scenes), _) => scenes_from_value(scenes, &mut errors),
        (None, Some(sections)) => scenes_from_sections(sections, &mut errors),
        (None, None) => {
            errors.push(FieldError::at(&[PathElem::Field("scenes")], "is required"));
            Vec::new()
        }
    };

    if !errors.is_empty() {
        return Err(ValidationError { errors }.into());
    }

    let script = Script {
        title: title.unwrap_or_default(),
        description,
        scenes,
        hashtags,
        call_to_action,
        target_audience,
        target_duration_secs,
    };

    check_duration(script, cfg)
}

fn check_duration(script: Script, cfg: &ValidationConfig) -> Result<Script, ScriptError> {
    let target = script
        .target_duration_secs
        .unwrap_or(cfg.target_duration_secs);
    let declared = script.total_duration_secs();
    let allowed = target * cfg.tolerance;
    if (declared - target).abs() > allowed + BOUNDARY_EPS {
        return Err(DurationMismatchError {
            declared_secs: declared,
            target_secs: target,
            tolerance: cfg.tolerance,
            script: Box::new(script),
        }
        .into());
    }
    Ok(script)
}

fn required_text(
    obj: &Map<String, Value>,
    field: &'static str,
    base: &[PathElem],
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    let path = child(base, PathElem::Field(field));
    match obj.get(field) {
        None | Some(Value::Null) => {
            errors.push(FieldError::at(&path, "is required"));
            None
        }
        Some(Value::String(s)) => {
            let t = s.trim();
            if t.is_empty() {
                errors.push(FieldError::at(&path, "must be non-empty"));
                None
            } else {
                Some(t.to_string())
            }
        }
        Some(_) => {
            errors.push(FieldError::at(&path, "must be a string"));
            None
        }
    }
}

fn optional_text(
    obj: &Map<String, Value>,
    field: &'static str,
    base: &[PathElem],
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    match obj.get(field) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => {
            let t = s.trim();
            (!t.is_empty()).then(|| t.to_string())
        }
        Some(_) => {
            errors.push(FieldError::at(
                &child(base, PathElem::Field(field)),
                "must be a string",
            ));
            None
        }
    }
}

fn hashtags(root: &Map<String, Value>, errors: &mut Vec<FieldError>) -> Vec<String> {
    let path = [PathElem::Field("hashtags")];
    match root.get("hashtags") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                match item.as_str() {
                    Some(s) if !s.trim().is_empty() => out.push(s.trim().to_string()),
                    _ => errors.push(FieldError::at(
                        &child(&path, PathElem::Index(i)),
                        "must be a non-empty string",
                    )),
                }
            }
            out
        }
        Some(_) => {
            errors.push(FieldError::at(&path, "must be an array of strings"));
            Vec::new()
        }
    }
}

fn positive_number(v: &Value, path: &[PathElem], errors: &mut Vec<FieldError>) -> Option<f64> {
    let Some(n) = v.as_f64() else {
        errors.push(FieldError::at(path, "must be a number"));
        return None;
    };
    if !n.is_finite() || n <= 0.0 {
        errors.push(FieldError::at(path, "must be > 0"));
        return None;
    }
    Some(n)
}

fn first_present<'a>(
    obj: &'a Map<String, Value>,
    names: &[&'static str],
) -> Option<(&'static str, &'a Value)> {
    names
        .iter()
        .find_map(|&n| obj.get(n).filter(|v| !v.is_null()).map(|v| (n, v)))
}

struct ParsedScene {
    order: Option<u64>,
    scene: Scene,
}

fn scenes_from_value(value: &Value, errors: &mut Vec<FieldError>) -> Vec<Scene> {
    let base = [PathElem::Field("scenes")];
    let Some(items) = value.as_array() else {
        errors.push(FieldError::at(&base, "must be an array"));
        return Vec::new();
    };
    if items.is_empty() {
        errors.push(FieldError::at(&base, "must contain at least one scene"));
        return Vec::new();
    }

    let mut parsed = Vec::with_capacity(items.len());
    let mut seen_orders = HashMap::<u64, usize>::new();
    let mut with_order = 0usize;

    for (i, item) in items.iter().enumerate() {
        let path = child(&base, PathElem::Index(i));
        let Some(obj) = item.as_object() else {
            errors.push(FieldError::at(&path, "scene must be an object"));
            continue;
        };

        let description = match first_present(obj, &["description", "visual_prompt"]) {
            None => {
                errors.push(FieldError::at(
                    &child(&path, PathElem::Field("description")),
                    "is required",
                ));
                None
            }
            Some((name, _)) => required_text(obj, name, &path, errors),
        };

        let duration = match first_present(obj, &["duration", "duration_seconds"]) {
            None => {
                errors.push(FieldError::at(
                    &child(&path, PathElem::Field("duration")),
                    "is required",
                ));
                None
            }
            Some((name, v)) => positive_number(v, &child(&path, PathElem::Field(name)), errors),
        };

        let order = match first_present(obj, &["index", "order"]) {
            None => None,
            Some((name, v)) => {
                let order_path = child(&path, PathElem::Field(name));
                match v.as_u64() {
                    Some(o) => {
                        with_order += 1;
                        if let Some(prev) = seen_orders.insert(o, i) {
                            errors.push(FieldError::at(
                                &order_path,
                                format!("duplicate scene order {o} (also used by scenes[{prev}])"),
                            ));
                        }
                        Some(o)
                    }
                    None => {
                        errors.push(FieldError::at(
                            &order_path,
                            "must be a non-negative integer",
                        ));
                        None
                    }
                }
            }
        };

        let overlay_text = optional_text(obj, "overlay_text", &path, errors);
        let audio_cue = optional_text(obj, "audio_cue", &path, errors);

        if let (Some(description), Some(duration_seconds)) = (description, duration) {
            parsed.push(ParsedScene {
                order,
                scene: Scene {
                    index: i,
                    description,
                    duration_seconds,
                    overlay_text,
                    audio_cue,
                },
            });
        }
    }

    if with_order != 0 && with_order != items.len() {
        errors.push(FieldError::at(
            &base,
            "scene order must be given for every scene or for none",
        ));
    }

    if with_order == items.len() {
        parsed.sort_by_key(|p| p.order);
    }
    parsed
        .into_iter()
        .enumerate()
        .map(|(i, p)| Scene { index: i, ..p.scene })
        .collect()
}

fn scenes_from_sections(value: &Value, errors: &mut Vec<FieldError>) -> Vec<Scene> {
    let base = [PathElem::Field("sections")];
    let Some(items) = value.as_array() else {
        errors.push(FieldError::at(&base, "must be an array"));
        return Vec::new();
    };
    if items.is_empty() {
        errors.push(FieldError::at(&base, "must contain at least one section"));
        return Vec::new();
    }

    let mut timed = Vec::<(usize, f64, f64, Scene)>::new();
    for (i, item) in items.iter().enumerate() {
        let path = child(&base, PathElem::Index(i));
        let Some(obj) = item.as_object() else {
            errors.push(FieldError::at(&path, "section must be an object"));
            continue;
        };

        let start = section_time(obj, "start_time", &path, errors);
        let end = section_time(obj, "end_time", &path, errors);
        let prompt = required_text(obj, "visual_prompt", &path, errors);
        let content = optional_text(obj, "content", &path, errors);
        let audio_prompt = optional_text(obj, "audio_prompt", &path, errors);

        let (Some(start), Some(end), Some(prompt)) = (start, end, prompt) else {
            continue;
        };
        if end <= start {
            errors.push(FieldError::at(
                &child(&path, PathElem::Field("end_time")),
                "must be greater than start_time",
            ));
            continue;
        }
        timed.push((
            i,
            start,
            end,
            Scene {
                index: 0,
                description: prompt,
                duration_seconds: end - start,
                overlay_text: content,
                audio_cue: audio_prompt,
            },
        ));
    }

    timed.sort_by(|a, b| a.1.total_cmp(&b.1));
    let mut cursor = 0.0f64;
    for (src_idx, start, end, _) in &timed {
        let path = child(&base, PathElem::Index(*src_idx));
        if *start < cursor - BOUNDARY_EPS {
            errors.push(FieldError::at(
                &child(&path, PathElem::Field("start_time")),
                "overlaps the previous section",
            ));
        } else if *start > cursor + BOUNDARY_EPS {
            errors.push(FieldError::at(
                &child(&path, PathElem::Field("start_time")),
                format!("leaves a gap after {cursor:.3}s"),
            ));
        }
        cursor = cursor.max(*end);
    }

    timed
        .into_iter()
        .enumerate()
        .map(|(i, (_, _, _, scene))| Scene { index: i, ..scene })
        .collect()
}

fn section_time(
    obj: &Map<String, Value>,
    field: &'static str,
    base: &[PathElem],
    errors: &mut Vec<FieldError>,
) -> Option<f64> {
    let path = child(base, PathElem::Field(field));
    match obj.get(field) {
        None | Some(Value::Null) => {
            errors.push(FieldError::at(&path, "is required"));
            None
        }
        Some(v) => match v.as_f64() {
            Some(t) if t.is_finite() && t >= 0.0 => Some(t),
            Some(_) => {
                errors.push(FieldError::at(&path, "must be >= 0"));
                None
            }
            None => {
                errors.push(FieldError::at(&path, "must be a number"));
                None
            }
        },
    }
}

fn child(base: &[PathElem], elem: PathElem) -> Vec<PathElem> {
    let mut p = base.to_vec();
    p.push(elem);
    p
}

#[cfg(test)]
#[path = "../../tests/unit/script/validate.rs"]
mod tests;
