use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::assemble::SceneRange;
use crate::foundation::core::FrameRGBA;
use crate::post::error::PostProcessError;
use crate::post::processor::PostConfig;
use crate::script::Script;

/// Vertical position of a caption.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlayPlacement {
    /// Upper safe area.
    Top,
    /// Vertically centred.
    Center,
    /// Lower safe area.
    #[default]
    Bottom,
}

/// Caption appearance.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct OverlayStyle {
    /// CSS font-family list.
    pub font_family: String,
    /// Font weight (100..=900).
    pub font_weight: u16,
    /// Font size as a fraction of frame height.
    pub font_size_frac: f32,
    /// Text colour.
    pub text_colour: [u8; 3],
    /// Backing box colour.
    pub box_colour: [u8; 3],
    /// Backing box opacity; `0` hides the box.
    pub box_opacity: f32,
    /// Wrap width in characters.
    pub max_chars_per_line: usize,
    /// Distance from the top/bottom edge as a fraction of frame height.
    pub margin_frac: f32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            font_family: "DejaVu Sans, Arial, sans-serif".to_string(),
            font_weight: 700,
            font_size_frac: 0.035,
            text_colour: [255, 255, 255],
            box_colour: [0, 0, 0],
            box_opacity: 0.55,
            max_chars_per_line: 28,
            margin_frac: 0.08,
        }
    }
}

/// A text layer anchored to a range of scenes.
#[derive(Clone, Debug, PartialEq)]
pub struct OverlaySpec {
    /// Caption text; `\n` forces a line break.
    pub text: String,
    /// Scenes the caption is shown over.
    pub anchor: SceneRange,
    /// Vertical position.
    pub placement: OverlayPlacement,
    /// Appearance.
    pub style: OverlayStyle,
}

/// Draws a caption as a full-frame, premultiplied, mostly transparent layer.
pub trait OverlayRenderer: Send + Sync + std::fmt::Debug {
    /// Render `spec` for frames of `width x height`.
    fn render(
        &self,
        spec: &OverlaySpec,
        width: u32,
        height: u32,
    ) -> Result<FrameRGBA, PostProcessError>;
}

/// Caption renderer that lays text out as SVG and rasterizes it with `resvg`.
#[derive(Clone)]
pub struct SvgOverlayRenderer {
    fontdb: Arc<usvg::fontdb::Database>,
}

impl std::fmt::Debug for SvgOverlayRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SvgOverlayRenderer")
            .field("fonts", &self.fontdb.len())
            .finish()
    }
}

impl SvgOverlayRenderer {
    /// System fonts plus any `.ttf`/`.otf`/`.ttc` files in `font_dirs`.
    pub fn new(font_dirs: &[PathBuf]) -> Self {
        let mut db = usvg::fontdb::Database::new();
        db.load_system_fonts();
        for dir in font_dirs {
            load_fonts_from_dir(&mut db, dir);
            load_fonts_from_dir(&mut db, &dir.join("fonts"));
        }
        Self::with_fontdb(Arc::new(db))
    }

    /// Use a prepared font database.
    pub fn with_fontdb(fontdb: Arc<usvg::fontdb::Database>) -> Self {
        Self { fontdb }
    }

    /// Number of font faces available.
    pub fn font_count(&self) -> usize {
        self.fontdb.len()
    }
}

impl OverlayRenderer for SvgOverlayRenderer {
    fn render(
        &self,
        spec: &OverlaySpec,
        width: u32,
        height: u32,
    ) -> Result<FrameRGBA, PostProcessError> {
        check_text(&spec.text)?;
        if self.fontdb.is_empty() {
            return Err(PostProcessError::FontUnavailable);
        }

        let svg = caption_svg(spec, width, height);
        let opts = usvg::Options {
            fontdb: self.fontdb.clone(),
            font_resolver: make_svg_font_resolver(),
            ..Default::default()
        };
        let tree = usvg::Tree::from_str(&svg, &opts)
            .map_err(|e| PostProcessError::Render(format!("parse caption svg: {e}")))?;

        let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
            .ok_or_else(|| PostProcessError::Render("failed to allocate caption pixmap".into()))?;
        resvg::render(
            &tree,
            resvg::tiny_skia::Transform::identity(),
            &mut pixmap.as_mut(),
        );
        FrameRGBA::from_raw(width, height, pixmap.take())
            .map_err(|e| PostProcessError::Render(e.to_string()))
    }
}

/// Reject control characters (other than `\n`), private-use code points and U+FFFD.
pub(crate) fn check_text(text: &str) -> Result<(), PostProcessError> {
    let mut bad = String::new();
    for c in text.chars() {
        let cp = c as u32;
        let refused = (c.is_control() && c != '\n')
            || (0xE000..=0xF8FF).contains(&cp)
            || (0xF0000..=0xFFFFD).contains(&cp)
            || (0x100000..=0x10FFFD).contains(&cp)
            || c == '\u{FFFD}';
        if refused && !bad.contains(c) {
            bad.push(c);
        }
    }
    if bad.is_empty() {
        Ok(())
    } else {
        Err(PostProcessError::UnsupportedCharacters { chars: bad })
    }
}

/// Greedy word wrap; words longer than `max_chars` get a line of their own.
pub(crate) fn wrap_words(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            let needed = if line.is_empty() {
                word.chars().count()
            } else {
                line.chars().count() + 1 + word.chars().count()
            };
            if needed > max_chars && !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(word);
        }
        if !line.is_empty() {
            lines.push(line);
        }
    }
    lines
}

fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

fn hex(rgb: [u8; 3]) -> String {
    format!("#{:02x}{:02x}{:02x}", rgb[0], rgb[1], rgb[2])
}

/// Caption laid out as an SVG document the size of the frame.
pub(crate) fn caption_svg(spec: &OverlaySpec, width: u32, height: u32) -> String {
    let style = &spec.style;
    let lines = wrap_words(&spec.text, style.max_chars_per_line);
    let (w, h) = (width as f32, height as f32);

    let font_px = (h * style.font_size_frac).max(8.0);
    let line_h = font_px * 1.3;
    let pad = font_px * 0.5;
    let longest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0) as f32;
    let box_w = (longest * font_px * 0.6 + 2.0 * pad).min(w * 0.94);
    let box_h = lines.len() as f32 * line_h + 2.0 * pad;
    let margin = h * style.margin_frac;
    let box_x = (w - box_w) / 2.0;
    let box_y = match spec.placement {
        OverlayPlacement::Top => margin,
        OverlayPlacement::Center => (h - box_h) / 2.0,
        OverlayPlacement::Bottom => h - margin - box_h,
    }
    .max(0.0);

    let mut svg = String::new();
    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"#
    );
    if style.box_opacity > 0.0 && !lines.is_empty() {
        let _ = write!(
            svg,
            r#"<rect x="{box_x:.1}" y="{box_y:.1}" width="{box_w:.1}" height="{box_h:.1}" rx="{r:.1}" fill="{fill}" fill-opacity="{op:.3}"/>"#,
            r = pad * 0.6,
            fill = hex(style.box_colour),
            op = style.box_opacity.clamp(0.0, 1.0),
        );
    }
    let _ = write!(
        svg,
        r#"<g font-family="{family}" font-size="{font_px:.1}" font-weight="{weight}" fill="{fill}" text-anchor="middle">"#,
        family = xml_escape(&style.font_family),
        weight = style.font_weight.clamp(100, 900),
        fill = hex(style.text_colour),
    );
    for (i, line) in lines.iter().enumerate() {
        let baseline = box_y + pad + i as f32 * line_h + font_px;
        let _ = write!(
            svg,
            r#"<text x="{x:.1}" y="{baseline:.1}">{text}</text>"#,
            x = w / 2.0,
            text = xml_escape(line),
        );
    }
    svg.push_str("</g></svg>");
    svg
}

/// Overlay layers implied by a script: per-scene captions, title card and call to action.
pub fn plan_overlays(script: &Script, cfg: &PostConfig) -> Vec<OverlaySpec> {
    let mut out = Vec::new();
    let style = &cfg.overlay_style;

    if cfg.title_card && !script.title().is_empty() {
        out.push(OverlaySpec {
            text: script.title().to_string(),
            anchor: SceneRange::single(0),
            placement: OverlayPlacement::Top,
            style: style.clone(),
        });
    }

    for scene in script.scenes() {
        if let Some(text) = scene.overlay_text.as_deref().map(str::trim)
            && !text.is_empty()
        {
            out.push(OverlaySpec {
                text: text.to_string(),
                anchor: SceneRange::single(scene.index),
                placement: OverlayPlacement::Bottom,
                style: style.clone(),
            });
        }
    }

    if cfg.call_to_action
        && let Some(cta) = script.call_to_action().map(str::trim)
        && !cta.is_empty()
    {
        let last = script.len().saturating_sub(1);
        out.push(OverlaySpec {
            text: cta.to_string(),
            anchor: SceneRange::single(last),
            placement: OverlayPlacement::Top,
            style: style.clone(),
        });
    }

    out
}

fn load_fonts_from_dir(db: &mut usvg::fontdb::Database, dir: &Path) {
    let Ok(rd) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in rd.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(ext) = path.extension().and_then(|s| s.to_str()) else {
            continue;
        };
        let ext = ext.to_ascii_lowercase();
        if ext != "ttf" && ext != "otf" && ext != "ttc" {
            continue;
        }
        let _ = db.load_font_file(&path);
    }
}

fn make_svg_font_resolver() -> usvg::FontResolver<'static> {
    use usvg::FontResolver;

    FontResolver {
        select_font: Box::new(|font, fontdb| {
            let mut families = Vec::<usvg::fontdb::Family<'_>>::new();
            for family in font.families() {
                families.push(match family {
                    usvg::FontFamily::Serif => usvg::fontdb::Family::Serif,
                    usvg::FontFamily::SansSerif => usvg::fontdb::Family::SansSerif,
                    usvg::FontFamily::Cursive => usvg::fontdb::Family::Cursive,
                    usvg::FontFamily::Fantasy => usvg::fontdb::Family::Fantasy,
                    usvg::FontFamily::Monospace => usvg::fontdb::Family::Monospace,
                    usvg::FontFamily::Named(s) => usvg::fontdb::Family::Name(s),
                });
            }
            families.push(usvg::fontdb::Family::SansSerif);

            let style = match font.style() {
                usvg::FontStyle::Normal => usvg::fontdb::Style::Normal,
                usvg::FontStyle::Italic => usvg::fontdb::Style::Italic,
                usvg::FontStyle::Oblique => usvg::fontdb::Style::Oblique,
            };

            let query = usvg::fontdb::Query {
                families: &families,
                weight: usvg::fontdb::Weight(font.weight()),
                stretch: usvg::fontdb::Stretch::Normal,
                style,
            };

            // Any face beats dropping the caption.
            if let Some(id) = fontdb.query(&query) {
                return Some(id);
            }
            fontdb.faces().next().map(|f| f.id)
        }),
        select_fallback: FontResolver::default_fallback_selector(),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/post/overlay.rs"]
mod tests;
