use crate::error::ReportError;
use anyhow::Context;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use ttf_parser::{name_id, Face, GlyphId};

/// Search-path style list of TrueType files to embed, tried in order.
pub const FONTS_ENV: &str = "REPORTD_FONTS";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glyph {
    pub id: u16,
    /// Horizontal advance in font units.
    pub advance: u16,
}

/// A parsed TrueType face kept as raw bytes for embedding.
pub struct FontSource {
    name: String,
    data: Vec<u8>,
    units_per_em: u16,
    ascender: i16,
    descender: i16,
    cap_height: i16,
    bbox: [i16; 4],
    notdef: Glyph,
}

impl fmt::Debug for FontSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontSource")
            .field("name", &self.name)
            .field("bytes", &self.data.len())
            .finish()
    }
}

impl FontSource {
    pub fn from_bytes(data: Vec<u8>, fallback_name: &str) -> Result<Self, ReportError> {
        let face = Face::parse(&data, 0)
            .map_err(|e| ReportError::Font(format!("{fallback_name}: {e}")))?;
        let postscript = face
            .names()
            .into_iter()
            .filter(|n| n.name_id == name_id::POST_SCRIPT_NAME)
            .find_map(|n| n.to_string())
            .unwrap_or_else(|| fallback_name.to_string());
        let units_per_em = face.units_per_em();
        let ascender = face.ascender();
        let descender = face.descender();
        let cap_height = face.capital_height().unwrap_or(ascender);
        let bb = face.global_bounding_box();
        let notdef = Glyph {
            id: 0,
            advance: face
                .glyph_hor_advance(GlyphId(0))
                .unwrap_or(units_per_em / 2),
        };
        drop(face);

        Ok(Self {
            name: pdf_font_name(&postscript),
            data,
            units_per_em,
            ascender,
            descender,
            cap_height,
            bbox: [bb.x_min, bb.y_min, bb.x_max, bb.y_max],
            notdef,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ReportError> {
        let data = std::fs::read(path)
            .with_context(|| format!("failed to read font {}", path.to_string_lossy()))
            .map_err(|e| ReportError::Font(format!("{e:#}")))?;
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "Embedded".to_string());
        Self::from_bytes(data, &stem)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[cfg(test)]
    pub fn units_per_em(&self) -> u16 {
        self.units_per_em
    }

    pub fn notdef(&self) -> Glyph {
        self.notdef
    }

    /// Scales a font-unit value to the 1/1000 em grid PDF font metrics use.
    pub fn to_pdf_units(&self, v: i32) -> f32 {
        v as f32 * 1000.0 / self.units_per_em as f32
    }

    pub fn ascender(&self) -> i16 {
        self.ascender
    }

    pub fn descender(&self) -> i16 {
        self.descender
    }

    pub fn cap_height(&self) -> i16 {
        self.cap_height
    }

    pub fn bbox(&self) -> [i16; 4] {
        self.bbox
    }

    /// Cmap lookup for every character of `text`, in order.
    pub fn lookup(&self, text: &str) -> Vec<Option<Glyph>> {
        let Ok(face) = Face::parse(&self.data, 0) else {
            return text.chars().map(|_| None).collect();
        };
        text.chars()
            .map(|c| {
                face.glyph_index(c).filter(|g| g.0 != 0).map(|g| Glyph {
                    id: g.0,
                    advance: face.glyph_hor_advance(g).unwrap_or(self.notdef.advance),
                })
            })
            .collect()
    }
}

/// PDF base-font names are plain ASCII without spaces.
fn pdf_font_name(raw: &str) -> String {
    let name: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if name.is_empty() {
        "Embedded".to_string()
    } else {
        name
    }
}

/// Ordered fallback chain of embeddable fonts. Empty means the document
/// uses the standard Helvetica faces only.
#[derive(Debug, Clone, Default)]
pub struct FontSet(Vec<Arc<FontSource>>);

impl FontSet {
    pub fn load_paths<I>(paths: I) -> Result<Self, ReportError>
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let mut out = Vec::new();
        for path in paths {
            out.push(Arc::new(FontSource::load(&path)?));
        }
        Ok(Self(out))
    }

    /// Reads `REPORTD_FONTS`. Unreadable entries are logged and skipped.
    pub fn from_env() -> Self {
        let Some(raw) = std::env::var_os(FONTS_ENV) else {
            return Self::default();
        };
        let mut out = Vec::new();
        for path in std::env::split_paths(&raw) {
            if path.as_os_str().is_empty() {
                continue;
            }
            match FontSource::load(&path) {
                Ok(font) => {
                    tracing::info!(font = font.name(), path = %path.to_string_lossy(), "font loaded");
                    out.push(Arc::new(font));
                }
                Err(e) => tracing::warn!(error = %e, "font skipped"),
            }
        }
        Self(out)
    }

    /// `self` first, then the entries of `fallback`.
    pub fn then(&self, fallback: &FontSet) -> FontSet {
        let mut out = self.0.clone();
        out.extend(fallback.0.iter().cloned());
        FontSet(out)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<FontSource>> {
        self.0.iter()
    }

    #[cfg(test)]
    pub fn single(font: FontSource) -> Self {
        Self(vec![Arc::new(font)])
    }
}

/// Hand-assembled TrueType files for tests: `head`, `hhea`, `hmtx`, `maxp`
/// and a format 12 `cmap`, one outline-free glyph per character.
#[cfg(test)]
pub(crate) mod testing {
    fn be16(out: &mut Vec<u8>, v: u16) {
        out.extend_from_slice(&v.to_be_bytes());
    }

    fn be32(out: &mut Vec<u8>, v: u32) {
        out.extend_from_slice(&v.to_be_bytes());
    }

    pub fn tiny_font(chars: &[char], advance: u16) -> Vec<u8> {
        let mut chars = chars.to_vec();
        chars.sort_unstable();
        chars.dedup();
        let num_glyphs = chars.len() as u16 + 1;

        let mut cmap = Vec::new();
        be16(&mut cmap, 0);
        be16(&mut cmap, 1);
        be16(&mut cmap, 3);
        be16(&mut cmap, 10);
        be32(&mut cmap, 12);
        be16(&mut cmap, 12);
        be16(&mut cmap, 0);
        be32(&mut cmap, 16 + 12 * chars.len() as u32);
        be32(&mut cmap, 0);
        be32(&mut cmap, chars.len() as u32);
        for (i, c) in chars.iter().enumerate() {
            be32(&mut cmap, *c as u32);
            be32(&mut cmap, *c as u32);
            be32(&mut cmap, i as u32 + 1);
        }

        let mut head = Vec::new();
        be16(&mut head, 1);
        be16(&mut head, 0);
        be32(&mut head, 0x0001_0000);
        be32(&mut head, 0);
        be32(&mut head, 0x5F0F_3CF5);
        be16(&mut head, 0);
        be16(&mut head, 1000);
        head.extend_from_slice(&[0; 16]);
        for v in [0u16, (-200i16) as u16, advance, 800] {
            be16(&mut head, v);
        }
        be16(&mut head, 0);
        be16(&mut head, 8);
        be16(&mut head, 2);
        be16(&mut head, 0);
        be16(&mut head, 0);

        let mut hhea = Vec::new();
        be16(&mut hhea, 1);
        be16(&mut hhea, 0);
        be16(&mut hhea, 800);
        be16(&mut hhea, (-200i16) as u16);
        be16(&mut hhea, 0);
        be16(&mut hhea, advance);
        hhea.extend_from_slice(&[0; 6]);
        be16(&mut hhea, 1);
        hhea.extend_from_slice(&[0; 12]);
        be16(&mut hhea, 0);
        be16(&mut hhea, num_glyphs);

        let mut hmtx = Vec::new();
        for _ in 0..num_glyphs {
            be16(&mut hmtx, advance);
            be16(&mut hmtx, 0);
        }

        let mut maxp = Vec::new();
        be32(&mut maxp, 0x0000_5000);
        be16(&mut maxp, num_glyphs);

        // Table records must be sorted by tag.
        let tables: [(&[u8; 4], Vec<u8>); 5] = [
            (b"cmap", cmap),
            (b"head", head),
            (b"hhea", hhea),
            (b"hmtx", hmtx),
            (b"maxp", maxp),
        ];
        let mut out = Vec::new();
        be32(&mut out, 0x0001_0000);
        be16(&mut out, tables.len() as u16);
        be16(&mut out, 64);
        be16(&mut out, 2);
        be16(&mut out, 16);
        let mut offset = 12 + 16 * tables.len() as u32;
        for (tag, data) in &tables {
            out.extend_from_slice(*tag);
            be32(&mut out, 0);
            be32(&mut out, offset);
            be32(&mut out, data.len() as u32);
            offset += (data.len() as u32 + 3) & !3;
        }
        for (_, data) in &tables {
            out.extend_from_slice(data);
            while out.len() % 4 != 0 {
                out.push(0);
            }
        }
        out
    }
}
