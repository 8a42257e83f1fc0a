use crate::charts::Snapshot;
use crate::error::ReportError;
use crate::fonts::{FontSet, FontSource, Glyph};
use crate::layout::geometry::{pt_to_mm, PageGeometry, Rgb, MM_PER_PT};
use crate::layout::text::helvetica_units;
use crate::layout::{Canvas, Rect, TextStyle};
use indexmap::IndexMap;
use pdf_writer::types::{CidFontType, FontFlags, SystemInfo, TextRenderingMode, UnicodeCmap};
use pdf_writer::{Content, Name, Pdf, Ref, Str, TextStr};
use std::collections::BTreeSet;
use std::sync::Arc;

const FONT_REGULAR: Name<'static> = Name(b"F1");
const FONT_BOLD: Name<'static> = Name(b"F2");
// Quarter-circle approximation factor for cubic Béziers.
const KAPPA: f64 = 0.552_284_75;
const BOLD_WIDEN: f64 = 1.08;
// Stroke width for synthetic bold, as a fraction of the font size.
const FAKE_BOLD_STROKE: f32 = 0.03;

struct PageBuf {
    content: Content,
    images: Vec<Snapshot>,
}

#[derive(Debug, Clone, Copy)]
struct UsedGlyph {
    cid: u16,
    gid: u16,
    advance: u16,
}

/// A TrueType face written as a Type0 font with `Identity-H` encoding.
/// CIDs are handed out in first-use order; `CIDToGIDMap` translates them
/// back to glyph ids.
struct EmbeddedFont {
    source: Arc<FontSource>,
    resource: String,
    used: IndexMap<char, UsedGlyph>,
    missing: BTreeSet<char>,
}

impl EmbeddedFont {
    fn cid_for(&mut self, ch: char, glyph: Option<Glyph>) -> u16 {
        if let Some(g) = self.used.get(&ch) {
            return g.cid;
        }
        let glyph = glyph.unwrap_or_else(|| {
            self.missing.insert(ch);
            self.source.notdef()
        });
        let cid = self.used.len() as u16 + 1;
        self.used.insert(
            ch,
            UsedGlyph {
                cid,
                gid: glyph.id,
                advance: glyph.advance,
            },
        );
        cid
    }
}

struct FontRefs {
    type0: Ref,
    cid: Ref,
    descriptor: Ref,
    file: Ref,
    gid_map: Ref,
    to_unicode: Ref,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Face {
    Standard,
    Embedded(usize),
}

#[derive(Debug, Clone, Copy)]
struct Resolved {
    ch: char,
    face: Face,
    glyph: Option<Glyph>,
}

/// Canvas backed by a PDF document. Text is set in the embedded fonts when
/// any are configured, falling back to the base-14 Helvetica faces.
pub struct PdfCanvas {
    width_pt: f32,
    height_pt: f32,
    pages: Vec<PageBuf>,
    fonts: Vec<EmbeddedFont>,
}

fn pt(mm: f64) -> f32 {
    (mm / MM_PER_PT) as f32
}

impl PdfCanvas {
    pub fn new(geometry: &PageGeometry, fonts: &FontSet) -> Self {
        Self {
            width_pt: pt(geometry.page_width),
            height_pt: pt(geometry.page_height),
            pages: Vec::new(),
            fonts: fonts
                .iter()
                .enumerate()
                .map(|(i, source)| EmbeddedFont {
                    source: source.clone(),
                    resource: format!("U{i}"),
                    used: IndexMap::new(),
                    missing: BTreeSet::new(),
                })
                .collect(),
        }
    }

    #[cfg(test)]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Flips a top-down millimetre y into PDF user space.
    fn y(&self, mm: f64) -> f32 {
        self.height_pt - pt(mm)
    }

    fn current(&mut self) -> Result<&mut PageBuf, ReportError> {
        self.pages
            .last_mut()
            .ok_or_else(|| ReportError::Serialize("drawing before the first page".to_string()))
    }

    fn with_page(&mut self, f: impl FnOnce(&mut PageBuf)) {
        match self.current() {
            Ok(page) => f(page),
            Err(e) => tracing::error!(error = %e, "draw call ignored"),
        }
    }

    /// Picks a face per character: the first embedded font that maps it,
    /// then Helvetica when WinAnsi can encode it. Anything else goes to the
    /// primary embedded font as notdef so its text survives extraction.
    fn resolve(&self, text: &str) -> Vec<Resolved> {
        if self.fonts.is_empty() {
            return text
                .chars()
                .map(|ch| Resolved {
                    ch,
                    face: Face::Standard,
                    glyph: None,
                })
                .collect();
        }
        let lookups: Vec<Vec<Option<Glyph>>> =
            self.fonts.iter().map(|f| f.source.lookup(text)).collect();
        text.chars()
            .enumerate()
            .map(|(pos, ch)| {
                let hit = lookups
                    .iter()
                    .enumerate()
                    .find_map(|(i, glyphs)| glyphs.get(pos).copied().flatten().map(|g| (i, g)));
                match hit {
                    Some((i, g)) => Resolved {
                        ch,
                        face: Face::Embedded(i),
                        glyph: Some(g),
                    },
                    None if win_ansi_byte(ch).is_some() => Resolved {
                        ch,
                        face: Face::Standard,
                        glyph: None,
                    },
                    None => Resolved {
                        ch,
                        face: Face::Embedded(0),
                        glyph: None,
                    },
                }
            })
            .collect()
    }

    /// Encodes `text` as runs of one face each, registering embedded glyphs.
    fn encode_runs(&mut self, text: &str) -> Vec<(Face, Vec<u8>)> {
        let mut runs: Vec<(Face, Vec<u8>)> = Vec::new();
        for r in self.resolve(text) {
            if runs.last().map(|(f, _)| *f) != Some(r.face) {
                runs.push((r.face, Vec::new()));
            }
            let Some((_, bytes)) = runs.last_mut() else {
                continue;
            };
            match r.face {
                Face::Standard => bytes.push(win_ansi_byte(r.ch).unwrap_or(b'?')),
                Face::Embedded(i) => {
                    let cid = self.fonts[i].cid_for(r.ch, r.glyph);
                    bytes.extend_from_slice(&cid.to_be_bytes());
                }
            }
        }
        runs
    }

    fn run_width_units(&self, r: &Resolved, bold: bool) -> f64 {
        match r.face {
            Face::Standard => {
                let scale = if bold { BOLD_WIDEN } else { 1.0 };
                helvetica_units(r.ch) as f64 * scale
            }
            Face::Embedded(i) => {
                let source = &self.fonts[i].source;
                let advance = r.glyph.unwrap_or(source.notdef()).advance;
                source.to_pdf_units(advance as i32) as f64
            }
        }
    }

    pub fn finish(self, title: &str) -> Result<Vec<u8>, ReportError> {
        if self.pages.is_empty() {
            return Err(ReportError::Serialize("document has no pages".to_string()));
        }

        let catalog_id = Ref::new(1);
        let tree_id = Ref::new(2);
        let regular_id = Ref::new(3);
        let bold_id = Ref::new(4);
        let info_id = Ref::new(5);
        let mut next_id = 6;

        let font_refs: Vec<FontRefs> = self
            .fonts
            .iter()
            .map(|_| {
                let base = next_id;
                next_id += 6;
                FontRefs {
                    type0: Ref::new(base),
                    cid: Ref::new(base + 1),
                    descriptor: Ref::new(base + 2),
                    file: Ref::new(base + 3),
                    gid_map: Ref::new(base + 4),
                    to_unicode: Ref::new(base + 5),
                }
            })
            .collect();

        struct PageRefs {
            page: Ref,
            content: Ref,
            images: Vec<Ref>,
        }
        let mut refs: Vec<PageRefs> = Vec::with_capacity(self.pages.len());
        for p in &self.pages {
            let page = Ref::new(next_id);
            let content = Ref::new(next_id + 1);
            next_id += 2;
            let images = (0..p.images.len() as i32)
                .map(|i| Ref::new(next_id + i))
                .collect();
            next_id += p.images.len() as i32;
            refs.push(PageRefs {
                page,
                content,
                images,
            });
        }

        let mut pdf = Pdf::new();
        pdf.catalog(catalog_id).pages(tree_id);
        pdf.pages(tree_id)
            .kids(refs.iter().map(|r| r.page))
            .count(refs.len() as i32);
        pdf.type1_font(regular_id)
            .base_font(Name(b"Helvetica"))
            .encoding_predefined(Name(b"WinAnsiEncoding"));
        pdf.type1_font(bold_id)
            .base_font(Name(b"Helvetica-Bold"))
            .encoding_predefined(Name(b"WinAnsiEncoding"));
        for (font, r) in self.fonts.iter().zip(&font_refs) {
            write_embedded_font(&mut pdf, font, r);
        }
        pdf.document_info(info_id)
            .title(TextStr(title))
            .producer(TextStr(concat!("reportd ", env!("CARGO_PKG_VERSION"))));

        for (page, r) in self.pages.into_iter().zip(&refs) {
            let names: Vec<String> = (0..page.images.len()).map(|i| format!("Im{i}")).collect();
            {
                let mut page_writer = pdf.page(r.page);
                page_writer
                    .media_box(pdf_writer::Rect::new(0.0, 0.0, self.width_pt, self.height_pt))
                    .parent(tree_id)
                    .contents(r.content);
                let mut resources = page_writer.resources();
                {
                    let mut fonts = resources.fonts();
                    fonts.pair(FONT_REGULAR, regular_id).pair(FONT_BOLD, bold_id);
                    for (font, fr) in self.fonts.iter().zip(&font_refs) {
                        fonts.pair(Name(font.resource.as_bytes()), fr.type0);
                    }
                }
                if !names.is_empty() {
                    let mut xobjects = resources.x_objects();
                    for (name, id) in names.iter().zip(&r.images) {
                        xobjects.pair(Name(name.as_bytes()), *id);
                    }
                }
            }
            pdf.stream(r.content, &page.content.finish());

            for (snapshot, id) in page.images.iter().zip(&r.images) {
                let mut image = pdf.image_xobject(*id, &snapshot.rgb);
                image.width(snapshot.width as i32);
                image.height(snapshot.height as i32);
                image.color_space().device_rgb();
                image.bits_per_component(8);
            }
        }

        for font in &self.fonts {
            if !font.missing.is_empty() {
                let missing: String = font.missing.iter().collect();
                tracing::warn!(font = font.source.name(), %missing, "characters without glyphs");
            }
        }

        Ok(pdf.finish())
    }
}

fn write_embedded_font(pdf: &mut Pdf, font: &EmbeddedFont, refs: &FontRefs) {
    let source = &font.source;
    let base_font = Name(source.name().as_bytes());
    let info = SystemInfo {
        registry: Str(b"Adobe"),
        ordering: Str(b"Identity"),
        supplement: 0,
    };

    pdf.type0_font(refs.type0)
        .base_font(base_font)
        .encoding_predefined(Name(b"Identity-H"))
        .descendant_font(refs.cid)
        .to_unicode(refs.to_unicode);

    {
        let notdef = source.to_pdf_units(source.notdef().advance as i32);
        let mut cid = pdf.cid_font(refs.cid);
        cid.subtype(CidFontType::Type2)
            .base_font(base_font)
            .system_info(info)
            .font_descriptor(refs.descriptor)
            .default_width(notdef)
            .cid_to_gid_map_stream(refs.gid_map);
        if !font.used.is_empty() {
            cid.widths().consecutive(
                1,
                font.used
                    .values()
                    .map(|g| source.to_pdf_units(g.advance as i32)),
            );
        }
    }

    let [x_min, y_min, x_max, y_max] = source.bbox();
    pdf.font_descriptor(refs.descriptor)
        .name(base_font)
        .flags(FontFlags::SYMBOLIC)
        .bbox(pdf_writer::Rect::new(
            source.to_pdf_units(x_min as i32),
            source.to_pdf_units(y_min as i32),
            source.to_pdf_units(x_max as i32),
            source.to_pdf_units(y_max as i32),
        ))
        .italic_angle(0.0)
        .ascent(source.to_pdf_units(source.ascender() as i32))
        .descent(source.to_pdf_units(source.descender() as i32))
        .cap_height(source.to_pdf_units(source.cap_height() as i32))
        .stem_v(80.0)
        .font_file2(refs.file);

    pdf.stream(refs.file, source.data())
        .pair(Name(b"Length1"), source.data().len() as i32);

    // Two bytes per CID, CID 0 included.
    let mut gid_map = vec![0u8; 2 * (font.used.len() + 1)];
    for g in font.used.values() {
        let at = 2 * g.cid as usize;
        gid_map[at..at + 2].copy_from_slice(&g.gid.to_be_bytes());
    }
    pdf.stream(refs.gid_map, &gid_map);

    let mut cmap = UnicodeCmap::new(Name(b"Custom"), info);
    for (ch, g) in &font.used {
        cmap.pair(g.cid, *ch);
    }
    pdf.cmap(refs.to_unicode, &cmap.finish());
}

/// WinAnsi code for `c`, if the code page has one.
fn win_ansi_byte(c: char) -> Option<u8> {
    match c {
        '\u{20}'..='\u{7e}' | '\u{a0}'..='\u{ff}' => Some(c as u8),
        '\u{2022}' => Some(0x95),
        '\u{2013}' => Some(0x96),
        '\u{2014}' => Some(0x97),
        '\u{2018}' => Some(0x91),
        '\u{2019}' => Some(0x92),
        '\u{201c}' => Some(0x93),
        '\u{201d}' => Some(0x94),
        '\u{20ac}' => Some(0x80),
        _ => None,
    }
}

/// WinAnsi encoding for the standard Type 1 fonts. Characters outside the
/// code page become '?'.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars().map(|c| win_ansi_byte(c).unwrap_or(b'?')).collect()
}

fn set_fill(content: &mut Content, c: Rgb) {
    content.set_fill_rgb(c[0] as f32, c[1] as f32, c[2] as f32);
}

fn set_stroke(content: &mut Content, c: Rgb) {
    content.set_stroke_rgb(c[0] as f32, c[1] as f32, c[2] as f32);
}

impl Canvas for PdfCanvas {
    fn begin_page(&mut self) {
        self.pages.push(PageBuf {
            content: Content::new(),
            images: Vec::new(),
        });
    }

    fn text(&mut self, x: f64, baseline: f64, text: &str, style: TextStyle) {
        let (x, y) = (pt(x), self.y(baseline));
        let size = style.size as f32;
        let runs = self.encode_runs(text);
        let resources: Vec<String> = self.fonts.iter().map(|f| f.resource.clone()).collect();
        self.with_page(|page| {
            let content = &mut page.content;
            content.save_state();
            set_fill(content, style.color);
            content.begin_text();
            content.next_line(x, y);
            let mut stroked = false;
            for (face, bytes) in &runs {
                // Embedded faces have no bold cut; bold is a filled outline.
                let want_stroke = style.bold && *face != Face::Standard;
                if want_stroke != stroked {
                    if want_stroke {
                        set_stroke(content, style.color);
                        content.set_line_width(size * FAKE_BOLD_STROKE);
                        content.set_text_rendering_mode(TextRenderingMode::FillStroke);
                    } else {
                        content.set_text_rendering_mode(TextRenderingMode::Fill);
                    }
                    stroked = want_stroke;
                }
                match face {
                    Face::Standard => {
                        content.set_font(if style.bold { FONT_BOLD } else { FONT_REGULAR }, size)
                    }
                    Face::Embedded(i) => content.set_font(Name(resources[*i].as_bytes()), size),
                };
                content.show(Str(bytes));
            }
            content.end_text();
            content.restore_state();
        });
    }

    fn text_width(&self, text: &str, size: f64, bold: bool) -> f64 {
        let units: f64 = self
            .resolve(text)
            .iter()
            .map(|r| self.run_width_units(r, bold))
            .sum();
        pt_to_mm(units / 1000.0 * size)
    }

    fn rect(&mut self, rect: Rect, radius: f64, fill: Rgb, stroke: Option<Rgb>) {
        let x0 = pt(rect.x);
        let x1 = pt(rect.x + rect.w);
        let y0 = self.y(rect.bottom());
        let y1 = self.y(rect.y);
        let r = pt(radius.min(rect.w / 2.0).min(rect.h / 2.0).max(0.0));
        let k = (KAPPA as f32) * r;
        self.with_page(|page| {
            let c = &mut page.content;
            c.save_state();
            set_fill(c, fill);
            if r > 0.0 {
                c.move_to(x0 + r, y0);
                c.line_to(x1 - r, y0);
                c.cubic_to(x1 - r + k, y0, x1, y0 + r - k, x1, y0 + r);
                c.line_to(x1, y1 - r);
                c.cubic_to(x1, y1 - r + k, x1 - r + k, y1, x1 - r, y1);
                c.line_to(x0 + r, y1);
                c.cubic_to(x0 + r - k, y1, x0, y1 - r + k, x0, y1 - r);
                c.line_to(x0, y0 + r);
                c.cubic_to(x0, y0 + r - k, x0 + r - k, y0, x0 + r, y0);
                c.close_path();
            } else {
                c.rect(x0, y0, x1 - x0, y1 - y0);
            }
            match stroke {
                Some(s) => {
                    set_stroke(c, s);
                    c.set_line_width(0.6);
                    c.fill_nonzero_and_stroke();
                }
                None => {
                    c.fill_nonzero();
                }
            }
            c.restore_state();
        });
    }

    fn hline(&mut self, x1: f64, x2: f64, y: f64, color: Rgb) {
        let (x1, x2, y) = (pt(x1), pt(x2), self.y(y));
        self.with_page(|page| {
            let c = &mut page.content;
            c.save_state();
            set_stroke(c, color);
            c.set_line_width(0.5);
            c.move_to(x1, y);
            c.line_to(x2, y);
            c.stroke();
            c.restore_state();
        });
    }

    fn image(&mut self, rect: Rect, snapshot: &Snapshot) {
        let (x, y, w, h) = (pt(rect.x), self.y(rect.bottom()), pt(rect.w), pt(rect.h));
        self.with_page(|page| {
            let name = format!("Im{}", page.images.len());
            page.images.push(snapshot.clone());
            let c = &mut page.content;
            c.save_state();
            c.transform([w, 0.0, 0.0, h, x, y]);
            c.x_object(Name(name.as_bytes()));
            c.restore_state();
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::testing::tiny_font;
    use crate::layout::recording::fake_snapshot;
    use crate::layout::text::helvetica_width;
    use crate::layout::LayoutEngine;

    fn tamil_fonts() -> FontSet {
        FontSet::single(
            FontSource::from_bytes(tiny_font(&['ப', 'ா', 'A'], 600), "TinyTamil").expect("font"),
        )
    }

    fn black(size: f64) -> TextStyle {
        TextStyle {
            size,
            bold: false,
            color: [0.0, 0.0, 0.0],
        }
    }

    #[test]
    fn encodes_bullets_and_replaces_unmapped_text() {
        assert_eq!(encode_win_ansi("\u{2022} Sound"), b"\x95 Sound".to_vec());
        assert_eq!(encode_win_ansi("கவி"), b"???".to_vec());
        assert_eq!(encode_win_ansi("Café"), b"Caf\xe9".to_vec());
    }

    #[test]
    fn writes_a_pdf_with_one_page_per_layout_page() {
        let g = PageGeometry::default();
        let mut canvas = PdfCanvas::new(&g, &FontSet::default());
        let mut engine = LayoutEngine::new(&mut canvas, &g);
        engine.header("Asha K's Test Report", "Mock Test 1");
        for _ in 0..3 {
            engine.chart_section("Chart", &fake_snapshot(60, 40));
        }
        let summary = engine.finish();
        assert_eq!(summary.page_count, canvas.page_count());

        let bytes = canvas.finish("report").expect("pdf bytes");
        assert!(bytes.starts_with(b"%PDF-"));
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("/Helvetica-Bold"));
        assert!(text.contains("/Im0"));
        assert!(text.contains("/WinAnsiEncoding"));
        assert!(!text.contains("/Type0"));
    }

    #[test]
    fn refuses_an_empty_document() {
        let g = PageGeometry::default();
        let canvas = PdfCanvas::new(&g, &FontSet::default());
        assert!(matches!(
            canvas.finish("empty"),
            Err(ReportError::Serialize(_))
        ));
    }

    #[test]
    fn embedded_widths_come_from_the_font() {
        let g = PageGeometry::default();
        let canvas = PdfCanvas::new(&g, &tamil_fonts());
        // Two 600-unit glyphs at 10pt.
        let w = canvas.text_width("பா", 10.0, false);
        assert!((w - pt_to_mm(12.0)).abs() < 1e-9, "{w}");
        // 'B' is not in the font and falls back to Helvetica metrics.
        assert!((canvas.text_width("B", 10.0, false) - helvetica_width("B", 10.0, false)).abs() < 1e-9);
    }

    #[test]
    fn tamil_text_is_embedded_with_a_unicode_map() {
        let g = PageGeometry::default();
        let mut canvas = PdfCanvas::new(&g, &tamil_fonts());
        canvas.begin_page();
        canvas.text(20.0, 30.0, "பாA", black(10.0));
        let bytes = canvas.finish("tamil").expect("pdf bytes");
        let text = String::from_utf8_lossy(&bytes);

        assert!(text.contains("/Type0"));
        assert!(text.contains("/CIDFontType2"));
        assert!(text.contains("/Identity-H"));
        assert!(text.contains("/FontFile2"));
        assert!(text.contains("/U0"));
        // CIDs in first-use order, each mapped back to its code point.
        assert!(text.contains("<0001> <0BAA>"));
        assert!(text.contains("<0002> <0BBE>"));
        assert!(text.contains("<0003> <0041>"));
        assert!(text.contains(r"(\000\001\000\002\000\003) Tj"));
    }

    #[test]
    fn uncovered_characters_keep_their_text() {
        let g = PageGeometry::default();
        let mut canvas = PdfCanvas::new(&g, &tamil_fonts());
        canvas.begin_page();
        // 'க' has no glyph and is outside WinAnsi; 'z' falls back to Helvetica.
        canvas.text(20.0, 30.0, "கz", black(10.0));
        assert_eq!(canvas.fonts[0].missing.iter().copied().collect::<Vec<_>>(), vec!['க']);
        let bytes = canvas.finish("gaps").expect("pdf bytes");
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("<0001> <0B95>"));
        assert!(text.contains("(z) Tj"));
    }

    #[test]
    fn repeated_characters_reuse_their_cid() {
        let g = PageGeometry::default();
        let mut canvas = PdfCanvas::new(&g, &tamil_fonts());
        let runs = canvas.encode_runs("பபா");
        assert_eq!(runs, vec![(Face::Embedded(0), vec![0, 1, 0, 1, 0, 2])]);
        assert_eq!(canvas.fonts[0].used.len(), 2);
    }
}
