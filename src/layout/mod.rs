pub mod geometry;
pub mod text;

use crate::charts::Snapshot;
use geometry::{pt_to_mm, PageGeometry, Rgb};
use serde::Serialize;

/// Rectangle in millimetres, `y` measured down from the page top.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn bottom(&self) -> f64 {
        self.y + self.h
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub size: f64,
    pub bold: bool,
    pub color: Rgb,
}

/// Drawing surface the layout engine writes to. All calls target the most
/// recently begun page.
pub trait Canvas {
    fn begin_page(&mut self);
    /// Draws `text` with its left edge at `x` and its baseline at `baseline`.
    fn text(&mut self, x: f64, baseline: f64, text: &str, style: TextStyle);
    fn text_width(&self, text: &str, size: f64, bold: bool) -> f64;
    fn rect(&mut self, rect: Rect, radius: f64, fill: Rgb, stroke: Option<Rgb>);
    fn hline(&mut self, x1: f64, x2: f64, y: f64, color: Rgb);
    fn image(&mut self, rect: Rect, snapshot: &Snapshot);
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutState {
    pub cursor_y: f64,
    pub page_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Where the section is drawn.
    pub y: f64,
    pub page_index: usize,
    pub new_page: bool,
    /// State after the section.
    pub next: LayoutState,
}

/// The pagination rule. A section that would cross the bottom margin moves
/// to a fresh page first; a section already at the top of a fresh page is
/// placed there regardless, since another break cannot help it.
pub fn advance(state: LayoutState, required: f64, g: &PageGeometry) -> Placement {
    let overflows = state.cursor_y + required > g.content_bottom();
    let at_top = state.cursor_y <= g.margin;
    let (y, page_index, new_page) = if overflows && !at_top {
        (g.margin, state.page_index + 1, true)
    } else {
        (state.cursor_y, state.page_index, false)
    };
    Placement {
        y,
        page_index,
        new_page,
        next: LayoutState {
            cursor_y: y + required,
            page_index,
        },
    }
}

/// Fits a snapshot to the content width, keeping its aspect ratio, and
/// shrinks it further when it would not fit on one page.
pub fn chart_display_size(snapshot: &Snapshot, g: &PageGeometry) -> (f64, f64) {
    let width = g.content_width();
    let height = width * snapshot.aspect();
    let max_h = g.max_chart_height();
    if height > max_h && height > 0.0 {
        (width * max_h / height, max_h)
    } else {
        (width, height)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedSection {
    pub kind: &'static str,
    pub title: String,
    pub page_index: usize,
    pub y: f64,
    pub height: f64,
}

pub struct LayoutEngine<'c, C: Canvas> {
    canvas: &'c mut C,
    geometry: &'c PageGeometry,
    state: LayoutState,
    sections: Vec<PlacedSection>,
}

impl<'c, C: Canvas> LayoutEngine<'c, C> {
    pub fn new(canvas: &'c mut C, geometry: &'c PageGeometry) -> Self {
        canvas.begin_page();
        Self {
            canvas,
            geometry,
            state: LayoutState {
                cursor_y: geometry.margin,
                page_index: 0,
            },
            sections: Vec::new(),
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> LayoutState {
        self.state
    }

    fn place(&mut self, required: f64) -> Placement {
        let placement = advance(self.state, required, self.geometry);
        if placement.new_page {
            self.draw_footer();
            self.canvas.begin_page();
        }
        self.state = placement.next;
        placement
    }

    fn record(
        &mut self,
        kind: &'static str,
        title: &str,
        page_index: usize,
        y: f64,
        height: f64,
    ) {
        self.sections.push(PlacedSection {
            kind,
            title: title.to_string(),
            page_index,
            y,
            height,
        });
    }

    fn gap(&mut self) {
        self.state.cursor_y += self.geometry.section_gap;
    }

    fn centered_text(&mut self, baseline: f64, text: &str, style: TextStyle) {
        let g = self.geometry;
        let w = self.canvas.text_width(text, style.size, style.bold);
        let x = g.margin + ((g.content_width() - w) / 2.0).max(0.0);
        self.canvas.text(x, baseline, text, style);
    }

    pub fn header(&mut self, title: &str, subtitle: &str) {
        let g = self.geometry;
        let p = self.place(g.header_height);
        self.canvas.rect(
            Rect {
                x: g.margin,
                y: p.y,
                w: g.content_width(),
                h: g.header_height,
            },
            g.info_box_radius,
            g.header_fill,
            None,
        );
        let title_size = pt_to_mm(g.title_font_size);
        let sub_size = pt_to_mm(g.subtitle_font_size);
        let block = title_size + 2.0 + sub_size;
        let top = p.y + (g.header_height - block) / 2.0;
        self.centered_text(
            top + title_size,
            title,
            TextStyle {
                size: g.title_font_size,
                bold: true,
                color: g.header_text,
            },
        );
        if !subtitle.is_empty() {
            self.centered_text(
                top + block,
                subtitle,
                TextStyle {
                    size: g.subtitle_font_size,
                    bold: false,
                    color: g.header_text,
                },
            );
        }
        self.record("header", title, p.page_index, p.y, g.header_height);
        self.gap();
    }

    /// Up to three rows of two label/value pairs. Drawn where the cursor
    /// is, without a page-break check.
    pub fn info_box(&mut self, pairs: &[(String, String)]) {
        let g = self.geometry;
        let y = self.state.cursor_y;
        let rect = Rect {
            x: g.margin,
            y,
            w: g.content_width(),
            h: g.info_box_height,
        };
        self.canvas.rect(
            rect,
            g.info_box_radius,
            g.info_box_fill,
            Some(g.info_box_stroke),
        );

        let row_h = g.info_box_height / 3.0;
        let col_w = g.content_width() / 2.0;
        let label_style = TextStyle {
            size: g.label_font_size,
            bold: true,
            color: g.muted_text_color,
        };
        let value_style = TextStyle {
            size: g.label_font_size,
            bold: false,
            color: g.text_color,
        };
        for (i, (label, value)) in pairs.iter().take(6).enumerate() {
            let row = (i / 2) as f64;
            let col = (i % 2) as f64;
            let x = g.margin + 5.0 + col * col_w;
            let baseline = y + row * row_h + (row_h + pt_to_mm(g.label_font_size)) / 2.0;
            let label_text = format!("{label}:");
            let label_w = self.canvas.text_width(&label_text, g.label_font_size, true);
            self.canvas.text(x, baseline, &label_text, label_style);
            self.canvas.text(x + label_w + 2.0, baseline, value, value_style);
        }

        self.state.cursor_y = rect.bottom();
        let page_index = self.state.page_index;
        self.record("infoBox", "", page_index, y, g.info_box_height);
        self.gap();
    }

    fn section_title(&mut self, y: f64, title: &str) {
        let g = self.geometry;
        let size = pt_to_mm(g.section_title_font_size);
        let baseline = y + size + 1.0;
        self.canvas.text(
            g.margin,
            baseline,
            title,
            TextStyle {
                size: g.section_title_font_size,
                bold: true,
                color: g.text_color,
            },
        );
        self.canvas.hline(
            g.margin,
            g.margin + g.content_width(),
            y + g.section_title_height - 2.5,
            g.rule_color,
        );
    }

    /// Title, rule and image as one unit; the whole unit moves to the next
    /// page when it does not fit.
    pub fn chart_section(&mut self, title: &str, snapshot: &Snapshot) {
        let g = self.geometry;
        let (w, h) = chart_display_size(snapshot, g);
        let required = g.section_title_height + h;
        let p = self.place(required);
        self.section_title(p.y, title);
        let x = g.margin + (g.content_width() - w) / 2.0;
        self.canvas.image(
            Rect {
                x,
                y: p.y + g.section_title_height,
                w,
                h,
            },
            snapshot,
        );
        self.record("chart", title, p.page_index, p.y, required);
        self.gap();
    }

    /// Title line followed by word-wrapped body lines. The title is kept
    /// together with the first body line; later lines spill onto new pages
    /// one at a time.
    pub fn text_block(&mut self, title: &str, body: &[String]) {
        let g = self.geometry;
        let keep = g.section_title_height + g.line_height;
        let p = self.place(keep);
        self.state.cursor_y = p.y + g.section_title_height;
        self.section_title(p.y, title);
        self.record("textBlock", title, p.page_index, p.y, keep);

        let style = TextStyle {
            size: g.body_font_size,
            bold: false,
            color: g.text_color,
        };
        let width = g.content_width();
        let canvas = &*self.canvas;
        let lines: Vec<String> = body
            .iter()
            .flat_map(|para| wrap_para(canvas, para, width, g.body_font_size))
            .collect();
        for line in lines {
            let p = self.place(g.line_height);
            let baseline = p.y + (g.line_height + pt_to_mm(g.body_font_size)) / 2.0;
            self.canvas.text(g.margin, baseline, &line, style);
        }
        self.gap();
    }

    fn draw_footer(&mut self) {
        let g = self.geometry;
        let style = TextStyle {
            size: g.footer_font_size,
            bold: false,
            color: g.muted_text_color,
        };
        let baseline = g.page_height - g.footer_offset;
        self.centered_text(baseline, &g.footer_text, style);
        let page = format!("Page {}", self.state.page_index + 1);
        let w = self.canvas.text_width(&page, g.footer_font_size, false);
        self.canvas
            .text(g.margin + g.content_width() - w, baseline, &page, style);
    }

    /// Closes the last page and reports what was placed where.
    pub fn finish(mut self) -> LayoutSummary {
        self.draw_footer();
        LayoutSummary {
            page_count: self.state.page_index + 1,
            sections: self.sections,
        }
    }
}

fn wrap_para<C: Canvas>(canvas: &C, para: &str, width: f64, size: f64) -> Vec<String> {
    text::wrap_text(para, width, |s| canvas.text_width(s, size, false))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutSummary {
    pub page_count: usize,
    pub sections: Vec<PlacedSection>,
}

#[cfg(test)]
pub(crate) mod recording {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Op {
        Text { page: usize, x: f64, baseline: f64, text: String },
        Rect { page: usize, rect: Rect },
        Rule { page: usize, y: f64 },
        Image { page: usize, rect: Rect },
    }

    /// Fake canvas: every glyph is 2mm wide and every op is logged with
    /// its page.
    #[derive(Debug, Default)]
    pub struct RecordingCanvas {
        pub pages: usize,
        pub ops: Vec<Op>,
    }

    impl RecordingCanvas {
        fn page(&self) -> usize {
            self.pages.saturating_sub(1)
        }

        pub fn images(&self) -> Vec<(usize, Rect)> {
            self.ops
                .iter()
                .filter_map(|op| match op {
                    Op::Image { page, rect } => Some((*page, *rect)),
                    _ => None,
                })
                .collect()
        }

        pub fn texts_on(&self, wanted: usize) -> Vec<String> {
            self.ops
                .iter()
                .filter_map(|op| match op {
                    Op::Text { page, text, .. } if *page == wanted => Some(text.clone()),
                    _ => None,
                })
                .collect()
        }
    }

    impl Canvas for RecordingCanvas {
        fn begin_page(&mut self) {
            self.pages += 1;
        }

        fn text(&mut self, x: f64, baseline: f64, text: &str, _style: TextStyle) {
            self.ops.push(Op::Text {
                page: self.page(),
                x,
                baseline,
                text: text.to_string(),
            });
        }

        fn text_width(&self, text: &str, _size: f64, _bold: bool) -> f64 {
            2.0 * text.chars().count() as f64
        }

        fn rect(&mut self, rect: Rect, _radius: f64, _fill: Rgb, _stroke: Option<Rgb>) {
            self.ops.push(Op::Rect {
                page: self.page(),
                rect,
            });
        }

        fn hline(&mut self, _x1: f64, _x2: f64, y: f64, _color: Rgb) {
            self.ops.push(Op::Rule {
                page: self.page(),
                y,
            });
        }

        fn image(&mut self, rect: Rect, _snapshot: &Snapshot) {
            self.ops.push(Op::Image {
                page: self.page(),
                rect,
            });
        }
    }

    pub fn fake_snapshot(width: u32, height: u32) -> Snapshot {
        Snapshot {
            width,
            height,
            rgb: vec![255; (width * height * 3) as usize],
        }
    }
}
