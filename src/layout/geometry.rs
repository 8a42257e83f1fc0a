use crate::error::ReportError;
use serde::{Deserialize, Serialize};

pub type Rgb = [f64; 3];

pub const MM_PER_PT: f64 = 25.4 / 72.0;

/// Page geometry and typography in one place. Lengths are millimetres
/// measured from the top-left corner; font sizes are points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PageGeometry {
    pub page_width: f64,
    pub page_height: f64,
    pub margin: f64,

    pub header_height: f64,
    pub info_box_height: f64,
    pub info_box_radius: f64,
    pub section_title_height: f64,
    pub section_gap: f64,
    pub line_height: f64,
    pub footer_offset: f64,

    pub title_font_size: f64,
    pub subtitle_font_size: f64,
    pub label_font_size: f64,
    pub section_title_font_size: f64,
    pub body_font_size: f64,
    pub footer_font_size: f64,

    pub header_fill: Rgb,
    pub header_text: Rgb,
    pub info_box_fill: Rgb,
    pub info_box_stroke: Rgb,
    pub rule_color: Rgb,
    pub text_color: Rgb,
    pub muted_text_color: Rgb,

    pub footer_text: String,
}

impl Default for PageGeometry {
    fn default() -> Self {
        // A4 portrait.
        Self {
            page_width: 210.0,
            page_height: 297.0,
            margin: 15.0,

            header_height: 24.0,
            info_box_height: 30.0,
            info_box_radius: 3.0,
            section_title_height: 10.0,
            section_gap: 6.0,
            line_height: 5.5,
            footer_offset: 8.0,

            title_font_size: 18.0,
            subtitle_font_size: 11.0,
            label_font_size: 9.5,
            section_title_font_size: 13.0,
            body_font_size: 10.0,
            footer_font_size: 8.0,

            header_fill: [0.27, 0.22, 0.79],
            header_text: [1.0, 1.0, 1.0],
            info_box_fill: [0.95, 0.95, 0.98],
            info_box_stroke: [0.78, 0.78, 0.85],
            rule_color: [0.75, 0.75, 0.75],
            text_color: [0.1, 0.1, 0.1],
            muted_text_color: [0.4, 0.4, 0.4],

            footer_text: "Generated by Test Management System".to_string(),
        }
    }
}

impl PageGeometry {
    pub fn content_width(&self) -> f64 {
        self.page_width - 2.0 * self.margin
    }

    /// Lowest y any section may reach.
    pub fn content_bottom(&self) -> f64 {
        self.page_height - self.margin
    }

    /// Tallest image a chart section can hold on an otherwise empty page.
    pub fn max_chart_height(&self) -> f64 {
        self.content_bottom() - self.margin - self.section_title_height
    }

    pub fn validate(&self) -> Result<(), ReportError> {
        let lengths = [
            ("pageWidth", self.page_width),
            ("pageHeight", self.page_height),
            ("headerHeight", self.header_height),
            ("infoBoxHeight", self.info_box_height),
            ("sectionTitleHeight", self.section_title_height),
            ("lineHeight", self.line_height),
            ("titleFontSize", self.title_font_size),
            ("bodyFontSize", self.body_font_size),
        ];
        for (name, v) in lengths {
            if !(v.is_finite() && v > 0.0) {
                return Err(ReportError::BadInput(format!(
                    "geometry.{name} must be a positive number"
                )));
            }
        }
        if !(self.margin.is_finite() && self.margin >= 0.0) {
            return Err(ReportError::BadInput(
                "geometry.margin must be zero or positive".to_string(),
            ));
        }
        if self.content_width() <= 0.0 {
            return Err(ReportError::BadInput(
                "geometry.margin leaves no content width".to_string(),
            ));
        }
        if !(self.footer_offset.is_finite()
            && self.footer_offset >= 0.0
            && self.footer_offset <= self.margin)
        {
            return Err(ReportError::BadInput(
                "geometry.footerOffset must lie within the bottom margin".to_string(),
            ));
        }
        if self.line_height < pt_to_mm(self.body_font_size) {
            return Err(ReportError::BadInput(
                "geometry.lineHeight is shorter than the body font".to_string(),
            ));
        }
        let first_page_fixed = self.header_height + self.info_box_height + self.section_gap * 2.0;
        if self.max_chart_height() <= self.line_height
            || self.margin + first_page_fixed > self.content_bottom()
        {
            return Err(ReportError::BadInput(
                "geometry.pageHeight is too small for the fixed sections".to_string(),
            ));
        }
        Ok(())
    }
}

pub fn pt_to_mm(pt: f64) -> f64 {
    pt * MM_PER_PT
}
