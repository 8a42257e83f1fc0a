use super::geometry::pt_to_mm;

/// Greedy word wrap. Words wider than `max_width` are broken between
/// characters so nothing is ever clipped. Always yields at least one line.
pub fn wrap_text(text: &str, max_width: f64, measure: impl Fn(&str) -> f64) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if measure(&candidate) <= max_width {
            current = candidate;
            continue;
        }
        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if measure(word) <= max_width {
            current = word.to_string();
            continue;
        }
        for ch in word.chars() {
            let mut next = current.clone();
            next.push(ch);
            if !current.is_empty() && measure(&next) > max_width {
                lines.push(std::mem::take(&mut current));
                current.push(ch);
            } else {
                current = next;
            }
        }
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// Helvetica advance widths (1/1000 em) for U+0020..=U+007E.
const HELVETICA_ASCII: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0'..'?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P'..'_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`'..'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 'p'..'~'
];

pub fn helvetica_units(ch: char) -> u16 {
    match ch {
        ' '..='~' => HELVETICA_ASCII[(ch as usize) - 0x20],
        '\u{2022}' => 350,
        _ => 556,
    }
}

/// Width of `text` set in Helvetica at `size_pt`, in millimetres. Bold is
/// approximated by widening the regular metrics.
pub fn helvetica_width(text: &str, size_pt: f64, bold: bool) -> f64 {
    let units: u32 = text.chars().map(|c| helvetica_units(c) as u32).sum();
    let scale = if bold { 1.08 } else { 1.0 };
    pt_to_mm(units as f64 / 1000.0 * size_pt) * scale
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mono(s: &str) -> f64 {
        s.chars().count() as f64
    }

    #[test]
    fn wraps_on_word_boundaries() {
        let lines = wrap_text("aa bb cc dd", 5.0, mono);
        assert_eq!(lines, vec!["aa bb", "cc dd"]);
    }

    #[test]
    fn breaks_words_longer_than_the_line() {
        let lines = wrap_text("abcdefgh ij", 3.0, mono);
        assert_eq!(lines, vec!["abc", "def", "gh", "ij"]);
    }

    #[test]
    fn empty_text_is_one_empty_line() {
        assert_eq!(wrap_text("   ", 10.0, mono), vec![String::new()]);
    }

    #[test]
    fn every_line_fits() {
        let text = "Needs significant improvement. Revisit the fundamentals of each weak topic.";
        for line in wrap_text(text, 40.0, |s| helvetica_width(s, 10.0, false)) {
            assert!(helvetica_width(&line, 10.0, false) <= 40.0, "{line}");
        }
    }

    #[test]
    fn helvetica_width_scales_with_size() {
        let w10 = helvetica_width("Physics", 10.0, false);
        let w20 = helvetica_width("Physics", 20.0, false);
        assert!((w20 - 2.0 * w10).abs() < 1e-9);
        assert!(helvetica_width("Physics", 10.0, true) > w10);
    }
}
