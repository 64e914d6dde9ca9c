use std::fmt::Write as _;

/// XML 1.0 valid char ranges:
/// - 0x09, 0x0A, 0x0D
/// - 0x20..=0xD7FF
/// - 0xE000..=0xFFFD
/// - 0x10000..=0x10FFFF
fn is_valid_xml_char(c: char) -> bool {
    matches!(
        c as u32,
        0x09 | 0x0A | 0x0D | 0x20..=0xD7FF | 0xE000..=0xFFFD | 0x10000..=0x10FFFF
    )
}

/// Escape text for element content or a double-quoted attribute, dropping
/// characters XML cannot carry.
pub fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars().filter(|&c| is_valid_xml_char(c)) {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Anchor {
    Start,
    Middle,
    End,
}

impl Anchor {
    fn as_str(self) -> &'static str {
        match self {
            Anchor::Start => "start",
            Anchor::Middle => "middle",
            Anchor::End => "end",
        }
    }
}

/// Font settings for one text element.
#[derive(Debug, Clone)]
pub struct TextStyle<'a> {
    pub family: &'a str,
    pub size: f32,
    pub color: &'a str,
    pub bold: bool,
    pub anchor: Anchor,
}

/// Accumulates SVG elements for one chart.
pub struct SvgCanvas {
    width: f32,
    height: f32,
    body: String,
}

impl SvgCanvas {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            body: String::new(),
        }
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn rect(&mut self, x: f32, y: f32, w: f32, h: f32, fill: &str) {
        let _ = write!(
            self.body,
            r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="{}"/>"#,
            x,
            y,
            w.max(0.0),
            h.max(0.0),
            escape_xml(fill)
        );
    }

    pub fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, stroke: &str, width: f32) {
        let _ = write!(
            self.body,
            r#"<line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke="{}" stroke-width="{:.2}"/>"#,
            x1,
            y1,
            x2,
            y2,
            escape_xml(stroke),
            width
        );
    }

    pub fn circle(&mut self, cx: f32, cy: f32, r: f32, fill: &str, stroke: Option<(&str, f32)>) {
        let _ = write!(
            self.body,
            r#"<circle cx="{:.2}" cy="{:.2}" r="{:.2}" fill="{}"{}/>"#,
            cx,
            cy,
            r.max(0.0),
            escape_xml(fill),
            stroke_attrs(stroke)
        );
    }

    /// Raw path data; callers build `d` from numbers only.
    pub fn path(&mut self, d: &str, fill: &str, stroke: Option<(&str, f32)>) {
        let _ = write!(
            self.body,
            r#"<path d="{}" fill="{}" fill-rule="evenodd"{}/>"#,
            d,
            escape_xml(fill),
            stroke_attrs(stroke)
        );
    }

    pub fn text(&mut self, x: f32, y: f32, content: &str, style: &TextStyle<'_>) {
        self.text_element(x, y, content, style, String::new());
    }

    /// Text turned by `degrees` around its anchor point.
    pub fn text_rotated(
        &mut self,
        x: f32,
        y: f32,
        content: &str,
        style: &TextStyle<'_>,
        degrees: f32,
    ) {
        let transform = format!(r#" transform="rotate({:.1} {:.2} {:.2})""#, degrees, x, y);
        self.text_element(x, y, content, style, transform);
    }

    fn text_element(
        &mut self,
        x: f32,
        y: f32,
        content: &str,
        style: &TextStyle<'_>,
        transform: String,
    ) {
        let _ = write!(
            self.body,
            r#"<text x="{:.2}" y="{:.2}"{} font-family="{}" font-size="{:.1}"{} fill="{}" text-anchor="{}" xml:space="preserve">{}</text>"#,
            x,
            y,
            transform,
            escape_xml(style.family),
            style.size,
            if style.bold { r#" font-weight="bold""# } else { "" },
            escape_xml(style.color),
            style.anchor.as_str(),
            escape_xml(content)
        );
    }

    pub fn finish(self) -> String {
        format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">{body}</svg>"#,
            w = self.width,
            h = self.height,
            body = self.body
        )
    }
}

fn stroke_attrs(stroke: Option<(&str, f32)>) -> String {
    match stroke {
        Some((color, width)) if width > 0.0 => format!(
            r#" stroke="{}" stroke-width="{:.2}" stroke-linejoin="round""#,
            escape_xml(color),
            width
        ),
        _ => String::new(),
    }
}

/// Path builder that formats coordinates consistently.
#[derive(Default)]
pub struct PathData(String);

impl PathData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn move_to(&mut self, x: f32, y: f32) -> &mut Self {
        let _ = write!(self.0, "M{:.2},{:.2} ", x, y);
        self
    }

    pub fn line_to(&mut self, x: f32, y: f32) -> &mut Self {
        let _ = write!(self.0, "L{:.2},{:.2} ", x, y);
        self
    }

    pub fn cubic_to(&mut self, c1: (f32, f32), c2: (f32, f32), to: (f32, f32)) -> &mut Self {
        let _ = write!(
            self.0,
            "C{:.2},{:.2} {:.2},{:.2} {:.2},{:.2} ",
            c1.0, c1.1, c2.0, c2.1, to.0, to.1
        );
        self
    }

    pub fn arc_to(&mut self, r: f32, large: bool, sweep: bool, x: f32, y: f32) -> &mut Self {
        let _ = write!(
            self.0,
            "A{:.2},{:.2} 0 {} {} {:.2},{:.2} ",
            r,
            r,
            large as u8,
            sweep as u8,
            x,
            y
        );
        self
    }

    pub fn close(&mut self) -> &mut Self {
        self.0.push_str("Z ");
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        self.0.trim_end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remove_invalid_control_chars() {
        assert_eq!(escape_xml("A\u{0007}B\u{000C}C"), "ABC");
    }

    #[test]
    fn escape_special_xml_chars() {
        assert_eq!(
            escape_xml(r#"<tag attr="x&y">'z'"#),
            "&lt;tag attr=&quot;x&amp;y&quot;&gt;&apos;z&apos;"
        );
    }

    #[test]
    fn attribute_values_cannot_break_out() {
        let mut canvas = SvgCanvas::new(10.0, 10.0);
        canvas.rect(0.0, 0.0, 10.0, 10.0, r#"red" onload="x"#);
        let svg = canvas.finish();
        assert!(svg.contains(r#"fill="red&quot; onload=&quot;x""#));
    }

    #[test]
    fn path_data_formats_commands() {
        let mut d = PathData::new();
        d.move_to(0.0, 1.0).line_to(2.0, 3.0).arc_to(5.0, true, false, 1.0, 1.0).close();
        assert_eq!(d.as_str(), "M0.00,1.00 L2.00,3.00 A5.00,5.00 0 1 0 1.00,1.00 Z");
    }
}
