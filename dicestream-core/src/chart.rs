//! SVG rendering for the offline analyzer.
//!
//! Both charts are plain SVG documents assembled with `fmt::Write`; values
//! that are undefined (NaN from `n == 0` rows) are drawn as empty bars or
//! gaps in a series rather than rejected.

use std::fmt::{self, Write as _};

use crate::analysis::AnnotatedRow;
use crate::constants::{EXPECTED_PROPORTION, FACE_COLORS, FACE_COUNT};
use crate::face::Face;
use crate::numbers::{count_to_f64, index_to_f64};

/// Canvas and palette shared by the analyzer charts.
#[derive(Debug, Clone)]
pub struct ChartStyle {
    pub width: f64,
    pub height: f64,
    pub margin_left: f64,
    pub margin_right: f64,
    pub margin_top: f64,
    pub margin_bottom: f64,
    pub background: String,
    pub reference_color: String,
    pub font_family: String,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            width: 700.0,
            height: 400.0,
            margin_left: 70.0,
            margin_right: 30.0,
            margin_top: 56.0,
            margin_bottom: 64.0,
            background: "#FFFAF0".into(),
            reference_color: "#c9a365".into(),
            font_family: "sans-serif".into(),
        }
    }
}

impl ChartStyle {
    fn plot_width(&self) -> f64 {
        self.width - self.margin_left - self.margin_right
    }

    fn plot_height(&self) -> f64 {
        self.height - self.margin_top - self.margin_bottom
    }

    fn plot_bottom(&self) -> f64 {
        self.margin_top + self.plot_height()
    }

    /// Map a value in `[0, y_max]` to a canvas y coordinate, clamped to the plot.
    fn y_for(&self, value: f64, y_max: f64) -> f64 {
        let ratio = (value / y_max).clamp(0.0, 1.0);
        self.plot_bottom() - ratio * self.plot_height()
    }

    fn open(&self, out: &mut String) -> fmt::Result {
        write!(
            out,
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" \
             viewBox=\"0 0 {w} {h}\" font-family=\"{font}\">",
            w = self.width,
            h = self.height,
            font = self.font_family,
        )?;
        write!(
            out,
            "<rect width=\"100%\" height=\"100%\" fill=\"{}\" stroke=\"black\" stroke-width=\"1.5\"/>",
            self.background
        )
    }

    fn title(&self, out: &mut String, text: &str) -> fmt::Result {
        out.push_str("<text x=\"");
        write!(out, "{}", self.width / 2.0)?;
        out.push_str("\" y=\"32\" text-anchor=\"middle\" font-size=\"16\">");
        svg_escape_into(out, text);
        out.push_str("</text>");
        Ok(())
    }

    fn axes(&self, out: &mut String, x_label: &str, y_label: &str) -> fmt::Result {
        let left = self.margin_left;
        let bottom = self.plot_bottom();
        write!(
            out,
            "<line x1=\"{left}\" y1=\"{top}\" x2=\"{left}\" y2=\"{bottom}\" stroke=\"black\"/>\
             <line x1=\"{left}\" y1=\"{bottom}\" x2=\"{right}\" y2=\"{bottom}\" stroke=\"black\"/>",
            top = self.margin_top,
            right = left + self.plot_width(),
        )?;
        write!(
            out,
            "<text x=\"{}\" y=\"{}\" text-anchor=\"middle\" font-size=\"12\">",
            left + self.plot_width() / 2.0,
            self.height - 16.0
        )?;
        svg_escape_into(out, x_label);
        out.push_str("</text>");
        write!(
            out,
            "<text x=\"18\" y=\"{y}\" text-anchor=\"middle\" font-size=\"12\" \
             transform=\"rotate(-90 18 {y})\">",
            y = self.margin_top + self.plot_height() / 2.0
        )?;
        svg_escape_into(out, y_label);
        out.push_str("</text>");
        Ok(())
    }

    fn y_ticks(&self, out: &mut String, y_max: f64, steps: u32) -> fmt::Result {
        for step in 0..=steps {
            let value = y_max * f64::from(step) / f64::from(steps);
            let y = self.y_for(value, y_max);
            write!(
                out,
                "<line x1=\"{x1}\" y1=\"{y}\" x2=\"{x2}\" y2=\"{y}\" stroke=\"black\"/>\
                 <text x=\"{tx}\" y=\"{ty}\" text-anchor=\"end\" font-size=\"10\">{value:.2}</text>",
                x1 = self.margin_left - 4.0,
                x2 = self.margin_left,
                tx = self.margin_left - 7.0,
                ty = y + 3.5,
            )?;
        }
        Ok(())
    }

    fn reference_line(&self, out: &mut String, y_max: f64) -> fmt::Result {
        let y = self.y_for(EXPECTED_PROPORTION, y_max);
        write!(
            out,
            "<line x1=\"{x1}\" y1=\"{y}\" x2=\"{x2}\" y2=\"{y}\" stroke=\"{color}\" \
             stroke-width=\"1\" stroke-dasharray=\"6 4\"/>",
            x1 = self.margin_left,
            x2 = self.margin_left + self.plot_width(),
            color = self.reference_color,
        )
    }
}

/// Bar chart of the final cumulative distribution, on a fixed 0 to 0.20 axis.
///
/// # Errors
///
/// Returns an error only if writing to the output buffer fails.
pub fn distribution_chart(row: &AnnotatedRow, style: &ChartStyle) -> Result<String, fmt::Error> {
    const Y_MAX: f64 = 0.20;

    let mut out = String::with_capacity(4096);
    style.open(&mut out)?;
    style.title(
        &mut out,
        &format!("Cumulative Dice Face Proportions - n={}", row.record.n),
    )?;
    style.axes(&mut out, "Dice Face", "Proportion")?;
    style.y_ticks(&mut out, Y_MAX, 4)?;

    let slot = style.plot_width() / index_to_f64(FACE_COUNT);
    let bar_width = slot * 0.7;
    for face in Face::ALL {
        let i = face.index();
        let proportion = row.cumulative[i];
        let x = style.margin_left + slot * index_to_f64(i) + (slot - bar_width) / 2.0;
        let center = x + bar_width / 2.0;
        let top = if proportion.is_finite() {
            style.y_for(proportion, Y_MAX)
        } else {
            style.plot_bottom()
        };
        write!(
            out,
            "<rect x=\"{x}\" y=\"{top}\" width=\"{bar_width}\" height=\"{h}\" \
             fill=\"{color}\" stroke=\"black\"/>",
            h = style.plot_bottom() - top,
            color = FACE_COLORS[i],
        )?;
        let label_y = (top + (style.plot_bottom() - top) * 0.1 + 12.0).min(style.plot_bottom() - 4.0);
        write!(
            out,
            "<text x=\"{center}\" y=\"{label_y}\" text-anchor=\"middle\" font-size=\"11\">{proportion:.3}</text>\
             <text x=\"{center}\" y=\"{tick}\" text-anchor=\"middle\" font-size=\"12\" \
             font-weight=\"bold\">{face}</text>",
            tick = style.plot_bottom() + 16.0,
        )?;
    }

    style.reference_line(&mut out, Y_MAX)?;
    out.push_str("</svg>");
    Ok(out)
}

/// Line chart of cumulative proportions against roll count, one series per face.
///
/// # Errors
///
/// Returns an error only if writing to the output buffer fails.
pub fn trend_chart(rows: &[AnnotatedRow], style: &ChartStyle) -> Result<String, fmt::Error> {
    let finite = || {
        rows.iter()
            .flat_map(|row| row.cumulative.iter().copied())
            .filter(|p| p.is_finite())
    };
    let y_max = (finite().fold(EXPECTED_PROPORTION, f64::max) * 1.1).min(1.0);
    let x_min = rows.iter().map(|row| row.record.n).min().unwrap_or(0);
    let x_max = rows.iter().map(|row| row.record.n).max().unwrap_or(0);
    let x_span = count_to_f64(x_max.saturating_sub(x_min)).max(1.0);
    let x_for = |n: u64| {
        style.margin_left + count_to_f64(n.saturating_sub(x_min)) / x_span * style.plot_width()
    };

    let mut out = String::with_capacity(8192);
    style.open(&mut out)?;
    style.title(&mut out, "Dice Face Proportions Over Time (cumulative)")?;
    style.axes(&mut out, "Number of Rolls", "Proportion")?;
    style.y_ticks(&mut out, y_max, 5)?;
    write!(
        out,
        "<text x=\"{}\" y=\"{y}\" text-anchor=\"middle\" font-size=\"10\">{x_min}</text>\
         <text x=\"{}\" y=\"{y}\" text-anchor=\"middle\" font-size=\"10\">{x_max}</text>",
        x_for(x_min),
        x_for(x_max),
        y = style.plot_bottom() + 14.0,
    )?;

    for face in Face::ALL {
        let i = face.index();
        // NaN points split the series into separate segments
        let mut segments: Vec<Vec<(f64, f64)>> = vec![Vec::new()];
        for row in rows {
            let p = row.cumulative[i];
            if p.is_finite() {
                if let Some(current) = segments.last_mut() {
                    current.push((x_for(row.record.n), style.y_for(p, y_max)));
                }
            } else if segments.last().is_some_and(|s| !s.is_empty()) {
                segments.push(Vec::new());
            }
        }
        for segment in segments.iter().filter(|s| !s.is_empty()) {
            out.push_str("<polyline fill=\"none\" stroke-width=\"1.8\" stroke=\"");
            out.push_str(FACE_COLORS[i]);
            out.push_str("\" points=\"");
            for (x, y) in segment {
                write!(out, "{x:.2},{y:.2} ")?;
            }
            out.push_str("\"/>");
        }
    }

    style.reference_line(&mut out, y_max)?;
    legend(&mut out, style)?;
    out.push_str("</svg>");
    Ok(out)
}

fn legend(out: &mut String, style: &ChartStyle) -> fmt::Result {
    let x = style.margin_left + style.plot_width() - 110.0;
    let mut y = style.margin_top + 8.0;
    write!(
        out,
        "<rect x=\"{}\" y=\"{}\" width=\"104\" height=\"{}\" fill=\"white\" stroke=\"black\"/>",
        x - 6.0,
        y - 4.0,
        14.0 * 7.0 + 6.0
    )?;
    for face in Face::ALL {
        write!(
            out,
            "<line x1=\"{x}\" y1=\"{cy}\" x2=\"{x2}\" y2=\"{cy}\" stroke=\"{color}\" stroke-width=\"2\"/>\
             <text x=\"{tx}\" y=\"{ty}\" font-size=\"10\">Face {face}</text>",
            cy = y + 5.0,
            x2 = x + 18.0,
            color = FACE_COLORS[face.index()],
            tx = x + 24.0,
            ty = y + 8.5,
        )?;
        y += 14.0;
    }
    write!(
        out,
        "<line x1=\"{x}\" y1=\"{cy}\" x2=\"{x2}\" y2=\"{cy}\" stroke=\"{color}\" \
         stroke-dasharray=\"6 4\"/><text x=\"{tx}\" y=\"{ty}\" font-size=\"10\">Expected (1/6)</text>",
        cy = y + 5.0,
        x2 = x + 18.0,
        color = style.reference_color,
        tx = x + 24.0,
        ty = y + 8.5,
    )
}

fn svg_escape_into(out: &mut String, s: &str) {
    for c in s.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            _ => out.push(c),
        }
    }
}
