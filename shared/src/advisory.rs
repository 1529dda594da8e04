//! Fixed fungicide advisory shown next to every prediction.
//!
//! Text keeps `**bold**` markers; [`emphasis_spans`] splits them for rendering.

pub const TITLE: &str = "Maize Downy Mildew – Fungicide Advisory";

pub const GENERAL_GUIDELINES_TITLE: &str = "General Guidelines";

pub const GENERAL_GUIDELINES: [&str; 4] = [
    "Downy mildew is seed- and soil-borne and spreads rapidly under **high humidity** and **20–25 °C** conditions.",
    "**Seed treatment is essential** for primary prevention.",
    "Foliar sprays are needed only as a follow-up under **high disease pressure**.",
    "**Integrated approach** (Seed Dressing + Foliar Spray) offers the best control.",
];

pub const SEVERITY_TITLE: &str = "Severity-Based Spraying";

pub const SEVERITY_HEADERS: [&str; 3] = [
    "Disease Pressure",
    "Crop Stage",
    "Spray / Treatment Recommendation",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeverityRow {
    pub pressure: &'static str,
    pub crop_stage: &'static str,
    pub recommendation: &'static str,
}

pub const SEVERITY_TABLE: [SeverityRow; 4] = [
    SeverityRow {
        pressure: "**Preventive (No visible symptoms)**",
        crop_stage: "Before sowing",
        recommendation: "**Seed treatment mandatory** → **Metalaxyl 4% + Mancozeb 64% WP @ 3 g/kg seed**.",
    },
    SeverityRow {
        pressure: "**Low (≤10% PDI)**",
        crop_stage: "Seedling stage (up to 25 DAS)",
        recommendation: "Seed treatment with **Metalaxyl 4% + Mancozeb 64% WP @ 3 g/kg seed** alone is effective.",
    },
    SeverityRow {
        pressure: "**Moderate (10–20% PDI)**",
        crop_stage: "Early vegetative stage (25–35 DAS)",
        recommendation: "Seed treatment (**Metalaxyl 4% + Mancozeb 64% WP @ 3 g/kg seed**) **+** foliar spray with **Carbendazim + Mancozeb @ 2 g/L water** or **Azoxystrobin + Cyproconazole @ 1 ml/L water**.",
    },
    SeverityRow {
        pressure: "**High (>20% PDI)**",
        crop_stage: "30–45 DAS (humid/wet)",
        recommendation: "Seed treatment (**Metalaxyl 4% + Mancozeb 64% WP @ 3 g/kg seed**) **+** foliar spray with **Azoxystrobin + Difenoconazole @ 1 ml/L water** (most effective). **Repeat after 15–20 days** if disease persists.",
    },
];

pub const HIGHLIGHTS_TITLE: &str = "Advisory Highlights";

pub const HIGHLIGHTS: [&str; 7] = [
    "**Seed Treatment:** Mandatory with **Metalaxyl + Mancozeb** for all maize sowings in endemic areas.",
    "**Best Strategy:** Seed treatment + **Azoxystrobin + Difenoconazole** foliar spray → *up to 97.6 % disease control*.",
    "**Moderate Strategy:** **Metalaxyl seed treatment alone** provides strong control under low disease pressure.",
    "**Avoid Sole Foliar Sprays:** Treatments like **Carbendazim + Mancozeb**, **Azoxystrobin + Difenoconazole**, or **Azoxystrobin + Cyproconazole** alone are less effective **without seed treatment**.",
    "**Spray Volume:** Maintain **500 L water/ha** for uniform coverage and penetration.",
    "**Resistance Management:** Avoid continuous use of **Metalaxyl** or strobilurins (Azoxystrobin, Pyraclostrobin).",
    "Rotate fungicides and mix different modes of action.",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Credit {
    pub name: &'static str,
    pub role: &'static str,
}

pub const CREDITS: [Credit; 3] = [
    Credit {
        name: "Anurag Dhole",
        role: "Researcher at MIT, Manipal",
    },
    Credit {
        name: "Dr. Jadesha G",
        role: "Assistant Professor at GKVK, UAS, Bangalore",
    },
    Credit {
        name: "Dr. Deepak D.",
        role: "Professor at MIT, Manipal",
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Span<'a> {
    Plain(&'a str),
    Bold(&'a str),
    Italic(&'a str),
}

/// Splits advisory text on `**` (bold) and single `*` (italic) markers.
///
/// An unterminated marker is kept as literal text.
pub fn emphasis_spans(text: &str) -> Vec<Span<'_>> {
    let mut spans = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        let Some(start) = rest.find('*') else {
            spans.push(Span::Plain(rest));
            break;
        };

        let bold = rest[start..].starts_with("**");
        let marker = if bold { "**" } else { "*" };

        let body_start = start + marker.len();
        let Some(len) = rest[body_start..].find(marker) else {
            spans.push(Span::Plain(rest));
            break;
        };

        if start > 0 {
            spans.push(Span::Plain(&rest[..start]));
        }
        if len > 0 {
            let body = &rest[body_start..body_start + len];
            spans.push(if bold { Span::Bold(body) } else { Span::Italic(body) });
        }
        rest = &rest[body_start + len + marker.len()..];
    }

    spans
}
