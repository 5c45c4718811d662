//! Text rendering of a beat list.
//!
//! Rows are `{seconds,downbeat,tempo}` triples: seconds without trailing
//! zeros or a leading `0`, downbeat as 1/0, and tempo as an integer BPM
//! (0 when unchanged).

use serde::Serialize;

use crate::grid::Beat;

/// One line of the beat table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BeatRow {
    pub seconds: String,
    pub downbeat: u8,
    pub tempo: u32,
}

impl From<&Beat> for BeatRow {
    fn from(beat: &Beat) -> Self {
        Self {
            seconds: format_seconds(beat.time_ms),
            downbeat: u8::from(beat.is_downbeat),
            tempo: beat.tempo.as_column(),
        }
    }
}

impl BeatRow {
    pub fn to_triple(&self) -> String {
        format!("{{{},{},{}}}", self.seconds, self.downbeat, self.tempo)
    }
}

/// Milliseconds as compact seconds: `500 -> ".5"`, `1250 -> "1.25"`,
/// `2000 -> "2"`, `0 -> "0"`.
pub fn format_seconds(time_ms: u64) -> String {
    let whole = time_ms / 1000;
    let fraction = format!("{:03}", time_ms % 1000);
    let fraction = fraction.trim_end_matches('0');

    match (whole, fraction.is_empty()) {
        (w, true) => w.to_string(),
        (0, false) => format!(".{}", fraction),
        (w, false) => format!("{}.{}", w, fraction),
    }
}

pub fn rows(beats: &[Beat]) -> Vec<BeatRow> {
    beats.iter().map(BeatRow::from).collect()
}

/// Triples, one per line, each followed by a comma.
pub fn render_rows(beats: &[Beat]) -> String {
    let mut out = String::new();
    for row in rows(beats) {
        out.push_str(&row.to_triple());
        out.push_str(",\n");
    }
    out
}

/// Fixed-width table for terminal preview.
pub fn render_preview(beats: &[Beat]) -> String {
    let mut out = format!("{:>6}  {:>10}  {:>8}  {:>5}\n", "beat", "seconds", "downbeat", "tempo");
    for (i, row) in rows(beats).iter().enumerate() {
        let tempo = if row.tempo == 0 {
            "-".to_string()
        } else {
            row.tempo.to_string()
        };
        out.push_str(&format!(
            "{:>6}  {:>10}  {:>8}  {:>5}\n",
            i, row.seconds, row.downbeat, tempo
        ));
    }
    out
}
