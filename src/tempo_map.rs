//! # Tempo Map
//!
//! Canonical tempo and time-signature sequences, plus tick-to-seconds
//! integration over them.
//!
//! ## Normalization
//! Raw change lists straight out of a MIDI file can be empty, unsorted,
//! repeated on the same tick, or start somewhere after tick 0. After
//! [`normalize_tempos`] / [`normalize_time_signatures`]:
//! - entries are sorted by tick, one per tick (the last one read wins)
//! - the first entry sits at tick 0, carrying the earliest known value
//! - an empty list becomes 120 BPM / 4:4 at tick 0
//! - non-positive tempos and zero-sized signatures are dropped
//!
//! ## Integration
//! [`ticks_to_seconds`] walks the piecewise-constant tempo segments and sums
//! `span * 60 / bpm / ppq` for every segment before the target tick.
//!
//! ## Example
//! ```rust
//! use beatgrid::tempo_map::{normalize_tempos, ticks_to_seconds, TempoChange};
//!
//! let tempos = normalize_tempos(vec![TempoChange::new(960, 60.0)]);
//! assert_eq!(tempos[0], TempoChange::new(0, 60.0));
//! assert_eq!(ticks_to_seconds(480, &tempos, 480), 1.0);
//! ```

use serde::Serialize;
use tracing::warn;

pub const DEFAULT_BPM: f64 = 120.0;
pub const DEFAULT_PPQ: u16 = 480;

/// Tempo in effect from `tick` until the next change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TempoChange {
    pub tick: u64,
    pub bpm: f64,
}

impl TempoChange {
    pub fn new(tick: u64, bpm: f64) -> Self {
        Self { tick, bpm }
    }

    /// Seconds covered by `ticks` ticks at this tempo
    pub fn seconds_for(&self, ticks: u64, ppq: u16) -> f64 {
        ticks as f64 * 60.0 / (self.bpm * effective_ppq(ppq) as f64)
    }
}

/// Time signature in effect from `tick` until the next change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeSignatureChange {
    pub tick: u64,
    pub numerator: u32,
    pub denominator: u32,
}

impl TimeSignatureChange {
    pub fn new(tick: u64, numerator: u32, denominator: u32) -> Self {
        Self {
            tick,
            numerator,
            denominator,
        }
    }
}

/// PPQ with the zero case mapped to the default.
pub fn effective_ppq(ppq: u16) -> u16 {
    if ppq == 0 {
        DEFAULT_PPQ
    } else {
        ppq
    }
}

/// Canonicalize a raw tempo list.
pub fn normalize_tempos(raw: Vec<TempoChange>) -> Vec<TempoChange> {
    let valid: Vec<TempoChange> = raw
        .into_iter()
        .filter(|t| {
            let ok = t.bpm.is_finite() && t.bpm > 0.0;
            if !ok {
                warn!(tick = t.tick, bpm = t.bpm, "dropping non-positive tempo");
            }
            ok
        })
        .collect();

    canonicalize(valid, |t| t.tick, |t, tick| t.tick = tick)
        .unwrap_or_else(|| vec![TempoChange::new(0, DEFAULT_BPM)])
}

/// Canonicalize a raw time-signature list.
pub fn normalize_time_signatures(raw: Vec<TimeSignatureChange>) -> Vec<TimeSignatureChange> {
    let valid: Vec<TimeSignatureChange> = raw
        .into_iter()
        .filter(|ts| {
            let ok = ts.numerator > 0 && ts.denominator > 0;
            if !ok {
                warn!(
                    tick = ts.tick,
                    numerator = ts.numerator,
                    denominator = ts.denominator,
                    "dropping empty time signature"
                );
            }
            ok
        })
        .collect();

    canonicalize(valid, |ts| ts.tick, |ts, tick| ts.tick = tick)
        .unwrap_or_else(|| vec![TimeSignatureChange::new(0, 4, 4)])
}

/// Sort by tick, keep the last entry per tick, and make sure tick 0 is
/// covered. Returns `None` for an empty list so the caller picks its default.
fn canonicalize<T: Copy>(
    mut items: Vec<T>,
    tick_of: impl Fn(&T) -> u64,
    set_tick: impl Fn(&mut T, u64),
) -> Option<Vec<T>> {
    // Stable sort: equal ticks keep file order, so the last one read wins below
    items.sort_by_key(|item| tick_of(item));

    let mut out: Vec<T> = Vec::with_capacity(items.len() + 1);
    for item in items {
        match out.last_mut() {
            Some(last) if tick_of(last) == tick_of(&item) => *last = item,
            _ => out.push(item),
        }
    }

    let first = *out.first()?;
    if tick_of(&first) != 0 {
        let mut synthetic = first;
        set_tick(&mut synthetic, 0);
        out.insert(0, synthetic);
    }
    Some(out)
}

/// Elapsed seconds from tick 0 to `target_tick`.
///
/// `tempos` is expected to be normalized. An empty slice integrates at the
/// default tempo.
pub fn ticks_to_seconds(target_tick: u64, tempos: &[TempoChange], ppq: u16) -> f64 {
    if tempos.is_empty() {
        return TempoChange::new(0, DEFAULT_BPM).seconds_for(target_tick, ppq);
    }

    let mut seconds = 0.0;
    for (i, segment) in tempos.iter().enumerate() {
        if segment.tick >= target_tick {
            break;
        }
        let end = tempos
            .get(i + 1)
            .map_or(target_tick, |next| next.tick.min(target_tick));
        seconds += segment.seconds_for(end - segment.tick, ppq);
    }
    seconds
}

/// Ticks covered by `seconds` at a single constant tempo, rounded to the
/// nearest tick.
///
/// Durations that are not finite, not positive, or too long to count in
/// `u64` ticks give 0.
pub fn seconds_to_ticks(seconds: f64, bpm: f64, ppq: u16) -> u64 {
    if !seconds.is_finite() || seconds <= 0.0 {
        return 0;
    }
    let ticks = (seconds * bpm / 60.0 * effective_ppq(ppq) as f64).round();
    if !ticks.is_finite() || ticks >= u64::MAX as f64 {
        warn!(seconds, bpm, "duration does not fit in ticks, ignoring it");
        return 0;
    }
    ticks as u64
}

/// Latest tempo change at or before `tick`.
pub fn tempo_at(tick: u64, tempos: &[TempoChange]) -> Option<&TempoChange> {
    tempos.iter().take_while(|t| t.tick <= tick).last()
}

/// Latest time-signature change at or before `tick`.
pub fn time_signature_at(tick: u64, signatures: &[TimeSignatureChange]) -> Option<&TimeSignatureChange> {
    signatures.iter().take_while(|ts| ts.tick <= tick).last()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_tempos_default_to_120() {
        let tempos = normalize_tempos(vec![]);
        assert_eq!(tempos, vec![TempoChange::new(0, 120.0)]);
    }

    #[test]
    fn test_empty_time_signatures_default_to_four_four() {
        let signatures = normalize_time_signatures(vec![]);
        assert_eq!(signatures, vec![TimeSignatureChange::new(0, 4, 4)]);
    }

    #[test]
    fn test_synthesizes_tick_zero_from_earliest() {
        let tempos = normalize_tempos(vec![
            TempoChange::new(1920, 90.0),
            TempoChange::new(960, 100.0),
        ]);
        assert_eq!(
            tempos,
            vec![
                TempoChange::new(0, 100.0),
                TempoChange::new(960, 100.0),
                TempoChange::new(1920, 90.0),
            ]
        );

        let signatures = normalize_time_signatures(vec![TimeSignatureChange::new(480, 3, 4)]);
        assert_eq!(signatures[0], TimeSignatureChange::new(0, 3, 4));
        assert_eq!(signatures.len(), 2);
    }

    #[test]
    fn test_duplicate_ticks_last_wins() {
        let tempos = normalize_tempos(vec![
            TempoChange::new(0, 100.0),
            TempoChange::new(480, 130.0),
            TempoChange::new(0, 110.0),
        ]);
        assert_eq!(
            tempos,
            vec![TempoChange::new(0, 110.0), TempoChange::new(480, 130.0)]
        );
    }

    #[test]
    fn test_non_positive_values_dropped() {
        let tempos = normalize_tempos(vec![
            TempoChange::new(0, 0.0),
            TempoChange::new(480, -20.0),
            TempoChange::new(960, f64::INFINITY),
        ]);
        assert_eq!(tempos, vec![TempoChange::new(0, 120.0)]);

        let signatures = normalize_time_signatures(vec![
            TimeSignatureChange::new(0, 0, 4),
            TimeSignatureChange::new(960, 6, 8),
        ]);
        assert_eq!(
            signatures,
            vec![
                TimeSignatureChange::new(0, 6, 8),
                TimeSignatureChange::new(960, 6, 8),
            ]
        );
    }

    #[test]
    fn test_first_tick_always_zero() {
        let inputs = vec![
            vec![],
            vec![TempoChange::new(7, 61.0)],
            vec![TempoChange::new(3000, 200.0), TempoChange::new(5, 70.0)],
        ];
        for raw in inputs {
            assert_eq!(normalize_tempos(raw)[0].tick, 0);
        }
    }

    #[test]
    fn test_constant_tempo_seconds() {
        let tempos = normalize_tempos(vec![]);
        assert_eq!(ticks_to_seconds(0, &tempos, 480), 0.0);
        assert_eq!(ticks_to_seconds(480, &tempos, 480), 0.5);
        assert_eq!(ticks_to_seconds(1920, &tempos, 480), 2.0);
    }

    #[test]
    fn test_exact_at_tempo_boundaries() {
        let tempos = normalize_tempos(vec![
            TempoChange::new(0, 120.0),
            TempoChange::new(960, 60.0),
            TempoChange::new(1920, 240.0),
        ]);
        // 960 ticks at 120 = 1s, then 960 ticks at 60 = 2s
        assert_eq!(ticks_to_seconds(960, &tempos, 480), 1.0);
        assert_eq!(ticks_to_seconds(1920, &tempos, 480), 3.0);
        // 480 ticks into the 240 BPM segment = 0.25s
        assert_eq!(ticks_to_seconds(2400, &tempos, 480), 3.25);
    }

    #[test]
    fn test_ticks_to_seconds_non_decreasing() {
        let tempos = normalize_tempos(vec![
            TempoChange::new(100, 87.5),
            TempoChange::new(1000, 203.0),
            TempoChange::new(1001, 40.0),
            TempoChange::new(5000, 133.3),
        ]);
        let mut previous = 0.0;
        for tick in (0..8000).step_by(7) {
            let seconds = ticks_to_seconds(tick, &tempos, 96);
            assert!(seconds >= previous, "went backwards at tick {}", tick);
            previous = seconds;
        }
    }

    #[test]
    fn test_zero_ppq_uses_default() {
        let tempos = normalize_tempos(vec![]);
        assert_eq!(ticks_to_seconds(480, &tempos, 0), 0.5);
        assert_eq!(ticks_to_seconds(480, &[], 480), 0.5);
    }

    #[test]
    fn test_seconds_to_ticks() {
        assert_eq!(seconds_to_ticks(2.0, 120.0, 480), 1920);
        assert_eq!(seconds_to_ticks(0.0, 120.0, 480), 0);
        assert_eq!(seconds_to_ticks(f64::NAN, 120.0, 480), 0);
        assert_eq!(seconds_to_ticks(1e300, 120.0, 480), 0);
        assert_eq!(seconds_to_ticks(1e17, 120.0, 480), 0);
    }

    #[test]
    fn test_lookups() {
        let tempos = normalize_tempos(vec![TempoChange::new(0, 120.0), TempoChange::new(960, 90.0)]);
        assert_eq!(tempo_at(959, &tempos).map(|t| t.bpm), Some(120.0));
        assert_eq!(tempo_at(960, &tempos).map(|t| t.bpm), Some(90.0));

        let signatures = normalize_time_signatures(vec![TimeSignatureChange::new(1920, 3, 4)]);
        assert_eq!(time_signature_at(0, &signatures).map(|ts| ts.numerator), Some(3));
        assert!(time_signature_at(0, &[]).is_none());
    }
}
