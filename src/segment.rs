//! Silence/speech segmentation
//!
//! Splits a continuous dubbed track into the audible regions that become
//! individual voice-line clips. The detector walks a decibel-relative-to-
//! peak amplitude curve in fixed strides, records threshold crossings as
//! enter/leave events, then cleans the event list with two merge passes
//! (fill short gaps, drop short blips) before padding and pairing.
//!
//! The engine is fail-soft by contract: if detection cannot produce a
//! sane event list for any reason, the caller gets a single segment
//! spanning the whole buffer instead of an error. Batch runs must never
//! stall on one odd track.

use log::warn;

use crate::audio::analysis::db_curve_rel_peak;
use crate::audio::buffer::AudioBuffer;
use crate::config::SegmentationConfig;
use crate::error::{Result, VoxlineError};

/// A contiguous audible sample range identified for extraction.
///
/// Immutable after creation; consumed once to slice an [`AudioBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    /// First sample of the audible region (inclusive)
    pub start: usize,
    /// One past the last sample of the audible region (exclusive)
    pub end: usize,
}

impl Segment {
    /// Create a segment. `end` must be greater than `start`.
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(end > start, "segment end must exceed start");
        Self { start, end }
    }

    /// Length in samples
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether this segment is degenerate (never true for valid segments)
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Duration in seconds at the given sample rate
    pub fn duration_secs(&self, sample_rate: u32) -> f32 {
        self.len() as f32 / sample_rate as f32
    }
}

/// Threshold-crossing event: sample position plus direction.
/// `entering == true` marks the start of an audible region.
#[derive(Debug, Clone, Copy)]
struct Crossing {
    position: usize,
    entering: bool,
}

/// Detect audible regions in a buffer.
///
/// Returns segments in ascending time order, pairwise non-overlapping.
/// On any detection failure (empty buffer, no crossings, malformed event
/// sequence) this logs a warning and returns one segment covering the
/// whole buffer, the documented fail-soft default.
pub fn segment(buffer: &AudioBuffer, config: &SegmentationConfig) -> Vec<Segment> {
    match detect(buffer, config) {
        Ok(segments) if !segments.is_empty() => segments,
        Ok(_) => {
            warn!(
                "WARN: no audible regions found in '{}', keeping full span",
                buffer.name
            );
            vec![full_span(buffer)]
        }
        Err(e) => {
            warn!("WARN: can't split audio '{}': {e}", buffer.name);
            vec![full_span(buffer)]
        }
    }
}

/// The fail-soft fallback: one segment over the whole buffer.
/// An empty buffer still yields a 1-sample segment, matching the
/// upstream tool's `[(0, 1)]` fallback.
fn full_span(buffer: &AudioBuffer) -> Segment {
    Segment::new(0, buffer.len().max(1))
}

fn detect(buffer: &AudioBuffer, config: &SegmentationConfig) -> Result<Vec<Segment>> {
    if buffer.is_empty() {
        return Err(VoxlineError::EmptyAudio);
    }

    let sample_rate = buffer.sample_rate;
    let threshold = config.silence_db;
    let stride = config.stride_samples(sample_rate);
    let curve = db_curve_rel_peak(&buffer.samples);
    let len = curve.len();

    // Step 1: collect threshold crossings at stride resolution.
    let mut events: Vec<Crossing> = Vec::new();
    if curve[0] > threshold {
        events.push(Crossing {
            position: 0,
            entering: true,
        });
    }
    let mut i = stride;
    while i < len {
        let prev = curve[i - stride];
        let cur = curve[i];
        if cur > threshold && prev <= threshold {
            events.push(Crossing {
                position: i,
                entering: true,
            });
        } else if cur < threshold && prev >= threshold {
            events.push(Crossing {
                position: i,
                entering: false,
            });
        }
        i += stride;
    }

    // Step 2: synthesize the trailing leave if the track ends audible.
    match events.last() {
        Some(last) if last.entering => events.push(Crossing {
            position: len,
            entering: false,
        }),
        Some(_) => {}
        None => return Ok(Vec::new()),
    }

    // Step 3: fill short gaps. A silence shorter than the threshold is
    // not a real pause, so the regions it separates become one.
    let min_silence = (config.min_silence_secs * sample_rate as f32) as usize;
    events = drop_short_intervals(events, min_silence, false);

    // Step 4: drop short blips. An audible region shorter than the
    // minimum segment duration dissolves into the surrounding silence.
    let min_segment = (config.min_segment_secs * sample_rate as f32) as usize;
    events = drop_short_intervals(events, min_segment, true);

    // Step 5: pad region boundaries outward, clamped to the buffer.
    let padding = (config.padding_secs * sample_rate as f32) as usize;
    for event in &mut events {
        if event.entering {
            event.position = event.position.saturating_sub(padding);
        } else {
            event.position = (event.position + padding).min(len);
        }
    }
    // A gap shorter than twice the padding makes the padded leave cross
    // the next padded enter; clamp both at the gap midpoint so segments
    // never overlap.
    for i in 0..events.len().saturating_sub(1) {
        if !events[i].entering
            && events[i + 1].entering
            && events[i].position > events[i + 1].position
        {
            let midpoint = (events[i].position + events[i + 1].position) / 2;
            events[i].position = midpoint;
            events[i + 1].position = midpoint;
        }
    }

    // Step 6: a leading leave has no matching start; drop it.
    if matches!(events.first(), Some(first) if !first.entering) {
        events.remove(0);
    }

    // Step 7: pair up (enter, leave) into segments.
    if events.len() % 2 != 0 {
        return Err(VoxlineError::InvalidAudio {
            reason: format!("unbalanced crossing events ({})", events.len()),
            source: None,
        });
    }
    let mut segments = Vec::with_capacity(events.len() / 2);
    for pair in events.chunks_exact(2) {
        if !pair[0].entering || pair[1].entering || pair[1].position <= pair[0].position {
            return Err(VoxlineError::InvalidAudio {
                reason: "crossing events out of order".to_string(),
                source: None,
            });
        }
        segments.push(Segment::new(pair[0].position, pair[1].position));
    }
    Ok(segments)
}

/// Remove interval boundaries whose spanned duration is at or below
/// `min_len`, considering only intervals that open with `entering`.
///
/// Deletion decisions are made against the unmodified list, then applied
/// in one sweep, so two adjacent short intervals are judged independently.
fn drop_short_intervals(events: Vec<Crossing>, min_len: usize, entering: bool) -> Vec<Crossing> {
    let mut drop = vec![false; events.len()];
    for i in 0..events.len().saturating_sub(1) {
        if events[i].entering == entering {
            let span = events[i + 1].position.saturating_sub(events[i].position);
            if span <= min_len {
                drop[i] = true;
                drop[i + 1] = true;
            }
        }
    }
    events
        .into_iter()
        .zip(drop)
        .filter_map(|(event, dropped)| (!dropped).then_some(event))
        .collect()
}
