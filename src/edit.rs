//! The frequency-domain edit operator and its undo/redo history.
//!
//! An edit is a Tukey-windowed multiplicative or additive change to the
//! magnitude of a contiguous run of frequency-domain samples on one channel.
//! Every applied edit is recorded so it can be undone (by restoring the
//! captured prior state) or redone (by recomputing the edit from its
//! parameters, not by replaying a stored post-state).

use num_complex::Complex;
use num_traits::Float;

use crate::segment::{SegmentedFunction, Samples};

/// Whether an edit scales magnitude multiplicatively or nudges it additively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeType {
    Multiplicative,
    Additive,
}

/// One entry in the modification history. The sentinel at index 0 has
/// `prior_state: None` and represents the pre-first-edit state; every other
/// record's `prior_state` is the samples it overwrote, of length
/// `to_sample - from_sample + 1`.
#[derive(Debug, Clone)]
pub struct ModificationRecord {
    pub from_sample: usize,
    pub to_sample: usize,
    pub change_type: ChangeType,
    pub change_amount: f64,
    pub smoothing: f64,
    pub channel: usize,
    prior_state: Option<Samples>,
}

impl ModificationRecord {
    fn sentinel() -> Self {
        ModificationRecord {
            from_sample: 0,
            to_sample: 0,
            change_type: ChangeType::Multiplicative,
            change_amount: 0.0,
            smoothing: 0.0,
            channel: 0,
            prior_state: None,
        }
    }

    fn len(&self) -> usize {
        self.to_sample - self.from_sample + 1
    }
}

/// The modification history: a single-owner spine of records with a cursor
/// index into it. `cursor == 0` exactly when at the pre-edit (sentinel)
/// state; a new edit truncates everything strictly after the cursor before
/// appending, so redo is only ever possible until the next `apply`.
#[derive(Debug, Clone)]
pub struct History {
    records: Vec<ModificationRecord>,
    cursor: usize,
}

impl Default for History {
    fn default() -> Self {
        History {
            records: vec![ModificationRecord::sentinel()],
            cursor: 0,
        }
    }
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records including the sentinel, i.e. one more than the
    /// number of edits ever applied (before any truncation by new edits).
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn can_undo(&self) -> bool {
        self.cursor != 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.records.len()
    }

    /// Applies a new edit to `channels[record.channel]`, recording it in the
    /// history. Returns `false` without mutating sample data if the prior
    /// state cannot be captured. Forward history beyond the cursor is
    /// discarded first, even on failure — an accepted side effect inherited
    /// from the source's documented history protocol.
    pub fn apply(
        &mut self,
        channels: &mut [Samples],
        channel: usize,
        from_sample: usize,
        to_sample: usize,
        change_type: ChangeType,
        change_amount: f64,
        smoothing: f64,
    ) -> bool {
        self.records.truncate(self.cursor + 1);

        let Some(target) = channels.get(channel) else {
            return false;
        };
        if to_sample >= target.len() || from_sample > to_sample {
            return false;
        }
        let prior_state = target.partial_clone(from_sample, to_sample);

        let record = ModificationRecord {
            from_sample,
            to_sample,
            change_type,
            change_amount,
            smoothing,
            channel,
            prior_state: Some(prior_state),
        };
        self.records.push(record);
        self.cursor = self.records.len() - 1;

        perform_edit(&mut channels[channel], self.records[self.cursor].clone_params());
        true
    }

    /// Restores the captured prior state of the record at the cursor and
    /// moves the cursor back by one. Returns `false` (no-op) if there is
    /// nothing to undo.
    pub fn undo(&mut self, channels: &mut [Samples]) -> bool {
        if !self.can_undo() {
            return false;
        }
        let record = &self.records[self.cursor];
        let channel_idx = record.channel;
        let from = record.from_sample;
        let len = record.len();
        if let (Some(prior), Some(target)) =
            (record.prior_state.as_ref(), channels.get_mut(channel_idx))
        {
            target.copy_from(prior, from, 0, len);
        }
        self.cursor -= 1;
        true
    }

    /// Re-executes the edit recorded just past the cursor, recomputed from
    /// its parameters rather than from a stored post-state, and advances the
    /// cursor. Returns `false` (no-op) if there is nothing to redo.
    pub fn redo(&mut self, channels: &mut [Samples]) -> bool {
        if !self.can_redo() {
            return false;
        }
        self.cursor += 1;
        let params = self.records[self.cursor].clone_params();
        perform_edit(&mut channels[params.channel], params);
        true
    }
}

/// The subset of a [`ModificationRecord`] needed to recompute (not replay)
/// an edit; split out so `redo` never touches the captured prior state.
struct EditParams {
    from_sample: usize,
    to_sample: usize,
    change_type: ChangeType,
    change_amount: f64,
    smoothing: f64,
    channel: usize,
}

impl ModificationRecord {
    fn clone_params(&self) -> EditParams {
        EditParams {
            from_sample: self.from_sample,
            to_sample: self.to_sample,
            change_type: self.change_type,
            change_amount: self.change_amount,
            smoothing: self.smoothing,
            channel: self.channel,
        }
    }
}

fn perform_edit(target: &mut Samples, params: EditParams) {
    let len = params.to_sample - params.from_sample + 1;
    let window = tukey_window(len, params.smoothing);
    match target {
        Samples::Single(buf) => apply_window(buf, params.from_sample, params.change_type, params.change_amount, &window),
        Samples::Double(buf) => apply_window(buf, params.from_sample, params.change_type, params.change_amount, &window),
    }
}

fn apply_window<T: Float>(
    buf: &mut SegmentedFunction<Complex<T>>,
    from: usize,
    change_type: ChangeType,
    amount: f64,
    window: &[f64],
) {
    for (n, &w) in window.iter().enumerate() {
        let idx = from + n;
        let z = buf.get(idx);
        let new_z = match change_type {
            ChangeType::Multiplicative => {
                let factor = T::from(amount * w).expect("change amount fits target float");
                z * factor
            }
            ChangeType::Additive => {
                let magnitude = z.norm();
                let delta = T::from(amount * w).expect("change amount fits target float");
                let new_magnitude = (magnitude + delta).max(T::zero());
                if magnitude > T::zero() {
                    let scale = new_magnitude / magnitude;
                    Complex::new(z.re * scale, z.im * scale)
                } else {
                    Complex::new(new_magnitude, T::zero())
                }
            }
        };
        buf.set(idx, new_z);
    }
}

/// Computes a Tukey (tapered cosine) window of the given `length`, with
/// `smoothing` in `[0, 1]` controlling the taper fraction.
///
/// `smoothing = 0` yields a rectangular window (all ones). `smoothing = 1`
/// yields `w(0) = w(length-1) = 0` and `w(floor((length-1)/2)) = 1`. The
/// window is computed once for the half below the center and mirrored, with
/// a guard against double-writing the self-paired center index that arises
/// when the taper width exactly reaches the halfway point.
pub fn tukey_window(length: usize, smoothing: f64) -> Vec<f64> {
    let mut w = vec![1.0f64; length];
    if length <= 1 || smoothing <= 0.0 {
        return w;
    }
    let smoothing = smoothing.min(1.0);
    let taper_width = ((smoothing * length as f64) / 2.0).ceil() as usize;
    let halfway = (length - 1) / 2;
    let taper_width = if taper_width == halfway + 1 && length % 2 == 0 {
        halfway
    } else {
        taper_width
    };
    let taper_width = taper_width.clamp(1, length);

    for n in 0..taper_width.min(length) {
        let value = 0.5 * (1.0 - (std::f64::consts::PI * n as f64 / taper_width as f64).cos());
        let mirror = length - 1 - n;
        w[n] = value;
        w[mirror] = value;
    }
    w
}
