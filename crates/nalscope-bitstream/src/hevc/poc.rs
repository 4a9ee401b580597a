//! Picture order count derivation (H.265 8.3.1)
//!
//! The carry state between pictures lives in a [`DecodingOrderTracker`]
//! owned by one decoding session.

use super::nal::NalHeader;
use super::slice::SliceHeader;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum TrackerState {
    /// No picture seen since construction or the last reset
    AwaitingFirstUnit,
    Tracking,
}

/// Computed order of one picture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct PicOrder {
    pub pic_order_cnt_msb: i32,
    pub pic_order_cnt_val: i32,
}

#[derive(Debug, Clone)]
pub struct DecodingOrderTracker {
    state: TrackerState,
    prev_tid0_pic_order_cnt_lsb: i32,
    prev_tid0_pic_order_cnt_msb: i32,
    /// Set by an end of sequence unit until the next picture starts
    after_end_of_sequence: bool,
    /// Order of the picture the last slice belonged to
    current: Option<PicOrder>,
}

impl Default for DecodingOrderTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl DecodingOrderTracker {
    pub fn new() -> Self {
        Self {
            state: TrackerState::AwaitingFirstUnit,
            prev_tid0_pic_order_cnt_lsb: 0,
            prev_tid0_pic_order_cnt_msb: 0,
            after_end_of_sequence: false,
            current: None,
        }
    }

    /// Forget all carry state (new file)
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    pub fn current(&self) -> Option<PicOrder> {
        self.current
    }

    /// Forget the current picture, e.g. after its first slice failed to parse
    ///
    /// Later slice segments report no order until the next picture starts.
    /// The carry state from earlier pictures is kept.
    pub fn invalidate_current(&mut self) {
        self.current = None;
    }

    /// Record an end of sequence unit; the next IRAP picture restarts the count
    pub fn end_of_sequence(&mut self) {
        self.after_end_of_sequence = true;
    }

    /// Derive the order of the picture `header` belongs to
    ///
    /// Only the first slice segment of a picture advances the state; later
    /// segments return the order already computed for their picture.
    pub fn compute(
        &mut self,
        nal: &NalHeader,
        header: &SliceHeader,
        log2_max_pic_order_cnt_lsb: u32,
    ) -> Option<PicOrder> {
        if !header.first_slice_segment_in_pic_flag {
            return self.current;
        }
        let Some(lsb) = header.slice_pic_order_cnt_lsb else {
            self.current = None;
            return None;
        };
        let lsb = lsb as i32;
        let nal_type = nal.nal_unit_type;

        let no_rasl_output = nal_type.is_irap()
            && (nal_type.is_idr()
                || nal_type.is_bla()
                || self.state == TrackerState::AwaitingFirstUnit
                || self.after_end_of_sequence);

        let pic_order_cnt_msb = if no_rasl_output {
            0
        } else {
            let max_lsb = 1i32 << log2_max_pic_order_cnt_lsb;
            let prev_lsb = self.prev_tid0_pic_order_cnt_lsb;
            let prev_msb = self.prev_tid0_pic_order_cnt_msb;
            if lsb < prev_lsb && prev_lsb - lsb >= max_lsb / 2 {
                prev_msb + max_lsb
            } else if lsb > prev_lsb && lsb - prev_lsb > max_lsb / 2 {
                prev_msb - max_lsb
            } else {
                prev_msb
            }
        };

        let order = PicOrder {
            pic_order_cnt_msb,
            pic_order_cnt_val: pic_order_cnt_msb + lsb,
        };

        let updates_carry = nal.temporal_id() == 0
            && !nal_type.is_rasl()
            && !nal_type.is_radl()
            && !nal_type.is_sub_layer_non_reference();
        if updates_carry {
            self.prev_tid0_pic_order_cnt_lsb = lsb;
            self.prev_tid0_pic_order_cnt_msb = pic_order_cnt_msb;
        }

        self.state = TrackerState::Tracking;
        self.after_end_of_sequence = false;
        self.current = Some(order);
        Some(order)
    }
}
