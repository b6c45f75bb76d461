//! Packed fixed-function state.
//!
//! A pipeline's depth/blend/cull/scissor/write-mask configuration is encoded
//! into a single `u64` with a fixed bit layout. The executor decides "did
//! anything relevant change since the last draw" with one XOR and per-field
//! mask tests instead of comparing every setting, which keeps the per-draw
//! hot path cheap.
//!
//! Layout:
//!
//! ```text
//! bit  0      depth test enabled
//! bit  1      multisampling enabled
//! bit  2      blending enabled
//! bit  3      depth write enabled
//! bits 4..8   color write mask (R, G, B, A)
//! bit  8      front face is clockwise
//! bit  9      scissor test enabled
//! bit 10      pipeline carries a viewport
//! bits 11..13 cull face (0 = no culling)
//! bits 13..16 color blend mode
//! bits 16..19 alpha blend mode
//! bits 19..23 color source blend function
//! bits 23..27 color destination blend function
//! bits 27..31 alpha source blend function
//! bits 31..35 alpha destination blend function
//! bits 35..39 depth compare function
//! ```
//!
//! The packed values are the abstract enum discriminants, never native API
//! constants, so the word is meaningful to any backend.

use bitflags::bitflags;

use crate::types::{
    BlendFunctions, BlendMode, ColorWriteSettings, CompareFunction, FaceDirection, FaceType,
    PipelineSettings,
};

bitflags! {
    /// Single-bit portion of the state word.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct StateFlags: u64 {
        const DEPTH_TEST = 1 << 0;
        const MULTISAMPLE = 1 << 1;
        const BLEND = 1 << 2;
        const DEPTH_WRITE = 1 << 3;
        const COLOR_WRITE_R = 1 << 4;
        const COLOR_WRITE_G = 1 << 5;
        const COLOR_WRITE_B = 1 << 6;
        const COLOR_WRITE_A = 1 << 7;
        const FRONT_FACE_CW = 1 << 8;
        const SCISSOR_TEST = 1 << 9;
        const VIEWPORT = 1 << 10;

        const COLOR_WRITE_MASK = Self::COLOR_WRITE_R.bits()
            | Self::COLOR_WRITE_G.bits()
            | Self::COLOR_WRITE_B.bits()
            | Self::COLOR_WRITE_A.bits();
    }
}

pub(crate) const CULL_FACE_SHIFT: u32 = 11;
pub(crate) const CULL_FACE_MASK: u64 = 0b11 << CULL_FACE_SHIFT;
pub(crate) const COLOR_BLEND_MODE_SHIFT: u32 = 13;
pub(crate) const COLOR_BLEND_MODE_MASK: u64 = 0b111 << COLOR_BLEND_MODE_SHIFT;
pub(crate) const ALPHA_BLEND_MODE_SHIFT: u32 = 16;
pub(crate) const ALPHA_BLEND_MODE_MASK: u64 = 0b111 << ALPHA_BLEND_MODE_SHIFT;
pub(crate) const COLOR_SRC_FUNC_SHIFT: u32 = 19;
pub(crate) const COLOR_SRC_FUNC_MASK: u64 = 0b1111 << COLOR_SRC_FUNC_SHIFT;
pub(crate) const COLOR_DEST_FUNC_SHIFT: u32 = 23;
pub(crate) const COLOR_DEST_FUNC_MASK: u64 = 0b1111 << COLOR_DEST_FUNC_SHIFT;
pub(crate) const ALPHA_SRC_FUNC_SHIFT: u32 = 27;
pub(crate) const ALPHA_SRC_FUNC_MASK: u64 = 0b1111 << ALPHA_SRC_FUNC_SHIFT;
pub(crate) const ALPHA_DEST_FUNC_SHIFT: u32 = 31;
pub(crate) const ALPHA_DEST_FUNC_MASK: u64 = 0b1111 << ALPHA_DEST_FUNC_SHIFT;
pub(crate) const DEPTH_FUNC_SHIFT: u32 = 35;
pub(crate) const DEPTH_FUNC_MASK: u64 = 0b1111 << DEPTH_FUNC_SHIFT;

pub(crate) const BLEND_MODE_MASKS: u64 = COLOR_BLEND_MODE_MASK | ALPHA_BLEND_MODE_MASK;
pub(crate) const BLEND_FUNC_MASKS: u64 =
    COLOR_SRC_FUNC_MASK | COLOR_DEST_FUNC_MASK | ALPHA_SRC_FUNC_MASK | ALPHA_DEST_FUNC_MASK;

/// The packed 64-bit encoding of a pipeline's fixed-function settings.
///
/// Two pipelines with equal words require zero state transitions between
/// consecutive draws.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct StateWord(u64);

impl StateWord {
    /// Pack pipeline settings into a state word. Pure and infallible.
    pub fn pack(settings: &PipelineSettings) -> Self {
        let mut flags = StateFlags::empty();
        flags.set(StateFlags::DEPTH_TEST, settings.depth_test);
        flags.set(StateFlags::MULTISAMPLE, settings.multisample);
        flags.set(StateFlags::BLEND, settings.blend.is_some());
        flags.set(StateFlags::DEPTH_WRITE, settings.depth_write);
        flags.set(StateFlags::COLOR_WRITE_R, settings.color_write.r);
        flags.set(StateFlags::COLOR_WRITE_G, settings.color_write.g);
        flags.set(StateFlags::COLOR_WRITE_B, settings.color_write.b);
        flags.set(StateFlags::COLOR_WRITE_A, settings.color_write.a);
        flags.set(
            StateFlags::FRONT_FACE_CW,
            settings.face_direction == FaceDirection::Clockwise,
        );
        flags.set(StateFlags::SCISSOR_TEST, settings.scissor.is_some());
        flags.set(
            StateFlags::VIEWPORT,
            settings.viewport.width > 0.0 && settings.viewport.height > 0.0,
        );

        let mut word = flags.bits();
        word |= field(settings.depth_function as u64, DEPTH_FUNC_SHIFT, DEPTH_FUNC_MASK);
        let cull = settings.cull_face.map_or(0, |f| f as u64);
        word |= field(cull, CULL_FACE_SHIFT, CULL_FACE_MASK);

        if let Some(blend) = &settings.blend {
            word |= field(
                blend.color_blend_mode as u64,
                COLOR_BLEND_MODE_SHIFT,
                COLOR_BLEND_MODE_MASK,
            );
            word |= field(
                blend.alpha_blend_mode as u64,
                ALPHA_BLEND_MODE_SHIFT,
                ALPHA_BLEND_MODE_MASK,
            );
            word |= field(
                blend.color_src_blend_function as u64,
                COLOR_SRC_FUNC_SHIFT,
                COLOR_SRC_FUNC_MASK,
            );
            word |= field(
                blend.color_dest_blend_function as u64,
                COLOR_DEST_FUNC_SHIFT,
                COLOR_DEST_FUNC_MASK,
            );
            word |= field(
                blend.alpha_src_blend_function as u64,
                ALPHA_SRC_FUNC_SHIFT,
                ALPHA_SRC_FUNC_MASK,
            );
            word |= field(
                blend.alpha_dest_blend_function as u64,
                ALPHA_DEST_FUNC_SHIFT,
                ALPHA_DEST_FUNC_MASK,
            );
        }

        Self(word)
    }

    /// Raw packed bits.
    pub fn bits(self) -> u64 {
        self.0
    }

    /// Bitwise XOR against another word; the result marks every changed
    /// flag and field.
    pub fn diff(self, other: Self) -> StateDiff {
        StateDiff(self.0 ^ other.0)
    }

    /// Whether all of `flags` are set.
    pub fn contains(self, flags: StateFlags) -> bool {
        self.0 & flags.bits() == flags.bits()
    }

    pub fn depth_function(self) -> CompareFunction {
        CompareFunction::from_index(extract(self.0, DEPTH_FUNC_SHIFT, DEPTH_FUNC_MASK))
    }

    /// `None` means culling is disabled.
    pub fn cull_face(self) -> Option<FaceType> {
        FaceType::from_index(extract(self.0, CULL_FACE_SHIFT, CULL_FACE_MASK))
    }

    /// `(color, alpha)` blend equations.
    pub fn blend_modes(self) -> (BlendMode, BlendMode) {
        (
            BlendMode::from_index(extract(self.0, COLOR_BLEND_MODE_SHIFT, COLOR_BLEND_MODE_MASK)),
            BlendMode::from_index(extract(self.0, ALPHA_BLEND_MODE_SHIFT, ALPHA_BLEND_MODE_MASK)),
        )
    }

    pub fn blend_functions(self) -> BlendFunctions {
        BlendFunctions {
            color_src: crate::types::BlendFunction::from_index(extract(
                self.0,
                COLOR_SRC_FUNC_SHIFT,
                COLOR_SRC_FUNC_MASK,
            )),
            color_dest: crate::types::BlendFunction::from_index(extract(
                self.0,
                COLOR_DEST_FUNC_SHIFT,
                COLOR_DEST_FUNC_MASK,
            )),
            alpha_src: crate::types::BlendFunction::from_index(extract(
                self.0,
                ALPHA_SRC_FUNC_SHIFT,
                ALPHA_SRC_FUNC_MASK,
            )),
            alpha_dest: crate::types::BlendFunction::from_index(extract(
                self.0,
                ALPHA_DEST_FUNC_SHIFT,
                ALPHA_DEST_FUNC_MASK,
            )),
        }
    }

    pub fn color_write(self) -> ColorWriteSettings {
        ColorWriteSettings {
            r: self.contains(StateFlags::COLOR_WRITE_R),
            g: self.contains(StateFlags::COLOR_WRITE_G),
            b: self.contains(StateFlags::COLOR_WRITE_B),
            a: self.contains(StateFlags::COLOR_WRITE_A),
        }
    }
}

/// Result of diffing two state words.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StateDiff(u64);

impl StateDiff {
    /// A diff that marks every flag and field as changed, used for the
    /// first draw of a frame.
    pub fn all() -> Self {
        Self(u64::MAX)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Whether any of the given single-bit flags changed.
    pub fn flag_changed(self, flags: StateFlags) -> bool {
        self.0 & flags.bits() != 0
    }

    /// Whether any bit of a multi-bit field changed.
    pub fn field_changed(self, mask: u64) -> bool {
        self.0 & mask != 0
    }
}

fn field(value: u64, shift: u32, mask: u64) -> u64 {
    (value << shift) & mask
}

fn extract(word: u64, shift: u32, mask: u64) -> u64 {
    (word & mask) >> shift
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BlendFunction, BlendSettings, PipelineSettings, Rect};
    use crate::ProgramId;

    fn base_settings() -> PipelineSettings {
        // The program handle is irrelevant to packing.
        PipelineSettings::new(ProgramId::dangling())
    }

    #[test]
    fn identical_settings_produce_identical_words() {
        let mut a = base_settings();
        a.depth_test = true;
        a.depth_function = CompareFunction::LessEqual;
        let mut b = base_settings();
        b.depth_test = true;
        b.depth_function = CompareFunction::LessEqual;

        let wa = StateWord::pack(&a);
        let wb = StateWord::pack(&b);
        assert_eq!(wa, wb);
        assert!(wa.diff(wb).is_empty());
    }

    #[test]
    fn depth_fields_round_trip() {
        let mut settings = base_settings();
        settings.depth_test = true;
        settings.depth_write = true;
        settings.depth_function = CompareFunction::GreaterEqual;

        let word = StateWord::pack(&settings);
        assert!(word.contains(StateFlags::DEPTH_TEST));
        assert!(word.contains(StateFlags::DEPTH_WRITE));
        assert_eq!(word.depth_function(), CompareFunction::GreaterEqual);
    }

    #[test]
    fn blend_fields_round_trip() {
        let mut settings = base_settings();
        let mut blend = BlendSettings::default();
        blend.set_blend_mode(BlendMode::ReverseSubtract);
        blend.set_blend_function(BlendFunction::SourceAlpha, BlendFunction::InverseSourceAlpha);
        settings.blend = Some(blend);

        let word = StateWord::pack(&settings);
        assert!(word.contains(StateFlags::BLEND));
        assert_eq!(
            word.blend_modes(),
            (BlendMode::ReverseSubtract, BlendMode::ReverseSubtract)
        );
        let funcs = word.blend_functions();
        assert_eq!(funcs.color_src, BlendFunction::SourceAlpha);
        assert_eq!(funcs.color_dest, BlendFunction::InverseSourceAlpha);
        assert_eq!(funcs.alpha_src, BlendFunction::SourceAlpha);
        assert_eq!(funcs.alpha_dest, BlendFunction::InverseSourceAlpha);
    }

    #[test]
    fn diff_isolates_the_changed_field() {
        let mut a = base_settings();
        a.depth_test = true;
        let mut b = base_settings();
        b.depth_test = true;
        b.blend = Some(BlendSettings::default());

        let diff = StateWord::pack(&a).diff(StateWord::pack(&b));
        assert!(diff.flag_changed(StateFlags::BLEND));
        assert!(!diff.flag_changed(StateFlags::DEPTH_TEST));
        assert!(!diff.field_changed(DEPTH_FUNC_MASK));
        // Default blend functions pack a nonzero source factor (One).
        assert!(diff.field_changed(BLEND_FUNC_MASKS));
    }

    #[test]
    fn cull_face_none_decodes_as_disabled() {
        let word = StateWord::pack(&base_settings());
        assert_eq!(word.cull_face(), None);

        let mut settings = base_settings();
        settings.cull_face = Some(FaceType::Back);
        assert_eq!(StateWord::pack(&settings).cull_face(), Some(FaceType::Back));
    }

    #[test]
    fn viewport_flag_tracks_nonempty_viewport() {
        let mut settings = base_settings();
        assert!(!StateWord::pack(&settings).contains(StateFlags::VIEWPORT));
        settings.viewport = Rect::new(0.0, 0.0, 800.0, 600.0);
        assert!(StateWord::pack(&settings).contains(StateFlags::VIEWPORT));
    }
}
