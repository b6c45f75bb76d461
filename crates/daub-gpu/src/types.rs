//! Backend-agnostic value types shared by the recorder, executor and
//! backends: enums for fixed-function state, clear/pipeline/sampler settings
//! and vertex layout descriptions.

/// Scalar element type of vertex attribute data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataType {
    UInt8,
    Int8,
    UInt16,
    Int16,
    UInt32,
    Int32,
    Float32,
    Float64,
}

impl DataType {
    pub fn byte_count(self) -> u32 {
        match self {
            Self::UInt8 | Self::Int8 => 1,
            Self::UInt16 | Self::Int16 => 2,
            Self::UInt32 | Self::Int32 | Self::Float32 => 4,
            Self::Float64 => 8,
        }
    }
}

/// Draw topology of a mesh draw call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DrawMode {
    Triangles,
    TriangleStrip,
    TriangleFan,
    Points,
    Lines,
    LineStrip,
    LineLoop,
}

/// Depth comparison function.
///
/// The discriminants are packed into the pipeline state word, so they must
/// stay dense starting at zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompareFunction {
    Equal = 0,
    LessEqual = 1,
    GreaterEqual = 2,
    NotEqual = 3,
    Always = 4,
    Never = 5,
    Less = 6,
    Greater = 7,
}

impl CompareFunction {
    pub(crate) fn from_index(index: u64) -> Self {
        match index {
            0 => Self::Equal,
            1 => Self::LessEqual,
            2 => Self::GreaterEqual,
            3 => Self::NotEqual,
            4 => Self::Always,
            5 => Self::Never,
            6 => Self::Less,
            _ => Self::Greater,
        }
    }
}

/// Blend equation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlendMode {
    Add = 0,
    Subtract = 1,
    ReverseSubtract = 2,
    Min = 3,
    Max = 4,
}

impl BlendMode {
    pub(crate) fn from_index(index: u64) -> Self {
        match index {
            0 => Self::Add,
            1 => Self::Subtract,
            2 => Self::ReverseSubtract,
            3 => Self::Min,
            _ => Self::Max,
        }
    }
}

/// Blend factor for source/destination color and alpha.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlendFunction {
    Zero = 0,
    One = 1,
    SourceColor = 2,
    InverseSourceColor = 3,
    DestinationColor = 4,
    InverseDestinationColor = 5,
    SourceAlpha = 6,
    InverseSourceAlpha = 7,
    DestinationAlpha = 8,
    InverseDestinationAlpha = 9,
    ConstantColor = 10,
    InverseConstantColor = 11,
    ConstantAlpha = 12,
    InverseConstantAlpha = 13,
}

impl BlendFunction {
    pub(crate) fn from_index(index: u64) -> Self {
        match index {
            0 => Self::Zero,
            1 => Self::One,
            2 => Self::SourceColor,
            3 => Self::InverseSourceColor,
            4 => Self::DestinationColor,
            5 => Self::InverseDestinationColor,
            6 => Self::SourceAlpha,
            7 => Self::InverseSourceAlpha,
            8 => Self::DestinationAlpha,
            9 => Self::InverseDestinationAlpha,
            10 => Self::ConstantColor,
            11 => Self::InverseConstantColor,
            12 => Self::ConstantAlpha,
            _ => Self::InverseConstantAlpha,
        }
    }
}

/// Winding order that defines the front face of a triangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FaceDirection {
    Clockwise,
    CounterClockwise,
}

/// Which faces get culled when culling is enabled.
///
/// "Culling disabled" is expressed as `Option::<FaceType>::None`; the state
/// word reserves field value zero for it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FaceType {
    Front = 1,
    Back = 2,
    FrontAndBack = 3,
}

impl FaceType {
    pub(crate) fn from_index(index: u64) -> Option<Self> {
        match index {
            1 => Some(Self::Front),
            2 => Some(Self::Back),
            3 => Some(Self::FrontAndBack),
            _ => None,
        }
    }
}

/// Texture storage formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    R8,
    R16,
    R32,
    R16F,
    R32F,
    Rgb8,
    Rgb16,
    Rgb32,
    Rgb16F,
    Rgb32F,
    Bgr8,
    Bgr16,
    Bgr32,
    Bgr16F,
    Bgr32F,
    Rgba8,
    Rgba16,
    Rgba32,
    Rgba16F,
    Rgba32F,
    Bgra8,
    Bgra16,
    Bgra32,
    Bgra16F,
    Bgra32F,
    Depth16,
    Depth24,
    Depth32,
    Depth24Stencil8,
    Depth32F,
    Depth32FStencil8,
}

impl TextureFormat {
    /// Whether this is a color format (as opposed to depth/stencil).
    pub fn is_color(self) -> bool {
        !matches!(
            self,
            Self::Depth16
                | Self::Depth24
                | Self::Depth32
                | Self::Depth24Stencil8
                | Self::Depth32F
                | Self::Depth32FStencil8
        )
    }

    /// Whether this format carries a stencil component.
    pub fn has_stencil(self) -> bool {
        matches!(self, Self::Depth24Stencil8 | Self::Depth32FStencil8)
    }
}

/// Texture addressing mode outside the [0, 1] range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureWrap {
    Repeat,
    ClampToEdge,
    ClampToBorder,
}

/// Texture minification/magnification filtering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureFiltering {
    /// Works with and without mipmapping.
    Nearest,
    /// Works with and without mipmapping.
    Bilinear,
    /// Requires mipmapping.
    Trilinear,
}

/// Buffer usage hint forwarded to the backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    #[default]
    Static,
    Dynamic,
}

/// An axis-aligned rectangle in framebuffer coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// RGBA clear color.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ClearColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

/// Which buffers to clear, and with what values. Each component is
/// independently optional.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ClearSettings {
    pub color: Option<ClearColor>,
    pub depth: Option<f64>,
    pub stencil: Option<i32>,
}

impl ClearSettings {
    pub fn color(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self {
            color: Some(ClearColor { r, g, b, a }),
            depth: None,
            stencil: None,
        }
    }

    pub fn color_depth_stencil(color: ClearColor, depth: f64, stencil: i32) -> Self {
        Self {
            color: Some(color),
            depth: Some(depth),
            stencil: Some(stencil),
        }
    }
}

/// Blend equation + factors for the color and alpha channels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlendSettings {
    pub color_blend_mode: BlendMode,
    pub color_src_blend_function: BlendFunction,
    pub color_dest_blend_function: BlendFunction,
    pub alpha_blend_mode: BlendMode,
    pub alpha_src_blend_function: BlendFunction,
    pub alpha_dest_blend_function: BlendFunction,
}

impl Default for BlendSettings {
    fn default() -> Self {
        Self {
            color_blend_mode: BlendMode::Add,
            color_src_blend_function: BlendFunction::One,
            color_dest_blend_function: BlendFunction::Zero,
            alpha_blend_mode: BlendMode::Add,
            alpha_src_blend_function: BlendFunction::One,
            alpha_dest_blend_function: BlendFunction::Zero,
        }
    }
}

impl BlendSettings {
    /// Set the blend equation for color and alpha together.
    pub fn set_blend_mode(&mut self, mode: BlendMode) {
        self.color_blend_mode = mode;
        self.alpha_blend_mode = mode;
    }

    /// Set the blend factors for color and alpha together.
    pub fn set_blend_function(&mut self, src: BlendFunction, dest: BlendFunction) {
        self.color_src_blend_function = src;
        self.color_dest_blend_function = dest;
        self.alpha_src_blend_function = src;
        self.alpha_dest_blend_function = dest;
    }
}

/// The four source/destination blend factors applied by the device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlendFunctions {
    pub color_src: BlendFunction,
    pub color_dest: BlendFunction,
    pub alpha_src: BlendFunction,
    pub alpha_dest: BlendFunction,
}

/// Per-channel color write mask.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColorWriteSettings {
    pub r: bool,
    pub g: bool,
    pub b: bool,
    pub a: bool,
}

impl Default for ColorWriteSettings {
    fn default() -> Self {
        Self {
            r: true,
            g: true,
            b: true,
            a: true,
        }
    }
}

/// Full fixed-function configuration of a pipeline, captured at pipeline
/// creation and packed into a [`StateWord`](crate::state::StateWord).
///
/// A zero-area viewport means "inherit whatever viewport is current", and
/// `scissor: None` disables the scissor test.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineSettings {
    pub program: crate::resources::ProgramId,
    pub viewport: Rect,
    pub scissor: Option<Rect>,
    pub multisample: bool,
    pub depth_test: bool,
    pub depth_write: bool,
    pub depth_function: CompareFunction,
    pub color_write: ColorWriteSettings,
    pub blend: Option<BlendSettings>,
    pub face_direction: FaceDirection,
    pub cull_face: Option<FaceType>,
}

impl PipelineSettings {
    pub fn new(program: crate::resources::ProgramId) -> Self {
        Self {
            program,
            viewport: Rect::default(),
            scissor: None,
            multisample: false,
            depth_test: false,
            depth_write: true,
            depth_function: CompareFunction::Less,
            color_write: ColorWriteSettings::default(),
            blend: None,
            face_direction: FaceDirection::CounterClockwise,
            cull_face: None,
        }
    }
}

/// Sampler construction settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SamplerSettings {
    pub wrap_s: TextureWrap,
    pub wrap_t: TextureWrap,
    pub wrap_r: TextureWrap,
    pub filtering: TextureFiltering,
    pub mip_mapping: bool,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            wrap_s: TextureWrap::ClampToEdge,
            wrap_t: TextureWrap::ClampToEdge,
            wrap_r: TextureWrap::ClampToEdge,
            filtering: TextureFiltering::Bilinear,
            mip_mapping: false,
        }
    }
}

/// One attachment of a render target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttachmentSettings {
    pub format: TextureFormat,
    pub mipmap_level_count: u32,
}

/// Render target construction settings. Attachments are created in
/// declaration order; at most one may be a depth/stencil format.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderTargetSettings {
    pub width: u32,
    pub height: u32,
    pub sample_count: u32,
    pub attachments: Vec<AttachmentSettings>,
}

/// A pixel upload into a texture. `depth > 1` selects a 3D texture,
/// `height > 1` a 2D texture, otherwise 1D.
#[derive(Clone, Copy, Debug)]
pub struct TextureUpload<'a> {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub data: &'a [u8],
    pub data_type: DataType,
    pub format: TextureFormat,
    /// Row alignment of `data` in bytes.
    pub alignment: u32,
    pub mipmap_level_count: u32,
}

/// One vertex attribute within a [`VertexLayout`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VertexElement {
    pub data_type: DataType,
    pub element_count: u32,
    /// Byte offset of the first element; computed by [`VertexLayout::finish`].
    pub offset: u32,
    /// Byte offset between consecutive elements; computed by
    /// [`VertexLayout::finish`].
    pub stride: u32,
    /// Shader attribute location; computed by [`VertexLayout::finish`].
    pub location: u32,
}

/// Interleaved layout of one vertex buffer. Offsets, strides and locations
/// are derived from the declaration order of the elements.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VertexLayout {
    pub elements: Vec<VertexElement>,
}

impl VertexLayout {
    /// Build a layout from `(data type, component count)` pairs, computing
    /// offset/stride/location from declaration order.
    pub fn new(elements: &[(DataType, u32)]) -> Self {
        let mut layout = Self {
            elements: elements
                .iter()
                .map(|&(data_type, element_count)| VertexElement {
                    data_type,
                    element_count,
                    offset: 0,
                    stride: 0,
                    location: 0,
                })
                .collect(),
        };
        layout.finish();
        layout
    }

    /// Recompute offsets, strides and locations from declaration order.
    pub fn finish(&mut self) {
        let mut byte_offset = 0;
        let mut stride = 0;
        for (location, element) in self.elements.iter_mut().enumerate() {
            let size = element.element_count * element.data_type.byte_count();
            element.offset = byte_offset;
            element.location = location as u32;
            byte_offset += size;
            stride += size;
        }
        for element in &mut self.elements {
            element.stride = stride;
        }
    }
}
