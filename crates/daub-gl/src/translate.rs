//! Mappings from the frontend's abstract enums to GL constants.

use daub_gpu::{
    BlendFunction, BlendMode, BufferUsage, CompareFunction, DataType, DrawMode, FaceDirection,
    FaceType, TextureFiltering, TextureFormat, TextureWrap,
};

pub(crate) fn draw_mode(mode: DrawMode) -> u32 {
    match mode {
        DrawMode::Triangles => glow::TRIANGLES,
        DrawMode::TriangleStrip => glow::TRIANGLE_STRIP,
        DrawMode::TriangleFan => glow::TRIANGLE_FAN,
        DrawMode::Points => glow::POINTS,
        DrawMode::Lines => glow::LINES,
        DrawMode::LineStrip => glow::LINE_STRIP,
        DrawMode::LineLoop => glow::LINE_LOOP,
    }
}

pub(crate) fn compare_function(function: CompareFunction) -> u32 {
    match function {
        CompareFunction::Equal => glow::EQUAL,
        CompareFunction::LessEqual => glow::LEQUAL,
        CompareFunction::GreaterEqual => glow::GEQUAL,
        CompareFunction::NotEqual => glow::NOTEQUAL,
        CompareFunction::Always => glow::ALWAYS,
        CompareFunction::Never => glow::NEVER,
        CompareFunction::Less => glow::LESS,
        CompareFunction::Greater => glow::GREATER,
    }
}

pub(crate) fn blend_mode(mode: BlendMode) -> u32 {
    match mode {
        BlendMode::Add => glow::FUNC_ADD,
        BlendMode::Subtract => glow::FUNC_SUBTRACT,
        BlendMode::ReverseSubtract => glow::FUNC_REVERSE_SUBTRACT,
        BlendMode::Min => glow::MIN,
        BlendMode::Max => glow::MAX,
    }
}

pub(crate) fn blend_function(function: BlendFunction) -> u32 {
    match function {
        BlendFunction::Zero => glow::ZERO,
        BlendFunction::One => glow::ONE,
        BlendFunction::SourceColor => glow::SRC_COLOR,
        BlendFunction::InverseSourceColor => glow::ONE_MINUS_SRC_COLOR,
        BlendFunction::DestinationColor => glow::DST_COLOR,
        BlendFunction::InverseDestinationColor => glow::ONE_MINUS_DST_COLOR,
        BlendFunction::SourceAlpha => glow::SRC_ALPHA,
        BlendFunction::InverseSourceAlpha => glow::ONE_MINUS_SRC_ALPHA,
        BlendFunction::DestinationAlpha => glow::DST_ALPHA,
        BlendFunction::InverseDestinationAlpha => glow::ONE_MINUS_DST_ALPHA,
        BlendFunction::ConstantColor => glow::CONSTANT_COLOR,
        BlendFunction::InverseConstantColor => glow::ONE_MINUS_CONSTANT_COLOR,
        BlendFunction::ConstantAlpha => glow::CONSTANT_ALPHA,
        BlendFunction::InverseConstantAlpha => glow::ONE_MINUS_CONSTANT_ALPHA,
    }
}

pub(crate) fn face_direction(direction: FaceDirection) -> u32 {
    match direction {
        FaceDirection::Clockwise => glow::CW,
        FaceDirection::CounterClockwise => glow::CCW,
    }
}

pub(crate) fn face_type(face: FaceType) -> u32 {
    match face {
        FaceType::Front => glow::FRONT,
        FaceType::Back => glow::BACK,
        FaceType::FrontAndBack => glow::FRONT_AND_BACK,
    }
}

pub(crate) fn buffer_usage(usage: BufferUsage) -> u32 {
    match usage {
        BufferUsage::Static => glow::STATIC_DRAW,
        BufferUsage::Dynamic => glow::DYNAMIC_DRAW,
    }
}

pub(crate) fn data_type(data_type: DataType) -> u32 {
    match data_type {
        DataType::UInt8 => glow::UNSIGNED_BYTE,
        DataType::Int8 => glow::BYTE,
        DataType::UInt16 => glow::UNSIGNED_SHORT,
        DataType::Int16 => glow::SHORT,
        DataType::UInt32 => glow::UNSIGNED_INT,
        DataType::Int32 => glow::INT,
        DataType::Float32 => glow::FLOAT,
        DataType::Float64 => glow::DOUBLE,
    }
}

pub(crate) fn texture_wrap(wrap: TextureWrap) -> u32 {
    match wrap {
        TextureWrap::Repeat => glow::REPEAT,
        TextureWrap::ClampToEdge => glow::CLAMP_TO_EDGE,
        TextureWrap::ClampToBorder => glow::CLAMP_TO_BORDER,
    }
}

pub(crate) fn min_filter(filtering: TextureFiltering, mip_mapping: bool) -> u32 {
    match (filtering, mip_mapping) {
        (TextureFiltering::Nearest, false) => glow::NEAREST,
        (TextureFiltering::Nearest, true) => glow::NEAREST_MIPMAP_NEAREST,
        (TextureFiltering::Bilinear, false) => glow::LINEAR,
        (TextureFiltering::Bilinear, true) => glow::LINEAR_MIPMAP_NEAREST,
        // Trilinear is only meaningful with mipmaps.
        (TextureFiltering::Trilinear, _) => glow::LINEAR_MIPMAP_LINEAR,
    }
}

pub(crate) fn mag_filter(filtering: TextureFiltering) -> u32 {
    match filtering {
        TextureFiltering::Nearest => glow::NEAREST,
        TextureFiltering::Bilinear | TextureFiltering::Trilinear => glow::LINEAR,
    }
}

/// `(internal format, pixel format)` for a texture format.
pub(crate) fn texture_format(format: TextureFormat) -> (u32, u32) {
    match format {
        TextureFormat::R8 => (glow::R8, glow::RED),
        TextureFormat::R16 => (glow::R16, glow::RED),
        TextureFormat::R32 => (glow::R32UI, glow::RED_INTEGER),
        TextureFormat::R16F => (glow::R16F, glow::RED),
        TextureFormat::R32F => (glow::R32F, glow::RED),
        TextureFormat::Rgb8 => (glow::RGB8, glow::RGB),
        TextureFormat::Rgb16 => (glow::RGB16, glow::RGB),
        TextureFormat::Rgb32 => (glow::RGB32UI, glow::RGB_INTEGER),
        TextureFormat::Rgb16F => (glow::RGB16F, glow::RGB),
        TextureFormat::Rgb32F => (glow::RGB32F, glow::RGB),
        TextureFormat::Bgr8 => (glow::RGB8, glow::BGR),
        TextureFormat::Bgr16 => (glow::RGB16, glow::BGR),
        TextureFormat::Bgr32 => (glow::RGB32UI, glow::BGR_INTEGER),
        TextureFormat::Bgr16F => (glow::RGB16F, glow::BGR),
        TextureFormat::Bgr32F => (glow::RGB32F, glow::BGR),
        TextureFormat::Rgba8 => (glow::RGBA8, glow::RGBA),
        TextureFormat::Rgba16 => (glow::RGBA16, glow::RGBA),
        TextureFormat::Rgba32 => (glow::RGBA32UI, glow::RGBA_INTEGER),
        TextureFormat::Rgba16F => (glow::RGBA16F, glow::RGBA),
        TextureFormat::Rgba32F => (glow::RGBA32F, glow::RGBA),
        TextureFormat::Bgra8 => (glow::RGBA8, glow::BGRA),
        TextureFormat::Bgra16 => (glow::RGBA16, glow::BGRA),
        TextureFormat::Bgra32 => (glow::RGBA32UI, glow::BGRA_INTEGER),
        TextureFormat::Bgra16F => (glow::RGBA16F, glow::BGRA),
        TextureFormat::Bgra32F => (glow::RGBA32F, glow::BGRA),
        TextureFormat::Depth16 => (glow::DEPTH_COMPONENT16, glow::DEPTH_COMPONENT),
        TextureFormat::Depth24 => (glow::DEPTH_COMPONENT24, glow::DEPTH_COMPONENT),
        TextureFormat::Depth32 => (glow::DEPTH_COMPONENT32, glow::DEPTH_COMPONENT),
        TextureFormat::Depth24Stencil8 => (glow::DEPTH24_STENCIL8, glow::DEPTH_STENCIL),
        TextureFormat::Depth32F => (glow::DEPTH_COMPONENT32F, glow::DEPTH_COMPONENT),
        TextureFormat::Depth32FStencil8 => (glow::DEPTH32F_STENCIL8, glow::DEPTH_STENCIL),
    }
}

/// Default pixel transfer type used when allocating attachment storage.
pub(crate) fn attachment_transfer_type(format: TextureFormat) -> u32 {
    match format {
        TextureFormat::Depth24Stencil8 => glow::UNSIGNED_INT_24_8,
        TextureFormat::Depth32FStencil8 => glow::FLOAT_32_UNSIGNED_INT_24_8_REV,
        TextureFormat::Depth16 | TextureFormat::Depth24 | TextureFormat::Depth32 => {
            glow::UNSIGNED_INT
        }
        TextureFormat::Depth32F => glow::FLOAT,
        TextureFormat::R16F
        | TextureFormat::R32F
        | TextureFormat::Rgb16F
        | TextureFormat::Rgb32F
        | TextureFormat::Bgr16F
        | TextureFormat::Bgr32F
        | TextureFormat::Rgba16F
        | TextureFormat::Rgba32F
        | TextureFormat::Bgra16F
        | TextureFormat::Bgra32F => glow::FLOAT,
        _ => glow::UNSIGNED_BYTE,
    }
}

pub(crate) fn attachment_point(format: TextureFormat, color_index: u32) -> u32 {
    if format.is_color() {
        glow::COLOR_ATTACHMENT0 + color_index
    } else if format.has_stencil() {
        glow::DEPTH_STENCIL_ATTACHMENT
    } else {
        glow::DEPTH_ATTACHMENT
    }
}
