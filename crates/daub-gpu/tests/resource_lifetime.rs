//! Handle lifetimes, destruction ordering and multisample resolve
//! tracking.

mod common;

use common::{DeviceCall, MockBackend};
use daub_gpu::{
    AttachmentSettings, BufferUsage, ClearSettings, DataType, DestroyAttachments, DeviceConfig,
    GpuError, PipelineSettings, ProgramReflection, RenderDevice, RenderTargetSettings,
    SamplerSettings, TextureBinding, TextureFormat, TextureUpload, VertexLayout,
};
use pretty_assertions::assert_eq;

fn sampling_reflection() -> ProgramReflection {
    ProgramReflection {
        blocks: Vec::new(),
        textures: vec![TextureBinding {
            name: "source".into(),
            slot: 0,
        }],
    }
}

fn msaa_target_settings() -> RenderTargetSettings {
    RenderTargetSettings {
        width: 128,
        height: 128,
        sample_count: 4,
        attachments: vec![
            AttachmentSettings {
                format: TextureFormat::Rgba8,
                mipmap_level_count: 1,
            },
            AttachmentSettings {
                format: TextureFormat::Depth24,
                mipmap_level_count: 1,
            },
        ],
    }
}

#[test]
fn destroying_a_referenced_program_fails() {
    let mut device = RenderDevice::new(MockBackend::new(), DeviceConfig::default()).unwrap();
    let program = device.create_program("vs", "fs").unwrap();
    let pipeline = device
        .create_pipeline(PipelineSettings::new(program))
        .unwrap();

    assert!(matches!(
        device.destroy_program(program),
        Err(GpuError::ProgramInUse)
    ));

    device.destroy_pipeline(pipeline);
    assert!(device.destroy_program(program).is_ok());
    assert!(matches!(
        device.destroy_program(program),
        Err(GpuError::StaleHandle { .. })
    ));
}

#[test]
fn stale_pipeline_fails_at_playback() {
    let mut device = RenderDevice::new(MockBackend::new(), DeviceConfig::default()).unwrap();
    let program = device.create_program("vs", "fs").unwrap();
    let vertices = device
        .create_vertex_buffer(&[0u8; 36], BufferUsage::Static)
        .unwrap();
    let mesh = device
        .create_mesh(
            &[(vertices, VertexLayout::new(&[(DataType::Float32, 3)]))],
            None,
        )
        .unwrap();
    let pipeline = device
        .create_pipeline(PipelineSettings::new(program))
        .unwrap();

    device.begin_frame();
    let pass = device.begin_pass(None);
    device.draw(pass, mesh, pipeline, 0, 3);
    device.end_pass(pass);
    // Destroyed after recording but before playback.
    device.destroy_pipeline(pipeline);
    let err = device.end_frame().unwrap_err();
    assert!(matches!(err, GpuError::StaleHandle { kind: "pipeline" }));
}

#[test]
fn handles_stay_stale_after_slot_reuse() {
    let mut device = RenderDevice::new(MockBackend::new(), DeviceConfig::default()).unwrap();
    let first = device
        .create_vertex_buffer(&[0u8; 16], BufferUsage::Static)
        .unwrap();
    device.destroy_vertex_buffer(first);
    let second = device
        .create_vertex_buffer(&[0u8; 16], BufferUsage::Static)
        .unwrap();
    assert_ne!(first, second);
    assert!(device.create_mesh(&[(first, VertexLayout::default())], None).is_err());
    assert!(device.create_mesh(&[(second, VertexLayout::default())], None).is_ok());
}

#[test]
fn sampling_a_msaa_attachment_resolves_once() {
    let mut backend = MockBackend::new();
    backend.reflections.push(sampling_reflection());
    let mut device = RenderDevice::new(backend, DeviceConfig::default()).unwrap();
    let program = device.create_program("vs", "fs").unwrap();
    let vertices = device
        .create_vertex_buffer(&[0u8; 36], BufferUsage::Static)
        .unwrap();
    let mesh = device
        .create_mesh(
            &[(vertices, VertexLayout::new(&[(DataType::Float32, 3)]))],
            None,
        )
        .unwrap();
    let target = device.create_render_target(&msaa_target_settings()).unwrap();
    let color = device.render_target_texture(target, 0).unwrap();

    let pipeline = device
        .create_pipeline(PipelineSettings::new(program))
        .unwrap();
    let slot = device.texture_slot(pipeline, "source").unwrap();
    device.set_texture(slot, Some(color), None);

    device.begin_frame();
    let offscreen = device.begin_pass(Some(target));
    device.clear(offscreen, ClearSettings::color(0.0, 0.0, 0.0, 1.0));
    device.end_pass(offscreen);
    let screen = device.begin_pass(None);
    device.draw(screen, mesh, pipeline, 0, 3);
    device.draw(screen, mesh, pipeline, 0, 3);
    device.end_pass(screen);
    let metrics = device.end_frame().unwrap();

    // One resolve for the first sample, none for the second draw.
    assert_eq!(metrics.resolves, 1);
    let calls = device.backend_mut().take_calls();
    let resolves = calls
        .iter()
        .filter(|c| matches!(c, DeviceCall::Resolve { .. }))
        .count();
    assert_eq!(resolves, 1);
    // The resolve happens before the texture bind, and the screen target is
    // rebound in between.
    let resolve_at = calls
        .iter()
        .position(|c| matches!(c, DeviceCall::Resolve { .. }))
        .unwrap();
    let bind_at = calls
        .iter()
        .position(|c| matches!(c, DeviceCall::BindTexture { .. }))
        .unwrap();
    assert!(resolve_at < bind_at);
    assert_eq!(calls[resolve_at + 1], DeviceCall::BindRenderTarget(None));

    // A frame that does not render into the target again needs no resolve.
    device.begin_frame();
    let screen = device.begin_pass(None);
    device.draw(screen, mesh, pipeline, 0, 3);
    device.end_pass(screen);
    let metrics = device.end_frame().unwrap();
    assert_eq!(metrics.resolves, 0);
}

fn small_texture_upload(data: &[u8]) -> TextureUpload<'_> {
    TextureUpload {
        width: 2,
        height: 2,
        depth: 1,
        data,
        data_type: DataType::UInt8,
        format: TextureFormat::Rgba8,
        alignment: 4,
        mipmap_level_count: 1,
    }
}

#[test]
fn destroyed_textures_read_as_unbound_slots() {
    let mut backend = MockBackend::new();
    backend.reflections.push(sampling_reflection());
    let mut device = RenderDevice::new(backend, DeviceConfig::default()).unwrap();
    let program = device.create_program("vs", "fs").unwrap();
    let vertices = device
        .create_vertex_buffer(&[0u8; 36], BufferUsage::Static)
        .unwrap();
    let mesh = device
        .create_mesh(
            &[(vertices, VertexLayout::new(&[(DataType::Float32, 3)]))],
            None,
        )
        .unwrap();
    let texture = device.create_texture(&small_texture_upload(&[0u8; 16])).unwrap();
    let pipeline = device
        .create_pipeline(PipelineSettings::new(program))
        .unwrap();
    let slot = device.texture_slot(pipeline, "source").unwrap();
    device.set_texture(slot, Some(texture), None);
    device.destroy_texture(texture);

    device.begin_frame();
    let pass = device.begin_pass(None);
    device.draw(pass, mesh, pipeline, 0, 3);
    device.end_pass(pass);
    let metrics = device.end_frame().unwrap();

    // The slot reads as unbound; the draw itself still goes out.
    assert_eq!(metrics.draw_calls, 1);
    assert_eq!(metrics.texture_binds, 0);
    let calls = device.backend_mut().take_calls();
    assert!(!calls.iter().any(|c| matches!(c, DeviceCall::BindTexture { .. })));
    assert!(calls.iter().any(|c| matches!(c, DeviceCall::DrawArrays { .. })));
}

#[test]
fn destroyed_samplers_fall_back_to_default_sampling() {
    let mut backend = MockBackend::new();
    backend.reflections.push(sampling_reflection());
    let mut device = RenderDevice::new(backend, DeviceConfig::default()).unwrap();
    let program = device.create_program("vs", "fs").unwrap();
    let vertices = device
        .create_vertex_buffer(&[0u8; 36], BufferUsage::Static)
        .unwrap();
    let mesh = device
        .create_mesh(
            &[(vertices, VertexLayout::new(&[(DataType::Float32, 3)]))],
            None,
        )
        .unwrap();
    let texture = device.create_texture(&small_texture_upload(&[0u8; 16])).unwrap();
    let sampler = device.create_sampler(&SamplerSettings::default()).unwrap();
    let pipeline = device
        .create_pipeline(PipelineSettings::new(program))
        .unwrap();
    let slot = device.texture_slot(pipeline, "source").unwrap();
    device.set_texture(slot, Some(texture), Some(sampler));
    device.destroy_sampler(sampler);

    device.begin_frame();
    let pass = device.begin_pass(None);
    device.draw(pass, mesh, pipeline, 0, 3);
    device.end_pass(pass);
    device.end_frame().unwrap();

    // The texture is still bound, with no sampler object.
    let calls = device.backend_mut().take_calls();
    assert!(calls
        .iter()
        .any(|c| matches!(c, DeviceCall::BindTexture { sampler: None, .. })));
}

#[test]
fn dropping_the_device_releases_native_resources() {
    let backend = MockBackend::new();
    let destroyed = backend.destroyed.clone();
    let mut device = RenderDevice::new(backend, DeviceConfig::default()).unwrap();
    let _program = device.create_program("vs", "fs").unwrap();
    let _vertices = device
        .create_vertex_buffer(&[0u8; 16], BufferUsage::Static)
        .unwrap();
    let _target = device
        .create_render_target(&RenderTargetSettings {
            width: 32,
            height: 32,
            sample_count: 1,
            attachments: vec![AttachmentSettings {
                format: TextureFormat::Rgba8,
                mipmap_level_count: 1,
            }],
        })
        .unwrap();
    drop(device);

    // Program, vertex buffer, uniform arena buffer, framebuffer and its
    // attachment texture.
    assert_eq!(destroyed.borrow().len(), 5);
}

#[test]
fn detached_attachments_survive_their_render_target() {
    let mut backend = MockBackend::new();
    backend.reflections.push(sampling_reflection());
    let mut device = RenderDevice::new(backend, DeviceConfig::default()).unwrap();
    let program = device.create_program("vs", "fs").unwrap();
    let target = device
        .create_render_target(&RenderTargetSettings {
            width: 32,
            height: 32,
            sample_count: 1,
            attachments: vec![AttachmentSettings {
                format: TextureFormat::Rgba8,
                mipmap_level_count: 1,
            }],
        })
        .unwrap();
    let color = device.render_target_texture(target, 0).unwrap();

    device.destroy_render_target(target, DestroyAttachments::Detach);

    // The texture is now an ordinary texture and can still be bound.
    let pipeline = device
        .create_pipeline(PipelineSettings::new(program))
        .unwrap();
    let slot = device.texture_slot(pipeline, "source").unwrap();
    device.set_texture(slot, Some(color), None);
    device.destroy_texture(color);
}

#[test]
fn destroyed_attachments_go_stale_with_their_render_target() {
    let mut device = RenderDevice::new(MockBackend::new(), DeviceConfig::default()).unwrap();
    let target = device
        .create_render_target(&RenderTargetSettings {
            width: 32,
            height: 32,
            sample_count: 1,
            attachments: vec![AttachmentSettings {
                format: TextureFormat::Rgba8,
                mipmap_level_count: 1,
            }],
        })
        .unwrap();
    device.destroy_render_target(target, DestroyAttachments::Destroy);
    assert!(device.render_target_texture(target, 0).is_none());
}
