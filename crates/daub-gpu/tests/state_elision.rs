//! Playback must only issue the fixed-function calls whose packed state
//! bits actually changed between consecutive draws.

mod common;

use common::{device_with_mesh, DeviceCall};
use daub_gpu::{
    BlendFunction, BlendMode, BlendSettings, CompareFunction, PipelineSettings, Rect,
};
use pretty_assertions::assert_eq;

#[test]
fn repeat_draws_with_one_pipeline_bind_once() {
    let (mut device, program, mesh) = device_with_mesh();
    let mut settings = PipelineSettings::new(program);
    settings.depth_test = true;
    let pipeline = device.create_pipeline(settings).unwrap();

    device.begin_frame();
    let pass = device.begin_pass(None);
    device.draw(pass, mesh, pipeline, 0, 3);
    device.draw(pass, mesh, pipeline, 3, 3);
    device.draw(pass, mesh, pipeline, 6, 3);
    device.end_pass(pass);
    let metrics = device.end_frame().unwrap();

    assert_eq!(metrics.draw_calls, 3);
    assert_eq!(metrics.program_binds, 1);

    let calls = device.backend_mut().take_calls();
    let program_binds = calls
        .iter()
        .filter(|c| matches!(c, DeviceCall::BindProgram(_)))
        .count();
    let mesh_binds = calls
        .iter()
        .filter(|c| matches!(c, DeviceCall::BindMesh(_)))
        .count();
    assert_eq!(program_binds, 1);
    assert_eq!(mesh_binds, 1);
    // The second and third draw must not re-issue any state.
    let depth_calls = calls
        .iter()
        .filter(|c| matches!(c, DeviceCall::SetDepthTest(_)))
        .count();
    assert_eq!(depth_calls, 1);
}

#[test]
fn switching_pipelines_only_emits_the_difference() {
    let (mut device, program, mesh) = device_with_mesh();
    let mut opaque = PipelineSettings::new(program);
    opaque.depth_test = true;
    opaque.depth_function = CompareFunction::LessEqual;
    let mut translucent = opaque.clone();
    let mut blend = BlendSettings::default();
    blend.set_blend_mode(BlendMode::Add);
    blend.set_blend_function(BlendFunction::SourceAlpha, BlendFunction::InverseSourceAlpha);
    translucent.blend = Some(blend);

    let opaque = device.create_pipeline(opaque).unwrap();
    let translucent = device.create_pipeline(translucent).unwrap();

    device.begin_frame();
    let pass = device.begin_pass(None);
    device.draw(pass, mesh, opaque, 0, 3);
    device.end_pass(pass);
    device.end_frame().unwrap();
    device.backend_mut().take_calls();

    device.begin_frame();
    let pass = device.begin_pass(None);
    device.draw(pass, mesh, opaque, 0, 3);
    device.draw(pass, mesh, translucent, 0, 3);
    device.end_pass(pass);
    device.end_frame().unwrap();

    let calls = device.backend_mut().take_calls();
    // Between the two draws only the blend group may change: enable plus
    // modes plus functions. Depth state is identical in both pipelines.
    let second_draw_start = calls
        .iter()
        .position(|c| matches!(c, DeviceCall::DrawArrays { .. }))
        .unwrap()
        + 1;
    let between: Vec<_> = calls[second_draw_start..]
        .iter()
        .take_while(|c| !matches!(c, DeviceCall::DrawArrays { .. }))
        .collect();
    assert!(between
        .iter()
        .all(|c| matches!(
            c,
            DeviceCall::SetBlend(_)
                | DeviceCall::SetBlendModes(..)
                | DeviceCall::SetBlendFunctions(_)
        )));
    assert!(between.contains(&&DeviceCall::SetBlend(true)));
    assert!(!between.is_empty());
}

#[test]
fn state_memo_survives_pass_boundaries() {
    let (mut device, program, mesh) = device_with_mesh();
    let mut settings = PipelineSettings::new(program);
    settings.depth_test = true;
    let pipeline = device.create_pipeline(settings).unwrap();

    device.begin_frame();
    let first = device.begin_pass(None);
    device.draw(first, mesh, pipeline, 0, 3);
    device.end_pass(first);
    let second = device.begin_pass(None);
    device.draw(second, mesh, pipeline, 0, 3);
    device.end_pass(second);
    let metrics = device.end_frame().unwrap();

    // The second pass's draw reuses everything from the first.
    assert_eq!(metrics.program_binds, 1);
    let calls = device.backend_mut().take_calls();
    let depth_calls = calls
        .iter()
        .filter(|c| matches!(c, DeviceCall::SetDepthTest(_)))
        .count();
    assert_eq!(depth_calls, 1);
}

#[test]
fn pipeline_viewport_is_applied_and_elided() {
    let (mut device, program, mesh) = device_with_mesh();
    let mut settings = PipelineSettings::new(program);
    settings.viewport = Rect::new(0.0, 0.0, 640.0, 480.0);
    let pipeline = device.create_pipeline(settings).unwrap();

    device.begin_frame();
    let pass = device.begin_pass(None);
    device.draw(pass, mesh, pipeline, 0, 3);
    device.draw(pass, mesh, pipeline, 0, 3);
    device.end_pass(pass);
    device.end_frame().unwrap();

    let calls = device.backend_mut().take_calls();
    let viewports: Vec<_> = calls
        .iter()
        .filter(|c| matches!(c, DeviceCall::SetViewport(_)))
        .collect();
    assert_eq!(
        viewports,
        vec![&DeviceCall::SetViewport(Rect::new(0.0, 0.0, 640.0, 480.0))]
    );
}

#[test]
fn explicit_viewport_command_updates_the_memo() {
    let (mut device, program, mesh) = device_with_mesh();
    let mut settings = PipelineSettings::new(program);
    settings.viewport = Rect::new(0.0, 0.0, 640.0, 480.0);
    let pipeline = device.create_pipeline(settings).unwrap();

    device.begin_frame();
    let pass = device.begin_pass(None);
    device.set_viewport(pass, Rect::new(0.0, 0.0, 640.0, 480.0));
    device.draw(pass, mesh, pipeline, 0, 3);
    device.end_pass(pass);
    device.end_frame().unwrap();

    // The draw's pipeline viewport matches the explicit command, so it is
    // issued exactly once.
    let calls = device.backend_mut().take_calls();
    let viewport_calls = calls
        .iter()
        .filter(|c| matches!(c, DeviceCall::SetViewport(_)))
        .count();
    assert_eq!(viewport_calls, 1);
}
