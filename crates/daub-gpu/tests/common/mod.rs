//! A recording backend for playback tests.
//!
//! Every call the executor issues is appended to `calls`, so tests can
//! assert exactly which transitions survived elision.

use std::cell::RefCell;
use std::rc::Rc;

use daub_gpu::{
    BackendCapabilities, BlendFunctions, BlendMode, BufferUsage, ClearSettings,
    ColorWriteSettings, CompareFunction, CompiledProgram, DataType, DrawMode, FaceDirection,
    FaceType, GpuBackend, GpuError, MeshBufferDesc, NativeAttachment, NativeRenderTarget,
    ProgramReflection, RawId, ReadRegion, Rect, RenderTargetSettings, ResolveRequest,
    SamplerSettings, TextureFormat, TextureUpload,
};

#[derive(Clone, Debug, PartialEq)]
pub enum DeviceCall {
    BindProgram(RawId),
    BindMesh(RawId),
    BindRenderTarget(Option<RawId>),
    BindUniformRange {
        binding_point: u32,
        byte_offset: usize,
        byte_count: usize,
    },
    BindTexture {
        slot: u32,
        texture: RawId,
        sampler: Option<RawId>,
    },
    UploadUniforms(Vec<u8>),
    Clear(ClearSettings),
    SetViewport(Rect),
    SetScissor(Option<Rect>),
    SetDepthTest(bool),
    SetDepthWrite(bool),
    SetDepthFunction(CompareFunction),
    SetMultisample(bool),
    SetBlend(bool),
    SetBlendModes(BlendMode, BlendMode),
    SetBlendFunctions(BlendFunctions),
    SetColorWrite(ColorWriteSettings),
    SetFrontFace(FaceDirection),
    SetCullFace(Option<FaceType>),
    DrawArrays {
        mode: DrawMode,
        first: i32,
        count: i32,
    },
    DrawIndexed {
        mode: DrawMode,
        first: i32,
        count: i32,
        base_vertex: i32,
    },
    Resolve {
        msaa_fbo: RawId,
        fbo: RawId,
    },
    Marker(&'static str),
}

#[derive(Default)]
pub struct MockBackend {
    pub calls: Vec<DeviceCall>,
    next_raw: u64,
    /// Reflections handed out by `create_program`, oldest first. Empty
    /// reflection when exhausted.
    pub reflections: Vec<ProgramReflection>,
    /// Every raw id passed to a destroy call, shared so tests can observe
    /// teardown after the device itself is gone.
    pub destroyed: Rc<RefCell<Vec<RawId>>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take_calls(&mut self) -> Vec<DeviceCall> {
        std::mem::take(&mut self.calls)
    }

    /// Record a marker from inside a custom draw.
    pub fn mark(&mut self, label: &'static str) {
        self.calls.push(DeviceCall::Marker(label));
    }

    fn mint(&mut self) -> RawId {
        self.next_raw += 1;
        RawId(self.next_raw)
    }
}

impl GpuBackend for MockBackend {
    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            uniform_offset_alignment: 256,
            max_sample_count: 8,
        }
    }

    fn create_program(
        &mut self,
        _vertex_source: &str,
        _fragment_source: &str,
    ) -> Result<CompiledProgram, GpuError> {
        let reflection = if self.reflections.is_empty() {
            ProgramReflection::default()
        } else {
            self.reflections.remove(0)
        };
        Ok(CompiledProgram {
            raw: self.mint(),
            reflection,
        })
    }

    fn destroy_program(&mut self, raw: RawId) {
        self.destroyed.borrow_mut().push(raw);
    }

    fn bind_program(&mut self, raw: RawId) {
        self.calls.push(DeviceCall::BindProgram(raw));
    }

    fn create_vertex_buffer(
        &mut self,
        _data: &[u8],
        _usage: BufferUsage,
    ) -> Result<RawId, GpuError> {
        Ok(self.mint())
    }

    fn update_vertex_buffer(&mut self, _raw: RawId, _byte_offset: usize, _data: &[u8]) {}

    fn create_index_buffer(&mut self, _data: &[u32], _usage: BufferUsage) -> Result<RawId, GpuError> {
        Ok(self.mint())
    }

    fn update_index_buffer(&mut self, _raw: RawId, _index_offset: usize, _data: &[u32]) {}

    fn destroy_buffer(&mut self, raw: RawId) {
        self.destroyed.borrow_mut().push(raw);
    }

    fn create_mesh(&mut self, _desc: &MeshBufferDesc<'_>) -> Result<RawId, GpuError> {
        Ok(self.mint())
    }

    fn destroy_mesh(&mut self, raw: RawId) {
        self.destroyed.borrow_mut().push(raw);
    }

    fn bind_mesh(&mut self, raw: RawId) {
        self.calls.push(DeviceCall::BindMesh(raw));
    }

    fn create_uniform_buffer(&mut self, _byte_count: usize) -> Result<RawId, GpuError> {
        Ok(self.mint())
    }

    fn upload_uniforms(&mut self, _raw: RawId, data: &[u8]) {
        self.calls.push(DeviceCall::UploadUniforms(data.to_vec()));
    }

    fn bind_uniform_range(
        &mut self,
        _raw: RawId,
        binding_point: u32,
        byte_offset: usize,
        byte_count: usize,
    ) {
        self.calls.push(DeviceCall::BindUniformRange {
            binding_point,
            byte_offset,
            byte_count,
        });
    }

    fn create_texture(&mut self, _upload: &TextureUpload<'_>) -> Result<RawId, GpuError> {
        Ok(self.mint())
    }

    fn destroy_texture(&mut self, raw: RawId) {
        self.destroyed.borrow_mut().push(raw);
    }

    fn create_sampler(&mut self, _settings: &SamplerSettings) -> Result<RawId, GpuError> {
        Ok(self.mint())
    }

    fn destroy_sampler(&mut self, raw: RawId) {
        self.destroyed.borrow_mut().push(raw);
    }

    fn bind_texture(&mut self, slot: u32, texture: RawId, sampler: Option<RawId>) {
        self.calls.push(DeviceCall::BindTexture {
            slot,
            texture,
            sampler,
        });
    }

    fn create_render_target(
        &mut self,
        settings: &RenderTargetSettings,
    ) -> Result<NativeRenderTarget, GpuError> {
        let fbo = self.mint();
        let msaa_fbo = (settings.sample_count > 1).then(|| self.mint());
        let attachments = settings
            .attachments
            .iter()
            .map(|attachment| NativeAttachment {
                texture: self.mint(),
                format: attachment.format,
            })
            .collect();
        Ok(NativeRenderTarget {
            fbo,
            msaa_fbo,
            attachments,
        })
    }

    fn destroy_render_target(&mut self, fbo: RawId, msaa_fbo: Option<RawId>) {
        let mut destroyed = self.destroyed.borrow_mut();
        destroyed.push(fbo);
        destroyed.extend(msaa_fbo);
    }

    fn bind_render_target(&mut self, fbo: Option<RawId>, _color_attachments: u32) {
        self.calls.push(DeviceCall::BindRenderTarget(fbo));
    }

    fn resolve_render_target(&mut self, request: &ResolveRequest) {
        self.calls.push(DeviceCall::Resolve {
            msaa_fbo: request.msaa_fbo,
            fbo: request.fbo,
        });
    }

    fn read_pixels(
        &mut self,
        _fbo: Option<RawId>,
        _region: ReadRegion,
        _format: TextureFormat,
        _data_type: DataType,
        out: &mut [u8],
    ) -> Result<(), GpuError> {
        out.fill(0);
        Ok(())
    }

    fn set_viewport(&mut self, rect: Rect) {
        self.calls.push(DeviceCall::SetViewport(rect));
    }

    fn set_scissor(&mut self, rect: Option<Rect>) {
        self.calls.push(DeviceCall::SetScissor(rect));
    }

    fn set_depth_test(&mut self, enabled: bool) {
        self.calls.push(DeviceCall::SetDepthTest(enabled));
    }

    fn set_depth_write(&mut self, enabled: bool) {
        self.calls.push(DeviceCall::SetDepthWrite(enabled));
    }

    fn set_depth_function(&mut self, function: CompareFunction) {
        self.calls.push(DeviceCall::SetDepthFunction(function));
    }

    fn set_multisample(&mut self, enabled: bool) {
        self.calls.push(DeviceCall::SetMultisample(enabled));
    }

    fn set_blend(&mut self, enabled: bool) {
        self.calls.push(DeviceCall::SetBlend(enabled));
    }

    fn set_blend_modes(&mut self, color: BlendMode, alpha: BlendMode) {
        self.calls.push(DeviceCall::SetBlendModes(color, alpha));
    }

    fn set_blend_functions(&mut self, functions: BlendFunctions) {
        self.calls.push(DeviceCall::SetBlendFunctions(functions));
    }

    fn set_color_write(&mut self, mask: ColorWriteSettings) {
        self.calls.push(DeviceCall::SetColorWrite(mask));
    }

    fn set_front_face(&mut self, direction: FaceDirection) {
        self.calls.push(DeviceCall::SetFrontFace(direction));
    }

    fn set_cull_face(&mut self, face: Option<FaceType>) {
        self.calls.push(DeviceCall::SetCullFace(face));
    }

    fn clear(&mut self, settings: &ClearSettings) {
        self.calls.push(DeviceCall::Clear(*settings));
    }

    fn draw_arrays(&mut self, mode: DrawMode, first_vertex: i32, vertex_count: i32) {
        self.calls.push(DeviceCall::DrawArrays {
            mode,
            first: first_vertex,
            count: vertex_count,
        });
    }

    fn draw_indexed(
        &mut self,
        mode: DrawMode,
        first_index: i32,
        index_count: i32,
        base_vertex: i32,
    ) {
        self.calls.push(DeviceCall::DrawIndexed {
            mode,
            first: first_index,
            count: index_count,
            base_vertex,
        });
    }
}

/// Device with a mock backend and one empty-interface program and triangle
/// mesh, enough for draw tests that do not care about uniforms.
pub fn device_with_mesh() -> (
    daub_gpu::RenderDevice<MockBackend>,
    daub_gpu::ProgramId,
    daub_gpu::MeshId,
) {
    let mut device =
        daub_gpu::RenderDevice::new(MockBackend::new(), daub_gpu::DeviceConfig::default())
            .expect("device");
    let program = device.create_program("vs", "fs").expect("program");
    let vertices = device
        .create_vertex_buffer(&[0u8; 36], BufferUsage::Static)
        .expect("vertex buffer");
    let layout = daub_gpu::VertexLayout::new(&[(DataType::Float32, 3)]);
    let mesh = device
        .create_mesh(&[(vertices, layout)], None)
        .expect("mesh");
    (device, program, mesh)
}
