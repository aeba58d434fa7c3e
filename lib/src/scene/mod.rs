use cgmath::{Matrix4, Quaternion, Vector3};

mod room;
pub use room::*;

mod triangles;
pub use triangles::*;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ModelId(usize);

impl ModelId {
    pub fn get_index(&self) -> usize {
        self.0
    }
}

pub struct Model {
    mesh: TriangleSet,
    pub pos: Vector3<f32>,
    pub rot: Quaternion<f32>,
    pub scale: f32,
    pub tint: [f32; 4],
    pub visible: bool,
}

impl Model {
    pub fn new(mesh: TriangleSet, pos: Vector3<f32>, rot: Quaternion<f32>) -> Self {
        assert!(!mesh.is_empty());

        Self {
            mesh,
            pos,
            rot,
            scale: 1.0,
            tint: [1.0, 1.0, 1.0, 1.0],
            visible: true,
        }
    }

    pub fn get_mesh(&self) -> &TriangleSet {
        &self.mesh
    }

    pub fn get_matrix(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.pos) * Matrix4::from(self.rot) * Matrix4::from_scale(self.scale)
    }

    pub fn is_translucent(&self) -> bool {
        self.tint[3] < 1.0
    }
}

// The model list is fixed once rendering starts, see RoomRenderer::new().
pub struct Scene {
    models: Vec<Model>,
}

impl Scene {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            models: Vec::new(),
        }
    }

    pub fn add(&mut self, model: Model) -> ModelId {
        let id = ModelId(self.models.len());
        self.models.push(model);
        id
    }

    pub fn get(&self, id: ModelId) -> &Model {
        &self.models[id.0]
    }

    pub fn get_mut(&mut self, id: ModelId) -> &mut Model {
        &mut self.models[id.0]
    }

    pub fn get_models(&self) -> &[Model] {
        &self.models
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

pub fn identity_rot() -> Quaternion<f32> {
    Quaternion::new(1.0, 0.0, 0.0, 0.0)
}
