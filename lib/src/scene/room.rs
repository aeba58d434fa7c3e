use cgmath::Vector3;

use crate::config::CubeConfig;
use crate::error::VrResult;
use crate::scene::{Model, ModelId, Scene, TriangleSet, identity_rot};

const WALL_COLOR: u32 = 0xff808080;
const FURNITURE_COLOR: u32 = 0xff383838;
const BAR_COLOR: u32 = 0xff505050;
const TABLE_COLOR: u32 = 0xff505000;
const CHAIR_COLOR: u32 = 0xff202050;
const POST_COLOR: u32 = 0xff404040;

// Fill scene with the room, returns the cube which is supposed to be animated.
pub fn create_room(scene: &mut Scene) -> VrResult<ModelId> {
    let mut cube = TriangleSet::new();
    cube.add_solid_color_box(0.5, -0.5, 0.5, -0.5, 0.5, -0.5, 0xff404040)?;
    let cube_id = scene.add(Model::new(cube, Vector3::new(0.0, 0.0, 0.0), identity_rot()));

    let mut spare_cube = TriangleSet::new();
    spare_cube.add_solid_color_box(0.1, -0.1, 0.1, -0.1, 0.1, -0.1, 0xffff0000)?;
    scene.add(Model::new(spare_cube, Vector3::new(0.0, -10.0, 0.0), identity_rot()));

    let mut walls = TriangleSet::new();
    walls.add_solid_color_box(10.1, 0.0, 20.0, 10.0, 4.0, -20.0, WALL_COLOR)?; // Left wall
    walls.add_solid_color_box(10.0, -0.1, 20.1, -10.0, 4.0, 20.0, WALL_COLOR)?; // Back wall
    walls.add_solid_color_box(-10.0, -0.1, 20.0, -10.1, 4.0, -20.0, WALL_COLOR)?; // Right wall
    scene.add(Model::new(walls, Vector3::new(0.0, 0.0, 0.0), identity_rot()));

    let mut floors = TriangleSet::new();
    floors.add_solid_color_box(10.0, -0.1, 20.0, -10.0, 0.0, -20.1, WALL_COLOR)?; // Main floor
    floors.add_solid_color_box(15.0, -6.1, -18.0, -15.0, -6.0, -30.0, WALL_COLOR)?; // Bottom floor
    scene.add(Model::new(floors, Vector3::new(0.0, 0.0, 0.0), identity_rot()));

    let mut ceiling = TriangleSet::new();
    ceiling.add_solid_color_box(10.0, 4.0, 20.0, -10.0, 4.1, -20.1, WALL_COLOR)?;
    scene.add(Model::new(ceiling, Vector3::new(0.0, 0.0, 0.0), identity_rot()));

    let mut furniture = TriangleSet::new();

    // Shelf.

    furniture.add_solid_color_box(-9.5, 0.75, -3.0, -10.1, 2.5, -3.1, FURNITURE_COLOR)?;
    furniture.add_solid_color_box(-9.5, 0.95, -3.7, -10.1, 2.75, -3.8, FURNITURE_COLOR)?;
    furniture.add_solid_color_box(-9.55, 1.20, -2.5, -10.1, 1.30, -3.75, FURNITURE_COLOR)?;
    furniture.add_solid_color_box(-9.55, 2.00, -3.05, -10.1, 2.10, -4.2, FURNITURE_COLOR)?;

    // Railings and bars at the edge of the main floor.

    furniture.add_solid_color_box(-5.0, 1.1, -20.0, -10.0, 1.2, -20.1, FURNITURE_COLOR)?;
    furniture.add_solid_color_box(10.0, 1.1, -20.0, 5.0, 1.2, -20.1, FURNITURE_COLOR)?;

    for i in 5..=9 {
        let f = i as f32;
        furniture.add_solid_color_box(-f, 0.0, -20.0, -f - 0.1, 1.1, -20.1, BAR_COLOR)?;
        furniture.add_solid_color_box(f, 1.1, -20.0, f + 0.1, 0.0, -20.1, BAR_COLOR)?;
    }

    // Table.

    furniture.add_solid_color_box(1.8, 0.8, -1.0, 0.0, 0.7, 0.0, TABLE_COLOR)?;
    furniture.add_solid_color_box(1.8, 0.0, 0.0, 1.7, 0.7, -0.1, TABLE_COLOR)?;
    furniture.add_solid_color_box(1.8, 0.7, -1.0, 1.7, 0.0, -0.9, TABLE_COLOR)?;
    furniture.add_solid_color_box(0.0, 0.0, -1.0, 0.1, 0.7, -0.9, TABLE_COLOR)?;
    furniture.add_solid_color_box(0.0, 0.7, 0.0, 0.1, 0.0, -0.1, TABLE_COLOR)?;

    // Chair.

    furniture.add_solid_color_box(1.4, 0.5, 1.1, 0.8, 0.55, 0.5, CHAIR_COLOR)?;
    furniture.add_solid_color_box(1.401, 0.0, 1.101, 1.339, 1.0, 1.039, CHAIR_COLOR)?;
    furniture.add_solid_color_box(1.401, 0.5, 0.499, 1.339, 0.0, 0.561, CHAIR_COLOR)?;
    furniture.add_solid_color_box(0.799, 0.0, 0.561, 0.861, 0.5, 0.499, CHAIR_COLOR)?;
    furniture.add_solid_color_box(0.799, 1.0, 1.039, 0.861, 0.0, 1.101, CHAIR_COLOR)?;
    furniture.add_solid_color_box(1.4, 0.97, 1.05, 0.8, 0.92, 1.10, CHAIR_COLOR)?;

    // Posts.

    for i in 0..10 {
        let f = 3.0 + i as f32 * 0.4;
        furniture.add_solid_color_box(3.0, 0.0, -f, 2.9, 1.3, -f - 0.1, POST_COLOR)?;
    }

    scene.add(Model::new(furniture, Vector3::new(0.0, 0.0, 0.0), identity_rot()));

    Ok(cube_id)
}

// Moves the cube on a circle around the room, the clock only runs while the
// app has input focus.
pub struct CubeAnimator {
    cube: ModelId,
    clock: f32,
    radius: f32,
    height: f32,
    step: f32,
}

impl CubeAnimator {
    pub fn new(cube: ModelId, config: &CubeConfig) -> Self {
        Self {
            cube,
            clock: 0.0,
            radius: config.radius,
            height: config.height,
            step: config.step,
        }
    }

    pub fn get_clock(&self) -> f32 {
        self.clock
    }

    pub fn update(&mut self, scene: &mut Scene, has_focus: bool) {
        if !has_focus {
            return;
        }

        self.clock += self.step;

        let model = scene.get_mut(self.cube);
        model.pos = Vector3::new(self.radius * self.clock.sin(), self.height, self.radius * self.clock.cos());
    }
}
