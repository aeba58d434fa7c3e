use bytemuck::{Pod, Zeroable};
use cgmath::{InnerSpace, Vector3};
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;

use crate::error::{VrError, VrResult};

const LIGHTS: [([f32; 3], f32); 3] = [ // (pos, strength)
    ([-2.0, 4.0, -2.0], 8.0),
    ([3.0, 4.0, -3.0], 1.0),
    ([-4.0, 3.0, 25.0], 4.0),
];
const LIGHT_AMBIENT: f32 = 0.65;
const LIGHT_SCALE: f32 = 192.0;
const MAX_VERTEXES: usize = u16::MAX as usize + 1;
const BRIGHTNESS_JITTER: u32 = 160;
const SHADE_SEED: u64 = 0x5eed;

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub pos: [f32; 3],
    pub color: [f32; 4], // Linear.
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Color(pub [f32; 4]);

impl Color {
    pub fn from_argb(argb: u32) -> Self {
        let [a, r, g, b] = argb.to_be_bytes();
        Self::from_srgb_byte(r, g, b, a)
    }

    pub fn from_srgb_byte(r: u8, g: u8, b: u8, a: u8) -> Self {
        // Convert sRGB to linear, see https://physicallybased.info/tools/ .

        let convert = |srgb: u8| {
            let srgb: f32 = srgb as f32 / u8::MAX as f32;

            #[allow(clippy::excessive_precision)]
            if srgb < 0.04045 {
                srgb * 0.0773993808
            } else {
                (srgb * 0.9478672986 + 0.0521327014).powf(2.4)
            }
        };

        Self([convert(r), convert(g), convert(b), a as f32 / u8::MAX as f32])
    }
}

// Indexed triangle list with baked vertex colors.
pub struct TriangleSet {
    vertexes: Vec<Vertex>,
    indexes: Vec<u16>,
    rng: StdRng,
}

impl TriangleSet {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            vertexes: Vec::new(),
            indexes: Vec::new(),
            rng: StdRng::seed_from_u64(SHADE_SEED),
        }
    }

    pub fn get_vertexes(&self) -> &[Vertex] {
        &self.vertexes
    }

    pub fn get_indexes(&self) -> &[u16] {
        &self.indexes
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }

    // Corners are taken in order, front face is counter-clockwise.
    pub fn add_quad(&mut self, corners: [Vector3<f32>; 4], colors: [Color; 4]) -> VrResult<()> {
        // All four new vertexes must be reachable with 16-bit indexes.

        let base = self.vertexes.len();
        if base + corners.len() > MAX_VERTEXES {
            return Err(VrError::MeshTooLarge(MAX_VERTEXES));
        }
        let base = base as u16;

        for (corner, color) in corners.iter().zip(colors.iter()) {
            self.vertexes.push(Vertex {
                pos: (*corner).into(),
                color: color.0,
            });
        }

        self.indexes.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        Ok(())
    }

    pub fn add_quad_facing(&mut self, mut corners: [Vector3<f32>; 4], normal: Vector3<f32>, colors: [Color; 4]) -> VrResult<()> {
        let face = (corners[1] - corners[0]).cross(corners[2] - corners[0]);
        if face.dot(normal) < 0.0 {
            corners.reverse();
        }

        self.add_quad(corners, colors)
    }

    // Axis aligned box, the two corners may be given in any order. Colors
    // are 0xAARRGGBB (sRGB) and get shaded by a few fixed lights.
    #[allow(clippy::too_many_arguments)]
    pub fn add_solid_color_box(&mut self, x1: f32, y1: f32, z1: f32, x2: f32, y2: f32, z2: f32, argb: u32) -> VrResult<()> {
        let lo = Vector3::new(x1.min(x2), y1.min(y2), z1.min(z2));
        let hi = Vector3::new(x1.max(x2), y1.max(y2), z1.max(z2));

        let faces = [
            (Vector3::unit_y(), [Vector3::new(lo.x, hi.y, lo.z), Vector3::new(hi.x, hi.y, lo.z), Vector3::new(hi.x, hi.y, hi.z), Vector3::new(lo.x, hi.y, hi.z)]),
            (-Vector3::unit_y(), [Vector3::new(lo.x, lo.y, lo.z), Vector3::new(hi.x, lo.y, lo.z), Vector3::new(hi.x, lo.y, hi.z), Vector3::new(lo.x, lo.y, hi.z)]),
            (Vector3::unit_x(), [Vector3::new(hi.x, lo.y, lo.z), Vector3::new(hi.x, hi.y, lo.z), Vector3::new(hi.x, hi.y, hi.z), Vector3::new(hi.x, lo.y, hi.z)]),
            (-Vector3::unit_x(), [Vector3::new(lo.x, lo.y, lo.z), Vector3::new(lo.x, hi.y, lo.z), Vector3::new(lo.x, hi.y, hi.z), Vector3::new(lo.x, lo.y, hi.z)]),
            (Vector3::unit_z(), [Vector3::new(lo.x, lo.y, hi.z), Vector3::new(hi.x, lo.y, hi.z), Vector3::new(hi.x, hi.y, hi.z), Vector3::new(lo.x, hi.y, hi.z)]),
            (-Vector3::unit_z(), [Vector3::new(lo.x, lo.y, lo.z), Vector3::new(hi.x, lo.y, lo.z), Vector3::new(hi.x, hi.y, lo.z), Vector3::new(lo.x, hi.y, lo.z)]),
        ];

        for (normal, corners) in faces {
            let colors = corners.map(|corner| self.shade(argb, &corner));
            self.add_quad_facing(corners, normal, colors)?;
        }

        Ok(())
    }

    // Frustum looking down -z from the origin, visible from both sides.
    pub fn add_frustum(&mut self, hfov: f32, vfov: f32, near: f32, far: f32, color: Color) -> VrResult<()> {
        let rect = |dist: f32| {
            let w = dist * (hfov / 2.0).tan();
            let h = dist * (vfov / 2.0).tan();

            [
                Vector3::new(-w, -h, -dist),
                Vector3::new(w, -h, -dist),
                Vector3::new(w, h, -dist),
                Vector3::new(-w, h, -dist),
            ]
        };

        let n = rect(near);
        let f = rect(far);
        let colors = [color; 4];

        let mut quads = vec![n, f];
        for i in 0..4 {
            let j = (i + 1) % 4;
            quads.push([n[i], n[j], f[j], f[i]]);
        }

        for quad in quads {
            let mut back = quad;
            back.reverse();

            self.add_quad(quad, colors)?;
            self.add_quad(back, colors)?;
        }

        Ok(())
    }

    fn shade(&mut self, argb: u32, pos: &Vector3<f32>) -> Color {
        // Fake lighting: brighten by proximity to the room lights, with some
        // noise to break up flat surfaces.

        let bri = self.rng.random_range(0..BRIGHTNESS_JITTER) as f32;

        let light: f32 = LIGHTS.iter().map(|(light_pos, strength)| {
            let dist = (pos - Vector3::from(*light_pos)).magnitude().max(f32::EPSILON);
            strength / dist
        }).sum();

        let factor = (bri + LIGHT_SCALE * (LIGHT_AMBIENT + light)) / 255.0;

        let [a, r, g, b] = argb.to_be_bytes();
        let modify = |c: u8| (c as f32 * factor).min(255.0) as u8;

        Color::from_srgb_byte(modify(r), modify(g), modify(b), a)
    }
}
