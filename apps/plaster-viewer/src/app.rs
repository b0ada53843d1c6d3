//! Clay diorama viewer.

use glam::{Vec3, Vec4};
use plaster_app::{AppContext, GpuMaterial, GpuMesh, KeyCode, PlasterApp, SceneView, VulkanBackend};
use plaster_core::Extent2d;
use plaster_scene::{MaterialId, MaterialParams, MeshData, ObjectId, RenderObject, Scene, Transform};
use tracing::{info, warn};

/// Camera distance from the diorama center.
const ORBIT_RADIUS: f32 = 7.0;
const ORBIT_HEIGHT: f32 = 3.5;
/// Orbit speed in radians per second.
const ORBIT_SPEED: f32 = 0.35;
/// Spin of the display pieces in degrees per second.
const SPIN_SPEED: f32 = 40.0;
/// Seconds between window title refreshes.
const TITLE_INTERVAL: f32 = 1.0;

const CLAY_COLOR: Vec3 = Vec3::new(0.8, 0.7, 0.6);
const FLOOR_COLOR: Vec3 = Vec3::new(0.5, 0.45, 0.4);

const PRESET_KEYS: [KeyCode; 5] = [
    KeyCode::Digit1,
    KeyCode::Digit2,
    KeyCode::Digit3,
    KeyCode::Digit4,
    KeyCode::Digit5,
];

fn presets() -> [(&'static str, MaterialParams); 5] {
    [
        ("Clay", MaterialParams::default()),
        ("Medieval Dungeon", MaterialParams::medieval_dungeon()),
        ("Blood Ritual", MaterialParams::blood_ritual()),
        ("Plague Village", MaterialParams::plague_village()),
        ("Ancient Forest", MaterialParams::ancient_forest()),
    ]
}

type ClayScene = Scene<GpuMesh, GpuMaterial>;

/// Viewer application state.
pub struct ClayViewer {
    scene: ClayScene,
    /// Preset names and their materials, selected with the number keys.
    presets: Vec<(&'static str, MaterialId)>,
    active_preset: usize,
    /// Pieces that spin and take the active preset.
    pieces: Vec<ObjectId>,
    orbit_angle: f32,
    paused: bool,
    frames_since_title: u32,
    title_timer: f32,
}

impl PlasterApp for ClayViewer {
    fn init(ctx: &mut AppContext) -> anyhow::Result<Self> {
        let mut scene = ClayScene::new();
        let built = build_diorama(ctx.backend(), &mut scene);
        let (presets, pieces) = match built {
            Ok(handles) => handles,
            Err(e) => {
                release(ctx.backend(), &mut scene);
                return Err(e);
            }
        };
        info!(
            "Diorama ready: {} objects, {} material presets",
            scene.object_count(),
            presets.len()
        );

        let mut viewer = Self {
            scene,
            presets,
            active_preset: 0,
            pieces,
            orbit_angle: 0.0,
            paused: false,
            frames_since_title: 0,
            title_timer: 0.0,
        };
        viewer.scene.camera.set_aspect(ctx.aspect_ratio());
        viewer.place_camera();
        Ok(viewer)
    }

    fn update(&mut self, ctx: &AppContext, dt: f32) {
        let keyboard = ctx.keyboard();
        if keyboard.is_just_pressed(KeyCode::Space) {
            self.paused = !self.paused;
        }
        if let Some(index) = PRESET_KEYS.iter().position(|&k| keyboard.is_just_pressed(k)) {
            self.select_preset(index);
        }

        if !self.paused {
            self.orbit_angle = (self.orbit_angle + ORBIT_SPEED * dt) % std::f32::consts::TAU;
            for &piece in &self.pieces {
                if let Some(transform) = self.scene.transform_mut(piece) {
                    transform.rotation.y = (transform.rotation.y + SPIN_SPEED * dt) % 360.0;
                }
            }
        }
        self.place_camera();

        self.frames_since_title += 1;
        self.title_timer += dt;
        if self.title_timer >= TITLE_INTERVAL {
            #[allow(clippy::cast_precision_loss)]
            let fps = self.frames_since_title as f32 / self.title_timer;
            let preset = self.presets.get(self.active_preset).map_or("?", |&(name, _)| name);
            ctx.surface
                .set_title(&format!("Plaster Viewer - {preset} - {fps:.0} FPS"));
            self.frames_since_title = 0;
            self.title_timer = 0.0;
        }
    }

    fn scene(&self) -> &dyn SceneView<VulkanBackend> {
        &self.scene
    }

    fn on_resize(&mut self, _ctx: &mut AppContext, extent: Extent2d) -> anyhow::Result<()> {
        self.scene.camera.set_aspect(extent.aspect_ratio());
        Ok(())
    }

    fn cleanup(&mut self, ctx: &mut AppContext) {
        release(ctx.backend(), &mut self.scene);
        info!("Viewer resources released");
    }
}

impl ClayViewer {
    fn place_camera(&mut self) {
        let (sin, cos) = self.orbit_angle.sin_cos();
        let camera = &mut self.scene.camera;
        camera.set_position(Vec3::new(cos * ORBIT_RADIUS, ORBIT_HEIGHT, sin * ORBIT_RADIUS));
        camera.look_at(Vec3::new(0.0, 0.5, 0.0));
    }

    fn select_preset(&mut self, index: usize) {
        let Some(&(name, material)) = self.presets.get(index) else {
            return;
        };
        for &piece in &self.pieces {
            if let Err(e) = self.scene.set_material(piece, material) {
                warn!("Failed to apply preset {name}: {e}");
                return;
            }
        }
        self.active_preset = index;
        info!("Material preset: {}", name);
    }
}

/// Upload the diorama's meshes and materials and place its objects.
///
/// Everything uploaded is stored in `scene` as soon as it exists, so a
/// failure part way leaves nothing untracked.
fn build_diorama(
    backend: &VulkanBackend,
    scene: &mut ClayScene,
) -> anyhow::Result<(Vec<(&'static str, MaterialId)>, Vec<ObjectId>)> {
    let cube = scene.add_mesh(backend.create_mesh(&MeshData::cube(1.0, CLAY_COLOR))?);
    let sphere = scene.add_mesh(backend.create_mesh(&MeshData::sphere(0.6, 24, 16, CLAY_COLOR))?);
    let floor = scene.add_mesh(backend.create_mesh(&MeshData::plane(10.0, 10.0, 8, 8, FLOOR_COLOR))?);

    let floor_material = scene.add_material(backend.create_material(
        &MaterialParams::default().with_base_color(Vec4::new(0.42, 0.36, 0.3, 1.0)),
    )?);
    let mut preset_materials = Vec::new();
    for (name, params) in presets() {
        preset_materials.push((name, scene.add_material(backend.create_material(&params)?)));
    }
    let clay = preset_materials
        .first()
        .map(|&(_, id)| id)
        .ok_or_else(|| anyhow::anyhow!("no material presets"))?;

    scene.add_object(RenderObject::new("floor", floor, floor_material))?;

    let layout = [
        ("cube_left", cube, Vec3::new(-2.0, 0.5, 0.0), 1.0),
        ("sphere_center", sphere, Vec3::new(0.0, 0.6, 0.0), 1.0),
        ("cube_right", cube, Vec3::new(2.0, 0.5, 0.0), 1.0),
        ("cube_back", cube, Vec3::new(0.0, 0.35, -2.0), 0.7),
        ("sphere_front", sphere, Vec3::new(0.0, 0.4, 2.0), 0.66),
    ];
    let mut pieces = Vec::with_capacity(layout.len());
    for (name, mesh, position, scale) in layout {
        let transform = Transform::from_position(position).with_scale(Vec3::splat(scale));
        pieces.push(scene.add_object(RenderObject::new(name, mesh, clay).with_transform(transform))?);
    }

    Ok((preset_materials, pieces))
}

fn release(backend: &VulkanBackend, scene: &mut ClayScene) {
    let (meshes, materials) = scene.drain();
    for mesh in meshes {
        backend.destroy_mesh(mesh);
    }
    for material in materials {
        backend.destroy_material(material);
    }
}
