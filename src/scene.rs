use std::{collections::HashMap, path::Path};

use bevy::{gltf::GltfAssetLabel, pbr::light_consts, prelude::*};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    board::*,
    config::PizzaConfig,
    echo3d::ModelLibrary,
    picking::{PickSource, PickTarget},
    primitives::board_to_world,
    GameState,
};

/// Height of the collision squares, just above the pizza surface.
pub const SQUARE_HEIGHT: f32 = 0.03;
/// Height at which toppings rest on the pizza and plates.
pub const TOPPING_HEIGHT: f32 = 0.1;
/// How far a topping may be scattered from the center of its plate.
pub const PLATE_JITTER: f32 = 1.0;

pub const SKYBOX_MODEL: &str = "Skybox.glb";
pub const PLATE_MODEL: &str = "plate.obj";
pub const PIZZA_MODEL: &str = "emptyPizza.obj";

/// A collision square and the board square it stands for.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot(pub Square);

#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Topping(pub ToppingKind);

/// Randomness for the topping layout and plate scatter.
#[derive(Resource)]
pub struct BoardRng(pub StdRng);

impl BoardRng {
    pub fn new(seed: Option<u64>) -> Self {
        BoardRng(match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        })
    }

    pub fn plate_jitter(&mut self) -> Vec2 {
        Vec2::new(
            self.0.gen_range(-PLATE_JITTER..=PLATE_JITTER),
            self.0.gen_range(-PLATE_JITTER..=PLATE_JITTER),
        )
    }

    pub fn yaw(&mut self) -> Quat {
        Quat::from_rotation_y(self.0.gen_range(0.0..std::f32::consts::TAU))
    }
}

/// Materials for the collision squares, which are only visible while highlighted.
#[derive(Resource, Debug, Clone)]
pub struct SquareMaterials {
    pub idle: Handle<StandardMaterial>,
    pub highlighted: Handle<StandardMaterial>,
}

/// Stand-in meshes for toppings whose models were not retrieved.
#[derive(Resource, Debug, Clone, Default)]
pub struct ToppingMeshes {
    meshes: HashMap<ToppingKind, (Handle<Mesh>, Handle<StandardMaterial>)>,
}

pub struct ScenePlugin;

impl Plugin for ScenePlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(ClearColor(Color::srgb(0.45, 0.62, 0.8)))
            .insert_resource(AmbientLight {
                color: Color::srgb(0.3, 0.25, 0.25),
                brightness: 300.0,
            })
            .add_systems(Startup, (spawn_camera, spawn_lights))
            .add_systems(OnEnter(GameState::Playing), spawn_board);
    }
}

/// Looks down at the pizza from behind, tilted 40 degrees.
pub fn camera_transform() -> Transform {
    Transform::from_xyz(0.0, 18.0, 20.0).with_rotation(Quat::from_rotation_x(-40f32.to_radians()))
}

/// World position for a topping resting on `square`. Plate toppings are scattered by `jitter`.
pub fn resting_translation(square: Square, jitter: Vec2) -> Vec3 {
    let offset = if square.is_plate() { jitter } else { Vec2::ZERO };
    board_to_world(square.position() + offset, TOPPING_HEIGHT)
}

fn spawn_camera(mut commands: Commands) {
    commands.spawn((
        Camera3dBundle {
            transform: camera_transform(),
            ..default()
        },
        PickSource::new_cursor(),
    ));
}

fn spawn_lights(mut commands: Commands) {
    commands.spawn(DirectionalLightBundle {
        directional_light: DirectionalLight {
            color: Color::srgb(0.9, 0.8, 0.9),
            illuminance: light_consts::lux::OVERCAST_DAY,
            shadows_enabled: true,
            ..default()
        },
        transform: Transform::default().looking_to(Vec3::new(0.0, -2.5, -8.0), Vec3::Y),
        ..default()
    });
}

fn is_scene_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("glb" | "gltf")
    )
}

/// Spawns a retrieved glTF model if there is one, otherwise the stand-in.
fn spawn_model(
    commands: &mut Commands,
    asset_server: &AssetServer,
    library: &ModelLibrary,
    model: &str,
    stand_in: PbrBundle,
) -> Entity {
    match library.get(model).filter(|path| is_scene_file(path)) {
        Some(path) => commands
            .spawn(SceneBundle {
                scene: asset_server.load(GltfAssetLabel::Scene(0).from_asset(path.to_path_buf())),
                transform: stand_in.transform,
                ..default()
            })
            .id(),
        None => commands.spawn(stand_in).id(),
    }
}

fn topping_meshes(
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
) -> ToppingMeshes {
    let mut lookup = HashMap::new();
    for kind in ToppingKind::PLATES {
        let (mesh, color) = match kind {
            ToppingKind::Mushroom => (
                meshes.add(Sphere::new(0.28).mesh().uv(16, 8)),
                Color::srgb(0.85, 0.78, 0.66),
            ),
            ToppingKind::Pepperoni => (
                meshes.add(Cylinder::new(0.38, 0.06)),
                Color::srgb(0.7, 0.12, 0.1),
            ),
            ToppingKind::Broccoli => (
                meshes.add(Sphere::new(0.3).mesh().uv(12, 8)),
                Color::srgb(0.2, 0.55, 0.18),
            ),
            ToppingKind::Pepper => (
                meshes.add(Torus::new(0.16, 0.32)),
                Color::srgb(0.25, 0.7, 0.2),
            ),
        };
        lookup.insert(kind, (mesh, materials.add(color)));
    }
    ToppingMeshes { meshes: lookup }
}

fn topping_scale(kind: ToppingKind) -> Vec3 {
    match kind {
        ToppingKind::Mushroom => Vec3::new(1.0, 0.5, 1.0),
        ToppingKind::Pepper => Vec3::new(1.0, 0.6, 1.0),
        ToppingKind::Pepperoni | ToppingKind::Broccoli => Vec3::ONE,
    }
}

fn spawn_topping(
    commands: &mut Commands,
    asset_server: &AssetServer,
    library: &ModelLibrary,
    stand_ins: &ToppingMeshes,
    kind: ToppingKind,
    translation: Vec3,
    rotation: Quat,
) -> Entity {
    let (mesh, material) = stand_ins.meshes[&kind].clone();
    let stand_in = PbrBundle {
        mesh,
        material,
        transform: Transform {
            translation,
            rotation,
            scale: topping_scale(kind),
        },
        ..default()
    };
    let entity = spawn_model(commands, asset_server, library, kind.model_file(), stand_in);
    commands
        .entity(entity)
        .insert((Topping(kind), Name::new(format!("{kind:?}"))));
    entity
}

/// Lays out the serving plate, the pizza, the supply plates, the collision squares and the initial
/// toppings, then stores the layout in a fresh [`Board`].
pub fn spawn_board(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    library: Res<ModelLibrary>,
    config: Res<PizzaConfig>,
    mut rng: ResMut<BoardRng>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let _span = info_span!("spawn board").entered();

    if let Some(path) = library.get(SKYBOX_MODEL).filter(|path| is_scene_file(path)) {
        commands.spawn(SceneBundle {
            scene: asset_server.load(GltfAssetLabel::Scene(0).from_asset(path.to_path_buf())),
            ..default()
        });
    }

    let plate_material = materials.add(Color::srgb(0.93, 0.93, 0.9));
    spawn_model(
        &mut commands,
        &asset_server,
        &library,
        PLATE_MODEL,
        PbrBundle {
            mesh: meshes.add(Cylinder::new(6.0, 0.2)),
            material: plate_material.clone(),
            transform: Transform::from_xyz(0.0, -0.2, 0.0),
            ..default()
        },
    );
    spawn_model(
        &mut commands,
        &asset_server,
        &library,
        PIZZA_MODEL,
        PbrBundle {
            mesh: meshes.add(Cylinder::new(4.6, 0.15)),
            material: materials.add(Color::srgb(0.95, 0.7, 0.3)),
            transform: Transform::from_xyz(0.0, -0.05, 0.0),
            ..default()
        },
    );

    let square_materials = SquareMaterials {
        idle: materials.add(StandardMaterial {
            base_color: Color::srgba(1.0, 1.0, 1.0, 0.0),
            alpha_mode: AlphaMode::Blend,
            unlit: true,
            ..default()
        }),
        highlighted: materials.add(StandardMaterial {
            base_color: Color::srgba(1.0, 0.9, 0.3, 0.45),
            alpha_mode: AlphaMode::Blend,
            unlit: true,
            ..default()
        }),
    };
    let square_mesh = meshes.add(Plane3d::default().mesh().size(1.0, 1.0));
    let stand_ins = topping_meshes(&mut meshes, &mut materials);

    let mut board = Board::<Entity>::new();
    for square in Square::all() {
        commands.spawn((
            PbrBundle {
                mesh: square_mesh.clone(),
                material: square_materials.idle.clone(),
                transform: Transform::from_translation(board_to_world(
                    square.position(),
                    SQUARE_HEIGHT,
                )),
                ..default()
            },
            Slot(square),
            PickTarget::square(1.0),
            Name::new(format!("square {}", square.index())),
        ));

        match square.plate() {
            None => {
                let Some(kind) = ToppingKind::roll(rng.0.gen_range(0..=ToppingKind::ROLL_MAX))
                else {
                    continue;
                };
                let rotation = rng.yaw();
                let topping = spawn_topping(
                    &mut commands,
                    &asset_server,
                    &library,
                    &stand_ins,
                    kind,
                    resting_translation(square, Vec2::ZERO),
                    rotation,
                );
                if let Err(e) = board.place(square, topping) {
                    error!("Could not place {kind:?}: {e}");
                }
            }
            Some(plate) => {
                spawn_model(
                    &mut commands,
                    &asset_server,
                    &library,
                    PLATE_MODEL,
                    PbrBundle {
                        mesh: meshes.add(Cylinder::new(1.8, 0.1)),
                        material: plate_material.clone(),
                        transform: Transform::from_translation(board_to_world(
                            square.position(),
                            -0.05,
                        )),
                        ..default()
                    },
                );
                let kind = ToppingKind::PLATES[plate];
                for _ in 0..PLATE_INITIAL_TOPPINGS {
                    let translation = resting_translation(square, rng.plate_jitter());
                    let rotation = rng.yaw();
                    let topping = spawn_topping(
                        &mut commands,
                        &asset_server,
                        &library,
                        &stand_ins,
                        kind,
                        translation,
                        rotation,
                    );
                    if let Err(e) = board.stock(plate, topping) {
                        error!("Could not stock {kind:?}: {e}");
                    }
                }
            }
        }
    }

    info!(
        "Board ready with {} toppings, collision overlay {}",
        board.items().count(),
        if config.show_collisions { "on" } else { "off" }
    );
    commands.insert_resource(square_materials);
    commands.insert_resource(stand_ins);
    commands.insert_resource(board);
}
