//! Background asset loading for a scene preset, spliced into the scene
//! between ticks.

use std::path::Path;

use anyhow::{Context, Result};
use asset::cubemap::CubemapData;
use asset::model::ModelData;
use asset::texture::TextureData;
use asset::{AssetLoader, LoadedAsset};
use corelib::attach::{attach_model, record_failure, settle_resource};
use corelib::loading::{Completion, CompletionQueue, LoadPolicy, LoadTable, TextureSlot};
use corelib::presets::ScenePreset;
use corelib::scene::{EnvironmentId, ModelId, SceneState};
use renderer::Renderer;

const MAX_LOADER_THREADS: usize = 4;

/// Where decoded assets go before they are attached.
pub trait AssetSink {
    fn upload_model(&mut self, data: &ModelData) -> ModelId;
    fn set_floor_texture(&mut self, slot: TextureSlot, data: &TextureData);
    fn set_environment(&mut self, cube: &CubemapData) -> EnvironmentId;
}

impl AssetSink for Renderer {
    fn upload_model(&mut self, data: &ModelData) -> ModelId {
        Renderer::upload_model(self, data)
    }

    fn set_floor_texture(&mut self, slot: TextureSlot, data: &TextureData) {
        Renderer::set_floor_texture(self, slot, data)
    }

    fn set_environment(&mut self, cube: &CubemapData) -> EnvironmentId {
        Renderer::set_environment(self, cube)
    }
}

pub struct AssetStream {
    table: LoadTable,
    queue: CompletionQueue<LoadedAsset>,
    policy: LoadPolicy,
    reported: bool,
    // Dropped last: joins the workers.
    _loader: Option<AssetLoader>,
}

impl AssetStream {
    /// Queue every request of `preset` and hand them to the worker pool.
    pub fn start(preset: &ScenePreset, root: &Path, policy: LoadPolicy) -> Result<Self> {
        let mut table = LoadTable::new();
        let ids = preset.queue_requests(root, &mut table);
        let queue = CompletionQueue::new();

        let loader = if ids.is_empty() {
            None
        } else {
            let threads = std::thread::available_parallelism()
                .map_or(1, |n| n.get())
                .min(MAX_LOADER_THREADS)
                .min(ids.len());
            let loader = AssetLoader::new(threads, queue.sender())
                .context("failed to start asset loader")?;
            for id in &ids {
                loader.submit(table.get(*id)?);
            }
            log::info!(
                "Queued {} asset requests under '{}' on {threads} threads",
                ids.len(),
                root.display()
            );
            Some(loader)
        };

        Ok(Self::with_queue(table, queue, policy, loader))
    }

    fn with_queue(
        table: LoadTable,
        queue: CompletionQueue<LoadedAsset>,
        policy: LoadPolicy,
        loader: Option<AssetLoader>,
    ) -> Self {
        Self {
            table,
            queue,
            policy,
            reported: false,
            _loader: loader,
        }
    }

    pub fn table(&self) -> &LoadTable {
        &self.table
    }

    /// Attach everything that finished since the last call. Under
    /// [`LoadPolicy::FailFast`] the first failure is returned.
    pub fn drain(&mut self, scene: &mut SceneState, sink: &mut dyn AssetSink) -> Result<usize> {
        let completions: Vec<_> = self.queue.drain().collect();
        let count = completions.len();
        for completion in completions {
            self.settle(completion, scene, sink)?;
        }
        if count > 0 && !self.reported && self.table.is_settled() {
            self.reported = true;
            let s = self.table.summary();
            log::info!("All assets settled: {} loaded, {} failed", s.loaded, s.failed);
        }
        Ok(count)
    }

    fn settle(
        &mut self,
        completion: Completion<LoadedAsset>,
        scene: &mut SceneState,
        sink: &mut dyn AssetSink,
    ) -> Result<()> {
        let Completion { id, result } = completion;
        let asset = match result {
            Ok(asset) => asset,
            Err(reason) => {
                record_failure(&mut self.table, id, &reason, self.policy)?;
                return Ok(());
            }
        };
        match asset {
            LoadedAsset::Model(data) => {
                if scene.contains_source(id) {
                    log::warn!("Ignoring repeated completion for {id:?}");
                    return Ok(());
                }
                let model = sink.upload_model(&data);
                attach_model(&mut self.table, scene, id, data.instance(model))?;
            }
            LoadedAsset::Texture(slot, data) => {
                if settle_resource(&mut self.table, id)? {
                    sink.set_floor_texture(slot, &data);
                }
            }
            LoadedAsset::Environment(cube) => {
                if settle_resource(&mut self.table, id)? {
                    let env = sink.set_environment(&cube);
                    scene.set_environment(env);
                    let n = scene.apply_environment();
                    log::info!("Environment {env:?} applied to {n} objects");
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asset::mesh::{MeshData, MeshVertex};
    use asset::model::{ModelMesh, ModelPrimitive};
    use asset::texture::ColorSpace;
    use corelib::loading::{LoadId, LoadPurpose, LoadState, TextureWrap};
    use corelib::scene::ModelNode;
    use corelib::transform::Transform;
    use corelib::vec3;

    #[derive(Default)]
    struct RecordingSink {
        models: u32,
        floor: Vec<TextureSlot>,
        environments: u32,
    }

    impl AssetSink for RecordingSink {
        fn upload_model(&mut self, _data: &ModelData) -> ModelId {
            self.models += 1;
            ModelId(self.models - 1)
        }

        fn set_floor_texture(&mut self, slot: TextureSlot, _data: &TextureData) {
            self.floor.push(slot);
        }

        fn set_environment(&mut self, _cube: &CubemapData) -> EnvironmentId {
            self.environments += 1;
            EnvironmentId(self.environments - 1)
        }
    }

    fn model(label: &str) -> LoadedAsset {
        let tri = MeshData::new(
            vec![
                MeshVertex::new([0.0; 3], [0.0, 1.0, 0.0], [0.0; 2]),
                MeshVertex::new([1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 0.0]),
                MeshVertex::new([0.0, 0.0, 1.0], [0.0, 1.0, 0.0], [0.0, 1.0]),
            ],
            vec![0, 1, 2],
        );
        LoadedAsset::Model(Box::new(ModelData {
            label: label.to_string(),
            nodes: vec![ModelNode {
                name: None,
                parent: None,
                local: Transform::identity(),
                mesh: Some(0),
            }],
            meshes: vec![ModelMesh {
                name: None,
                primitives: vec![ModelPrimitive {
                    mesh: tri,
                    material: None,
                }],
            }],
            materials: Vec::new(),
            images: Vec::new(),
            clips: Vec::new(),
        }))
    }

    fn stream(policy: LoadPolicy) -> (AssetStream, Vec<LoadId>) {
        let mut table = LoadTable::new();
        let ids = vec![
            table.request(vec!["textures/color.jpg".into()], LoadPurpose::Texture(TextureSlot::Color, TextureWrap::Repeat)),
            table.request(
                vec!["models/hangar.glb".into()],
                LoadPurpose::Model {
                    name: "hangar".into(),
                    placement: vec3(10.0, 0.0, 10.0),
                },
            ),
            table.request(vec!["models/bus.glb".into()], LoadPurpose::Model {
                name: "bus".into(),
                placement: vec3(10.0, 0.5, -10.0),
            }),
        ];
        (AssetStream::with_queue(table, CompletionQueue::new(), policy, None), ids)
    }

    fn scene() -> SceneState {
        ScenePreset::airport().build_scene(1.0)
    }

    #[test]
    fn completions_attach_in_arrival_order() {
        let (mut s, ids) = stream(LoadPolicy::BestEffort);
        let mut scene = scene();
        let mut sink = RecordingSink::default();
        let tx = s.queue.sender();
        tx.send(ids[2], Ok(model("bus")));
        tx.send(ids[1], Ok(model("hangar")));
        tx.send(ids[1], Ok(model("hangar")));
        let texture = TextureData::solid([255; 4], ColorSpace::Srgb);
        tx.send(ids[0], Ok(LoadedAsset::Texture(TextureSlot::Color, texture)));

        assert_eq!(s.drain(&mut scene, &mut sink).unwrap(), 4);
        // duplicate hangar is not uploaded twice
        assert_eq!(sink.models, 2);
        assert_eq!(sink.floor, [TextureSlot::Color]);
        let bus = scene.object_by_source(ids[2]).unwrap();
        assert_eq!(bus.transform.translation, vec3(10.0, 0.5, -10.0));
        assert!(s.table().is_settled());
    }

    #[test]
    fn best_effort_keeps_going_after_failure() {
        let (mut s, ids) = stream(LoadPolicy::BestEffort);
        let mut scene = scene();
        let mut sink = RecordingSink::default();
        let tx = s.queue.sender();
        tx.send(ids[1], Err("models/hangar.glb: not found".into()));
        tx.send(ids[2], Ok(model("bus")));

        assert_eq!(s.drain(&mut scene, &mut sink).unwrap(), 2);
        assert!(matches!(s.table().get(ids[1]).unwrap().state, LoadState::Failed(_)));
        assert!(scene.contains_source(ids[2]));
    }

    #[test]
    fn fail_fast_returns_the_failure() {
        let (mut s, ids) = stream(LoadPolicy::FailFast);
        let mut scene = scene();
        let mut sink = RecordingSink::default();
        s.queue.sender().send(ids[0], Err("decode error".into()));
        let err = s.drain(&mut scene, &mut sink).unwrap_err();
        assert!(format!("{err:#}").contains("decode error"));
    }

    #[test]
    fn environment_is_applied_to_models() {
        let mut table = LoadTable::new();
        let env = table.request(vec!["px.png".into(); 6], LoadPurpose::Environment);
        let mut s = AssetStream::with_queue(table, CompletionQueue::new(), LoadPolicy::BestEffort, None);
        let mut scene = scene();
        let mut sink = RecordingSink::default();
        let face = TextureData::solid([0, 0, 0, 255], ColorSpace::Srgb);
        let cube = CubemapData::from_faces(vec![face; 6]).unwrap();
        s.queue.sender().send(env, Ok(LoadedAsset::Environment(cube)));

        s.drain(&mut scene, &mut sink).unwrap();
        assert_eq!(sink.environments, 1);
        assert_eq!(scene.environment(), Some(EnvironmentId(0)));
    }
}
