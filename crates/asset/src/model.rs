//! glTF 2.0 / GLB model loading into CPU-side data.
//!
//! Nodes are flattened depth-first from the default scene so parents come
//! before children; animation channels are remapped onto that order.

use std::path::Path;

use anyhow::{Context, Result, bail};
use corelib::animation::{AnimationClip, AnimationMixer, Channel, ChannelValues, Interpolation};
use corelib::scene::{ModelId, ModelInstance, ModelNode};
use corelib::transform::Transform;
use corelib::{Quat, Vec3};
use gltf::animation::util::ReadOutputs;

use crate::mesh::{MeshData, MeshVertex};
use crate::texture::{ColorSpace, TextureData};

const DRACO_EXTENSION: &str = "KHR_draco_mesh_compression";

#[derive(Clone, Debug)]
pub struct ModelPrimitive {
    pub mesh: MeshData,
    /// Index into [`ModelData::materials`]; `None` uses the default material.
    pub material: Option<usize>,
}

#[derive(Clone, Debug, Default)]
pub struct ModelMesh {
    pub name: Option<String>,
    pub primitives: Vec<ModelPrimitive>,
}

/// Metallic-roughness factors plus an optional base color image.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ModelMaterial {
    pub base_color: [f32; 4],
    /// Index into [`ModelData::images`].
    pub base_color_texture: Option<usize>,
    pub metallic: f32,
    pub roughness: f32,
    pub emissive: [f32; 3],
}

impl Default for ModelMaterial {
    fn default() -> Self {
        Self {
            base_color: [1.0; 4],
            base_color_texture: None,
            metallic: 1.0,
            roughness: 1.0,
            emissive: [0.0; 3],
        }
    }
}

#[derive(Clone, Debug)]
pub struct ModelData {
    pub label: String,
    pub nodes: Vec<ModelNode>,
    pub meshes: Vec<ModelMesh>,
    pub materials: Vec<ModelMaterial>,
    pub images: Vec<TextureData>,
    pub clips: Vec<AnimationClip>,
}

impl ModelData {
    pub fn vertex_count(&self) -> usize {
        self.meshes
            .iter()
            .flat_map(|m| &m.primitives)
            .map(|p| p.mesh.vertices.len())
            .sum()
    }

    /// Scene-side instance once the GPU upload produced `model`. Clips, if
    /// any, play through a fresh mixer.
    pub fn instance(&self, model: ModelId) -> ModelInstance {
        let inst = ModelInstance::new(model, self.nodes.clone());
        if self.clips.is_empty() {
            inst
        } else {
            inst.with_mixer(AnimationMixer::new(self.clips.clone()))
        }
    }
}

/// Load a `.gltf` or `.glb` file, resolving external buffers and images
/// relative to it.
pub fn load_gltf<P: AsRef<Path>>(path: P) -> Result<ModelData> {
    let path = path.as_ref();
    log::info!("Loading model from {:?}", path);
    let (doc, buffers, images) =
        gltf::import(path).with_context(|| format!("Failed to load glTF {}", path.display()))?;
    build(&path.display().to_string(), &doc, &buffers, &images)
}

/// Load a self-contained glTF from memory (GLB or JSON with data URIs).
pub fn load_gltf_slice(bytes: &[u8], label: &str) -> Result<ModelData> {
    let (doc, buffers, images) =
        gltf::import_slice(bytes).with_context(|| format!("Failed to parse glTF {label}"))?;
    build(label, &doc, &buffers, &images)
}

fn build(
    label: &str,
    doc: &gltf::Document,
    buffers: &[gltf::buffer::Data],
    images: &[gltf::image::Data],
) -> Result<ModelData> {
    let draco = doc.extensions_used().any(|e| e == DRACO_EXTENSION);

    let meshes = doc
        .meshes()
        .map(|m| read_mesh(&m, buffers, draco))
        .collect::<Result<Vec<_>>>()
        .with_context(|| format!("Failed to read meshes of {label}"))?;

    let materials = doc.materials().map(|m| read_material(&m)).collect();

    let images = images
        .iter()
        .enumerate()
        .map(|(i, img)| {
            convert_image(img).unwrap_or_else(|| {
                log::warn!("{label}: image {i} has unsupported format {:?}", img.format);
                TextureData::solid([255; 4], ColorSpace::Srgb)
            })
        })
        .collect();

    let (nodes, node_map) = flatten_nodes(doc);
    let clips = doc
        .animations()
        .map(|a| read_clip(&a, buffers, &node_map))
        .collect::<Result<Vec<_>>>()
        .with_context(|| format!("Failed to read animations of {label}"))?;

    let data = ModelData {
        label: label.to_string(),
        nodes,
        meshes,
        materials,
        images,
        clips,
    };
    log::info!(
        "Loaded model {}: {} nodes, {} meshes, {} vertices, {} clips",
        label,
        data.nodes.len(),
        data.meshes.len(),
        data.vertex_count(),
        data.clips.len()
    );
    Ok(data)
}

fn read_mesh(mesh: &gltf::Mesh, buffers: &[gltf::buffer::Data], draco: bool) -> Result<ModelMesh> {
    let mut primitives = Vec::new();
    for primitive in mesh.primitives() {
        if primitive.mode() != gltf::mesh::Mode::Triangles {
            log::warn!(
                "Skipping primitive {} of mesh {}: mode {:?}",
                primitive.index(),
                mesh.index(),
                primitive.mode()
            );
            continue;
        }
        // Compressed attributes keep their accessors but lose the buffer view.
        let compressed = draco
            && primitive
                .get(&gltf::Semantic::Positions)
                .is_some_and(|a| a.view().is_none() && a.sparse().is_none());
        if compressed {
            bail!(
                "mesh {} primitive {} is Draco-compressed ({DRACO_EXTENSION}); decompress the asset first",
                mesh.index(),
                primitive.index()
            );
        }
        let reader = primitive.reader(|b| buffers.get(b.index()).map(|d| &d.0[..]));

        let Some(positions) = reader.read_positions() else {
            bail!("mesh {} primitive {} has no POSITION", mesh.index(), primitive.index());
        };
        let positions: Vec<[f32; 3]> = positions.collect();

        let normals: Vec<[f32; 3]> = reader
            .read_normals()
            .map(|it| it.collect())
            .unwrap_or_else(|| vec![[0.0, 1.0, 0.0]; positions.len()]);
        let uvs: Vec<[f32; 2]> = reader
            .read_tex_coords(0)
            .map(|it| it.into_f32().collect())
            .unwrap_or_else(|| vec![[0.0, 0.0]; positions.len()]);

        let vertices = positions
            .iter()
            .enumerate()
            .map(|(i, p)| {
                MeshVertex::new(
                    *p,
                    normals.get(i).copied().unwrap_or([0.0, 1.0, 0.0]),
                    uvs.get(i).copied().unwrap_or_default(),
                )
            })
            .collect::<Vec<_>>();

        let indices: Vec<u32> = match reader.read_indices() {
            Some(it) => it.into_u32().collect(),
            None => (0..vertices.len() as u32).collect(),
        };
        if let Some(bad) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
            bail!("mesh {} index {bad} out of range", mesh.index());
        }

        primitives.push(ModelPrimitive {
            mesh: MeshData::new(vertices, indices),
            material: primitive.material().index(),
        });
    }
    Ok(ModelMesh {
        name: mesh.name().map(str::to_string),
        primitives,
    })
}

fn read_material(material: &gltf::Material) -> ModelMaterial {
    let pbr = material.pbr_metallic_roughness();
    ModelMaterial {
        base_color: pbr.base_color_factor(),
        base_color_texture: pbr.base_color_texture().map(|t| t.texture().source().index()),
        metallic: pbr.metallic_factor(),
        roughness: pbr.roughness_factor(),
        emissive: material.emissive_factor(),
    }
}

/// Expand 8-bit formats to RGBA8. Wider formats are not supported.
fn convert_image(img: &gltf::image::Data) -> Option<TextureData> {
    use gltf::image::Format;

    let pixels = &img.pixels;
    let rgba = match img.format {
        Format::R8G8B8A8 => pixels.clone(),
        Format::R8G8B8 => pixels
            .chunks_exact(3)
            .flat_map(|c| [c[0], c[1], c[2], 255])
            .collect(),
        Format::R8G8 => pixels
            .chunks_exact(2)
            .flat_map(|c| [c[0], c[1], 0, 255])
            .collect(),
        Format::R8 => pixels.iter().flat_map(|&v| [v, v, v, 255]).collect(),
        _ => return None,
    };
    TextureData::from_rgba8(img.width, img.height, rgba, ColorSpace::Srgb).ok()
}

/// Depth-first flatten of the default scene (or the first one). Returns the
/// nodes and a map from glTF node index to flattened index.
fn flatten_nodes(doc: &gltf::Document) -> (Vec<ModelNode>, Vec<Option<usize>>) {
    let mut nodes = Vec::new();
    let mut map = vec![None; doc.nodes().len()];

    let Some(scene) = doc.default_scene().or_else(|| doc.scenes().next()) else {
        return (nodes, map);
    };

    let mut stack: Vec<(gltf::Node, Option<usize>)> =
        scene.nodes().collect::<Vec<_>>().into_iter().rev().map(|n| (n, None)).collect();
    while let Some((node, parent)) = stack.pop() {
        if map[node.index()].is_some() {
            continue;
        }
        let (t, r, s) = node.transform().decomposed();
        let flat = nodes.len();
        map[node.index()] = Some(flat);
        nodes.push(ModelNode {
            name: node.name().map(str::to_string),
            parent,
            local: Transform::from_trs(Vec3::from(t), Quat::from_array(r), Vec3::from(s)),
            mesh: node.mesh().map(|m| m.index()),
        });
        let children: Vec<_> = node.children().collect();
        for child in children.into_iter().rev() {
            stack.push((child, Some(flat)));
        }
    }
    (nodes, map)
}

fn read_clip(
    anim: &gltf::Animation,
    buffers: &[gltf::buffer::Data],
    node_map: &[Option<usize>],
) -> Result<AnimationClip> {
    let mut channels = Vec::new();
    for channel in anim.channels() {
        let target = channel.target().node().index();
        let Some(node) = node_map.get(target).copied().flatten() else {
            log::debug!("animation channel targets node {target} outside the scene");
            continue;
        };
        let sampler = channel.sampler();
        let cubic = sampler.interpolation() == gltf::animation::Interpolation::CubicSpline;
        let interpolation = match sampler.interpolation() {
            gltf::animation::Interpolation::Step => Interpolation::Step,
            _ => Interpolation::Linear,
        };

        let reader = channel.reader(|b| buffers.get(b.index()).map(|d| &d.0[..]));
        let times: Vec<f32> = reader
            .read_inputs()
            .with_context(|| format!("channel on node {target} has no input"))?
            .collect();
        check_key_times(&times).with_context(|| format!("channel on node {target}"))?;
        let outputs = reader
            .read_outputs()
            .with_context(|| format!("channel on node {target} has no output"))?;

        let values = match outputs {
            ReadOutputs::Translations(it) => {
                ChannelValues::Translation(key_values(it.map(Vec3::from).collect(), cubic))
            }
            ReadOutputs::Scales(it) => {
                ChannelValues::Scale(key_values(it.map(Vec3::from).collect(), cubic))
            }
            ReadOutputs::Rotations(it) => ChannelValues::Rotation(key_values(
                it.into_f32().map(|q| Quat::from_array(q).normalize()).collect(),
                cubic,
            )),
            ReadOutputs::MorphTargetWeights(_) => {
                log::debug!("skipping morph target weights on node {target}");
                continue;
            }
        };

        channels.push(Channel {
            node,
            times,
            values,
            interpolation,
        });
    }
    Ok(AnimationClip::new(
        anim.name().unwrap_or("animation").to_string(),
        channels,
    ))
}

/// Cubic-spline outputs are (in-tangent, value, out-tangent) triples; keep
/// the values and sample them linearly.
/// Key times must be finite and strictly ascending.
fn check_key_times(times: &[f32]) -> Result<()> {
    if let Some(bad) = times.iter().find(|t| !t.is_finite()) {
        bail!("key time {bad} is not finite");
    }
    if let Some(w) = times.windows(2).find(|w| w[0] >= w[1]) {
        bail!("key times are not ascending ({} then {})", w[0], w[1]);
    }
    Ok(())
}

fn key_values<T: Copy>(raw: Vec<T>, cubic: bool) -> Vec<T> {
    if cubic {
        raw.chunks_exact(3).map(|c| c[1]).collect()
    } else {
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUFFER: &str = "AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAAAAABAAIAAAAAAAAAAACAPwAAAAAAAABAAAAAAAAAAAAAAIBAAAAAAA==";

    fn triangle_gltf() -> String {
        format!(
            r#"{{
  "asset": {{ "version": "2.0" }},
  "scene": 0,
  "scenes": [{{ "nodes": [0] }}],
  "nodes": [
    {{ "name": "root", "translation": [1.0, 0.0, 0.0], "children": [1] }},
    {{ "name": "tri", "mesh": 0, "translation": [0.0, 2.0, 0.0] }}
  ],
  "meshes": [{{ "primitives": [{{ "attributes": {{ "POSITION": 0 }}, "indices": 1, "material": 0 }}] }}],
  "materials": [{{ "pbrMetallicRoughness": {{ "baseColorFactor": [1.0, 0.0, 0.0, 1.0], "metallicFactor": 0.0, "roughnessFactor": 0.5 }} }}],
  "buffers": [{{ "byteLength": 76, "uri": "data:application/octet-stream;base64,{BUFFER}" }}],
  "bufferViews": [
    {{ "buffer": 0, "byteOffset": 0, "byteLength": 36, "target": 34962 }},
    {{ "buffer": 0, "byteOffset": 36, "byteLength": 6, "target": 34963 }},
    {{ "buffer": 0, "byteOffset": 44, "byteLength": 8 }},
    {{ "buffer": 0, "byteOffset": 52, "byteLength": 24 }}
  ],
  "accessors": [
    {{ "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3", "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] }},
    {{ "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }},
    {{ "bufferView": 2, "componentType": 5126, "count": 2, "type": "SCALAR", "min": [0.0], "max": [1.0] }},
    {{ "bufferView": 3, "componentType": 5126, "count": 2, "type": "VEC3" }}
  ],
  "animations": [{{
    "name": "bob",
    "samplers": [{{ "input": 2, "output": 3, "interpolation": "LINEAR" }}],
    "channels": [{{ "sampler": 0, "target": {{ "node": 1, "path": "translation" }} }}]
  }}]
}}"#
        )
    }

    #[test]
    fn loads_embedded_triangle() {
        let model = load_gltf_slice(triangle_gltf().as_bytes(), "tri.gltf").unwrap();
        assert_eq!(model.meshes.len(), 1);
        let prim = &model.meshes[0].primitives[0];
        assert_eq!(prim.mesh.indices, vec![0, 1, 2]);
        assert_eq!(prim.mesh.vertices[1].position, [1.0, 0.0, 0.0]);
        // No NORMAL attribute: default up.
        assert_eq!(prim.mesh.vertices[0].normal, [0.0, 1.0, 0.0]);
        assert_eq!(model.vertex_count(), 3);

        let mat = model.materials[prim.material.unwrap()];
        assert_eq!(mat.base_color, [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(mat.roughness, 0.5);
    }

    #[test]
    fn nodes_are_flattened_parent_first() {
        let model = load_gltf_slice(triangle_gltf().as_bytes(), "tri.gltf").unwrap();
        assert_eq!(model.nodes.len(), 2);
        assert_eq!(model.nodes[0].name.as_deref(), Some("root"));
        assert_eq!(model.nodes[0].parent, None);
        assert_eq!(model.nodes[1].parent, Some(0));
        assert_eq!(model.nodes[1].mesh, Some(0));
    }

    #[test]
    fn animation_drives_the_child_node() {
        let model = load_gltf_slice(triangle_gltf().as_bytes(), "tri.gltf").unwrap();
        assert_eq!(model.clips.len(), 1);
        assert_eq!(model.clips[0].name, "bob");
        assert_eq!(model.clips[0].duration, 1.0);
        assert_eq!(model.clips[0].channels[0].node, 1);

        let mut inst = model.instance(ModelId(3));
        assert!(inst.mixer.is_some());
        inst.advance(0.5);
        assert!((inst.nodes[1].local.translation.y - 3.0).abs() < 1e-5);
        let world = inst.world_matrices(corelib::Mat4::IDENTITY);
        let p = world[1].transform_point3(Vec3::ZERO);
        assert!((p - Vec3::new(1.0, 3.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn garbage_is_an_error() {
        let err = load_gltf_slice(b"not a model", "junk.glb").unwrap_err();
        assert!(format!("{err:#}").contains("junk.glb"));
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_gltf("/nonexistent/models/plane.glb").is_err());
    }

    #[test]
    fn cubic_spline_keeps_middle_values() {
        let raw = vec![1, 2, 3, 4, 5, 6];
        assert_eq!(key_values(raw.clone(), true), vec![2, 5]);
        assert_eq!(key_values(raw, false).len(), 6);
    }

    /// Binary glTF with one JSON and one BIN chunk.
    fn glb(json: &str, bin: &[u8]) -> Vec<u8> {
        let mut json = json.as_bytes().to_vec();
        json.resize(json.len().next_multiple_of(4), b' ');
        let mut bin = bin.to_vec();
        bin.resize(bin.len().next_multiple_of(4), 0);
        let total = 12 + 8 + json.len() + 8 + bin.len();

        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(b"glTF");
        out.extend_from_slice(&2u32.to_le_bytes());
        out.extend_from_slice(&(total as u32).to_le_bytes());
        out.extend_from_slice(&(json.len() as u32).to_le_bytes());
        out.extend_from_slice(b"JSON");
        out.extend_from_slice(&json);
        out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
        out.extend_from_slice(b"BIN\0");
        out.extend_from_slice(&bin);
        out
    }

    fn animated_glb(times: [f32; 2]) -> Vec<u8> {
        let json = r#"{
  "asset": { "version": "2.0" },
  "scene": 0,
  "scenes": [{ "nodes": [0] }],
  "nodes": [{ "name": "beacon" }],
  "buffers": [{ "byteLength": 32 }],
  "bufferViews": [
    { "buffer": 0, "byteOffset": 0, "byteLength": 8 },
    { "buffer": 0, "byteOffset": 8, "byteLength": 24 }
  ],
  "accessors": [
    { "bufferView": 0, "componentType": 5126, "count": 2, "type": "SCALAR", "min": [0.0], "max": [1.0] },
    { "bufferView": 1, "componentType": 5126, "count": 2, "type": "VEC3" }
  ],
  "animations": [{
    "samplers": [{ "input": 0, "output": 1 }],
    "channels": [{ "sampler": 0, "target": { "node": 0, "path": "translation" } }]
  }]
}"#;
        let mut bin = Vec::new();
        for v in times.into_iter().chain([0.0, 0.0, 0.0, 0.0, 1.0, 0.0]) {
            bin.extend_from_slice(&v.to_le_bytes());
        }
        glb(json, &bin)
    }

    #[test]
    fn glb_with_valid_keys_loads() {
        let model = load_gltf_slice(&animated_glb([0.0, 1.0]), "beacon.glb").unwrap();
        assert_eq!(model.clips[0].channels[0].times, vec![0.0, 1.0]);
    }

    #[test]
    fn malformed_key_times_fail_the_model() {
        for times in [[f32::NAN, 1.0], [1.0, 0.5], [0.0, f32::INFINITY]] {
            let err = load_gltf_slice(&animated_glb(times), "beacon.glb").unwrap_err();
            let msg = format!("{err:#}");
            assert!(msg.contains("beacon.glb"), "{msg}");
            assert!(msg.contains("key time"), "{msg}");
        }
    }

    #[test]
    fn key_time_checks() {
        assert!(check_key_times(&[]).is_ok());
        assert!(check_key_times(&[0.5]).is_ok());
        assert!(check_key_times(&[0.0, 0.0]).is_err());
        assert!(check_key_times(&[0.0, f32::NAN]).is_err());
    }

    #[test]
    fn draco_primitive_is_rejected_with_its_extension() {
        let json = r#"{
  "asset": { "version": "2.0" },
  "extensionsUsed": ["KHR_draco_mesh_compression"],
  "scene": 0,
  "scenes": [{ "nodes": [0] }],
  "nodes": [{ "mesh": 0 }],
  "meshes": [{ "primitives": [{
    "attributes": { "POSITION": 0 },
    "extensions": { "KHR_draco_mesh_compression": { "bufferView": 0, "attributes": { "POSITION": 0 } } }
  }] }],
  "buffers": [{ "byteLength": 4 }],
  "bufferViews": [{ "buffer": 0, "byteOffset": 0, "byteLength": 4 }],
  "accessors": [
    { "componentType": 5126, "count": 3, "type": "VEC3", "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] }
  ]
}"#;
        let err = load_gltf_slice(&glb(json, &[0; 4]), "hangar.glb").unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("hangar.glb"), "{msg}");
        assert!(msg.contains("Draco-compressed"), "{msg}");
    }
}
