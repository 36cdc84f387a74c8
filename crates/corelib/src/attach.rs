//! Attaching finished loads to the scene.
//!
//! Called between ticks only. An object is built completely (GPU upload
//! done by the caller, placement applied here) before it is inserted, so a
//! tick never sees a half-configured object.

use crate::error::{CoreError, CoreResult};
use crate::loading::{LoadId, LoadPolicy, LoadPurpose, LoadTable};
use crate::scene::{ModelInstance, ObjectId, ObjectKind, SceneObject, SceneState};
use crate::transform::Transform;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Attached {
    Object(ObjectId),
    /// Request already settled; the completion was ignored.
    Duplicate,
}

/// Place a loaded model at its requested offset and insert it.
pub fn attach_model(
    table: &mut LoadTable,
    scene: &mut SceneState,
    id: LoadId,
    instance: ModelInstance,
) -> CoreResult<Attached> {
    let pending = table.get(id)?;
    let (name, placement) = match &pending.purpose {
        LoadPurpose::Model { name, placement } => (name.clone(), *placement),
        other => {
            return Err(CoreError::LoadPurpose {
                id,
                expected: "model",
                actual: other.kind(),
            });
        }
    };

    if scene.contains_source(id) || !table.mark_loaded(id)? {
        log::warn!("Ignoring repeated completion for '{name}' ({id:?})");
        return Ok(Attached::Duplicate);
    }

    // Loaded roots sit at the origin, so the offset is the position.
    let mut transform = Transform::identity();
    transform.translate(placement);

    let mut object = SceneObject::new(name.clone(), ObjectKind::Model(instance))
        .with_transform(transform)
        .receiving_environment();
    object.source = Some(id);

    let object_id = scene.insert(object);
    scene.apply_environment();
    log::info!(
        "Attached model '{name}' at ({:.2}, {:.2}, {:.2}); {} objects in scene",
        placement.x,
        placement.y,
        placement.z,
        scene.len()
    );
    Ok(Attached::Object(object_id))
}

/// Record a settled non-model request (texture or environment).
pub fn settle_resource(table: &mut LoadTable, id: LoadId) -> CoreResult<bool> {
    let loaded = table.mark_loaded(id)?;
    if !loaded {
        log::warn!("Ignoring repeated completion for {id:?}");
    }
    Ok(loaded)
}

/// Record a failure. Best-effort logs and continues; fail-fast returns the
/// error so the caller can stop the loop.
pub fn record_failure(
    table: &mut LoadTable,
    id: LoadId,
    reason: &str,
    policy: LoadPolicy,
) -> CoreResult<()> {
    let path = table.get(id)?.label();
    if !table.mark_failed(id, reason)? {
        log::warn!("Ignoring late failure for '{path}': {reason}");
        return Ok(());
    }
    log::error!("Failed to load '{path}': {reason}");
    match policy {
        LoadPolicy::BestEffort => Ok(()),
        LoadPolicy::FailFast => Err(CoreError::LoadFailed {
            path,
            reason: reason.to_string(),
        }),
    }
}
