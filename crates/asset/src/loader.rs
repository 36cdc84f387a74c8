//! Background decoding of scene assets.
//!
//! A small pool of worker threads pulls jobs from a shared channel, decodes
//! files off the main thread and posts the result to a completion queue.
//! Nothing here touches the GPU or the scene.

use std::path::PathBuf;
use std::sync::{Arc, mpsc};
use std::thread::{self, JoinHandle};

use anyhow::{Result, bail};
use corelib::loading::{CompletionSender, LoadId, LoadPurpose, PendingLoad, TextureSlot};
use parking_lot::Mutex;

use crate::cubemap::CubemapData;
use crate::model::{ModelData, load_gltf};
use crate::texture::{ColorSpace, Sampling, TextureData};

/// Decoded payload of one request.
#[derive(Debug)]
pub enum LoadedAsset {
    Model(Box<ModelData>),
    Texture(TextureSlot, TextureData),
    Environment(CubemapData),
}

struct Job {
    id: LoadId,
    paths: Vec<PathBuf>,
    purpose: LoadPurpose,
}

pub struct AssetLoader {
    jobs: Option<mpsc::Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl AssetLoader {
    /// Spawn `threads` workers (at least one) posting to `completions`.
    pub fn new(threads: usize, completions: CompletionSender<LoadedAsset>) -> Result<Self> {
        let (tx, rx) = mpsc::channel::<Job>();
        let rx = Arc::new(Mutex::new(rx));
        let mut workers = Vec::new();
        for i in 0..threads.max(1) {
            let rx = Arc::clone(&rx);
            let completions = completions.clone();
            let handle = thread::Builder::new()
                .name(format!("asset-loader-{i}"))
                .spawn(move || worker(rx, completions))?;
            workers.push(handle);
        }
        log::debug!("Asset loader started with {} workers", workers.len());
        Ok(Self {
            jobs: Some(tx),
            workers,
        })
    }

    /// Queue a request. Its completion arrives on the queue given at
    /// construction, in whatever order the workers finish.
    pub fn submit(&self, load: &PendingLoad) {
        let job = Job {
            id: load.id,
            paths: load.paths.clone(),
            purpose: load.purpose.clone(),
        };
        let sent = self.jobs.as_ref().is_some_and(|tx| tx.send(job).is_ok());
        if !sent {
            log::warn!("Asset loader stopped; dropping {}", load.label());
        }
    }
}

impl Drop for AssetLoader {
    fn drop(&mut self) {
        // Closing the channel lets idle workers exit.
        self.jobs.take();
        for w in self.workers.drain(..) {
            if w.join().is_err() {
                log::error!("asset loader worker panicked");
            }
        }
    }
}

fn worker(rx: Arc<Mutex<mpsc::Receiver<Job>>>, completions: CompletionSender<LoadedAsset>) {
    loop {
        let job = rx.lock().recv();
        let Ok(job) = job else {
            return;
        };
        let result = decode(&job.paths, &job.purpose).map_err(|e| format!("{e:#}"));
        if let Err(reason) = &result {
            log::warn!("Load {:?} failed: {reason}", job.id);
        }
        if !completions.send(job.id, result) {
            return;
        }
    }
}

/// Decode the files of one request according to its purpose.
pub fn decode(paths: &[PathBuf], purpose: &LoadPurpose) -> Result<LoadedAsset> {
    match purpose {
        LoadPurpose::Model { .. } => {
            let [path] = paths else {
                bail!("model request needs one path, got {}", paths.len());
            };
            Ok(LoadedAsset::Model(Box::new(load_gltf(path)?)))
        }
        LoadPurpose::Texture(slot, wrap) => {
            let [path] = paths else {
                bail!("texture request needs one path, got {}", paths.len());
            };
            let space = if slot.is_srgb() {
                ColorSpace::Srgb
            } else {
                ColorSpace::Linear
            };
            let tex = TextureData::load(path, space)?.with_sampling(Sampling::from(*wrap));
            Ok(LoadedAsset::Texture(*slot, tex))
        }
        LoadPurpose::Environment => Ok(LoadedAsset::Environment(CubemapData::load(paths)?)),
    }
}
