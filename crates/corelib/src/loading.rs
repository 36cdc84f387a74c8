//! Bookkeeping for asynchronous asset requests.
//!
//! Every request gets a [`LoadId`] and an explicit [`LoadState`]. Workers
//! report back through a [`CompletionQueue`]; the main thread drains it
//! between ticks, so completions never overlap a frame.

use std::path::PathBuf;
use std::sync::mpsc;

use crate::Vec3;
use crate::error::{CoreError, CoreResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoadId(pub u32);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadState {
    Pending,
    Loaded,
    Failed(String),
}

/// Material slot of the floor a texture request feeds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureSlot {
    Color,
    Occlusion,
    Normal,
    Roughness,
}

impl TextureSlot {
    pub const ALL: [TextureSlot; 4] = [Self::Color, Self::Occlusion, Self::Normal, Self::Roughness];

    /// Only the color map carries sRGB-encoded values.
    pub fn is_srgb(self) -> bool {
        matches!(self, Self::Color)
    }
}

/// Edge behaviour a texture request asks for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TextureWrap {
    #[default]
    Clamp,
    Repeat,
}

/// What to do with an asset once it arrives.
#[derive(Clone, Debug, PartialEq)]
pub enum LoadPurpose {
    Model { name: String, placement: Vec3 },
    Texture(TextureSlot, TextureWrap),
    Environment,
}

impl LoadPurpose {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Model { .. } => "model",
            Self::Texture(..) => "texture",
            Self::Environment => "environment",
        }
    }
}

#[derive(Clone, Debug)]
pub struct PendingLoad {
    pub id: LoadId,
    /// One path, or six cube faces for an environment.
    pub paths: Vec<PathBuf>,
    pub purpose: LoadPurpose,
    pub state: LoadState,
}

impl PendingLoad {
    /// Short label for logs.
    pub fn label(&self) -> String {
        match self.paths.as_slice() {
            [one] => one.display().to_string(),
            [first, ..] => format!("{} (+{} more)", first.display(), self.paths.len() - 1),
            [] => format!("{:?}", self.id),
        }
    }
}

/// How a failed load affects the run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoadPolicy {
    /// Log and keep rendering without the asset.
    #[default]
    BestEffort,
    /// Stop the loop on the first failure.
    FailFast,
}

impl std::str::FromStr for LoadPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "best-effort" | "besteffort" | "lenient" => Ok(Self::BestEffort),
            "fail-fast" | "failfast" | "strict" => Ok(Self::FailFast),
            other => Err(format!("unknown load policy '{other}'")),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub pending: usize,
    pub loaded: usize,
    pub failed: usize,
}

/// All requests issued for a scene, in request order.
#[derive(Debug, Default)]
pub struct LoadTable {
    entries: Vec<PendingLoad>,
}

impl LoadTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&mut self, paths: Vec<PathBuf>, purpose: LoadPurpose) -> LoadId {
        let id = LoadId(self.entries.len() as u32);
        self.entries.push(PendingLoad {
            id,
            paths,
            purpose,
            state: LoadState::Pending,
        });
        id
    }

    pub fn get(&self, id: LoadId) -> CoreResult<&PendingLoad> {
        self.entries
            .get(id.0 as usize)
            .ok_or(CoreError::UnknownLoad(id))
    }

    /// Mark loaded. Returns `false` if the request had already settled.
    pub fn mark_loaded(&mut self, id: LoadId) -> CoreResult<bool> {
        let entry = self.entry_mut(id)?;
        if entry.state != LoadState::Pending {
            return Ok(false);
        }
        entry.state = LoadState::Loaded;
        Ok(true)
    }

    /// Mark failed. Returns `false` if the request had already settled.
    pub fn mark_failed(&mut self, id: LoadId, reason: impl Into<String>) -> CoreResult<bool> {
        let entry = self.entry_mut(id)?;
        if entry.state != LoadState::Pending {
            return Ok(false);
        }
        entry.state = LoadState::Failed(reason.into());
        Ok(true)
    }

    pub fn summary(&self) -> LoadSummary {
        self.entries
            .iter()
            .fold(LoadSummary::default(), |mut s, e| {
                match e.state {
                    LoadState::Pending => s.pending += 1,
                    LoadState::Loaded => s.loaded += 1,
                    LoadState::Failed(_) => s.failed += 1,
                }
                s
            })
    }

    pub fn is_settled(&self) -> bool {
        self.summary().pending == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingLoad> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry_mut(&mut self, id: LoadId) -> CoreResult<&mut PendingLoad> {
        self.entries
            .get_mut(id.0 as usize)
            .ok_or(CoreError::UnknownLoad(id))
    }
}

/// One finished request, successful or not.
#[derive(Debug)]
pub struct Completion<T> {
    pub id: LoadId,
    pub result: Result<T, String>,
}

/// Cloneable producer half handed to loader workers.
#[derive(Debug)]
pub struct CompletionSender<T> {
    tx: mpsc::Sender<Completion<T>>,
}

impl<T> Clone for CompletionSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> CompletionSender<T> {
    /// Post a completion. Returns false if the queue is gone (viewer closed).
    pub fn send(&self, id: LoadId, result: Result<T, String>) -> bool {
        if self.tx.send(Completion { id, result }).is_err() {
            log::debug!("completion for {id:?} dropped: queue closed");
            return false;
        }
        true
    }
}

/// Single-consumer queue of finished loads, drained on the main thread.
#[derive(Debug)]
pub struct CompletionQueue<T> {
    tx: mpsc::Sender<Completion<T>>,
    rx: mpsc::Receiver<Completion<T>>,
}

impl<T> CompletionQueue<T> {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx }
    }

    pub fn sender(&self) -> CompletionSender<T> {
        CompletionSender {
            tx: self.tx.clone(),
        }
    }

    /// Everything that has arrived so far, without blocking.
    pub fn drain(&self) -> impl Iterator<Item = Completion<T>> + '_ {
        self.rx.try_iter()
    }
}

impl<T> Default for CompletionQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
