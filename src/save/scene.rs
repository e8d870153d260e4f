//! Scene transition bridge
//!
//! Loading a save made in another scene has to wait for the engine to bring
//! that scene up. The bridge receives a `SceneLoadHandle` continuation and
//! completes it whenever the scene is ready, possibly frames later; the
//! coordinator keeps the matching `SceneLoad` and polls it.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

pub type SceneResult = Result<(), String>;

/// Asynchronous scene-loading service consumed by the coordinator
pub trait SceneBridge {
    /// Identifier of the scene that is currently loaded
    fn current_scene(&self) -> Option<String>;

    /// Start loading `scene_id` and complete `on_complete` when done
    fn load_scene(&mut self, scene_id: &str, on_complete: SceneLoadHandle);
}

/// Completion side of a scene load, handed to the bridge
#[derive(Debug)]
pub struct SceneLoadHandle {
    tx: Sender<SceneResult>,
}

impl SceneLoadHandle {
    pub fn complete(self, result: SceneResult) {
        // The coordinator may have shut down; nobody is left to tell.
        let _ = self.tx.send(result);
    }

    pub fn succeed(self) {
        self.complete(Ok(()))
    }

    pub fn fail(self, reason: impl Into<String>) {
        self.complete(Err(reason.into()))
    }
}

/// Waiting side of a scene load, kept by the coordinator
#[derive(Debug)]
pub struct SceneLoad {
    rx: Receiver<SceneResult>,
}

impl SceneLoad {
    /// `None` while the scene is still loading
    ///
    /// A handle dropped without completing counts as a failure.
    pub fn poll(&self) -> Option<SceneResult> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                Some(Err("scene loader dropped the request".to_string()))
            }
        }
    }
}

pub fn scene_load() -> (SceneLoadHandle, SceneLoad) {
    let (tx, rx) = mpsc::channel();
    (SceneLoadHandle { tx }, SceneLoad { rx })
}

/// Bridge for hosts without streaming: every scene is ready immediately
#[derive(Debug, Default, Clone)]
pub struct InstantSceneBridge {
    current: Option<String>,
}

impl InstantSceneBridge {
    pub fn new(current: Option<&str>) -> Self {
        InstantSceneBridge {
            current: current.map(str::to_string),
        }
    }
}

impl SceneBridge for InstantSceneBridge {
    fn current_scene(&self) -> Option<String> {
        self.current.clone()
    }

    fn load_scene(&mut self, scene_id: &str, on_complete: SceneLoadHandle) {
        self.current = Some(scene_id.to_string());
        on_complete.succeed();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_until_completed() {
        let (handle, load) = scene_load();
        assert_eq!(load.poll(), None);
        handle.succeed();
        assert_eq!(load.poll(), Some(Ok(())));
    }

    #[test]
    fn test_dropped_handle_is_failure() {
        let (handle, load) = scene_load();
        drop(handle);
        assert!(matches!(load.poll(), Some(Err(_))));
    }

    #[test]
    fn test_instant_bridge_switches_scene() {
        let mut bridge = InstantSceneBridge::new(Some("menu"));
        let (handle, load) = scene_load();
        bridge.load_scene("cavern", handle);
        assert_eq!(bridge.current_scene().as_deref(), Some("cavern"));
        assert_eq!(load.poll(), Some(Ok(())));
    }
}
