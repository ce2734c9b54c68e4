// src/scene.rs
//
// Boundary to the scene/mission descriptor generator. Descriptor content
// is opaque to the controller; the only semantic the lifecycle depends on
// is whether the scene is rebuilt from scratch (first episode ever) or
// produced as a cheap variant of the previous one.

/// Opaque scene/mission descriptor document handed to the host on start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneDescriptor {
    payload: String,
    full_rebuild: bool,
}

impl SceneDescriptor {
    pub fn new(payload: impl Into<String>, full_rebuild: bool) -> Self {
        Self {
            payload: payload.into(),
            full_rebuild,
        }
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn is_full_rebuild(&self) -> bool {
        self.full_rebuild
    }
}

/// Producer of scene descriptors and post-spawn setup commands.
///
/// Implementations live outside this crate (mission templating is someone
/// else's problem); [`StaticScene`] is the trivial stand-in used by the
/// sim harness and tests.
pub trait SceneSource {
    /// Build the descriptor for the next episode. `full_rebuild` is true
    /// only for the very first episode of a session's lifetime.
    fn descriptor(&self, full_rebuild: bool) -> SceneDescriptor;

    /// Commands sent fire-and-forget once the spawn precondition holds,
    /// before normal ticking begins. Default: none.
    fn setup_commands(&self) -> &[String] {
        &[]
    }
}

/// Trivial scene source with a fixed payload and optional setup commands.
#[derive(Debug, Clone, Default)]
pub struct StaticScene {
    payload: String,
    setup: Vec<String>,
}

impl StaticScene {
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            setup: Vec::new(),
        }
    }

    pub fn with_setup_commands(mut self, commands: Vec<String>) -> Self {
        self.setup = commands;
        self
    }
}

impl SceneSource for StaticScene {
    fn descriptor(&self, full_rebuild: bool) -> SceneDescriptor {
        SceneDescriptor::new(self.payload.clone(), full_rebuild)
    }

    fn setup_commands(&self) -> &[String] {
        &self.setup
    }
}
