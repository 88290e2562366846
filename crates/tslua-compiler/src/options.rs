/// Knobs for a compilation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileOptions {
    /// Chunk name recorded in the main prototype, e.g. `@main.ts`.
    /// `None` writes an absent source string.
    pub source: Option<String>,
    /// Omit the source name (and any debug tables) from the chunk.
    pub strip: bool,
}

impl CompileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source(mut self, name: impl Into<String>) -> Self {
        self.source = Some(name.into());
        self
    }

    pub fn strip(mut self, strip: bool) -> Self {
        self.strip = strip;
        self
    }
}
