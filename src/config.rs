//! Arbor - Engine configuration

/// Default search depth in plies
pub const DEFAULT_DEPTH: u32 = 4;

/// Settings for a game session
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Plies searched for each engine move
    pub depth: u32,
    /// Precomputation worker threads, 0 for one per logical CPU
    pub threads: usize,
    /// Analyse the opponent's replies after each engine move
    pub precompute: bool,
}

impl EngineConfig {
    pub fn new(depth: u32) -> Self {
        EngineConfig {
            depth,
            ..EngineConfig::default()
        }
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_precompute(mut self, precompute: bool) -> Self {
        self.precompute = precompute;
        self
    }

    /// Number of worker threads to start
    pub fn worker_count(&self) -> usize {
        if self.threads == 0 {
            num_cpus::get().max(1)
        } else {
            self.threads
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            depth: DEFAULT_DEPTH,
            threads: 0,
            precompute: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_count() {
        assert!(EngineConfig::default().worker_count() >= 1);
        assert_eq!(EngineConfig::new(3).with_threads(5).worker_count(), 5);
    }

    #[test]
    fn test_builder() {
        let config = EngineConfig::new(2).with_precompute(false);
        assert_eq!(config.depth, 2);
        assert!(!config.precompute);
        assert_eq!(config.threads, 0);
    }
}
