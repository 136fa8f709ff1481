use crate::error::{Error, Result};
use crate::sink::CompletionSink;
use std::sync::Arc;

/// Pool and queue configuration. All fields are read once at
/// construction.
#[derive(Clone)]
pub struct Config {
    /// Worker thread count; defaults to the hardware concurrency.
    pub thread_count: Option<usize>,
    /// Defer worker spawning until the first submission.
    pub lazy_init: bool,
    /// Worker thread name prefix.
    pub name: String,
    /// Worker thread stack size.
    pub stack_size: Option<usize>,
    /// Where completions are delivered. A pool without one runs
    /// completions inline on the delivering thread; a
    /// [`TaskQueue`](crate::TaskQueue) installs its own.
    pub complete: Option<Arc<dyn CompletionSink>>,
    /// Invoked after each buffered completion so a host event loop can
    /// be interrupted. Only meaningful for [`TaskQueue`](crate::TaskQueue).
    pub wakeup: Option<Arc<dyn Fn() + Send + Sync>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            thread_count: None,
            lazy_init: false,
            name: "taskforge-worker".to_string(),
            stack_size: Some(2 * 1024 * 1024),
            complete: None,
            wakeup: None,
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(n) = self.thread_count {
            if n == 0 {
                return Err(Error::config("thread_count must be > 0"));
            }
            if n > 1024 {
                return Err(Error::config("thread_count too large (max 1024)"));
            }
        }
        if self.name.is_empty() {
            return Err(Error::config("name must not be empty"));
        }
        Ok(())
    }

    pub fn worker_threads(&self) -> usize {
        self.thread_count.unwrap_or_else(num_cpus::get)
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("thread_count", &self.thread_count)
            .field("lazy_init", &self.lazy_init)
            .field("name", &self.name)
            .field("stack_size", &self.stack_size)
            .field("complete", &self.complete.is_some())
            .field("wakeup", &self.wakeup.is_some())
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn thread_count(mut self, n: usize) -> Self {
        self.config.thread_count = Some(n);
        self
    }

    pub fn lazy_init(mut self, lazy: bool) -> Self {
        self.config.lazy_init = lazy;
        self
    }

    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.config.name = name.into();
        self
    }

    pub fn stack_size(mut self, size: usize) -> Self {
        self.config.stack_size = Some(size);
        self
    }

    pub fn complete(mut self, sink: Arc<dyn CompletionSink>) -> Self {
        self.config.complete = Some(sink);
        self
    }

    pub fn wakeup<F>(mut self, wakeup: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.config.wakeup = Some(Arc::new(wakeup));
        self
    }

    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}
