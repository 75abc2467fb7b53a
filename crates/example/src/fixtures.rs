//! Misbehaving plugins for exercising the process sandbox.
//!
//! Each fixture does one thing: succeed, fail, hang, crash or exhaust a
//! resource. They only make sense inside a worker process; running
//! `crasher` in-process aborts the host.

use core::time::Duration;
use std::fs;
use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

use preflight_plugin::{HookError, MetaError, Plugin, PluginMeta, PreCompileContext};

/// File the `sleeper` fixture writes its pid into, relative to the project root.
pub const SLEEPER_PID_FILE: &str = "sleeper.pid";

/// File the `big-writer` fixture writes, relative to the project root.
pub const BIG_FILE: &str = "big.bin";

/// Every fixture id.
pub const IDS: [&str; 7] = [
    "ok",
    "failer",
    "sleeper",
    "crasher",
    "memory-hog",
    "big-writer",
    "spinner",
];

#[derive(Debug, Clone, Copy)]
enum Behavior {
    Succeed,
    Fail,
    Sleep,
    Abort,
    Allocate,
    WriteBig,
    Spin,
}

/// A fixture plugin.
pub struct Fixture {
    meta: PluginMeta,
    behavior: Behavior,
}

impl Fixture {
    /// Builds the fixture named `id`, or `None` for unknown ids.
    pub fn by_id(id: &str) -> Option<Result<Self, MetaError>> {
        let behavior = match id {
            "ok" => Behavior::Succeed,
            "failer" => Behavior::Fail,
            "sleeper" => Behavior::Sleep,
            "crasher" => Behavior::Abort,
            "memory-hog" => Behavior::Allocate,
            "big-writer" => Behavior::WriteBig,
            "spinner" => Behavior::Spin,
            _ => return None,
        };
        Some(PluginMeta::new(id, id, "0.1.0").map(|meta| Self {
            meta: meta.with_tags(["fixture"]),
            behavior,
        }))
    }

    /// Builds the fixture named `id` as a shareable plugin.
    pub fn plugin(id: &str) -> Option<Arc<dyn Plugin>> {
        match Self::by_id(id)? {
            Ok(fixture) => Some(Arc::new(fixture)),
            Err(error) => {
                tracing::error!(id, %error, "invalid fixture");
                None
            }
        }
    }
}

impl Plugin for Fixture {
    fn meta(&self) -> &PluginMeta {
        &self.meta
    }

    fn on_pre_compile(&self, ctx: &PreCompileContext) -> Result<(), HookError> {
        match self.behavior {
            Behavior::Succeed => Ok(()),
            Behavior::Fail => Err(HookError::msg("deliberate failure")),
            Behavior::Sleep => {
                fs::write(
                    ctx.project_root().join(SLEEPER_PID_FILE),
                    std::process::id().to_string(),
                )?;
                std::thread::sleep(Duration::from_secs(30));
                Ok(())
            }
            Behavior::Abort => std::process::abort(),
            Behavior::Allocate => {
                let block = vec![1u8; 1 << 30];
                tracing::info!(bytes = std::hint::black_box(&block).len(), "allocated");
                Ok(())
            }
            Behavior::WriteBig => {
                let mut file = fs::File::create(ctx.project_root().join(BIG_FILE))?;
                let chunk = vec![0u8; 1 << 20];
                for _ in 0..8 {
                    file.write_all(&chunk)?;
                }
                Ok(())
            }
            Behavior::Spin => {
                let start = Instant::now();
                let mut acc = 0u64;
                while start.elapsed() < Duration::from_secs(30) {
                    acc = std::hint::black_box(acc.wrapping_mul(31).wrapping_add(7));
                }
                tracing::info!(acc, "spin finished");
                Ok(())
            }
        }
    }
}
