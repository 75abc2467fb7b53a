//! In-process hook invocation.

use core::any::Any;
use std::panic::{self, AssertUnwindSafe};

use preflight_plugin::{Plugin, PreCompileContext};

/// Runs a plugin's hook, converting errors and panics into a message.
pub(crate) fn invoke(plugin: &dyn Plugin, ctx: &PreCompileContext) -> Result<(), String> {
    match panic::catch_unwind(AssertUnwindSafe(|| plugin.on_pre_compile(ctx))) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(error)) => Err(error.to_string()),
        Err(payload) => Err(format!("panicked: {}", panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use preflight_plugin::{HookError, PluginMeta};

    struct Behaves(PluginMeta, u8);

    impl Plugin for Behaves {
        fn meta(&self) -> &PluginMeta {
            &self.0
        }

        fn on_pre_compile(&self, _ctx: &PreCompileContext) -> Result<(), HookError> {
            match self.1 {
                0 => Ok(()),
                1 => Err(HookError::msg("bad header")),
                2 => panic!("index out of range"),
                _ => panic::panic_any(42_u32),
            }
        }
    }

    fn run(mode: u8) -> Result<(), String> {
        let plugin = Behaves(PluginMeta::new("p", "P", "1").unwrap(), mode);
        invoke(&plugin, &PreCompileContext::new("."))
    }

    #[test]
    fn success_and_error() {
        assert_eq!(run(0), Ok(()));
        assert_eq!(run(1), Err("bad header".to_string()));
    }

    #[test]
    fn panics_are_caught() {
        assert_eq!(run(2), Err("panicked: index out of range".to_string()));
        assert_eq!(run(3), Err("panicked: unknown panic payload".to_string()));
    }
}
