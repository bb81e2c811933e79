//! Runtime host for theme-supplied script code.
//!
//! The QuickJS runtime lives on a dedicated thread and is driven over a
//! channel, so the async lifecycle paths never touch the interpreter
//! directly. A loaded theme script may expose two optional named
//! capabilities: `execute` (activation, possibly async) and `disable`
//! (deactivation, possibly async). Presence is probed at load time and
//! recorded as a [`HookSet`]; a hook is only ever invoked when present.

use serde::Deserialize;
use tokio::sync::{mpsc, oneshot};

/// Which of the two optional capabilities a loaded theme script exposes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HookSet {
    pub execute: bool,
    pub disable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    Execute,
    Disable,
}

impl HookKind {
    fn name(&self) -> &'static str {
        match self {
            HookKind::Execute => "execute",
            HookKind::Disable => "disable",
        }
    }
}

// Messages sent to the dedicated QuickJS thread
enum ScriptCommand {
    Load {
        code: String,
        reply: oneshot::Sender<Result<HookSet, String>>,
    },
    Invoke {
        hook: HookKind,
        reply: oneshot::Sender<Result<(), String>>,
    },
    Shutdown,
}

/// Settled state of one hook invocation, mirrored back from the interpreter.
#[derive(Deserialize)]
struct HookState {
    settled: bool,
    #[serde(default)]
    missing: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Handle to the QuickJS thread. Cheap to keep around for the lifetime of the
/// theme manager; dropping it shuts the thread down.
pub struct ScriptRuntime {
    tx: mpsc::Sender<ScriptCommand>,
}

impl ScriptRuntime {
    /// Spawns the interpreter thread.
    pub fn new() -> Self {
        let (tx, mut rx) = mpsc::channel::<ScriptCommand>(8);

        std::thread::spawn(move || {
            let rt = rquickjs::Runtime::new().expect("Failed to create QuickJS runtime");
            let ctx = rquickjs::Context::full(&rt).expect("Failed to create QuickJS context");

            while let Some(cmd) = rx.blocking_recv() {
                match cmd {
                    ScriptCommand::Load { code, reply } => {
                        let result = load_module(&rt, &ctx, &code);
                        let _ = reply.send(result);
                    }
                    ScriptCommand::Invoke { hook, reply } => {
                        let result = invoke_hook(&rt, &ctx, hook);
                        let _ = reply.send(result);
                    }
                    ScriptCommand::Shutdown => break,
                }
            }
            println!("[ThemeScripts] Script thread shut down.");
        });

        Self { tx }
    }

    /// Evaluates a theme script and reports which hooks it exposes. The
    /// previous script's module record is discarded first; teardown of the
    /// previous theme is the coordinator's job, not the interpreter's.
    pub async fn load(&self, code: &str) -> Result<HookSet, String> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(ScriptCommand::Load {
                code: code.to_string(),
                reply: reply_tx,
            })
            .await
            .map_err(|_| "script runtime unavailable".to_string())?;
        reply_rx
            .await
            .map_err(|_| "script runtime dropped the request".to_string())?
    }

    /// Invokes a hook and waits for it to settle, including any promise it
    /// returns. Rejections and thrown errors come back as `Err`.
    pub async fn invoke(&self, hook: HookKind) -> Result<(), String> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(ScriptCommand::Invoke {
                hook,
                reply: reply_tx,
            })
            .await
            .map_err(|_| "script runtime unavailable".to_string())?;
        reply_rx
            .await
            .map_err(|_| "script runtime dropped the request".to_string())?
    }
}

impl Default for ScriptRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ScriptRuntime {
    fn drop(&mut self) {
        let _ = self.tx.try_send(ScriptCommand::Shutdown);
    }
}

/// Runs queued interpreter jobs (promise reactions) until quiescent. Theme
/// scripts have no timers, so quiescence means every pending hook promise has
/// settled.
fn drain_jobs(rt: &rquickjs::Runtime) {
    while rt.is_job_pending() {
        if rt.execute_pending_job().is_err() {
            break;
        }
    }
}

fn load_module(
    rt: &rquickjs::Runtime,
    ctx: &rquickjs::Context,
    code: &str,
) -> Result<HookSet, String> {
    // The script runs inside a function scope; whatever `execute`/`disable`
    // it defines is captured into the module record probed below.
    let mut program = String::with_capacity(code.len() + 256);
    program.push_str("globalThis.__theme_module = {};\n(function () {\n");
    program.push_str(code);
    program.push_str(concat!(
        "\n;if (typeof execute === \"function\") ",
        "{ globalThis.__theme_module.execute = execute; }\n",
        "if (typeof disable === \"function\") ",
        "{ globalThis.__theme_module.disable = disable; }\n})();"
    ));

    ctx.with(|ctx| {
        ctx.eval::<(), _>(program.as_str())
            .map_err(|e| format!("{}", e))
    })?;
    drain_jobs(rt);

    let probe = concat!(
        "JSON.stringify({",
        " execute: typeof globalThis.__theme_module.execute === \"function\",",
        " disable: typeof globalThis.__theme_module.disable === \"function\"",
        " })"
    );
    let json = ctx.with(|ctx| {
        ctx.eval::<String, _>(probe)
            .map_err(|e| format!("{}", e))
    })?;
    let hooks: serde_json::Value =
        serde_json::from_str(&json).map_err(|e| format!("hook probe failed: {}", e))?;
    Ok(HookSet {
        execute: hooks["execute"].as_bool().unwrap_or(false),
        disable: hooks["disable"].as_bool().unwrap_or(false),
    })
}

fn invoke_hook(
    rt: &rquickjs::Runtime,
    ctx: &rquickjs::Context,
    hook: HookKind,
) -> Result<(), String> {
    // Route the call through a promise chain so sync and async hooks settle
    // the same way, then drain the job queue to run it to completion.
    let program = format!(
        concat!(
            "globalThis.__hook_state = {{ settled: false, missing: false, error: null }};\n",
            "(function () {{\n",
            "  var hook = globalThis.__theme_module && globalThis.__theme_module.{name};\n",
            "  if (typeof hook !== \"function\") {{\n",
            "    globalThis.__hook_state.settled = true;\n",
            "    globalThis.__hook_state.missing = true;\n",
            "    return;\n",
            "  }}\n",
            "  Promise.resolve().then(function () {{ return hook(); }}).then(\n",
            "    function () {{ globalThis.__hook_state.settled = true; }},\n",
            "    function (err) {{\n",
            "      globalThis.__hook_state.settled = true;\n",
            "      globalThis.__hook_state.error = String(err);\n",
            "    }}\n",
            "  );\n",
            "}})();"
        ),
        name = hook.name()
    );

    ctx.with(|ctx| {
        ctx.eval::<(), _>(program.as_str())
            .map_err(|e| format!("{}", e))
    })?;
    drain_jobs(rt);

    let json = ctx.with(|ctx| {
        ctx.eval::<String, _>("JSON.stringify(globalThis.__hook_state)")
            .map_err(|e| format!("{}", e))
    })?;
    let state: HookState =
        serde_json::from_str(&json).map_err(|e| format!("hook state unreadable: {}", e))?;

    if !state.settled {
        return Err(format!("{} hook did not settle", hook.name()));
    }
    if state.missing {
        // Callers check the HookSet first; a missing hook at this point is a
        // quiet no-op rather than a failure.
        return Ok(());
    }
    match state.error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn load_reports_exposed_hooks() {
        let runtime = ScriptRuntime::new();

        let both = runtime
            .load("function execute() {}\nfunction disable() {}")
            .await
            .unwrap();
        assert_eq!(
            both,
            HookSet {
                execute: true,
                disable: true
            }
        );

        let activate_only = runtime.load("function execute() {}").await.unwrap();
        assert_eq!(
            activate_only,
            HookSet {
                execute: true,
                disable: false
            }
        );

        let neither = runtime.load("var x = 1;").await.unwrap();
        assert_eq!(neither, HookSet::default());
    }

    #[tokio::test]
    async fn syntax_error_fails_the_load() {
        let runtime = ScriptRuntime::new();
        assert!(runtime.load("function execute( {").await.is_err());
    }

    #[tokio::test]
    async fn hooks_share_script_state() {
        let runtime = ScriptRuntime::new();
        let code = r#"
            var activated = false;
            function execute() { activated = true; }
            function disable() {
                if (!activated) { throw new Error("never activated"); }
            }
        "#;
        let hooks = runtime.load(code).await.unwrap();
        assert!(hooks.execute && hooks.disable);

        runtime.invoke(HookKind::Execute).await.unwrap();
        runtime.invoke(HookKind::Disable).await.unwrap();
    }

    #[tokio::test]
    async fn throwing_hook_surfaces_the_error() {
        let runtime = ScriptRuntime::new();
        runtime
            .load(r#"function execute() { throw new Error("boom"); }"#)
            .await
            .unwrap();
        let err = runtime.invoke(HookKind::Execute).await.unwrap_err();
        assert!(err.contains("boom"), "{}", err);
    }

    #[tokio::test]
    async fn async_hooks_run_to_completion() {
        let runtime = ScriptRuntime::new();
        let code = r#"
            var done = false;
            async function execute() {
                await Promise.resolve();
                await Promise.resolve();
                done = true;
            }
            function disable() {
                if (!done) { throw new Error("execute had not finished"); }
            }
        "#;
        runtime.load(code).await.unwrap();
        runtime.invoke(HookKind::Execute).await.unwrap();
        runtime.invoke(HookKind::Disable).await.unwrap();
    }

    #[tokio::test]
    async fn async_rejection_surfaces_the_error() {
        let runtime = ScriptRuntime::new();
        runtime
            .load(r#"async function execute() { throw new Error("late boom"); }"#)
            .await
            .unwrap();
        let err = runtime.invoke(HookKind::Execute).await.unwrap_err();
        assert!(err.contains("late boom"), "{}", err);
    }

    #[tokio::test]
    async fn loading_replaces_the_previous_module() {
        let runtime = ScriptRuntime::new();
        runtime
            .load("function execute() {}\nfunction disable() {}")
            .await
            .unwrap();
        let hooks = runtime.load("var quiet = true;").await.unwrap();
        assert_eq!(hooks, HookSet::default());
        // Invoking against the replaced module is a no-op, not a failure.
        runtime.invoke(HookKind::Execute).await.unwrap();
    }
}
