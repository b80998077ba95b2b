//! Timer globals (`enableTimers`).
//!
//! ```lua
//! local h = setTimeout(function(name) print("hi " .. name) end, 100, "bob")
//! local i = setInterval(tick, 1000)
//! clearTimeout(h); clearInterval(i)
//! ```
//!
//! Each timer is a tokio task; its callback re-enters Lua through the call
//! gate. Handles are numeric and never reused within one runtime.

use mlua::prelude::*;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

use super::call_gate::CallGate;

/// Lower bound for interval periods.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Live timers of one runtime, by handle.
#[derive(Default)]
pub struct TimerRegistry {
    next_id: u64,
    timers: HashMap<u64, AbortHandle>,
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn insert(&mut self, id: u64, handle: AbortHandle) {
        self.timers.insert(id, handle);
    }

    /// Forget a timer that completed on its own.
    fn finish(&mut self, id: u64) {
        self.timers.remove(&id);
    }

    /// Cancel a timer. Unknown or expired handles are ignored.
    pub fn cancel(&mut self, id: u64) -> bool {
        match self.timers.remove(&id) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn abort_all(&mut self) {
        for (_, handle) in self.timers.drain() {
            handle.abort();
        }
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}

pub type SharedTimers = Arc<Mutex<TimerRegistry>>;

fn lock_timers(timers: &SharedTimers) -> LuaResult<std::sync::MutexGuard<'_, TimerRegistry>> {
    timers
        .lock()
        .map_err(|e| LuaError::external(format!("timer registry lock poisoned: {}", e)))
}

/// Delay in milliseconds as given by a script; missing, negative or NaN is zero.
fn delay_from(ms: Option<f64>) -> Duration {
    Duration::from_millis(ms.unwrap_or(0.0).max(0.0) as u64)
}

/// Handle argument of `clearTimeout`/`clearInterval`; anything else is ignored.
fn handle_from(value: &LuaValue) -> Option<u64> {
    match value {
        LuaValue::Integer(i) => u64::try_from(*i).ok(),
        LuaValue::Number(n) if n.fract() == 0.0 && *n >= 0.0 => Some(*n as u64),
        _ => None,
    }
}

pub fn register_timers_api(
    lua: &Lua,
    globals: &LuaTable,
    gate: CallGate,
    timers: SharedTimers,
    handle: Handle,
) -> LuaResult<()> {
    for (name, repeat) in [("setTimeout", false), ("setInterval", true)] {
        let gate = gate.clone();
        let timers = Arc::clone(&timers);
        let handle = handle.clone();
        let set_fn = lua.create_function(
            move |lua, (callback, ms, args): (LuaFunction, Option<f64>, LuaVariadic<LuaValue>)| {
                schedule(
                    lua,
                    &gate,
                    &timers,
                    &handle,
                    callback,
                    delay_from(ms),
                    args,
                    repeat,
                )
            },
        )?;
        globals.set(name, set_fn)?;
    }

    for name in ["clearTimeout", "clearInterval"] {
        let timers = Arc::clone(&timers);
        let clear_fn = lua.create_function(move |_, id: LuaValue| {
            if let Some(id) = handle_from(&id) {
                lock_timers(&timers)?.cancel(id);
            }
            Ok(())
        })?;
        globals.set(name, clear_fn)?;
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn schedule(
    lua: &Lua,
    gate: &CallGate,
    timers: &SharedTimers,
    handle: &Handle,
    callback: LuaFunction,
    delay: Duration,
    args: LuaVariadic<LuaValue>,
    repeat: bool,
) -> LuaResult<u64> {
    let callback = lua.create_registry_value(callback)?;
    let packed = lua.create_table()?;
    packed.set("n", args.len())?;
    for (i, arg) in args.iter().enumerate() {
        packed.raw_set(i + 1, arg.clone())?;
    }
    let args = lua.create_registry_value(packed)?;

    let gate = gate.clone();
    let task_timers = Arc::clone(timers);

    // Held across spawn so the task cannot finish before it is registered.
    let mut registry = lock_timers(timers)?;
    let id = registry.allocate();

    let task = handle.spawn(async move {
        if repeat {
            let period = delay.max(MIN_INTERVAL);
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !fire(&gate, id, &callback, &args).await {
                    break;
                }
            }
        } else {
            tokio::time::sleep(delay).await;
            fire(&gate, id, &callback, &args).await;
        }
        if let Ok(mut registry) = task_timers.lock() {
            registry.finish(id);
        }
    });

    registry.insert(id, task.abort_handle());
    debug!(timer = id, ?delay, repeat, "Scheduled timer");
    Ok(id)
}

/// Run one timer callback. Returns `false` once the runtime is gone.
async fn fire(gate: &CallGate, id: u64, callback: &LuaRegistryKey, args: &LuaRegistryKey) -> bool {
    let Ok(lua) = gate.enter().await else {
        return false;
    };

    let result = async {
        let callback: LuaFunction = lua.registry_value(callback)?;
        let packed: LuaTable = lua.registry_value(args)?;
        let count: i64 = packed.raw_get("n")?;
        let args = (1..=count)
            .map(|i| packed.raw_get::<LuaValue>(i))
            .collect::<LuaResult<LuaMultiValue>>()?;
        callback.call_async::<()>(args).await
    }
    .await;

    if let Err(e) = result {
        warn!(timer = id, "Timer callback failed: {}", e);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn make_gate() -> (CallGate, SharedTimers) {
        let lua = Lua::new();
        let gate = CallGate::new();
        let timers: SharedTimers = Arc::new(Mutex::new(TimerRegistry::new()));
        register_timers_api(
            &lua,
            &lua.globals(),
            gate.clone(),
            Arc::clone(&timers),
            Handle::current(),
        )
        .unwrap();
        gate.open(lua).unwrap();
        (gate, timers)
    }

    async fn run(gate: &CallGate, src: &str) {
        let lua = gate.enter().await.unwrap();
        lua.load(src).exec_async().await.unwrap();
    }

    async fn global_i64(gate: &CallGate, name: &str) -> i64 {
        let lua = gate.enter().await.unwrap();
        lua.globals().get::<Option<i64>>(name).unwrap().unwrap_or(0)
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_fires_once_with_args() {
        let (gate, timers) = make_gate().await;
        run(
            &gate,
            "hits = 0; setTimeout(function(a, b) hits = hits + a + b end, 100, 2, 3)",
        )
        .await;

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(global_i64(&gate, "hits").await, 0);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(global_i64(&gate, "hits").await, 5);
        assert!(timers.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_repeats_until_cleared() {
        let (gate, _timers) = make_gate().await;
        run(
            &gate,
            r#"
            ticks = 0
            handle = setInterval(function()
                ticks = ticks + 1
                if ticks == 3 then clearInterval(handle) end
            end, 10)
        "#,
        )
        .await;

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(global_i64(&gate, "ticks").await, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_unknown_handle_is_noop() {
        let (gate, _timers) = make_gate().await;
        run(&gate, "clearTimeout(999); clearInterval('nope'); clearTimeout(nil)").await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleared_timeout_never_fires() {
        let (gate, _timers) = make_gate().await;
        run(
            &gate,
            "fired = 0; local h = setTimeout(function() fired = 1 end, 10); clearTimeout(h)",
        )
        .await;

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(global_i64(&gate, "fired").await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_all_stops_pending_timers() {
        let (gate, timers) = make_gate().await;
        run(
            &gate,
            "fired = 0; setTimeout(function() fired = 1 end, 10); setInterval(function() fired = 2 end, 10)",
        )
        .await;
        assert_eq!(timers.lock().unwrap().len(), 2);

        timers.lock().unwrap().abort_all();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(global_i64(&gate, "fired").await, 0);
    }

    #[test]
    fn test_delay_parsing() {
        assert_eq!(delay_from(None), Duration::ZERO);
        assert_eq!(delay_from(Some(-5.0)), Duration::ZERO);
        assert_eq!(delay_from(Some(f64::NAN)), Duration::ZERO);
        assert_eq!(delay_from(Some(250.0)), Duration::from_millis(250));
    }
}
