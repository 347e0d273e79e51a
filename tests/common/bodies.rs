//! Fixture handler bodies
//!
//! Each body mimics one style of device glue: immediate publishers, suspending
//! network calls, legacy fire() accessors and the failure modes around them.

use accessor_core::error::{BodyError, HandlerError};
use accessor_core::registry::{BodyCatalog, HandlerToken};
use accessor_core::runtime::{AccessorBody, BodyScope, Handler};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

pub mod codes {
    pub const THERMOMETER: &str = "climate/thermometer";
    pub const POWER_SWITCH: &str = "home/power-switch";
    pub const FAILING_INIT: &str = "climate/failing-init";
    pub const FIRE_ADDER: &str = "legacy/fire-adder";
    pub const LATE_FAILURE: &str = "home/late-failure";
    pub const PANICKING: &str = "home/panicking";
    pub const SILENT: &str = "climate/silent";
    pub const FAILING_BODY: &str = "broken/failing-body";
    pub const UNKNOWN_PORT: &str = "broken/unknown-port";
    pub const DUPLICATE_HANDLER: &str = "broken/duplicate-handler";
    pub const PANICKING_BODY: &str = "broken/panicking-body";
    pub const PROJECTOR: &str = "display/projector";
    pub const SPAWNER: &str = "home/spawner";
    pub const SELF_REMOVING: &str = "home/self-removing";
    pub const FAILING_WRAPUP: &str = "home/failing-wrapup";
    pub const FAN_OUT: &str = "test/fan-out";
}

pub fn register_fixture_bodies(catalog: &BodyCatalog) {
    catalog.register(codes::THERMOMETER, thermometer);
    catalog.register(codes::POWER_SWITCH, power_switch);
    catalog.register(codes::FAILING_INIT, failing_init);
    catalog.register(codes::FIRE_ADDER, fire_adder);
    catalog.register(codes::LATE_FAILURE, late_failure);
    catalog.register(codes::PANICKING, panicking);
    catalog.register(codes::SILENT, silent);
    catalog.register(codes::FAILING_BODY, failing_body);
    catalog.register(codes::UNKNOWN_PORT, unknown_port);
    catalog.register(codes::DUPLICATE_HANDLER, duplicate_handler);
    catalog.register(codes::PANICKING_BODY, panicking_body);
    catalog.register(codes::PROJECTOR, Projector);
    catalog.register(codes::SPAWNER, spawner);
    catalog.register(codes::SELF_REMOVING, self_removing);
    catalog.register(codes::FAILING_WRAPUP, failing_wrapup);
    catalog.register(codes::FAN_OUT, fan_out);
}

fn thermometer(scope: &mut BodyScope<'_>) -> Result<(), BodyError> {
    scope
        .port("Temperature")?
        .on_output(Handler::direct("sample", |ctx, _| {
            ctx.publish("Temperature", json!(21.5));
            Ok(None)
        }))?;
    Ok(())
}

/// Two handlers on `Power`: a slow suspending one registered first, then a direct one
fn power_switch(scope: &mut BodyScope<'_>) -> Result<(), BodyError> {
    let power = scope.port("Power")?;
    power.on_input(Handler::suspending("relay", |_ctx, value| async move {
        tokio::time::sleep(Duration::from_millis(40)).await;
        Ok(Some(json!({"relay": value})))
    }))?;
    power.on_input(Handler::direct("indicator", |_ctx, value| {
        Ok(Some(json!({"indicator": value})))
    }))?;
    Ok(())
}

fn failing_init(scope: &mut BodyScope<'_>) -> Result<(), BodyError> {
    thermometer(scope)?;
    scope.define_init(Handler::direct("connect", |_ctx, _| {
        Err(HandlerError::device("GET /status", "connection refused"))
    }));
    Ok(())
}

/// Legacy style: one fire() handler recomputes the output from every input
fn fire_adder(scope: &mut BodyScope<'_>) -> Result<(), BodyError> {
    fn sum(ctx: &accessor_core::runtime::HandlerContext) -> Value {
        let operand = |port| ctx.get(port).and_then(|v| v.as_f64()).unwrap_or(0.0);
        json!(operand("A") + operand("B"))
    }

    scope.add_fire_handler(Handler::direct("fire", |ctx, _| {
        ctx.publish("Sum", sum(ctx));
        Ok(None)
    }))?;
    scope.add_output_handler(
        "Sum",
        Handler::direct("latest", |ctx, _| {
            ctx.publish("Sum", sum(ctx));
            Ok(None)
        }),
    )?;
    Ok(())
}

/// A handler failing after it resumed, next to one that would run for a long time
fn late_failure(scope: &mut BodyScope<'_>) -> Result<(), BodyError> {
    scope.add_input_handler(
        "Power",
        Handler::suspending("flaky", |_ctx, _| async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Err(HandlerError::failed("bridge went away"))
        }),
    )?;
    scope.add_input_handler(
        "Power",
        Handler::suspending("long_poll", |_ctx, _| async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(Some(json!("too late")))
        }),
    )?;
    Ok(())
}

fn panicking(scope: &mut BodyScope<'_>) -> Result<(), BodyError> {
    scope.add_input_handler(
        "Power",
        Handler::direct("driver", |_ctx, _| panic!("driver bug")),
    )?;
    Ok(())
}

/// Output handler that never publishes
fn silent(scope: &mut BodyScope<'_>) -> Result<(), BodyError> {
    scope.add_output_handler("Temperature", Handler::direct("noop", |_ctx, _| Ok(None)))?;
    Ok(())
}

fn failing_body(scope: &mut BodyScope<'_>) -> Result<(), BodyError> {
    scope.log().info("configuring");
    Err(BodyError::failed("bridge address is not a URL"))
}

fn unknown_port(scope: &mut BodyScope<'_>) -> Result<(), BodyError> {
    scope
        .port("Volume")?
        .on_input(Handler::direct("volume", |_ctx, _| Ok(None)))?;
    Ok(())
}

fn duplicate_handler(scope: &mut BodyScope<'_>) -> Result<(), BodyError> {
    let handler = Handler::direct("power", |_ctx, _| Ok(None));
    scope.add_input_handler("Power", handler.clone())?;
    scope.add_input_handler("Power", handler)?;
    Ok(())
}

fn panicking_body(_scope: &mut BodyScope<'_>) -> Result<(), BodyError> {
    panic!("body crashed while loading")
}

/// Projector with required configuration, a select input and lifecycle functions
pub struct Projector;

impl AccessorBody for Projector {
    fn execute(&self, scope: &mut BodyScope<'_>) -> Result<(), BodyError> {
        let device_url = scope
            .require_parameter("device_url")?
            .as_str()
            .ok_or_else(|| BodyError::Parameter {
                name: "device_url".to_string(),
                reason: "must be a string".to_string(),
            })?
            .to_string();

        scope.port("Power")?.on_input(Handler::direct("power", move |ctx, value| {
            ctx.log().info(&format!("PUT {device_url}/power {value:?}"));
            Ok(None)
        }))?;

        let input = scope.port("Input")?;
        input.on_input(Handler::direct("select", |_ctx, value| {
            match value.as_ref().and_then(Value::as_str) {
                Some("HDMI") | Some("VGA") => Ok(None),
                other => Err(HandlerError::invalid_value("Input", format!("{other:?} is not a source"))),
            }
        }))?;
        input.on_output(Handler::direct("current", |ctx, _| {
            let current = ctx
                .get("Input")
                .or_else(|| ctx.parameter("default_input").cloned())
                .unwrap_or(Value::Null);
            ctx.publish("Input", current);
            Ok(None)
        }))?;

        scope.define_init(Handler::direct("connect", |ctx, _| {
            ctx.require_parameter("device_url")?;
            Ok(None)
        }));
        scope.define_wrapup(Handler::direct("disconnect", |_ctx, _| Ok(None)));
        Ok(())
    }
}

/// Accepts immediately and fails later in background work started in the same dispatch
fn spawner(scope: &mut BodyScope<'_>) -> Result<(), BodyError> {
    scope.add_input_handler(
        "Power",
        Handler::direct("accept", |ctx, _| {
            ctx.spawn(async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Err(HandlerError::failed("background refresh failed"))
            });
            Ok(Some(json!("accepted")))
        }),
    )?;
    Ok(())
}

/// `Power` handler that removes itself on first use; `Trigger` re-installs it
fn self_removing(scope: &mut BodyScope<'_>) -> Result<(), BodyError> {
    let token: Arc<Mutex<Option<HandlerToken>>> = Arc::new(Mutex::new(None));

    let once_token = Arc::clone(&token);
    let once = Handler::direct("once", move |ctx, _| {
        if let Some(token) = once_token.lock().take() {
            ctx.remove_handler(&token)
                .map_err(|e| HandlerError::failed(e.to_string()))?;
        }
        Ok(Some(json!("fired")))
    });

    *token.lock() = Some(scope.add_input_handler("Power", once.clone())?);

    let reinstall_token = Arc::clone(&token);
    scope.add_input_handler(
        "Trigger",
        Handler::direct("reinstall", move |ctx, _| {
            let installed = ctx
                .add_input_handler("Power", once.clone())
                .map_err(|e| HandlerError::failed(e.to_string()))?;
            *reinstall_token.lock() = Some(installed);
            Ok(None)
        }),
    )?;
    Ok(())
}

fn failing_wrapup(scope: &mut BodyScope<'_>) -> Result<(), BodyError> {
    scope.define_wrapup(Handler::suspending("disconnect", |_ctx, _| async {
        tokio::task::yield_now().await;
        Err(HandlerError::device("DELETE /session", "session already closed"))
    }));
    Ok(())
}

/// `handlers` direct handlers on `Power`, handler `i` answering `i`
fn fan_out(scope: &mut BodyScope<'_>) -> Result<(), BodyError> {
    let count = scope
        .require_parameter("handlers")?
        .as_u64()
        .ok_or_else(|| BodyError::Parameter {
            name: "handlers".to_string(),
            reason: "must be a non-negative integer".to_string(),
        })?;

    for i in 0..count {
        scope.add_input_handler(
            "Power",
            Handler::direct(format!("fan_{i}"), move |_ctx, _| Ok(Some(json!(i)))),
        )?;
    }
    Ok(())
}
