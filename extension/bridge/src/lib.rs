//! In-page bridge between injected wallet providers and `wallet listen`.
//!
//! Loaded into the page that has the wallet extensions injected. On start it
//! reads `window.walletBridge = { url?, token }`, probes the known injection
//! points, and relays host requests to the provider objects it found.

pub mod probe;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use js_sys::{Array, Function, Object, Promise, Reflect, Uint8Array};
use serde_json::Value;
use wallet_protocol::{BridgeMessage, HostMessage, InjectedProvider, ProviderFlags};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{CloseEvent, ErrorEvent, MessageEvent, WebSocket};

use crate::probe::CallStyle;

const DEFAULT_URL: &str = "ws://127.0.0.1:9271/";
const CONFIG_GLOBAL: &str = "walletBridge";
const MAX_DEPTH: usize = 8;

thread_local! {
    static BRIDGE: RefCell<Option<Rc<Bridge>>> = RefCell::new(None);
}

struct Bridge {
    ws: WebSocket,
    /// Every probed path, aliases included.
    objects: HashMap<String, JsValue>,
}

struct Found {
    provider: InjectedProvider,
    object: JsValue,
    /// First path this object was seen at; events are forwarded for it only.
    canonical: bool,
}

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();

    let Some(window) = web_sys::window() else {
        return;
    };
    let config = Reflect::get(&window, &JsValue::from_str(CONFIG_GLOBAL)).unwrap_or(JsValue::UNDEFINED);
    if !config.is_object() {
        return;
    }
    let url = string_prop(&config, "url").unwrap_or_else(|| DEFAULT_URL.to_string());
    let Some(token) = string_prop(&config, "token") else {
        log("walletBridge.token missing; call connect() manually");
        return;
    };
    if let Err(err) = connect(&url, &token) {
        log(&format!("bridge failed to start: {err:?}"));
    }
}

/// Opens the host connection and announces the providers found on `window`.
#[wasm_bindgen]
pub fn connect(url: &str, token: &str) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let found = probe_window(&window);

    let ws = WebSocket::new(url)?;
    let bridge = Rc::new(Bridge {
        ws,
        objects: found.iter().map(|f| (f.provider.path.clone(), f.object.clone())).collect(),
    });
    BRIDGE.with(|slot| {
        if let Some(previous) = slot.borrow_mut().replace(Rc::clone(&bridge)) {
            let _ = previous.ws.close();
        }
    });

    {
        let bridge_for_open = Rc::clone(&bridge);
        let token = token.to_string();
        let onopen = Closure::<dyn FnMut()>::new(move || {
            let bridge = &bridge_for_open;
            let hello = BridgeMessage::Hello {
                token: token.clone(),
                providers: found.iter().map(|f| f.provider.clone()).collect(),
            };
            if let Err(err) = send(&bridge.ws, &hello) {
                log(&format!("hello failed: {err:?}"));
                return;
            }
            for f in found.iter().filter(|f| f.canonical) {
                if let Err(err) = subscribe(bridge, &f.provider.path, &f.object) {
                    log(&format!("cannot watch {}: {err:?}", f.provider.path));
                }
            }
        });
        bridge.ws.set_onopen(Some(onopen.as_ref().unchecked_ref()));
        onopen.forget();
    }

    {
        let bridge_for_msg = Rc::clone(&bridge);
        let onmessage = Closure::<dyn FnMut(MessageEvent)>::new(move |event: MessageEvent| {
            let Some(text) = event.data().as_string() else {
                return;
            };
            let bridge = Rc::clone(&bridge_for_msg);
            wasm_bindgen_futures::spawn_local(async move {
                if let Err(err) = handle_host_message(&bridge, &text).await {
                    log(&format!("host message failed: {err:?}"));
                }
            });
        });
        bridge.ws.set_onmessage(Some(onmessage.as_ref().unchecked_ref()));
        onmessage.forget();
    }

    let onerror = Closure::<dyn FnMut(ErrorEvent)>::new(|e: ErrorEvent| {
        log(&format!("websocket error: {}", e.message()));
    });
    bridge.ws.set_onerror(Some(onerror.as_ref().unchecked_ref()));
    onerror.forget();

    let onclose = Closure::<dyn FnMut(CloseEvent)>::new(|e: CloseEvent| {
        log(&format!("host connection closed ({})", e.code()));
    });
    bridge.ws.set_onclose(Some(onclose.as_ref().unchecked_ref()));
    onclose.forget();

    Ok(())
}

async fn handle_host_message(bridge: &Bridge, text: &str) -> Result<(), JsValue> {
    let msg: HostMessage = serde_json::from_str(text).map_err(|e| JsValue::from_str(&e.to_string()))?;
    match msg {
        HostMessage::Welcome { version } => log(&format!("attached to wallet host {version}")),
        HostMessage::Rejected { reason } => {
            log(&format!("rejected by wallet host: {reason}"));
            let _ = bridge.ws.close();
        }
        HostMessage::Request {
            id,
            path,
            method,
            params,
        } => {
            let outcome = match bridge.objects.get(&path) {
                Some(object) => call(object, CallStyle::for_path(&path), &method, &params)
                    .await
                    .map_err(|thrown| to_rpc_error(&thrown)),
                None => Err(probe::missing_provider(&path)),
            };
            let response = match outcome {
                Ok(result) => BridgeMessage::Response {
                    id,
                    result: Some(result),
                    error: None,
                },
                Err(error) => BridgeMessage::Response {
                    id,
                    result: None,
                    error: Some(error),
                },
            };
            send(&bridge.ws, &response)?;
        }
    }
    Ok(())
}

/// Invokes `method` on `provider` and awaits the returned promise.
async fn call(provider: &JsValue, style: CallStyle, method: &str, params: &Value) -> Result<Value, JsValue> {
    let returned = match style {
        CallStyle::Request => {
            let args = Object::new();
            Reflect::set(&args, &JsValue::from_str("method"), &JsValue::from_str(method))?;
            if !params.is_null() {
                Reflect::set(&args, &JsValue::from_str("params"), &to_js(params)?)?;
            }
            function(provider, "request")?.call1(provider, &args)?
        }
        CallStyle::Method => {
            let f = function(provider, method)?;
            match (method, params) {
                // wallets take raw bytes plus a display hint
                ("signMessage", Value::Object(map)) => {
                    let message = map.get("message").and_then(Value::as_str).unwrap_or_default();
                    let display = map.get("display").and_then(Value::as_str).unwrap_or("utf8");
                    let bytes = Uint8Array::from(message.as_bytes());
                    f.call2(provider, &bytes, &JsValue::from_str(display))?
                }
                (_, Value::Null) => f.call0(provider)?,
                _ => f.call1(provider, &to_js(params)?)?,
            }
        }
    };
    let settled = JsFuture::from(Promise::resolve(&returned)).await?;
    Ok(to_wire(&settled, 0))
}

fn subscribe(bridge: &Rc<Bridge>, path: &str, provider: &JsValue) -> Result<(), JsValue> {
    let on = function(provider, "on")?;
    for name in CallStyle::for_path(path).events() {
        let bridge = Rc::clone(bridge);
        let path = path.to_string();
        let event_name = name.to_string();
        let listener = Closure::<dyn FnMut(JsValue)>::new(move |payload: JsValue| {
            let event = BridgeMessage::Event {
                path: path.clone(),
                name: event_name.clone(),
                payload: to_wire(&payload, 0),
            };
            if let Err(err) = send(&bridge.ws, &event) {
                log(&format!("event {} dropped: {err:?}", event_name));
            }
        });
        on.call2(provider, &JsValue::from_str(name), listener.as_ref().unchecked_ref())?;
        listener.forget();
    }
    Ok(())
}

/// Walks the injection points. An object reachable from several paths keeps
/// one `objectId`.
fn probe_window(window: &JsValue) -> Vec<Found> {
    let mut seen: Vec<JsValue> = Vec::new();
    let mut found = Vec::new();

    if let Some(list) = lookup(window, probe::PROVIDER_ARRAY).filter(Array::is_array) {
        let list = Array::from(&list);
        let len = (list.length() as usize).min(probe::MAX_ARRAY_PROVIDERS);
        for index in 0..len {
            let object = list.get(index as u32);
            if !object.is_object() {
                break;
            }
            record(&mut seen, &mut found, probe::array_path(index), object);
        }
    }
    for path in probe::INJECTION_POINTS {
        if let Some(object) = lookup(window, path) {
            record(&mut seen, &mut found, path.to_string(), object);
        }
    }
    found
}

fn record(seen: &mut Vec<JsValue>, found: &mut Vec<Found>, path: String, object: JsValue) {
    let (object_id, canonical) = match seen.iter().position(|s| Object::is(s, &object)) {
        Some(index) => (index, false),
        None => {
            seen.push(object.clone());
            (seen.len() - 1, true)
        }
    };
    let flags = ProviderFlags {
        is_meta_mask: bool_prop(&object, "isMetaMask"),
        is_coinbase_wallet: bool_prop(&object, "isCoinbaseWallet"),
        is_phantom: bool_prop(&object, "isPhantom"),
        is_brave_wallet: bool_prop(&object, "isBraveWallet"),
    };
    found.push(Found {
        provider: InjectedProvider {
            path,
            object_id: object_id as u32,
            flags,
        },
        object,
        canonical,
    });
}

/// Resolves a dotted property path; only objects count as found.
fn lookup(root: &JsValue, path: &str) -> Option<JsValue> {
    path.split('.')
        .try_fold(root.clone(), |value, key| {
            Reflect::get(&value, &JsValue::from_str(key))
                .ok()
                .filter(JsValue::is_object)
        })
}

/// Converts a provider result or event payload to JSON.
///
/// Public keys become their base58 string, byte arrays become hex.
fn to_wire(value: &JsValue, depth: usize) -> Value {
    if value.is_null() || value.is_undefined() || depth > MAX_DEPTH {
        return Value::Null;
    }
    if let Some(s) = value.as_string() {
        return Value::String(s);
    }
    if let Some(b) = value.as_bool() {
        return Value::Bool(b);
    }
    if let Some(n) = value.as_f64() {
        return if n.fract() == 0.0 && n.abs() < 9.0e15 {
            Value::from(n as i64)
        } else {
            serde_json::Number::from_f64(n).map_or(Value::Null, Value::Number)
        };
    }
    if let Some(bytes) = value.dyn_ref::<Uint8Array>() {
        return Value::String(probe::hex(&bytes.to_vec()));
    }
    if Array::is_array(value) {
        return Array::from(value).iter().map(|item| to_wire(&item, depth + 1)).collect();
    }
    if let Ok(to_base58) = function(value, "toBase58") {
        return to_base58
            .call0(value)
            .ok()
            .and_then(|s| s.as_string())
            .map_or(Value::Null, Value::String);
    }
    let Some(object) = value.dyn_ref::<Object>() else {
        return Value::Null;
    };
    let mut map = serde_json::Map::new();
    for key in Object::keys(object).iter() {
        if let Some(name) = key.as_string() {
            let field = Reflect::get(value, &key).unwrap_or(JsValue::UNDEFINED);
            if !field.is_function() {
                map.insert(name, to_wire(&field, depth + 1));
            }
        }
    }
    Value::Object(map)
}

fn to_js(value: &Value) -> Result<JsValue, JsValue> {
    use serde::Serialize;
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(JsValue::from)
}

fn to_rpc_error(thrown: &JsValue) -> wallet_protocol::RpcError {
    let code = Reflect::get(thrown, &JsValue::from_str("code")).ok().and_then(|c| c.as_f64());
    let message = Reflect::get(thrown, &JsValue::from_str("message"))
        .ok()
        .and_then(|m| m.as_string())
        .or_else(|| thrown.as_string());
    probe::thrown(code, message)
}

fn send(ws: &WebSocket, msg: &BridgeMessage) -> Result<(), JsValue> {
    let text = serde_json::to_string(msg).map_err(|e| JsValue::from_str(&e.to_string()))?;
    ws.send_with_str(&text)
}

fn function(target: &JsValue, name: &str) -> Result<Function, JsValue> {
    Reflect::get(target, &JsValue::from_str(name))?
        .dyn_into::<Function>()
        .map_err(|_| JsValue::from_str(&format!("{name} is not a function")))
}

fn string_prop(target: &JsValue, name: &str) -> Option<String> {
    Reflect::get(target, &JsValue::from_str(name)).ok()?.as_string()
}

fn bool_prop(target: &JsValue, name: &str) -> bool {
    Reflect::get(target, &JsValue::from_str(name))
        .ok()
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}

fn log(message: &str) {
    web_sys::console::log_1(&JsValue::from_str(&format!("[wallet-bridge] {message}")));
}
