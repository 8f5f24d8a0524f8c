//! Host-independent pieces of the bridge: where wallets inject themselves,
//! how each one is called, and how thrown errors map onto the wire.

use wallet_protocol::RpcError;

/// Array some pages expose when several EIP-1193 wallets are installed.
pub const PROVIDER_ARRAY: &str = "ethereum.providers";

/// Upper bound on entries read from [`PROVIDER_ARRAY`].
pub const MAX_ARRAY_PROVIDERS: usize = 16;

/// Fixed injection points, probed after the provider array.
pub const INJECTION_POINTS: &[&str] = &["ethereum", "coinbaseWalletExtension", "phantom.solana", "solana"];

/// Code reported when the provider threw without one (JSON-RPC internal error).
pub const INTERNAL_ERROR_CODE: i64 = -32603;

/// Code reported when a request names a path the bridge has no object for.
pub const DISCONNECTED_CODE: i64 = 4900;

/// How requests reach a provider object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStyle {
    /// `provider.request({ method, params })`
    Request,
    /// `provider[method](params)`
    Method,
}

impl CallStyle {
    pub fn for_path(path: &str) -> Self {
        if path == "solana" || path.ends_with(".solana") {
            CallStyle::Method
        } else {
            CallStyle::Request
        }
    }

    /// Native events forwarded for providers of this style.
    pub fn events(self) -> &'static [&'static str] {
        match self {
            CallStyle::Request => &["accountsChanged", "chainChanged", "disconnect"],
            CallStyle::Method => &["accountChanged", "disconnect"],
        }
    }
}

pub fn array_path(index: usize) -> String {
    format!("{PROVIDER_ARRAY}.{index}")
}

/// Error for a thrown value with the given `code` and `message` properties.
pub fn thrown(code: Option<f64>, message: Option<String>) -> RpcError {
    RpcError {
        code: code.filter(|c| c.fract() == 0.0).map_or(INTERNAL_ERROR_CODE, |c| c as i64),
        message: message.unwrap_or_else(|| "Provider request failed".to_string()),
    }
}

pub fn missing_provider(path: &str) -> RpcError {
    RpcError {
        code: DISCONNECTED_CODE,
        message: format!("No provider at {path}"),
    }
}

pub fn hex(bytes: &[u8]) -> String {
    use std::fmt::Write;
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}
